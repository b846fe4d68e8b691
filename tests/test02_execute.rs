use std::sync::Arc;

use cubrid_adapter::prelude::*;
use cubrid_adapter::test_utils::{FailPoint, FakeClient};

fn connected() -> (Arc<FakeClient>, CubridConnection) {
    let client = Arc::new(FakeClient::new());
    let url = UrlParts::new()
        .user("dba")
        .password("secret")
        .host("localhost")
        .port(33000)
        .path("/demodb");
    let conn = CubridConnection::connect(client.clone(), &url).unwrap();
    (client, conn)
}

#[test]
fn execute_runs_ddl_and_dml() {
    let (client, mut conn) = connected();
    assert!(conn.execute("CREATE TABLE t (a INT, b STRING)"));
    assert!(conn.execute("INSERT INTO t VALUES (1, 'one')"));
    assert!(conn.execute("INSERT INTO t VALUES (2, 'two')"));
    assert_eq!(conn.last_error(), "");
    assert_eq!(client.table_row_count("t"), Some(2));
}

#[test]
fn execute_reports_failure_and_records_the_message() {
    let (_client, mut conn) = connected();
    assert!(!conn.execute("GRANT ALL ON t TO nobody"));
    assert!(conn.last_error().contains("unsupported statement"));
}

#[test]
fn execute_releases_the_temporary_statement_on_every_path() {
    let (client, mut conn) = connected();
    assert!(conn.execute("CREATE TABLE t (a INT)"));
    assert!(!conn.execute("nonsense"));
    client.fail(FailPoint::Execute);
    assert!(!conn.execute("INSERT INTO t VALUES (1)"));
    client.clear_failures();
    assert_eq!(client.open_request_count(), 0);
}

#[test]
fn failed_execute_rolls_the_transaction_back() {
    let (client, mut conn) = connected();
    assert!(conn.execute("CREATE TABLE t (a INT)"));
    assert!(conn.execute("INSERT INTO t VALUES (1)"));
    assert!(conn.commit());

    assert!(conn.execute("INSERT INTO t VALUES (2)"));
    client.fail(FailPoint::Execute);
    assert!(!conn.execute("INSERT INTO t VALUES (3)"));
    client.clear_failures();

    assert_eq!(conn.last_error(), "execute failed");
    assert_eq!(client.rollback_count(), 1);
    // the uncommitted second insert went down with the rollback
    assert_eq!(client.table_row_count("t"), Some(1));
}

#[test]
fn a_successful_statement_clears_a_prior_error() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT)");
    client.fail(FailPoint::Execute);
    assert!(!conn.execute("INSERT INTO t VALUES (1)"));
    assert_eq!(conn.last_error(), "execute failed");
    client.clear_failures();
    assert!(conn.execute("INSERT INTO t VALUES (1)"));
    assert_eq!(conn.last_error(), "");
}

#[test]
fn ping_round_trips_and_releases_its_handle() {
    let (client, mut conn) = connected();
    assert!(conn.ping());
    assert_eq!(client.open_request_count(), 0);

    client.fail(FailPoint::Execute);
    assert!(!conn.ping());
    assert_eq!(conn.last_error(), "execute failed");
    assert_eq!(client.open_request_count(), 0);
}

#[test]
fn ping_does_not_mask_an_unresolved_error() {
    let (client, mut conn) = connected();
    client.fail(FailPoint::Execute);
    assert!(!conn.execute("CREATE TABLE t (a INT)"));
    client.clear_failures();
    // the probe itself succeeds but the connection still carries the error
    assert!(!conn.ping());
}

#[test]
fn transaction_bool_contract() {
    let (client, mut conn) = connected();
    assert!(conn.begin_transaction());
    conn.execute("CREATE TABLE t (a INT)");
    conn.execute("INSERT INTO t VALUES (1)");
    assert!(conn.commit());

    client.fail(FailPoint::EndTran);
    assert!(!conn.commit());
    assert_eq!(conn.last_error(), "end transaction failed");
    // an unusable session refuses to open a transaction
    assert!(!conn.begin_transaction());
    client.clear_failures();
}

#[test]
fn a_successful_end_tran_does_not_clear_a_sticky_error() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT)");
    assert!(conn.commit());
    client.fail(FailPoint::EndTran);
    assert!(!conn.commit());
    client.clear_failures();

    // the native rollback succeeds, but the error stays buffered until a
    // new statement attempt overwrites it
    assert!(!conn.rollback());
    assert_eq!(conn.last_error(), "end transaction failed");
    assert!(!conn.begin_transaction());

    assert!(conn.execute("INSERT INTO t VALUES (1)"));
    assert_eq!(conn.last_error(), "");
    assert!(conn.commit());
    assert!(conn.begin_transaction());
}

#[test]
fn rollback_discards_uncommitted_changes() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT)");
    conn.execute("INSERT INTO t VALUES (1)");
    assert!(conn.commit());
    conn.execute("INSERT INTO t VALUES (2)");
    assert!(conn.rollback());
    assert_eq!(client.table_row_count("t"), Some(1));
}

#[test]
fn last_insert_row_id_tracks_inserts() {
    let (_client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT)");
    conn.execute("INSERT INTO t VALUES (1)");
    assert_eq!(conn.last_insert_row_id(), 1);
    conn.execute("INSERT INTO t VALUES (2)");
    assert_eq!(conn.last_insert_row_id(), 2);
}

#[test]
fn last_insert_row_id_degrades_to_zero() {
    // absent entry point
    let (client, mut conn) = connected();
    client.set_last_insert_id_unavailable();
    conn.execute("CREATE TABLE t (a INT)");
    conn.execute("INSERT INTO t VALUES (1)");
    assert_eq!(conn.last_insert_row_id(), 0);
    assert_eq!(conn.last_error(), "");

    // native failure
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT)");
    conn.execute("INSERT INTO t VALUES (1)");
    client.fail(FailPoint::LastInsertId);
    assert_eq!(conn.last_insert_row_id(), 0);
    assert_eq!(conn.last_error(), "last insert id failed");
}

#[test]
fn rows_changed_reports_or_fails_hard() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT)");
    conn.execute("INSERT INTO t VALUES (1)");
    conn.execute("INSERT INTO t VALUES (2)");
    assert_eq!(conn.rows_changed().unwrap(), 1);
    conn.execute("DELETE FROM t");
    assert_eq!(conn.rows_changed().unwrap(), 2);

    client.fail(FailPoint::RowCount);
    match conn.rows_changed() {
        Err(CubridAdapterError::StatementError(msg)) => assert_eq!(msg, "row count failed"),
        other => panic!("expected StatementError, got {other:?}"),
    }
    assert_eq!(conn.last_error(), "row count failed");
}
