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

fn assert_out_of_range(result: Result<(), CubridAdapterError>) {
    match result {
        Err(CubridAdapterError::StatementError(msg)) => {
            assert_eq!(msg, "Parameter index is out of range");
        }
        other => panic!("expected StatementError, got {other:?}"),
    }
}

#[test]
fn param_count_comes_from_the_placeholders() {
    let (_client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT, b STRING, c DOUBLE)");
    let stmt = conn
        .prepare_statement("INSERT INTO t VALUES (?, 'fixed', ?)")
        .unwrap();
    assert_eq!(stmt.param_count(), 2);
}

#[test]
fn out_of_range_indexes_fail_without_a_native_call() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT, b STRING)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?, ?)").unwrap();

    assert_out_of_range(stmt.set_int(0, 1));
    assert_out_of_range(stmt.set_int(3, 1));
    assert_out_of_range(stmt.set_string(9, Some("x")));
    assert_out_of_range(stmt.set_blob(0, Some(b"x")));
    assert_eq!(client.bind_call_count(), 0);
    assert_eq!(client.live_blob_count(), 0);
}

#[test]
fn setter_order_does_not_matter_and_the_last_value_wins() {
    let (_client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT, b STRING)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?, ?)").unwrap();
    stmt.set_string(2, Some("row")).unwrap();
    stmt.set_int(1, 1).unwrap();
    stmt.set_int(1, 42).unwrap();
    stmt.execute().unwrap();
    drop(stmt);

    let mut rs = conn.execute_query("SELECT a, b FROM t").unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_string(1).unwrap().as_deref(), Some("42"));
    assert_eq!(rs.get_string(2).unwrap().as_deref(), Some("row"));
}

#[test]
fn typed_setters_round_trip_through_a_query() {
    let (_client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT, b BIGINT, c DOUBLE, d STRING)");
    let mut stmt = conn
        .prepare_statement("INSERT INTO t VALUES (?, ?, ?, ?)")
        .unwrap();
    stmt.set_int(1, -7).unwrap();
    stmt.set_long(2, 9_000_000_000).unwrap();
    stmt.set_double(3, 2.5).unwrap();
    stmt.set_string(4, Some("text")).unwrap();
    stmt.execute().unwrap();
    drop(stmt);

    let mut rs = conn.execute_query("SELECT * FROM t").unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_string(1).unwrap().as_deref(), Some("-7"));
    assert_eq!(rs.get_string(2).unwrap().as_deref(), Some("9000000000"));
    assert_eq!(rs.get_string(3).unwrap().as_deref(), Some("2.5"));
    assert_eq!(rs.get_string(4).unwrap().as_deref(), Some("text"));
}

#[test]
fn null_string_binds_sql_null() {
    let (_client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a STRING)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?)").unwrap();
    stmt.set_string(1, None).unwrap();
    stmt.execute().unwrap();
    drop(stmt);

    let mut rs = conn.execute_query("SELECT * FROM t").unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_string(1).unwrap(), None);
}

#[test]
fn blob_bind_round_trips() {
    let (_client, mut conn) = connected();
    conn.execute("CREATE TABLE t (data BLOB)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?)").unwrap();
    stmt.set_blob(1, Some(&[0u8, 1, 2, 255])).unwrap();
    stmt.execute().unwrap();
    drop(stmt);

    let mut rs = conn.execute_query("SELECT * FROM t").unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_blob(1).unwrap(), Some(vec![0u8, 1, 2, 255]));
}

#[test]
fn null_blob_binds_without_allocating() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (data BLOB)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?)").unwrap();
    stmt.set_blob(1, None).unwrap();
    assert_eq!(client.live_blob_count(), 0);
    stmt.execute().unwrap();
    drop(stmt);

    let mut rs = conn.execute_query("SELECT * FROM t").unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_blob(1).unwrap(), None);
}

#[test]
fn short_blob_write_releases_the_blob_and_fails() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (data BLOB)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?)").unwrap();
    client.set_short_blob_write(2);
    match stmt.set_blob(1, Some(&[1, 2, 3, 4])) {
        Err(CubridAdapterError::StatementError(msg)) => {
            assert_eq!(msg, "blob write size mismatch (2) <> (4)");
        }
        other => panic!("expected StatementError, got {other:?}"),
    }
    assert_eq!(client.live_blob_count(), 0);
    assert_eq!(client.blob_free_count(), 1);
}

#[test]
fn blob_allocation_failure_is_reported() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (data BLOB)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?)").unwrap();
    client.fail(FailPoint::BlobNew);
    match stmt.set_blob(1, Some(b"x")) {
        Err(CubridAdapterError::StatementError(msg)) => {
            assert!(msg.starts_with("blob allocate failed"), "{msg}");
        }
        other => panic!("expected StatementError, got {other:?}"),
    }
}

#[test]
fn rebinding_a_blob_slot_releases_the_displaced_blob() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (data BLOB)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?)").unwrap();
    stmt.set_blob(1, Some(b"first")).unwrap();
    stmt.set_blob(1, Some(b"second")).unwrap();
    assert_eq!(client.blob_free_count(), 1);
    assert_eq!(client.live_blob_count(), 1);
    stmt.close();
    assert_eq!(client.live_blob_count(), 0);
}

#[test]
fn close_releases_the_handle_and_every_staged_blob_once() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a BLOB, b BLOB)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?, ?)").unwrap();
    stmt.set_blob(1, Some(b"a")).unwrap();
    stmt.set_blob(2, Some(b"b")).unwrap();
    stmt.close();
    stmt.close();
    drop(stmt);
    assert_eq!(client.open_request_count(), 0);
    assert_eq!(client.live_blob_count(), 0);
    assert_eq!(client.blob_free_count(), 2);
}

#[test]
fn bind_failure_surfaces_at_execute() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?)").unwrap();
    stmt.set_int(1, 1).unwrap();
    client.fail(FailPoint::BindParam);
    match stmt.execute() {
        Err(CubridAdapterError::StatementError(msg)) => assert_eq!(msg, "bind failed"),
        other => panic!("expected StatementError, got {other:?}"),
    }
}

#[test]
fn unset_slots_are_sent_as_nothing() {
    let (client, mut conn) = connected();
    conn.execute("CREATE TABLE t (a INT, b STRING)");
    let mut stmt = conn.prepare_statement("INSERT INTO t VALUES (?, ?)").unwrap();
    stmt.set_int(1, 5).unwrap();
    stmt.execute().unwrap();
    // only the populated slot produced a native bind
    assert_eq!(client.bind_call_count(), 1);
    drop(stmt);

    let mut rs = conn.execute_query("SELECT * FROM t").unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_string(2).unwrap(), None);
}
