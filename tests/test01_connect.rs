use std::sync::Arc;

use cubrid_adapter::client::IsolationLevel;
use cubrid_adapter::prelude::*;
use cubrid_adapter::test_utils::{FailPoint, FakeClient};

fn url() -> UrlParts {
    UrlParts::new()
        .user("dba")
        .password("secret")
        .host("db.example.com")
        .port(33000)
        .path("/demodb")
}

#[test]
fn connect_succeeds_with_full_url() {
    let client = Arc::new(FakeClient::new());
    let conn = CubridConnection::connect(client, &url()).unwrap();
    assert_eq!(conn.last_error(), "");
}

#[test]
fn connect_rejects_incomplete_urls_before_touching_the_client() {
    let client = Arc::new(FakeClient::new());
    client.fail(FailPoint::Connect);

    let no_user = UrlParts::new()
        .password("p")
        .host("h")
        .port(33000)
        .path("/d");
    let err = CubridConnection::connect(client.clone(), &no_user)
        .unwrap_err();
    // validation fires first, so the armed native failure is never reached
    assert_eq!(
        err.to_string(),
        "Connect error: no username specified in URL"
    );

    let mut no_port = url();
    no_port.port = None;
    let err = CubridConnection::connect(client.clone(), &no_port).unwrap_err();
    assert_eq!(err.to_string(), "Connect error: no port specified in URL");
}

#[test]
fn connect_rejects_bad_connect_timeout() {
    let client = Arc::new(FakeClient::new());
    let bad = url().with_parameter("connect-timeout", "never");
    let err = CubridConnection::connect(client, &bad).unwrap_err();
    assert_eq!(err.to_string(), "Connect error: invalid connect timeout value");
}

#[test]
fn unix_socket_parameter_substitutes_localhost() {
    let client = Arc::new(FakeClient::new());
    let mut via_socket = url().with_parameter("unix-socket", "/tmp/cubrid.sock");
    via_socket.host = None;
    assert!(CubridConnection::connect(client, &via_socket).is_ok());
}

#[test]
fn native_connect_failure_surfaces_the_client_message() {
    let client = Arc::new(FakeClient::new());
    client.fail(FailPoint::Connect);
    let err = CubridConnection::connect(client.clone(), &url())
        .unwrap_err();
    match err {
        CubridAdapterError::ConnectError(msg) => {
            assert!(msg.contains("cannot connect to demodb@db.example.com"), "{msg}");
        }
        other => panic!("expected ConnectError, got {other:?}"),
    }
}

#[test]
fn connect_applies_session_defaults() {
    let client = Arc::new(FakeClient::new());
    let _conn =
        CubridConnection::connect(client.clone(), &url()).unwrap();
    let settings = client.last_session_settings().unwrap();
    assert_eq!(settings.autocommit, Some(true));
    assert_eq!(settings.lock_timeout_ms, Some(100));
    assert_eq!(
        settings.isolation,
        Some(IsolationLevel::RepClassCommitInstance)
    );
    assert_eq!(settings.query_timeout_ms, Some(3000));
}

#[test]
fn query_timeout_is_adjustable_after_connect() {
    let client = Arc::new(FakeClient::new());
    let mut conn =
        CubridConnection::connect(client.clone(), &url()).unwrap();
    conn.set_query_timeout(250);
    assert_eq!(conn.query_timeout(), 250);
    assert_eq!(
        client.last_session_settings().unwrap().query_timeout_ms,
        Some(250)
    );
}

#[test]
fn close_disconnects_exactly_once() {
    let client = Arc::new(FakeClient::new());
    let mut conn =
        CubridConnection::connect(client.clone(), &url()).unwrap();
    conn.close();
    conn.close();
    drop(conn);
    assert_eq!(client.disconnect_count(), 1);
}

#[test]
fn dropping_an_unclosed_connection_disconnects() {
    let client = Arc::new(FakeClient::new());
    let conn =
        CubridConnection::connect(client.clone(), &url()).unwrap();
    drop(conn);
    assert_eq!(client.disconnect_count(), 1);
}
