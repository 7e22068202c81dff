//! Integration tests for the HTTP client facade.

use std::net::TcpListener;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::{ClientError, ClientOptions, HttpClient};
use crate::test_support::{
    ScriptedResponse, ephemeral_listener, refused_addr, spawn_scripted_server,
    spawn_stalling_server,
};

#[fixture]
fn tcp_listener() -> TcpListener {
    ephemeral_listener()
}

fn quick_client() -> HttpClient {
    HttpClient::new(ClientOptions {
        connect_timeout: Duration::from_secs(2),
        default_timeout: Duration::from_secs(5),
        ..Default::default()
    })
}

#[rstest]
fn get_returns_status_and_body(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_scripted_server(tcp_listener, vec![ScriptedResponse::ok("hi")]);
    let client = quick_client();

    let response = client
        .get(&format!("http://{addr}/probe"), &[], None)
        .expect("get");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"hi");

    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert_eq!(captured.method, "GET");
    assert_eq!(captured.path, "/probe");
}

#[rstest]
fn request_headers_are_forwarded(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_scripted_server(tcp_listener, vec![ScriptedResponse::ok("")]);
    let client = quick_client();
    let headers = vec![("X-Trace".to_owned(), "abc123".to_owned())];

    client
        .get(&format!("http://{addr}/"), &headers, None)
        .expect("get");

    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    let trace = captured
        .headers
        .iter()
        .find(|(name, _)| name == "x-trace")
        .map(|(_, value)| value.as_str());
    assert_eq!(trace, Some("abc123"));
}

#[rstest]
#[case("POST")]
#[case("PUT")]
#[case("PATCH")]
fn body_bearing_methods_send_their_payload(tcp_listener: TcpListener, #[case] method: &str) {
    let (addr, rx) = spawn_scripted_server(tcp_listener, vec![ScriptedResponse::new(201, "")]);
    let client = quick_client();
    let url = format!("http://{addr}/items");

    let response = match method {
        "POST" => client.post(&url, &[], b"payload", None),
        "PUT" => client.put(&url, &[], b"payload", None),
        "PATCH" => client.patch(&url, &[], b"payload", None),
        _ => unreachable!(),
    }
    .expect("request");
    assert_eq!(response.status, 201);

    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert_eq!(captured.method, method);
    assert_eq!(captured.body, "payload");
}

#[rstest]
fn delete_sends_no_body(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_scripted_server(tcp_listener, vec![ScriptedResponse::new(204, "")]);
    let client = quick_client();

    let response = client
        .delete(&format!("http://{addr}/items/1"), &[], None)
        .expect("delete");
    assert_eq!(response.status, 204);

    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert_eq!(captured.method, "DELETE");
    assert!(captured.body.is_empty());
}

#[rstest]
fn non_2xx_statuses_are_responses_not_errors(tcp_listener: TcpListener) {
    let (addr, _rx) =
        spawn_scripted_server(tcp_listener, vec![ScriptedResponse::new(404, "missing")]);
    let client = quick_client();

    let response = client
        .get(&format!("http://{addr}/nowhere"), &[], None)
        .expect("a 404 still yields a response");
    assert_eq!(response.status, 404);
    assert_eq!(response.body, b"missing");
}

#[test]
fn connection_refused_maps_to_connect_failed() {
    let addr = refused_addr();
    let client = quick_client();

    let error = client
        .get(&format!("http://{addr}/"), &[], None)
        .expect_err("nothing listens there");
    assert!(matches!(error, ClientError::ConnectFailed(_)));
}

#[rstest]
fn exceeding_the_request_timeout_maps_to_timeout(tcp_listener: TcpListener) {
    let addr = spawn_stalling_server(tcp_listener, Duration::from_secs(3));
    let client = quick_client();

    let error = client
        .get(
            &format!("http://{addr}/slow"),
            &[],
            Some(Duration::from_millis(200)),
        )
        .expect_err("server never answers");
    assert_eq!(error, ClientError::Timeout);
}

#[rstest]
fn bodies_over_the_cap_are_rejected(tcp_listener: TcpListener) {
    let (addr, _rx) =
        spawn_scripted_server(tcp_listener, vec![ScriptedResponse::ok("0123456789")]);
    let client = HttpClient::new(ClientOptions {
        connect_timeout: Duration::from_secs(2),
        default_timeout: Duration::from_secs(5),
        max_body_bytes: 8,
    });

    let error = client
        .get(&format!("http://{addr}/big"), &[], None)
        .expect_err("body exceeds the cap");
    assert_eq!(error, ClientError::BodyTooLarge(8));
}

#[rstest]
fn response_headers_are_captured(tcp_listener: TcpListener) {
    let (addr, _rx) = spawn_scripted_server(tcp_listener, vec![ScriptedResponse::ok("x")]);
    let client = quick_client();

    let response = client
        .get(&format!("http://{addr}/"), &[], None)
        .expect("get");
    let content_length = response
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.as_str());
    assert_eq!(content_length, Some("1"));
}
