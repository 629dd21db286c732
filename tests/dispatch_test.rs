//! Room dispatch forwarding against a mock real-time backend

mod common;

use std::time::Duration;

use bytes::Bytes;
use gatehouse::auth::{sign, SIGNATURE_HEADER};
use gatehouse::relay::DispatchForwarder;
use hyper::header::HeaderValue;
use hyper::HeaderMap;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GATEWAY: &str = "https://gateway.example.com";

fn forwarder(server: &MockServer) -> DispatchForwarder {
    DispatchForwarder::new(
        reqwest::Client::new(),
        server.uri(),
        GATEWAY,
        Duration::from_secs(2),
    )
}

fn signed_headers(body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&sign(body, &common::secret())).unwrap(),
    );
    headers
}

#[tokio::test]
async fn test_forwards_body_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dispatch/r1"))
        .and(header("ORIGIN", GATEWAY))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // Deliberately odd spacing: the bytes must arrive as sent
    let body = Bytes::from_static(br#"{"type":"ping",  "payload": [1,2,3] }"#);
    assert_eq!(body.len(), 37);
    let inbound = signed_headers(&body);

    forwarder(&server)
        .forward("r1", body.clone(), &inbound)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, body.to_vec());
    assert_eq!(
        requests[0].headers.get(SIGNATURE_HEADER).unwrap(),
        inbound.get(SIGNATURE_HEADER).unwrap()
    );
}

#[tokio::test]
async fn test_room_id_is_url_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dispatch/room%20one"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    tokio_test::assert_ok!(
        forwarder(&server)
            .forward("room one", Bytes::from_static(b"{}"), &HeaderMap::new())
            .await
    );
}

#[tokio::test]
async fn test_empty_room_id_is_bad_request() {
    let server = MockServer::start().await;

    let err = forwarder(&server)
        .forward("", Bytes::from_static(b"{}"), &HeaderMap::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "actionRoomIdRequired");
    assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_rejection_is_relay_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("stack trace here"))
        .mount(&server)
        .await;

    let err = forwarder(&server)
        .forward("r1", Bytes::from_static(b"{}"), &HeaderMap::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "relay/peerStatus");
    assert!(!err.public_message().contains("stack"));
}
