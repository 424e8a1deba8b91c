mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::{authed_json, body_bytes, test_app};
use std::str::FromStr;
use tower::ServiceExt;
use trust_dns_proto::op::{Message, Query, ResponseCode};
use trust_dns_proto::rr::{Name, RData, RecordType};

fn query_wire(name: &str, qtype: RecordType) -> Vec<u8> {
    let mut message = Message::new();
    message.set_id(4242).add_query(Query::query(
        Name::from_str(name).unwrap(),
        qtype,
    ));
    message.to_vec().unwrap()
}

fn doh_get(wire: &[u8]) -> Request<Body> {
    let encoded = URL_SAFE_NO_PAD.encode(wire);
    Request::builder()
        .uri(format!("/dns-query?dns={encoded}"))
        .body(Body::empty())
        .unwrap()
}

fn doh_post(wire: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/dns-query")
        .header("content-type", "application/dns-message")
        .body(Body::from(wire))
        .unwrap()
}

#[tokio::test]
async fn get_and_post_return_identical_wire_bytes() {
    let (_, app) = test_app().await;
    app.clone()
        .oneshot(authed_json(
            "PUT",
            "/v1/records/app.example.com",
            r#"{"ip":"198.51.100.5","ttl":15}"#,
        ))
        .await
        .unwrap();

    let wire = query_wire("app.example.com.", RecordType::A);

    let get_response = app.clone().oneshot(doh_get(&wire)).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    assert_eq!(
        get_response.headers()["content-type"],
        "application/dns-message"
    );
    assert_eq!(get_response.headers()["cache-control"], "no-store");
    let get_bytes = body_bytes(get_response).await;

    let post_response = app.oneshot(doh_post(wire)).await.unwrap();
    assert_eq!(post_response.status(), StatusCode::OK);
    let post_bytes = body_bytes(post_response).await;

    assert_eq!(get_bytes, post_bytes);

    let message = Message::from_vec(&get_bytes).unwrap();
    assert_eq!(message.id(), 4242);
    assert!(message.authoritative());
    assert_eq!(message.response_code(), ResponseCode::NoError);
    assert_eq!(message.answers().len(), 1);
    assert_eq!(
        message.answers()[0].data(),
        Some(&RData::A("198.51.100.5".parse().unwrap()))
    );
}

#[tokio::test]
async fn doh_reports_nxdomain_with_soa_authority() {
    let (_, app) = test_app().await;
    app.clone()
        .oneshot(authed_json("PUT", "/v1/zones/example.com", "{}"))
        .await
        .unwrap();

    let wire = query_wire("missing.example.com.", RecordType::A);
    let response = app.oneshot(doh_post(wire)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let message = Message::from_vec(&body_bytes(response).await).unwrap();
    assert_eq!(message.response_code(), ResponseCode::NXDomain);
    assert_eq!(message.name_servers().len(), 1);
    assert_eq!(message.name_servers()[0].record_type(), RecordType::SOA);
}

#[tokio::test]
async fn missing_dns_parameter_is_bad_request() {
    let (_, app) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/dns-query")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_base64_is_bad_request() {
    let (_, app) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/dns-query?dns=%21%21not-base64%21%21")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_post_body_is_bad_request() {
    let (_, app) = test_app().await;
    let response = app
        .oneshot(doh_post(Vec::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn garbage_wire_payload_is_bad_request() {
    let (_, app) = test_app().await;
    let response = app.oneshot(doh_post(vec![0xff; 8])).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_message_is_rejected() {
    let (_, app) = test_app().await;
    let response = app
        .oneshot(doh_post(vec![0; (u16::MAX as usize) + 1]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
