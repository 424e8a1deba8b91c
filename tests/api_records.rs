mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{authed, authed_json, body_json, test_app, API_TOKEN};
use std::str::FromStr;
use tower::ServiceExt;
use trust_dns_proto::op::{Message, Query, ResponseCode};
use trust_dns_proto::rr::{Name, RData, RecordType};

use shoaldns::resolver;

fn question(name: &str, qtype: RecordType) -> Message {
    let mut message = Message::new();
    message.add_query(Query::query(Name::from_str(name).unwrap(), qtype));
    message
}

#[tokio::test]
async fn put_record_then_resolve_a() {
    let (node, app) = test_app().await;

    let response = app
        .clone()
        .oneshot(authed_json(
            "PUT",
            "/v1/records/app.example.com",
            r#"{"ip":"198.51.100.5","ttl":15}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["name"], "app.example.com.");
    assert_eq!(json["type"], "A");
    assert_eq!(json["ip"], "198.51.100.5");
    assert_eq!(json["ttl"], 15);
    assert_eq!(json["zone"], "example.com.");
    assert_eq!(json["source"], "test-node");

    let answer = resolver::resolve_message(&node.store, &question("app.example.com.", RecordType::A));
    assert_eq!(answer.response_code(), ResponseCode::NoError);
    assert!(answer.authoritative());
    assert_eq!(answer.answers().len(), 1);
    assert_eq!(answer.answers()[0].ttl(), 15);
    assert_eq!(
        answer.answers()[0].data(),
        Some(&RData::A("198.51.100.5".parse().unwrap()))
    );
}

#[tokio::test]
async fn put_requires_api_token() {
    let (_, app) = test_app().await;

    let unauthed = Request::builder()
        .method("PUT")
        .uri("/v1/records/app.example.com")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"ip":"198.51.100.5"}"#))
        .unwrap();
    let response = app.clone().oneshot(unauthed).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bearer = Request::builder()
        .method("PUT")
        .uri("/v1/records/app.example.com")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {API_TOKEN}"))
        .body(Body::from(r#"{"ip":"198.51.100.5"}"#))
        .unwrap();
    let response = app.clone().oneshot(bearer).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = app.oneshot(Request::builder()
        .uri("/v1/records")
        .body(Body::empty())
        .unwrap())
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_json_fields_are_rejected() {
    let (_, app) = test_app().await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/v1/records/app.example.com",
            r#"{"ip":"198.51.100.5","bogus":1}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn invalid_ip_for_type_is_rejected() {
    let (_, app) = test_app().await;

    let response = app
        .clone()
        .oneshot(authed_json(
            "PUT",
            "/v1/records/app.example.com",
            r#"{"type":"A","ip":"2001:db8::1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/v1/records/app.example.com",
            r#"{"type":"AAAA","ip":"198.51.100.5"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ttl_defaults_from_config() {
    let (_, app) = test_app().await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/v1/records/app.example.com",
            r#"{"ip":"198.51.100.5"}"#,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["ttl"], 20);
}

#[tokio::test]
async fn put_without_zone_ns_source_fails() {
    let config = std::sync::Arc::new(shoaldns::Config {
        default_ns: Vec::new(),
        ..(*common::test_config()).clone()
    });
    let node = common::test_node_with_config(config).await;
    let app = shoaldns::api::routes::new(node);

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/v1/records/app.example.com",
            r#"{"ip":"198.51.100.5"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("DEFAULT_NS"));
}

#[tokio::test]
async fn add_two_members_then_remove_one() {
    let (node, app) = test_app().await;

    for ip in ["198.51.100.1", "198.51.100.2"] {
        let response = app
            .clone()
            .oneshot(authed_json(
                "POST",
                "/v1/records/pool.example.com/add",
                &format!(r#"{{"type":"A","ip":"{ip}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let answer =
        resolver::resolve_message(&node.store, &question("pool.example.com.", RecordType::A));
    assert_eq!(answer.answers().len(), 2);

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/v1/records/pool.example.com/remove",
            r#"{"type":"A","ip":"198.51.100.1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["removed"], "pool.example.com.");
    assert_eq!(json["type"], "A");

    let answer =
        resolver::resolve_message(&node.store, &question("pool.example.com.", RecordType::A));
    assert_eq!(answer.answers().len(), 1);
    assert_eq!(
        answer.answers()[0].data(),
        Some(&RData::A("198.51.100.2".parse().unwrap()))
    );
}

#[tokio::test]
async fn put_replaces_the_whole_rrset() {
    let (node, app) = test_app().await;

    for ip in ["198.51.100.1", "198.51.100.2"] {
        app.clone()
            .oneshot(authed_json(
                "POST",
                "/v1/records/pool.example.com/add",
                &format!(r#"{{"type":"A","ip":"{ip}"}}"#),
            ))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/v1/records/pool.example.com",
            r#"{"type":"A","ip":"198.51.100.9"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = node.store.get_records("pool.example.com", RecordType::A);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data.fingerprint(), "198.51.100.9");
}

#[tokio::test]
async fn delete_with_type_filter() {
    let (node, app) = test_app().await;

    app.clone()
        .oneshot(authed_json(
            "POST",
            "/v1/records/app.example.com/add",
            r#"{"type":"A","ip":"198.51.100.1"}"#,
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(authed_json(
            "POST",
            "/v1/records/app.example.com/add",
            r#"{"type":"TXT","text":"hello"}"#,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed("DELETE", "/v1/records/app.example.com?type=TXT"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["deleted"], "app.example.com.");
    assert_eq!(json["type"], "TXT");
    assert!(json["version"].as_i64().unwrap() > 0);

    assert!(node
        .store
        .get_records("app.example.com", RecordType::TXT)
        .is_empty());
    assert_eq!(
        node.store.get_records("app.example.com", RecordType::A).len(),
        1
    );

    let response = app
        .oneshot(authed("DELETE", "/v1/records/app.example.com?type=SRV"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_records_is_name_sorted() {
    let (_, app) = test_app().await;

    for name in ["b.example.com", "a.example.com"] {
        app.clone()
            .oneshot(authed_json(
                "PUT",
                &format!("/v1/records/{name}"),
                r#"{"ip":"198.51.100.1"}"#,
            ))
            .await
            .unwrap();
    }

    let response = app.oneshot(authed("GET", "/v1/records")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let records = json["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "a.example.com.");
    assert_eq!(records[1]["name"], "b.example.com.");
}

#[tokio::test]
async fn type_inference_covers_legacy_payloads() {
    let (_, app) = test_app().await;

    let cases = [
        (r#"{"text":"hello"}"#, "TXT"),
        (r#"{"target":"mail.example.com","priority":5}"#, "MX"),
        (r#"{"target":"app.example.com"}"#, "CNAME"),
        (r#"{"ip":"2001:db8::1"}"#, "AAAA"),
        (r#"{"ip":"198.51.100.5"}"#, "A"),
    ];
    for (body, expected) in cases {
        let response = app
            .clone()
            .oneshot(authed_json("PUT", "/v1/records/infer.example.com", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "payload {body}");
        let json = body_json(response).await;
        assert_eq!(json["type"], expected, "payload {body}");
    }
}

#[tokio::test]
async fn healthz_is_open_and_reports_identity() {
    let (_, app) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["node_id"], "test-node");
    assert!(json["uptime_sec"].is_number());
}
