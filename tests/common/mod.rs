//! Shared test infrastructure for the HTTP-surface integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;

use shoaldns::config::Config;
use shoaldns::{Node, Persistence, Replicator, Store};

pub const API_TOKEN: &str = "test-api-token";
pub const SYNC_TOKEN: &str = "test-sync-token";

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        node_id: "test-node".to_string(),
        http_listen: "127.0.0.1:0".parse().unwrap(),
        dns_udp_listen: "127.0.0.1:0".parse().unwrap(),
        dns_tcp_listen: "127.0.0.1:0".parse().unwrap(),
        db_path: String::new(),
        migrations_dir: "migrations".to_string(),
        api_token: API_TOKEN.to_string(),
        sync_token: SYNC_TOKEN.to_string(),
        peers: Vec::new(),
        default_ttl: 20,
        default_zone: String::new(),
        default_ns: vec!["ns1.example.com.".to_string()],
    })
}

pub async fn test_node_with_config(config: Arc<Config>) -> Node {
    let store = Store::new();
    let persist = Persistence::open_in_memory(&config.migrations_dir)
        .await
        .expect("open in-memory persistence");
    let replicator = Replicator::new(&config).expect("build replicator");
    Node::new(config, store, persist, replicator)
}

pub async fn test_node() -> Node {
    test_node_with_config(test_config()).await
}

pub async fn test_app() -> (Node, Router) {
    let node = test_node().await;
    let app = shoaldns::api::routes::new(node.clone());
    (node, app)
}

/// Build a JSON request carrying the control API token.
pub fn authed_json(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-token", API_TOKEN)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-token", API_TOKEN)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<axum::body::BoxBody>) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<axum::body::BoxBody>) -> Vec<u8> {
    hyper::body::to_bytes(response.into_body())
        .await
        .unwrap()
        .to_vec()
}
