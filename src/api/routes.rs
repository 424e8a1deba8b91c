use crate::api::api_error::APIError;
use crate::api::doh;
use crate::api::model::{
    DeleteRecordParams, RemoveRecordRequest, UpsertRecordRequest, UpsertZoneRequest,
};
use crate::error::Error;
use crate::name::normalize_name;
use crate::node::Node;
use crate::record::{Record, RecordKind, SyncEvent, Zone};
use crate::sync::SYNC_TOKEN_HEADER;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const MAX_JSON_BODY_BYTES: usize = 1 << 20;
const API_TIMEOUT: Duration = Duration::from_secs(2);

pub fn new(node: Node) -> Router {
    let control = Router::new()
        .route("/v1/records", get(list_records))
        .route("/v1/records/:name", put(upsert_record).delete(delete_record))
        .route("/v1/records/:name/add", post(add_record))
        .route("/v1/records/:name/remove", post(remove_record))
        .route("/v1/zones", get(list_zones))
        .route("/v1/zones/:zone", put(upsert_zone))
        .route_layer(middleware::from_fn_with_state(node.clone(), api_auth));

    let sync = Router::new()
        .route("/v1/sync/event", post(sync_event))
        .route_layer(middleware::from_fn_with_state(node.clone(), sync_auth));

    Router::new()
        .route("/healthz", get(health_check))
        .route("/dns-query", get(doh::doh_get).post(doh::doh_post))
        .merge(control)
        .merge(sync)
        .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(API_TIMEOUT))
        .with_state(node)
}

/// Bearer or `X-API-Token` auth for the control endpoints. An empty
/// configured token leaves the API open.
async fn api_auth<B>(
    State(node): State<Node>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let expected = &node.config.api_token;
    if !expected.is_empty() && !token_matches(request.headers(), expected) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        )
            .into_response();
    }
    next.run(request).await
}

/// `X-Sync-Token` auth for peer ingest. An empty configured token leaves
/// the endpoint open.
async fn sync_auth<B>(
    State(node): State<Node>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let expected = &node.config.sync_token;
    if expected.is_empty() {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(SYNC_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if provided.is_empty() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing sync token"})),
        )
            .into_response();
    }
    if provided != expected {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid sync token"})),
        )
            .into_response();
    }
    next.run(request).await
}

fn token_matches(headers: &HeaderMap, expected: &str) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();
    if !bearer.is_empty() && bearer == expected {
        return true;
    }

    headers
        .get("x-api-token")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .map_or(false, |tok| !tok.is_empty() && tok == expected)
}

#[allow(clippy::unused_async)]
async fn health_check(State(node): State<Node>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "node_id": node.config.node_id,
        "uptime_sec": node.uptime_secs(),
    }))
}

#[allow(clippy::unused_async)]
async fn list_records(State(node): State<Node>) -> impl IntoResponse {
    Json(json!({ "records": node.store.list_records() }))
}

#[allow(clippy::unused_async)]
async fn list_zones(State(node): State<Node>) -> impl IntoResponse {
    Json(json!({ "zones": node.store.list_zones() }))
}

async fn upsert_record(
    State(node): State<Node>,
    Path(name): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<UpsertRecordRequest>, APIError>,
) -> Result<Json<Record>, APIError> {
    let propagate = payload.propagate.unwrap_or(true);
    let ns_hint = payload.ns.clone().unwrap_or_default();
    let rec = node
        .set_record(payload.into_wire(name), &ns_hint, propagate)
        .await?;
    Ok(Json(rec))
}

async fn add_record(
    State(node): State<Node>,
    Path(name): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<UpsertRecordRequest>, APIError>,
) -> Result<Json<Record>, APIError> {
    let propagate = payload.propagate.unwrap_or(true);
    let ns_hint = payload.ns.clone().unwrap_or_default();
    let rec = node
        .add_record(payload.into_wire(name), &ns_hint, propagate)
        .await?;
    Ok(Json(rec))
}

async fn remove_record(
    State(node): State<Node>,
    Path(name): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<RemoveRecordRequest>, APIError>,
) -> Result<Response, APIError> {
    let propagate = payload.propagate.unwrap_or(true);
    let (rec, version) = node.remove_record(payload.into_wire(name), propagate).await?;
    Ok(Json(json!({
        "removed": rec.name,
        "type": rec.kind().as_str(),
        "version": version,
    }))
    .into_response())
}

async fn delete_record(
    State(node): State<Node>,
    Path(name): Path<String>,
    Query(params): Query<DeleteRecordParams>,
) -> Result<Response, APIError> {
    let name = normalize_name(&name);
    if name == "." {
        return Err(Error::Validation("missing record name".to_string()).into());
    }
    let kind_filter = match params.kind.as_deref() {
        Some(tag) if !tag.trim().is_empty() => Some(tag.parse::<RecordKind>()?),
        _ => None,
    };
    let propagate = params.propagate.unwrap_or(true);

    let version = node.delete_records(&name, kind_filter, propagate).await?;
    Ok(Json(json!({
        "deleted": name,
        "type": kind_filter.map_or("", RecordKind::as_str),
        "version": version,
    }))
    .into_response())
}

async fn upsert_zone(
    State(node): State<Node>,
    Path(zone): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<UpsertZoneRequest>, APIError>,
) -> Result<Json<Zone>, APIError> {
    let propagate = payload.propagate.unwrap_or(true);
    let zone = node
        .upsert_zone(&zone, &payload.ns, payload.soa_ttl, propagate)
        .await?;
    Ok(Json(zone))
}

async fn sync_event(
    State(node): State<Node>,
    WithRejection(Json(event), _): WithRejection<Json<SyncEvent>, APIError>,
) -> Result<Response, APIError> {
    node.ingest(event).await?;
    Ok(Json(json!({"ok": true})).into_response())
}
