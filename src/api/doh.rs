//! RFC 8484 DNS-over-HTTPS adapter.
//!
//! Both forms decode to the same wire message and run through the shared
//! resolver, so a DoH answer is byte-identical to the UDP/TCP answer for
//! the same question and store state. TLS termination is left to a front
//! proxy.

use crate::node::Node;
use crate::resolver;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose;
use base64::{alphabet, engine, Engine};
use lazy_static::lazy_static;
use serde::Deserialize;
use trust_dns_proto::op::Message;

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// DNS wire-size cap; larger payloads get HTTP 413.
const MAX_WIRE_BYTES: usize = u16::MAX as usize;

lazy_static! {
    static ref BASE64URL_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

#[derive(Deserialize, Debug, Default)]
pub(super) struct DohParams {
    #[serde(default)]
    dns: String,
}

#[allow(clippy::unused_async)]
pub(super) async fn doh_get(
    State(node): State<Node>,
    Query(params): Query<DohParams>,
) -> Response {
    let encoded = params.dns.trim();
    if encoded.is_empty() {
        return plain_error(StatusCode::BAD_REQUEST, "missing dns query parameter");
    }

    match BASE64URL_ENGINE.decode(encoded) {
        Ok(payload) => answer(&node, &payload),
        Err(_) => plain_error(StatusCode::BAD_REQUEST, "invalid base64url dns parameter"),
    }
}

#[allow(clippy::unused_async)]
pub(super) async fn doh_post(State(node): State<Node>, body: Bytes) -> Response {
    if body.is_empty() {
        return plain_error(StatusCode::BAD_REQUEST, "empty request body");
    }
    answer(&node, &body)
}

fn answer(node: &Node, payload: &[u8]) -> Response {
    if payload.len() > MAX_WIRE_BYTES {
        return plain_error(StatusCode::PAYLOAD_TOO_LARGE, "dns message too large");
    }

    let request = match Message::from_vec(payload) {
        Ok(message) => message,
        Err(_) => return plain_error(StatusCode::BAD_REQUEST, "invalid dns message"),
    };

    let response = resolver::resolve_message(&node.store, &request);
    match response.to_vec() {
        Ok(wire) => (
            [
                (header::CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-store"),
            ],
            wire,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("failed to encode DoH response: {err}");
            plain_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode dns response",
            )
        }
    }
}

fn plain_error(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}
