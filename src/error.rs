//! Error types.

use axum::extract::rejection::JsonRejection;
use trust_dns_proto::error::ProtoError;

/// Error enumerates the failure states of the node.
///
/// The control API maps these onto HTTP statuses in
/// [`api_error`][crate::api::api_error]; resolver paths never surface them
/// (every DNS query gets a response message).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed input: bad name, bad IP literal, missing required value, or
    /// an unsupported record type tag.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid API/sync token.
    #[error("unauthorized")]
    Unauthorized,

    /// A zone create/update found no NS source in the request, the in-memory
    /// zone, or `DEFAULT_NS`.
    #[error("zone ns is not configured; set DEFAULT_NS or create the zone with an explicit ns list")]
    MissingZoneNs,

    /// Returned when clients send a body the JSON extractor rejects
    /// (syntax error, wrong content type, unknown fields).
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// A listen address that is neither `host:port` nor `:port`.
    #[error("invalid listen address \"{0}\"")]
    ListenAddr(String),

    /// Durable-store failure. Mutation paths log these and keep the
    /// in-memory state applied.
    #[error("persistence error")]
    Persistence(#[from] sqlx::Error),

    /// Migration driver failure at startup. Fatal.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Replication client failure. Logged by the fan-out tasks, never
    /// surfaced to the originating client.
    #[error("replication error")]
    Replication(#[from] reqwest::Error),

    #[error("an IO error occurred")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON")]
    InvalidJson(#[from] serde_json::Error),

    /// Generic DNS wire-protocol error.
    #[error("DNS error")]
    Dns(#[from] ProtoError),
}
