//! HTTP surface: control API, peer sync ingest, and DNS-over-HTTPS.
//!
//! # API Endpoints
//!
//! ## `/healthz` (GET)
//!
//!   Returns HTTP 200 (OK) and `{"ok":true,"node_id":…,"uptime_sec":…}`.
//!
//! ## `/dns-query` (GET, POST)
//!
//!   RFC 8484 DNS-over-HTTPS. `GET` takes the wire-format query in the
//!   `dns` parameter, base64url-encoded without padding; `POST` takes the
//!   raw `application/dns-message` body. Responses are resolved by the same
//!   path as UDP/TCP queries. Unauthenticated.
//!
//! ## `/v1/records` (GET), `/v1/zones` (GET)
//!
//!   List the stored records/zones as `{"records":[…]}` / `{"zones":[…]}`.
//!
//! ## `/v1/records/{name}` (PUT, DELETE)
//!
//!   `PUT` replaces the whole `(name, type)` RRset with the single value in
//!   the JSON body, even when the set currently holds several members:
//!
//!   ```bash
//!   ❯ curl -X PUT -H 'X-API-Token: secret' --json \
//!     '{"ip":"198.51.100.5","ttl":15}' \
//!     http://localhost:8080/v1/records/app.example.com
//!   ```
//!
//!   `DELETE` removes all members at the name, optionally filtered with
//!   `?type=A`; `?propagate=false` suppresses replication.
//!
//! ## `/v1/records/{name}/add`, `/v1/records/{name}/remove` (POST)
//!
//!   Add or remove a single RRset member identified by its value.
//!
//! ## `/v1/zones/{zone}` (PUT)
//!
//!   Create or update a zone. The NS list resolves from the request, then
//!   the stored zone, then `DEFAULT_NS`; with no source at all the request
//!   fails with HTTP 400.
//!
//! ## `/v1/sync/event` (POST)
//!
//!   Peer replication ingest, guarded by `X-Sync-Token` when `SYNC_TOKEN`
//!   is configured.
//!
//! All `/v1/*` endpoints except sync require `Authorization: Bearer` or
//! `X-API-Token` when `API_TOKEN` is configured. JSON bodies are strict:
//! unknown fields are rejected and bodies are capped at 1 MiB.

pub mod api_error;
mod doh;
mod model;
pub mod routes;
pub mod server;

pub use server::new;
