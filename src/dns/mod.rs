//! Authoritative DNS service over UDP and TCP.
//!
//! Queries are answered from the in-memory [`Store`][crate::store::Store]
//! through the shared [`resolver`][crate::resolver]; the DoH endpoint in
//! [`api`][crate::api] reuses the same resolution, so all three transports
//! return the same answers for the same state.
//!
//! Responses always carry the AA bit. Names covered by a managed zone
//! resolve to NOERROR/NXDOMAIN with a synthesized SOA in the authority
//! section; anything outside every managed zone is REFUSED.
//!
//! E.g. after `PUT /v1/records/app.example.com` with `{"ip":"198.51.100.5"}`:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 app.example.com +short A
//! 198.51.100.5
//! ```

pub mod handlers;
pub mod server;

pub use server::new;
