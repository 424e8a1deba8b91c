//! Replication egress: fan-out of local mutation events to peer nodes.
//!
//! Every propagated mutation becomes one `POST {peer}/v1/sync/event` per
//! configured peer, each on its own task with a short timeout. Peer failures
//! are logged and never retried; the originating client request has already
//! been answered by the time these tasks run.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SharedConfig;
use crate::error::Error;
use crate::record::SyncEvent;

pub const SYNC_TOKEN_HEADER: &str = "X-Sync-Token";

const PEER_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct Replicator {
    client: reqwest::Client,
    peers: Arc<Vec<String>>,
    sync_token: String,
}

impl Replicator {
    /// # Errors
    ///
    /// Returns [`Error::Replication`] if the HTTP client cannot be built.
    pub fn new(config: &SharedConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(PEER_TIMEOUT).build()?;
        Ok(Self {
            client,
            peers: Arc::new(config.peers.clone()),
            sync_token: config.sync_token.clone(),
        })
    }

    /// Fire-and-forget: spawn one send per peer and return immediately.
    pub fn emit(&self, event: &SyncEvent) {
        if self.peers.is_empty() {
            return;
        }

        let body = match serde_json::to_vec(event) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!("sync event marshal failed: {err}");
                return;
            }
        };

        for peer in self.peers.iter() {
            let url = format!("{peer}/v1/sync/event");
            let client = self.client.clone();
            let token = self.sync_token.clone();
            let body = body.clone();

            tokio::spawn(async move {
                let mut request = client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .body(body);
                if !token.is_empty() {
                    request = request.header(SYNC_TOKEN_HEADER, token);
                }

                match request.send().await {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => {
                        tracing::warn!("sync event rejected by {url} status={}", resp.status());
                    }
                    Err(err) => {
                        tracing::warn!("sync request failed for {url}: {err}");
                    }
                }
            });
        }
    }
}
