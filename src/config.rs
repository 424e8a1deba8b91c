//! Environment-derived node configuration.
//!
//! Configuration is read once at startup and is read-only for the life of
//! the process. Listen addresses accept the bare `:port` shorthand, which
//! binds all interfaces.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::Error;
use crate::name::{normalize_name, normalize_names};

pub type SharedConfig = Arc<Config>;

#[derive(Debug, Clone)]
pub struct Config {
    /// Identity stamped into record `source` fields and sync events.
    pub node_id: String,
    pub http_listen: SocketAddr,
    pub dns_udp_listen: SocketAddr,
    pub dns_tcp_listen: SocketAddr,
    pub db_path: String,
    pub migrations_dir: String,
    /// Empty means the control API is open.
    pub api_token: String,
    /// Empty means the sync endpoint is open. Falls back to `api_token`.
    pub sync_token: String,
    /// Peer base URLs replication events are POSTed to.
    pub peers: Vec<String>,
    pub default_ttl: u32,
    /// Empty means no default zone is configured.
    pub default_zone: String,
    pub default_ns: Vec<String>,
}

impl Config {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ListenAddr`] when a listen address cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        let node_id = match env_trimmed("NODE_ID") {
            Some(id) => id,
            None => hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "shoaldns".to_string()),
        };

        let default_zone = match env_trimmed("DEFAULT_ZONE") {
            Some(z) => {
                let z = normalize_name(&z);
                if z == "." {
                    String::new()
                } else {
                    z
                }
            }
            None => String::new(),
        };

        let api_token = env_trimmed("API_TOKEN").unwrap_or_default();
        if api_token.is_empty() {
            tracing::warn!("API_TOKEN is empty, control API is open");
        }
        let sync_token = env_trimmed("SYNC_TOKEN").unwrap_or_else(|| api_token.clone());

        Ok(Config {
            node_id,
            http_listen: parse_listen_addr(&env_or_default("HTTP_LISTEN", ":8080"))?,
            dns_udp_listen: parse_listen_addr(&env_or_default("DNS_UDP_LISTEN", ":53"))?,
            dns_tcp_listen: parse_listen_addr(&env_or_default("DNS_TCP_LISTEN", ":53"))?,
            db_path: env_or_default("DB_PATH", "dns.db"),
            migrations_dir: env_or_default("MIGRATIONS_DIR", "migrations"),
            api_token,
            sync_token,
            peers: split_csv(&env_trimmed("PEERS").unwrap_or_default())
                .iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .collect(),
            default_ttl: env_or_default_u32("DEFAULT_TTL", 20),
            default_zone,
            default_ns: normalize_names(&split_csv(
                &env_trimmed("DEFAULT_NS").unwrap_or_default(),
            )),
        })
    }

    /// The configured fallback NS list for zones created without one.
    pub fn default_ns_list(&self) -> Vec<String> {
        self.default_ns.clone()
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(key: &str, fallback: &str) -> String {
    env_trimmed(key).unwrap_or_else(|| fallback.to_string())
}

fn env_or_default_u32(key: &str, fallback: u32) -> u32 {
    env_trimmed(key)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(fallback)
}

/// Parse `host:port`, accepting the bare `:port` shorthand for all
/// interfaces.
pub fn parse_listen_addr(raw: &str) -> Result<SocketAddr, Error> {
    let candidate = if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    };
    candidate
        .parse::<SocketAddr>()
        .map_err(|_| Error::ListenAddr(raw.to_string()))
}

pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
