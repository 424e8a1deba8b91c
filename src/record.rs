//! Record and zone entities, plus the flat wire-JSON forms they travel in.
//!
//! The store and resolver only ever see the typed [`RecordData`] sum; the
//! flat `{ip,text,target,priority}` shape used by the control API and the
//! sync protocol is parsed into it through [`Record::try_from`], which is the
//! single validation funnel for both local mutations and peer ingest.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use trust_dns_proto::rr::RecordType;

use crate::error::Error;
use crate::name::{normalize_name, normalize_names, validate_name};

/// The record types this server is authoritative for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    A,
    Aaaa,
    Txt,
    Cname,
    Mx,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Txt => "TXT",
            RecordKind::Cname => "CNAME",
            RecordKind::Mx => "MX",
        }
    }

    /// The wire query type this kind answers.
    pub fn query_type(self) -> RecordType {
        match self {
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
            RecordKind::Txt => RecordType::TXT,
            RecordKind::Cname => RecordType::CNAME,
            RecordKind::Mx => RecordType::MX,
        }
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordKind::A),
            "AAAA" => Ok(RecordKind::Aaaa),
            "TXT" => Ok(RecordKind::Txt),
            "CNAME" => Ok(RecordKind::Cname),
            "MX" => Ok(RecordKind::Mx),
            other => Err(Error::Validation(format!(
                "type must be A, AAAA, TXT, CNAME or MX, got \"{other}\""
            ))),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed record payload. Constructors in [`Record::try_from`] enforce the
/// per-variant invariants, so a value of this type is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Txt(String),
    Cname(String),
    Mx { priority: u16, target: String },
}

impl RecordData {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordData::A(_) => RecordKind::A,
            RecordData::Aaaa(_) => RecordKind::Aaaa,
            RecordData::Txt(_) => RecordKind::Txt,
            RecordData::Cname(_) => RecordKind::Cname,
            RecordData::Mx { .. } => RecordKind::Mx,
        }
    }

    /// Canonical value fingerprint. Together with `(name, kind)` this is the
    /// record identity used for RRset-member addressing.
    pub fn fingerprint(&self) -> String {
        match self {
            RecordData::A(ip) => ip.to_string(),
            RecordData::Aaaa(ip) => ip.to_string(),
            RecordData::Txt(text) => text.clone(),
            RecordData::Cname(target) => target.clone(),
            RecordData::Mx { priority, target } => format!("{priority}|{target}"),
        }
    }
}

/// A single RRset member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordWire", into = "RecordWire")]
pub struct Record {
    pub name: String,
    pub data: RecordData,
    pub ttl: u32,
    pub zone: String,
    pub updated_at: OffsetDateTime,
    pub version: i64,
    pub source: String,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        self.data.kind()
    }

    /// The `(name, type, value-fingerprint)` identity key.
    pub fn identity_key(&self) -> String {
        format!("{}|{}|{}", self.name, self.kind(), self.data.fingerprint())
    }
}

fn u16_is_zero(v: &u16) -> bool {
    *v == 0
}

/// Flat JSON form of a record, as served by the control API and carried in
/// sync events. Unknown fields are rejected everywhere this is decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordWire {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(default, skip_serializing_if = "u16_is_zero")]
    pub priority: u16,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub zone: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub source: String,
}

/// Infer a record kind from the populated payload fields, for callers that
/// omit `type`.
pub fn infer_kind(ip: &str, text: &str, target: &str, priority: u16) -> RecordKind {
    if !text.trim().is_empty() {
        return RecordKind::Txt;
    }
    if !target.trim().is_empty() {
        if priority > 0 {
            return RecordKind::Mx;
        }
        return RecordKind::Cname;
    }
    match IpAddr::from_str(ip.trim()) {
        Ok(IpAddr::V6(v6)) if v6.to_ipv4_mapped().is_none() => RecordKind::Aaaa,
        _ => RecordKind::A,
    }
}

fn parse_ipv4(raw: &str) -> Result<Ipv4Addr, Error> {
    match IpAddr::from_str(raw.trim()) {
        Ok(IpAddr::V4(v4)) => Ok(v4),
        Ok(IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .ok_or_else(|| Error::Validation("type A requires IPv4".to_string())),
        Err(_) => Err(Error::Validation("type A requires IPv4".to_string())),
    }
}

fn parse_ipv6(raw: &str) -> Result<Ipv6Addr, Error> {
    match IpAddr::from_str(raw.trim()) {
        Ok(IpAddr::V6(v6)) if v6.to_ipv4_mapped().is_none() => Ok(v6),
        _ => Err(Error::Validation("type AAAA requires IPv6".to_string())),
    }
}

impl TryFrom<RecordWire> for Record {
    type Error = Error;

    fn try_from(wire: RecordWire) -> Result<Self, Self::Error> {
        let name = validate_name(&wire.name)?;
        let kind = match &wire.kind {
            Some(tag) if !tag.trim().is_empty() => tag.parse::<RecordKind>()?,
            _ => infer_kind(&wire.ip, &wire.text, &wire.target, wire.priority),
        };

        let data = match kind {
            RecordKind::A => RecordData::A(parse_ipv4(&wire.ip)?),
            RecordKind::Aaaa => RecordData::Aaaa(parse_ipv6(&wire.ip)?),
            RecordKind::Txt => {
                let text = wire.text.trim().to_string();
                if text.is_empty() {
                    return Err(Error::Validation("type TXT requires text field".to_string()));
                }
                RecordData::Txt(text)
            }
            RecordKind::Cname => {
                if wire.target.trim().is_empty() {
                    return Err(Error::Validation("type CNAME requires target field".to_string()));
                }
                RecordData::Cname(normalize_name(&wire.target))
            }
            RecordKind::Mx => {
                if wire.target.trim().is_empty() {
                    return Err(Error::Validation("type MX requires target field".to_string()));
                }
                let priority = if wire.priority == 0 { 10 } else { wire.priority };
                RecordData::Mx {
                    priority,
                    target: normalize_name(&wire.target),
                }
            }
        };

        Ok(Record {
            name,
            data,
            ttl: wire.ttl,
            zone: normalize_name(&wire.zone),
            updated_at: wire.updated_at.unwrap_or(OffsetDateTime::UNIX_EPOCH),
            version: wire.version,
            source: wire.source,
        })
    }
}

impl From<Record> for RecordWire {
    fn from(rec: Record) -> Self {
        let kind = rec.kind();
        let (ip, text, target, priority) = match &rec.data {
            RecordData::A(v4) => (v4.to_string(), String::new(), String::new(), 0),
            RecordData::Aaaa(v6) => (v6.to_string(), String::new(), String::new(), 0),
            RecordData::Txt(text) => (String::new(), text.clone(), String::new(), 0),
            RecordData::Cname(t) => (String::new(), String::new(), t.clone(), 0),
            RecordData::Mx { priority, target } => {
                (String::new(), String::new(), target.clone(), *priority)
            }
        };
        RecordWire {
            name: rec.name,
            kind: Some(kind.as_str().to_string()),
            ip,
            text,
            target,
            priority,
            ttl: rec.ttl,
            zone: rec.zone,
            updated_at: Some(rec.updated_at),
            version: rec.version,
            source: rec.source,
        }
    }
}

/// An authoritative zone entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Zone {
    #[serde(rename = "zone")]
    pub name: String,
    pub ns: Vec<String>,
    pub soa_ttl: u32,
    pub serial: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Zone {
    /// Normalize the zone FQDN and NS list in place.
    pub fn normalize(&mut self) {
        self.name = normalize_name(&self.name);
        self.ns = normalize_names(&self.ns);
    }
}

/// Replication event operations, in their wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOp {
    Set,
    Add,
    Remove,
    Delete,
    Zone,
}

/// Envelope replicated to peers for every propagated mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncEvent {
    pub origin_node: String,
    pub op: SyncOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub event_time: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_config: Option<Zone>,
}
