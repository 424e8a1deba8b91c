use serde::Deserialize;

use crate::record::RecordWire;

/// Body of `PUT /v1/records/{name}` and `POST /v1/records/{name}/add`.
///
/// `type` may be omitted; it is then inferred from the populated value
/// fields. The optional `ns` list seeds the owning zone when the mutation
/// has to create it.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(super) struct UpsertRecordRequest {
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub priority: u16,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub ns: Option<Vec<String>>,
    #[serde(default)]
    pub propagate: Option<bool>,
}

impl UpsertRecordRequest {
    pub fn into_wire(self, name: String) -> RecordWire {
        RecordWire {
            name,
            kind: self.kind,
            ip: self.ip,
            text: self.text,
            target: self.target,
            priority: self.priority,
            ttl: self.ttl,
            zone: self.zone,
            updated_at: None,
            version: 0,
            source: String::new(),
        }
    }
}

/// Body of `POST /v1/records/{name}/remove`: the value identifying the
/// RRset member to drop.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(super) struct RemoveRecordRequest {
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub priority: u16,
    #[serde(default)]
    pub propagate: Option<bool>,
}

impl RemoveRecordRequest {
    pub fn into_wire(self, name: String) -> RecordWire {
        RecordWire {
            name,
            kind: self.kind,
            ip: self.ip,
            text: self.text,
            target: self.target,
            priority: self.priority,
            ttl: 0,
            zone: String::new(),
            updated_at: None,
            version: 0,
            source: String::new(),
        }
    }
}

/// Body of `PUT /v1/zones/{zone}`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(super) struct UpsertZoneRequest {
    #[serde(default)]
    pub ns: Vec<String>,
    #[serde(default)]
    pub soa_ttl: u32,
    #[serde(default)]
    pub propagate: Option<bool>,
}

/// Query string of `DELETE /v1/records/{name}`.
#[derive(Deserialize, Debug, Clone, Default)]
pub(super) struct DeleteRecordParams {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub propagate: Option<bool>,
}
