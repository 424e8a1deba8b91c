//! The mutation pipeline shared by the control API and sync ingest.
//!
//! Both surfaces drive the same sequence: validate and normalize the input,
//! resolve the owning zone (creating it from the configured defaults when
//! needed), apply to the in-memory store, mirror to persistence, then queue
//! replication. Peer ingest re-enters here with the event's version, origin
//! and timestamp, so version guards behave identically on every node.

use std::time::Instant;

use time::OffsetDateTime;

use crate::config::SharedConfig;
use crate::error::Error;
use crate::name::{normalize_name, normalize_names, parent_zone, validate_name};
use crate::persistence::Persistence;
use crate::record::{Record, RecordKind, RecordWire, SyncEvent, SyncOp, Zone};
use crate::store::Store;
use crate::sync::Replicator;

/// Top-level server context: configuration, the shared store, its durable
/// mirror, and the replication egress. Cheap to clone into each listener.
#[derive(Clone)]
pub struct Node {
    pub config: SharedConfig,
    pub store: Store,
    pub persist: Persistence,
    pub replicator: Replicator,
    started: Instant,
}

impl Node {
    pub fn new(
        config: SharedConfig,
        store: Store,
        persist: Persistence,
        replicator: Replicator,
    ) -> Self {
        Self {
            config,
            store,
            persist,
            replicator,
            started: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    fn now_stamp() -> (OffsetDateTime, i64) {
        let now = OffsetDateTime::now_utc();
        (now, now.unix_timestamp_nanos() as i64)
    }

    /// Owning zone for a record name: longest-match stored zone, then the
    /// configured default zone, then the parent labels of the name.
    pub fn infer_zone(&self, name: &str) -> String {
        if let Some(zone) = self.store.best_zone(name) {
            return zone.name;
        }
        if !self.config.default_zone.is_empty() {
            return self.config.default_zone.clone();
        }
        parent_zone(name)
    }

    /// Build the zone entity to upsert alongside a mutation, resolving NS
    /// from the request hint, the stored zone, then `DEFAULT_NS`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingZoneNs`] when all three sources are empty.
    fn zone_with_defaults(
        &self,
        name: &str,
        ns_hint: &[String],
        soa_ttl_hint: u32,
        now: OffsetDateTime,
    ) -> Result<Zone, Error> {
        let name = normalize_name(name);
        let ns_hint = normalize_names(ns_hint);
        let serial = now.unix_timestamp() as u32;

        if let Some(existing) = self.store.get_zone(&name) {
            let ns = if ns_hint.is_empty() {
                existing.ns.clone()
            } else {
                ns_hint
            };
            if ns.is_empty() {
                return Err(Error::MissingZoneNs);
            }
            return Ok(Zone {
                name,
                ns,
                soa_ttl: if soa_ttl_hint == 0 {
                    existing.soa_ttl
                } else {
                    soa_ttl_hint
                },
                serial,
                updated_at: now,
            });
        }

        let ns = if ns_hint.is_empty() {
            self.config.default_ns_list()
        } else {
            ns_hint
        };
        if ns.is_empty() {
            return Err(Error::MissingZoneNs);
        }
        Ok(Zone {
            name,
            ns,
            soa_ttl: if soa_ttl_hint == 0 {
                self.config.default_ttl
            } else {
                soa_ttl_hint
            },
            serial,
            updated_at: now,
        })
    }

    /// Stamp and validate a locally-originated record mutation.
    fn prepare_local_record(
        &self,
        mut wire: RecordWire,
        now: OffsetDateTime,
        version: i64,
    ) -> Result<Record, Error> {
        wire.name = validate_name(&wire.name)?;
        if wire.ttl == 0 {
            wire.ttl = self.config.default_ttl;
        }
        if normalize_name(&wire.zone) == "." {
            wire.zone = self.infer_zone(&wire.name);
        }
        wire.updated_at = Some(now);
        wire.version = version;
        wire.source = self.config.node_id.clone();
        Record::try_from(wire)
    }

    async fn persist_zone(&self, zone: &Zone) {
        if let Err(err) = self.persist.upsert_zone(zone).await {
            tracing::error!("persist zone failed: {err}");
        }
    }

    /// Replace the `(name, type)` RRset with this single value.
    pub async fn set_record(
        &self,
        wire: RecordWire,
        ns_hint: &[String],
        propagate: bool,
    ) -> Result<Record, Error> {
        let (now, version) = Self::now_stamp();
        let rec = self.prepare_local_record(wire, now, version)?;
        let zone = self.zone_with_defaults(&rec.zone, ns_hint, 0, now)?;

        let zone_applied = self.store.upsert_zone(zone.clone());
        let rec_applied = self.store.upsert_record_set(rec.clone());

        if zone_applied {
            self.persist_zone(&zone).await;
        }
        if rec_applied {
            if let Err(err) = self.persist.upsert_record_set(&rec).await {
                tracing::error!("persist record failed: {err}");
            }
        }

        if propagate {
            self.replicator.emit(&SyncEvent {
                origin_node: self.config.node_id.clone(),
                op: SyncOp::Set,
                record: Some(rec.clone().into()),
                name: None,
                kind: None,
                zone: None,
                version,
                event_time: now,
                zone_config: None,
            });
        }
        Ok(rec)
    }

    /// Add one RRset member, leaving the rest of the set untouched.
    pub async fn add_record(
        &self,
        wire: RecordWire,
        ns_hint: &[String],
        propagate: bool,
    ) -> Result<Record, Error> {
        let (now, version) = Self::now_stamp();
        let rec = self.prepare_local_record(wire, now, version)?;
        let zone = self.zone_with_defaults(&rec.zone, ns_hint, 0, now)?;

        let zone_applied = self.store.upsert_zone(zone.clone());
        let rec_applied = self.store.add_record(rec.clone());

        if zone_applied {
            self.persist_zone(&zone).await;
        }
        if rec_applied {
            if let Err(err) = self.persist.add_record(&rec).await {
                tracing::error!("persist record failed: {err}");
            }
        }

        if propagate {
            self.replicator.emit(&SyncEvent {
                origin_node: self.config.node_id.clone(),
                op: SyncOp::Add,
                record: Some(rec.clone().into()),
                name: None,
                kind: None,
                zone: None,
                version,
                event_time: now,
                zone_config: None,
            });
        }
        Ok(rec)
    }

    /// Remove the single identity-matched RRset member.
    ///
    /// Returns the resolved identity and the stamped version.
    pub async fn remove_record(
        &self,
        wire: RecordWire,
        propagate: bool,
    ) -> Result<(Record, i64), Error> {
        let (now, version) = Self::now_stamp();
        let rec = self.prepare_local_record(wire, now, version)?;

        if self.store.remove_record(&rec, version) {
            if let Err(err) = self.persist.remove_record(&rec, version).await {
                tracing::error!("persist record remove failed: {err}");
            }
        }

        if propagate {
            self.replicator.emit(&SyncEvent {
                origin_node: self.config.node_id.clone(),
                op: SyncOp::Remove,
                record: Some(rec.clone().into()),
                name: None,
                kind: None,
                zone: None,
                version,
                event_time: now,
                zone_config: None,
            });
        }
        Ok((rec, version))
    }

    /// Delete all (or type-filtered) members at `name` up to the stamped
    /// version. Returns the stamped version.
    pub async fn delete_records(
        &self,
        name: &str,
        kind_filter: Option<RecordKind>,
        propagate: bool,
    ) -> Result<i64, Error> {
        let (now, version) = Self::now_stamp();
        let name = normalize_name(name);

        if self.store.delete_by_name_type(&name, kind_filter, version) {
            if let Err(err) = self
                .persist
                .delete_by_name_type(&name, kind_filter, version)
                .await
            {
                tracing::error!("persist record delete failed: {err}");
            }
        }

        if propagate {
            self.replicator.emit(&SyncEvent {
                origin_node: self.config.node_id.clone(),
                op: SyncOp::Delete,
                record: None,
                name: Some(name),
                kind: kind_filter.map(|k| k.as_str().to_string()),
                zone: None,
                version,
                event_time: now,
                zone_config: None,
            });
        }
        Ok(version)
    }

    /// Create or update a zone from the control surface.
    pub async fn upsert_zone(
        &self,
        name: &str,
        ns: &[String],
        soa_ttl: u32,
        propagate: bool,
    ) -> Result<Zone, Error> {
        let (now, _) = Self::now_stamp();
        let name = validate_name(name)?;
        let soa_ttl = if soa_ttl == 0 {
            self.config.default_ttl
        } else {
            soa_ttl
        };
        let zone = self.zone_with_defaults(&name, ns, soa_ttl, now)?;

        if self.store.upsert_zone(zone.clone()) {
            self.persist_zone(&zone).await;
        }

        if propagate {
            self.replicator.emit(&SyncEvent {
                origin_node: self.config.node_id.clone(),
                op: SyncOp::Zone,
                record: None,
                name: None,
                kind: None,
                zone: Some(zone.name.clone()),
                version: i64::from(zone.serial),
                event_time: now,
                zone_config: Some(zone.clone()),
            });
        }
        Ok(zone)
    }

    /// Apply a peer event: the full mutation pipeline with the event's
    /// version, origin and timestamp. Stale events are silent no-ops, and
    /// events are never relayed further.
    pub async fn ingest(&self, mut event: SyncEvent) -> Result<(), Error> {
        let (now, fallback_version) = Self::now_stamp();
        if event.version == 0 {
            event.version = fallback_version;
        }

        match event.op {
            SyncOp::Set | SyncOp::Add => {
                let mut wire = event
                    .record
                    .clone()
                    .ok_or_else(|| Error::Validation("record required for set".to_string()))?;
                wire.name = validate_name(&wire.name)?;
                wire.version = event.version;
                if wire.ttl == 0 {
                    wire.ttl = self.config.default_ttl;
                }
                if normalize_name(&wire.zone) == "." {
                    wire.zone = self.infer_zone(&wire.name);
                }
                wire.source = event.origin_node.clone();
                wire.updated_at = Some(event.event_time);
                let rec = Record::try_from(wire)?;

                let applied = match event.op {
                    SyncOp::Set => self.store.upsert_record_set(rec.clone()),
                    _ => self.store.add_record(rec.clone()),
                };
                if applied {
                    let persisted = match event.op {
                        SyncOp::Set => self.persist.upsert_record_set(&rec).await,
                        _ => self.persist.add_record(&rec).await,
                    };
                    if let Err(err) = persisted {
                        tracing::error!("persist record failed: {err}");
                    }
                }

                match self.zone_with_defaults(&rec.zone, &[], 0, now) {
                    Ok(zone) => {
                        if self.store.upsert_zone(zone.clone()) {
                            self.persist_zone(&zone).await;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("sync ingest skipped zone defaults for {}: {err}", rec.zone);
                    }
                }
                Ok(())
            }
            SyncOp::Remove => {
                let mut wire = event
                    .record
                    .clone()
                    .ok_or_else(|| Error::Validation("record required for remove".to_string()))?;
                wire.name = validate_name(&wire.name)?;
                wire.source = event.origin_node.clone();
                wire.updated_at = Some(event.event_time);
                let rec = Record::try_from(wire)?;

                if self.store.remove_record(&rec, event.version) {
                    if let Err(err) = self.persist.remove_record(&rec, event.version).await {
                        tracing::error!("persist record remove failed: {err}");
                    }
                }
                Ok(())
            }
            SyncOp::Delete => {
                let name = event
                    .name
                    .clone()
                    .ok_or_else(|| Error::Validation("name required for delete".to_string()))?;
                let kind_filter = match event.kind.as_deref() {
                    Some(tag) if !tag.trim().is_empty() => Some(tag.parse::<RecordKind>()?),
                    _ => None,
                };

                if self
                    .store
                    .delete_by_name_type(&name, kind_filter, event.version)
                {
                    if let Err(err) = self
                        .persist
                        .delete_by_name_type(&name, kind_filter, event.version)
                        .await
                    {
                        tracing::error!("persist record delete failed: {err}");
                    }
                }
                Ok(())
            }
            SyncOp::Zone => {
                let zone = event
                    .zone_config
                    .clone()
                    .ok_or_else(|| Error::Validation("zone_config required for zone op".to_string()))?;
                if self.store.upsert_zone(zone.clone()) {
                    self.persist_zone(&zone).await;
                }
                Ok(())
            }
        }
    }
}
