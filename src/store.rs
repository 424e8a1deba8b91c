//! In-memory authoritative view of zones and records.
//!
//! The store is the single shared resource between the resolver read path
//! and the control/sync write path. A [`Store`] handle is cheap to clone;
//! all clones see the same state behind one readers/writer lock. Every
//! public operation holds the lock for its whole scan-then-write, so readers
//! observe either the pre-state or the post-state of a mutation, never a
//! partial one.
//!
//! Writes are guarded by the per-identity `version`: a mutation carrying a
//! version lower than the stored one is rejected, which makes any
//! interleaving of replicated writes converge on the highest-version state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use trust_dns_proto::rr::RecordType;

use crate::name::{label_count, normalize_name, zone_contains};
use crate::record::{Record, RecordKind, Zone};

#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    /// identity key → record.
    records: HashMap<String, Record>,
    /// zone FQDN → zone.
    zones: HashMap<String, Zone>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole `(name, type)` RRset with this single member.
    ///
    /// Rejected if any existing member of the set carries a newer version.
    pub fn upsert_record_set(&self, mut rec: Record) -> bool {
        rec.name = normalize_name(&rec.name);
        rec.zone = normalize_name(&rec.zone);
        let kind = rec.kind();

        let mut inner = self.inner.write();

        let members: Vec<String> = inner
            .records
            .iter()
            .filter(|(_, prev)| prev.name == rec.name && prev.kind() == kind)
            .map(|(key, _)| key.clone())
            .collect();
        if members
            .iter()
            .any(|key| inner.records[key].version > rec.version)
        {
            return false;
        }
        for key in members {
            inner.records.remove(&key);
        }

        inner.records.insert(rec.identity_key(), rec);
        true
    }

    /// Insert or replace a single RRset member, keyed by full identity.
    pub fn add_record(&self, mut rec: Record) -> bool {
        rec.name = normalize_name(&rec.name);
        rec.zone = normalize_name(&rec.zone);
        let key = rec.identity_key();

        let mut inner = self.inner.write();
        if let Some(prev) = inner.records.get(&key) {
            if prev.version > rec.version {
                return false;
            }
        }
        inner.records.insert(key, rec);
        true
    }

    /// Remove the identity-matched member, if its stored version is not
    /// newer than `version`.
    pub fn remove_record(&self, rec: &Record, version: i64) -> bool {
        let key = rec.identity_key();

        let mut inner = self.inner.write();
        match inner.records.get(&key) {
            Some(prev) if prev.version <= version => {
                inner.records.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Delete all members at `name` (optionally restricted to one kind)
    /// whose version is not newer than `version`. The guard is per member;
    /// newer members survive.
    pub fn delete_by_name_type(
        &self,
        name: &str,
        kind_filter: Option<RecordKind>,
        version: i64,
    ) -> bool {
        let name = normalize_name(name);

        let mut inner = self.inner.write();
        let doomed: Vec<String> = inner
            .records
            .iter()
            .filter(|(_, rec)| {
                rec.name == name
                    && kind_filter.map_or(true, |k| rec.kind() == k)
                    && rec.version <= version
            })
            .map(|(key, _)| key.clone())
            .collect();

        let deleted = !doomed.is_empty();
        for key in doomed {
            inner.records.remove(&key);
        }
        deleted
    }

    /// All members of `name` matching the DNS query type; `ANY` returns
    /// every member. Deterministically ordered by `(type, value)`.
    pub fn get_records(&self, name: &str, query_type: RecordType) -> Vec<Record> {
        let name = normalize_name(name);

        let inner = self.inner.read();
        let mut out: Vec<Record> = inner
            .records
            .values()
            .filter(|rec| rec.name == name)
            .filter(|rec| {
                query_type == RecordType::ANY || rec.kind().query_type() == query_type
            })
            .cloned()
            .collect();
        drop(inner);

        out.sort_by(|a, b| {
            (a.kind(), a.data.fingerprint()).cmp(&(b.kind(), b.data.fingerprint()))
        });
        out
    }

    /// True if any record exists at `name`, of any type.
    pub fn has_name(&self, name: &str) -> bool {
        let name = normalize_name(name);
        let inner = self.inner.read();
        inner.records.values().any(|rec| rec.name == name)
    }

    /// All records, sorted by name.
    pub fn list_records(&self) -> Vec<Record> {
        let inner = self.inner.read();
        let mut out: Vec<Record> = inner.records.values().cloned().collect();
        drop(inner);
        out.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.identity_key().cmp(&b.identity_key()))
        });
        out
    }

    /// Overwrite a zone unless the stored serial is newer.
    pub fn upsert_zone(&self, mut zone: Zone) -> bool {
        zone.normalize();

        let mut inner = self.inner.write();
        if let Some(prev) = inner.zones.get(&zone.name) {
            if prev.serial > zone.serial {
                return false;
            }
        }
        inner.zones.insert(zone.name.clone(), zone);
        true
    }

    /// Exact zone lookup.
    pub fn get_zone(&self, name: &str) -> Option<Zone> {
        let key = normalize_name(name);
        self.inner.read().zones.get(&key).cloned()
    }

    /// The stored zone whose FQDN is the longest suffix of `name`.
    pub fn best_zone(&self, name: &str) -> Option<Zone> {
        let name = normalize_name(name);

        let inner = self.inner.read();
        inner
            .zones
            .values()
            .filter(|zone| zone_contains(&zone.name, &name))
            .max_by_key(|zone| label_count(&zone.name))
            .cloned()
    }

    /// All zones, sorted by name.
    pub fn list_zones(&self) -> Vec<Zone> {
        let inner = self.inner.read();
        let mut out: Vec<Zone> = inner.zones.values().cloned().collect();
        drop(inner);
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
