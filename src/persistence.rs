//! Durable SQLite mirror of the in-memory store.
//!
//! The mirror is written after every accepted mutation and read once at
//! startup. Version guards are applied here as well as in the store, so a
//! node whose database and memory diverged (for example after a failed
//! write) reconverges on the highest-version row at the next write or
//! restart.

use std::path::Path;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use time::OffsetDateTime;

use crate::error::Error;
use crate::name::normalize_name;
use crate::record::{Record, RecordData, RecordKind, RecordWire, Zone};
use crate::store::Store;

#[derive(Clone)]
pub struct Persistence {
    pool: SqlitePool,
}

type RecordRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    i64,
    String,
    OffsetDateTime,
    i64,
    String,
);

const SELECT_RECORD_COLUMNS: &str =
    "SELECT name, type, ip, text, target, priority, ttl, zone, updated_at, version, source FROM records";

impl Persistence {
    /// Open (creating if missing) the database at `db_path` and run all
    /// pending migrations from `migrations_dir` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the database cannot be opened and
    /// [`Error::Migration`] if the migration driver fails; both are fatal at
    /// startup.
    pub async fn open(db_path: &str, migrations_dir: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let migrator = Migrator::new(Path::new(migrations_dir)).await?;
        migrator.run(&pool).await?;

        Ok(Self { pool })
    }

    /// Open a private in-memory database, migrated and ready. Test use.
    pub async fn open_in_memory(migrations_dir: &str) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let migrator = Migrator::new(Path::new(migrations_dir)).await?;
        migrator.run(&pool).await?;

        Ok(Self { pool })
    }

    /// Replay all stored zones, then records, through the store's own
    /// upsert paths so normalization and version guards stay uniform.
    pub async fn load_all(&self, store: &Store) -> Result<(), Error> {
        let zones = sqlx::query_as::<_, (String, String, i64, i64, OffsetDateTime)>(
            "SELECT zone, ns_json, soa_ttl, serial, updated_at FROM zones",
        )
        .fetch_all(&self.pool)
        .await?;

        for (name, ns_json, soa_ttl, serial, updated_at) in zones {
            let ns: Vec<String> = serde_json::from_str(&ns_json)?;
            store.upsert_zone(Zone {
                name,
                ns,
                soa_ttl: soa_ttl as u32,
                serial: serial as u32,
                updated_at,
            });
        }

        let rows = sqlx::query_as::<_, RecordRow>(SELECT_RECORD_COLUMNS)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let (name, kind, ip, text, target, priority, ttl, zone, updated_at, version, source) =
                row;
            let wire = RecordWire {
                name,
                kind: Some(kind),
                ip: ip.unwrap_or_default(),
                text: text.unwrap_or_default(),
                target: target.unwrap_or_default(),
                priority: priority as u16,
                ttl: ttl as u32,
                zone,
                updated_at: Some(updated_at),
                version,
                source,
            };
            match Record::try_from(wire) {
                Ok(rec) => {
                    store.add_record(rec);
                }
                Err(err) => {
                    tracing::warn!("skipping undecodable persisted record: {err}");
                }
            }
        }

        Ok(())
    }

    /// Mirror of [`Store::upsert_record_set`]: replace the whole
    /// `(name, type)` set unless any stored row is newer.
    pub async fn upsert_record_set(&self, rec: &Record) -> Result<(), Error> {
        let kind = rec.kind().as_str();

        let versions = sqlx::query_as::<_, (i64,)>(
            "SELECT version FROM records WHERE name = ? AND type = ?",
        )
        .bind(&rec.name)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        if versions.iter().any(|(v,)| *v > rec.version) {
            return Ok(());
        }

        sqlx::query("DELETE FROM records WHERE name = ? AND type = ?")
            .bind(&rec.name)
            .bind(kind)
            .execute(&self.pool)
            .await?;

        self.insert_record(rec).await
    }

    /// Mirror of [`Store::add_record`]: insert or replace one identity.
    pub async fn add_record(&self, rec: &Record) -> Result<(), Error> {
        let (ip, text, target, priority) = identity_columns(&rec.data);

        let existing = sqlx::query_as::<_, (i64, i64)>(
            "SELECT id, version FROM records
             WHERE name = ? AND type = ? AND COALESCE(ip, '') = ?
               AND COALESCE(text, '') = ? AND COALESCE(target, '') = ? AND priority = ?",
        )
        .bind(&rec.name)
        .bind(rec.kind().as_str())
        .bind(ip.clone().unwrap_or_default())
        .bind(text.clone().unwrap_or_default())
        .bind(target.clone().unwrap_or_default())
        .bind(priority)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some((_, version)) if version > rec.version => Ok(()),
            Some((id, _)) => {
                sqlx::query(
                    "UPDATE records SET ttl = ?, zone = ?, updated_at = ?, version = ?, source = ?
                     WHERE id = ?",
                )
                .bind(i64::from(rec.ttl))
                .bind(&rec.zone)
                .bind(rec.updated_at)
                .bind(rec.version)
                .bind(&rec.source)
                .bind(id)
                .execute(&self.pool)
                .await?;
                Ok(())
            }
            None => self.insert_record(rec).await,
        }
    }

    /// Mirror of [`Store::remove_record`].
    pub async fn remove_record(&self, rec: &Record, version: i64) -> Result<(), Error> {
        let (ip, text, target, priority) = identity_columns(&rec.data);

        sqlx::query(
            "DELETE FROM records
             WHERE name = ? AND type = ? AND COALESCE(ip, '') = ?
               AND COALESCE(text, '') = ? AND COALESCE(target, '') = ? AND priority = ?
               AND version <= ?",
        )
        .bind(&rec.name)
        .bind(rec.kind().as_str())
        .bind(ip.unwrap_or_default())
        .bind(text.unwrap_or_default())
        .bind(target.unwrap_or_default())
        .bind(priority)
        .bind(version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mirror of [`Store::delete_by_name_type`], with the same per-row
    /// version guard.
    pub async fn delete_by_name_type(
        &self,
        name: &str,
        kind_filter: Option<RecordKind>,
        version: i64,
    ) -> Result<(), Error> {
        let name = normalize_name(name);
        match kind_filter {
            Some(kind) => {
                sqlx::query(
                    "DELETE FROM records WHERE name = ? AND type = ? AND version <= ?",
                )
                .bind(name)
                .bind(kind.as_str())
                .bind(version)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM records WHERE name = ? AND version <= ?")
                    .bind(name)
                    .bind(version)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// Mirror of [`Store::upsert_zone`]: serial guard, then overwrite.
    pub async fn upsert_zone(&self, zone: &Zone) -> Result<(), Error> {
        let existing = sqlx::query_as::<_, (i64,)>("SELECT serial FROM zones WHERE zone = ?")
            .bind(&zone.name)
            .fetch_optional(&self.pool)
            .await?;
        if let Some((serial,)) = existing {
            if serial as u32 > zone.serial {
                return Ok(());
            }
        }

        let ns_json = serde_json::to_string(&zone.ns)?;
        sqlx::query(
            "INSERT INTO zones (zone, ns_json, soa_ttl, serial, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (zone) DO UPDATE SET
               ns_json = excluded.ns_json,
               soa_ttl = excluded.soa_ttl,
               serial = excluded.serial,
               updated_at = excluded.updated_at",
        )
        .bind(&zone.name)
        .bind(ns_json)
        .bind(i64::from(zone.soa_ttl))
        .bind(i64::from(zone.serial))
        .bind(zone.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_record(&self, rec: &Record) -> Result<(), Error> {
        let (ip, text, target, priority) = identity_columns(&rec.data);

        sqlx::query(
            "INSERT INTO records (name, type, ip, text, target, priority, ttl, zone, updated_at, version, source)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&rec.name)
        .bind(rec.kind().as_str())
        .bind(ip)
        .bind(text)
        .bind(target)
        .bind(priority)
        .bind(i64::from(rec.ttl))
        .bind(&rec.zone)
        .bind(rec.updated_at)
        .bind(rec.version)
        .bind(&rec.source)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Column projection of a record value: `(ip, text, target, priority)`.
fn identity_columns(data: &RecordData) -> (Option<String>, Option<String>, Option<String>, i64) {
    match data {
        RecordData::A(v4) => (Some(v4.to_string()), None, None, 0),
        RecordData::Aaaa(v6) => (Some(v6.to_string()), None, None, 0),
        RecordData::Txt(text) => (None, Some(text.clone()), None, 0),
        RecordData::Cname(target) => (None, None, Some(target.clone()), 0),
        RecordData::Mx { priority, target } => {
            (None, None, Some(target.clone()), i64::from(*priority))
        }
    }
}
