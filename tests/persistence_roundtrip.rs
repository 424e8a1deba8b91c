use shoaldns::record::{Record, RecordData, Zone};
use shoaldns::{Persistence, Store};
use time::macros::datetime;

fn record(name: &str, data: RecordData, version: i64) -> Record {
    Record {
        name: name.to_string(),
        data,
        ttl: 15,
        zone: "example.com.".to_string(),
        updated_at: datetime!(2026-01-02 03:04:05 UTC),
        version,
        source: "test-node".to_string(),
    }
}

fn zone(name: &str, serial: u32) -> Zone {
    Zone {
        name: name.to_string(),
        ns: vec!["ns1.example.com.".to_string()],
        soa_ttl: 30,
        serial,
        updated_at: datetime!(2026-01-02 03:04:05 UTC),
    }
}

async fn open() -> Persistence {
    Persistence::open_in_memory("migrations").await.unwrap()
}

#[tokio::test]
async fn full_state_survives_a_reload() {
    let persist = open().await;

    persist.upsert_zone(&zone("example.com.", 1)).await.unwrap();
    persist.upsert_zone(&zone("svc.example.com.", 2)).await.unwrap();

    let records = [
        record("app.example.com.", RecordData::A("198.51.100.5".parse().unwrap()), 1),
        record("app.example.com.", RecordData::Aaaa("2001:db8::1".parse().unwrap()), 2),
        record("app.example.com.", RecordData::Txt("token=abc".to_string()), 3),
        record("alias.example.com.", RecordData::Cname("app.example.com.".to_string()), 4),
        record(
            "example.com.",
            RecordData::Mx {
                priority: 10,
                target: "mail.example.com.".to_string(),
            },
            5,
        ),
    ];
    for rec in &records {
        persist.add_record(rec).await.unwrap();
    }

    let restored = Store::new();
    persist.load_all(&restored).await.unwrap();

    assert_eq!(restored.list_zones().len(), 2);
    let loaded = restored.list_records();
    assert_eq!(loaded.len(), records.len());
    for rec in &records {
        assert!(
            loaded.iter().any(|l| l == rec),
            "missing {} after reload",
            rec.identity_key()
        );
    }
}

#[tokio::test]
async fn reload_into_populated_store_is_a_noop() {
    let persist = open().await;
    persist.upsert_zone(&zone("example.com.", 1)).await.unwrap();
    let rec = record("app.example.com.", RecordData::A("198.51.100.5".parse().unwrap()), 7);
    persist.add_record(&rec).await.unwrap();

    let store = Store::new();
    persist.load_all(&store).await.unwrap();
    let before_records = store.list_records();
    let before_zones = store.list_zones();

    persist.load_all(&store).await.unwrap();
    assert_eq!(store.list_records(), before_records);
    assert_eq!(store.list_zones(), before_zones);
}

#[tokio::test]
async fn stale_set_does_not_overwrite_newer_rows() {
    let persist = open().await;

    let newer = record("app.example.com.", RecordData::A("198.51.100.1".parse().unwrap()), 20);
    persist.upsert_record_set(&newer).await.unwrap();

    let stale = record("app.example.com.", RecordData::A("198.51.100.2".parse().unwrap()), 10);
    persist.upsert_record_set(&stale).await.unwrap();

    let store = Store::new();
    persist.load_all(&store).await.unwrap();
    let records = store.list_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data.fingerprint(), "198.51.100.1");
    assert_eq!(records[0].version, 20);
}

#[tokio::test]
async fn set_replaces_the_stored_rrset() {
    let persist = open().await;

    persist
        .add_record(&record("pool.example.com.", RecordData::A("198.51.100.1".parse().unwrap()), 1))
        .await
        .unwrap();
    persist
        .add_record(&record("pool.example.com.", RecordData::A("198.51.100.2".parse().unwrap()), 2))
        .await
        .unwrap();

    persist
        .upsert_record_set(&record(
            "pool.example.com.",
            RecordData::A("198.51.100.9".parse().unwrap()),
            3,
        ))
        .await
        .unwrap();

    let store = Store::new();
    persist.load_all(&store).await.unwrap();
    let records = store.list_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data.fingerprint(), "198.51.100.9");
}

#[tokio::test]
async fn remove_and_delete_apply_version_guards() {
    let persist = open().await;

    let member = record("pool.example.com.", RecordData::A("198.51.100.1".parse().unwrap()), 50);
    persist.add_record(&member).await.unwrap();

    // Stale remove leaves the row in place.
    persist.remove_record(&member, 10).await.unwrap();
    let store = Store::new();
    persist.load_all(&store).await.unwrap();
    assert_eq!(store.list_records().len(), 1);

    // Newer delete clears it.
    persist
        .delete_by_name_type("pool.example.com.", None, 60)
        .await
        .unwrap();
    let store = Store::new();
    persist.load_all(&store).await.unwrap();
    assert!(store.list_records().is_empty());
}

#[tokio::test]
async fn zone_serial_guard_applies_in_the_mirror() {
    let persist = open().await;

    persist.upsert_zone(&zone("example.com.", 10)).await.unwrap();
    let mut stale = zone("example.com.", 5);
    stale.ns = vec!["ns9.example.com.".to_string()];
    persist.upsert_zone(&stale).await.unwrap();

    let store = Store::new();
    persist.load_all(&store).await.unwrap();
    let loaded = store.get_zone("example.com.").unwrap();
    assert_eq!(loaded.serial, 10);
    assert_eq!(loaded.ns, vec!["ns1.example.com.".to_string()]);
}
