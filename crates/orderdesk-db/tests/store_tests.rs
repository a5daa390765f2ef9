// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use orderdesk_app::{CollapsiblePersister, StateStore, page_key};
use orderdesk_db::{Store, validate_db_path};
use orderdesk_testkit::FakePage;
use std::collections::BTreeSet;

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/orderdesk.db").is_ok());
}

#[test]
fn bootstrap_is_repeatable() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.put_state("collapse_state_/admin/", "[0]")?;
    store.bootstrap()?;
    assert_eq!(
        store.get_state("collapse_state_/admin/")?.as_deref(),
        Some("[0]")
    );
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE projects (id INTEGER PRIMARY KEY);")?;

    let err = store
        .bootstrap()
        .expect_err("schema validation should fail");
    assert!(err.to_string().contains("missing required table `ui_state`"));
    Ok(())
}

#[test]
fn bootstrap_rejects_table_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE ui_state (key TEXT PRIMARY KEY, value TEXT NOT NULL);")?;

    let err = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = err.to_string();
    assert!(message.contains("table `ui_state` is missing required columns"));
    assert!(message.contains("updated_at"));
    Ok(())
}

#[test]
fn state_survives_reopen_on_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orderdesk.db");

    {
        let mut store = Store::open(&path)?;
        store.bootstrap()?;
        store.set("collapse_state_/admin/shop/sitesettings/1/change/", "[0,2,3]")?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(
        store
            .get("collapse_state_/admin/shop/sitesettings/1/change/")?
            .as_deref(),
        Some("[0,2,3]")
    );
    Ok(())
}

#[test]
fn store_without_schema_fails_reads_and_writes() -> Result<()> {
    let mut store = Store::open_memory()?;
    assert!(store.get("anything").is_err());
    assert!(store.set("anything", "[]").is_err());
    Ok(())
}

#[test]
fn sections_round_trip_through_sqlite() -> Result<()> {
    let path = "/admin/orders/order/12/change/";
    let persister = CollapsiblePersister::new();
    let mut store = Store::open_memory()?;
    store.bootstrap()?;

    let open = FakePage::new(path).with_sections(&[
        (None, true),
        (None, false),
        (Some("delivery"), true),
    ]);
    persister.capture(&open, &mut store);
    assert_eq!(
        store.get_state(&page_key(path))?.as_deref(),
        Some(r#"[0,"delivery"]"#)
    );

    let mut fresh = FakePage::new(path).with_sections(&[
        (None, false),
        (None, false),
        (Some("delivery"), false),
    ]);
    assert_eq!(persister.restore(&mut fresh, &store), BTreeSet::from([0, 2]));

    let listed = store.list_state()?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, page_key(path));
    Ok(())
}
