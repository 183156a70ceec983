//! Plugin-owned storage: handle sharing and the flush on dispatch
//! completion.

use std::rc::Rc;
use std::time::Duration;

use serde_json::json;

use plugroute::{ListItem, MemoryHost, Plugin, TimedStorage, ViewOutcome};

mod common;

#[test]
fn storage_handles_are_shared_per_name() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut builder =
        Plugin::builder("Hello", "plugin.video.hello").storage_path(dir.path());
    builder
        .route("/", "main_menu", |_ctx| Ok(ViewOutcome::Listing(Vec::new())))
        .unwrap();
    let plugin = builder.build().unwrap();

    let first = plugin.get_storage("cache").unwrap();
    let again = plugin.get_storage("cache").unwrap();
    let other = plugin.get_storage("history").unwrap();

    assert!(Rc::ptr_eq(&first, &again));
    assert!(!Rc::ptr_eq(&first, &other));

    // A TTL request for an already-open storage reuses the open handle.
    let with_ttl = plugin
        .get_storage_with_ttl("cache", Duration::from_secs(60))
        .unwrap();
    assert!(Rc::ptr_eq(&first, &with_ttl));
}

#[test]
fn writes_through_one_handle_are_visible_through_another() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut builder =
        Plugin::builder("Hello", "plugin.video.hello").storage_path(dir.path());
    builder
        .route("/", "main_menu", |_ctx| Ok(ViewOutcome::Listing(Vec::new())))
        .unwrap();
    let plugin = builder.build().unwrap();

    plugin
        .get_storage("cache")
        .unwrap()
        .borrow_mut()
        .set("answer", json!(42));
    assert_eq!(
        plugin.get_storage("cache").unwrap().borrow_mut().get("answer"),
        Some(json!(42))
    );
}

#[test]
fn dispatch_completion_flushes_open_storages() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut builder =
        Plugin::builder("Hello", "plugin.video.hello").storage_path(dir.path());
    builder
        .route("/", "main_menu", |ctx| {
            // No explicit sync: the dispatcher flushes when the run is done.
            let cache = ctx.storage("cache")?;
            cache.borrow_mut().set("last_label", json!("Hello"));
            Ok(ViewOutcome::Listing(vec![ListItem::new("Hello")]))
        })
        .unwrap();
    let plugin = builder.build().unwrap();

    let argv = vec![
        "plugin://plugin.video.hello/".to_string(),
        "0".to_string(),
    ];
    let mut renderer = MemoryHost::new();
    let mut resolver = MemoryHost::new();
    plugin.run(&argv, &mut renderer, &mut resolver).unwrap();

    let mut reopened =
        TimedStorage::open(dir.path().join("cache.json"), None).unwrap();
    assert_eq!(reopened.get("last_label"), Some(json!("Hello")));
}

#[test]
fn storage_files_live_under_the_configured_path() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut builder =
        Plugin::builder("Hello", "plugin.video.hello").storage_path(dir.path());
    builder
        .route("/", "main_menu", |_ctx| Ok(ViewOutcome::Listing(Vec::new())))
        .unwrap();
    let plugin = builder.build().unwrap();

    assert_eq!(plugin.storage_path(), dir.path());
    let handle = plugin.get_storage("cache").unwrap();
    handle.borrow().sync().unwrap();
    assert!(dir.path().join("cache.json").exists());
}
