//! Tests for full reconciliation passes and the dangling sweep

use pretty_assertions::assert_eq;
use registrator_core::{AddOutcome, Bridge, BridgeConfig, LEDGER_FILE_NAME, Service, ServiceId};
use registrator_test_utils::{Call, ConfigDir, RecordingAdapter};
use std::sync::Arc;

fn bridge(dir: &ConfigDir, backend: &RecordingAdapter, cleanup: bool) -> Bridge {
    let config = BridgeConfig::with_identity(dir.root(), "h1").with_cleanup(cleanup);
    Bridge::with_adapter(Box::new(backend.clone()), config).unwrap()
}

fn orphan(host: &str) -> Service {
    let signature = registrator_fs::content_signature(b"deleted while we were down");
    Service::with_id(ServiceId::new(host, signature, 8080).to_string())
}

#[tokio::test]
async fn test_sync_registers_every_definition() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    dir.write_definition("nested/db.json", "db", 5432);
    dir.write("README.md", "not a definition");
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, false);

    let report = bridge.sync(false).await.unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.added, 2);
    assert_eq!(backend.registered_ids().len(), 2);
    assert_eq!(bridge.ledger().len(), 2);
}

#[tokio::test]
async fn test_sync_skips_ledger_file() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, false);

    bridge.sync(false).await.unwrap();
    assert!(dir.root().join(LEDGER_FILE_NAME).exists());
    let report = bridge.sync(false).await.unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(report.invalid, 0);
}

#[tokio::test]
async fn test_sync_continues_past_invalid_files() {
    let dir = ConfigDir::new();
    dir.write("broken.json", "[1, 2");
    dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, false);

    let report = bridge.sync(true).await.unwrap();

    assert_eq!(report.invalid, 1);
    assert_eq!(report.added, 1);
}

#[tokio::test]
async fn test_sync_reasserts_after_backend_wipe_without_ledger_write() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    dir.write_definition("db.json", "db", 5432);
    let backend = RecordingAdapter::new();
    bridge(&dir, &backend, false).sync(false).await.unwrap();
    let expected = backend.registered_ids();

    backend.wipe();
    let restarted = bridge(&dir, &backend, false);
    // Any ledger flush during this pass would recreate the file.
    std::fs::remove_file(dir.root().join(LEDGER_FILE_NAME)).unwrap();

    let report = restarted.sync(false).await.unwrap();

    assert_eq!(report.reasserted, 2);
    assert_eq!(report.added, 0);
    assert_eq!(backend.registered_ids(), expected);
    assert!(!dir.root().join(LEDGER_FILE_NAME).exists());
}

#[tokio::test]
async fn test_sync_detects_port_edit() {
    let dir = ConfigDir::new();
    let path = dir.write("svc-a.json", r#"{"name":"web","port":8080}"#);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, false);
    bridge.sync(false).await.unwrap();
    let old_id = bridge.ledger().service_id(&path).unwrap();

    dir.write("svc-a.json", r#"{"name":"web","port":9090}"#);
    let report = bridge.sync(false).await.unwrap();

    let new_id: ServiceId = bridge.ledger().service_id(&path).unwrap().parse().unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(new_id.port(), 9090);
    assert_eq!(new_id.host(), "h1");
    assert_ne!(new_id.to_string(), old_id);
}

#[tokio::test]
async fn test_sync_replaces_version_edited_while_down() {
    let dir = ConfigDir::new();
    let path = dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    bridge(&dir, &backend, false).sync(false).await.unwrap();
    let old_id = backend.registered_ids().remove(0);

    dir.write_definition("web.json", "web", 9090);
    backend.clear_calls();
    let restarted = bridge(&dir, &backend, false);
    let report = restarted.sync(false).await.unwrap();

    let new_id = restarted.ledger().service_id(&path).unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(
        backend.calls(),
        vec![Call::Deregister(old_id), Call::Register(new_id.clone())]
    );
    assert_eq!(backend.registered_ids(), vec![new_id]);
}

#[tokio::test]
async fn test_sync_with_cleanup_leaves_nothing_for_sweep_after_edit() {
    let dir = ConfigDir::new();
    let path = dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, true);
    bridge.sync(false).await.unwrap();

    dir.write_definition("web.json", "web", 9090);
    let report = bridge.sync(false).await.unwrap();

    let new_id = bridge.ledger().service_id(&path).unwrap();
    assert!(report.dangling.is_empty());
    assert_eq!(backend.registered_ids(), vec![new_id]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_sync_skips_dangling_symlink() {
    let dir = ConfigDir::new();
    let path = dir.write_definition("web.json", "web", 8080);
    std::os::unix::fs::symlink(
        dir.root().join("missing-target"),
        dir.root().join("dead.json"),
    )
    .unwrap();
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, false);

    let report = bridge.sync(false).await.unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(report.added, 1);
    assert!(bridge.ledger().service_id(&path).is_some());
}

#[tokio::test]
async fn test_sync_registers_nested_file_named_like_ledger() {
    let dir = ConfigDir::new();
    dir.write_definition("team/storage.json", "team", 7000);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, false);

    let report = bridge.sync(false).await.unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(report.added, 1);
}

#[tokio::test]
async fn test_sweep_removes_only_true_orphans() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, true);
    bridge.sync(false).await.unwrap();
    let live = backend.registered_ids();

    let stray = orphan("h1");
    backend.insert(stray.clone());
    backend.clear_calls();

    let report = bridge.sync(false).await.unwrap();

    assert_eq!(report.dangling, vec![stray.id.clone()]);
    assert_eq!(backend.deregister_calls(), vec![stray.id]);
    assert_eq!(backend.registered_ids(), live);
}

#[tokio::test]
async fn test_sweep_respects_host_namespace_and_foreign_ids() {
    let dir = ConfigDir::new();
    let backend = RecordingAdapter::new();
    let other_host = orphan("h2");
    let unmanaged = Service::with_id("redis-6379");
    backend.insert(other_host.clone());
    backend.insert(unmanaged.clone());
    let bridge = bridge(&dir, &backend, true);

    let report = bridge.sync(false).await.unwrap();

    assert!(report.dangling.is_empty());
    assert!(backend.deregister_calls().is_empty());
    assert_eq!(backend.registered_ids().len(), 2);
}

#[tokio::test]
async fn test_sync_without_cleanup_never_lists_backend() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    backend.insert(orphan("h1"));
    let bridge = bridge(&dir, &backend, false);

    bridge.sync(false).await.unwrap();

    assert!(!backend.calls().contains(&Call::Services));
    assert!(backend.deregister_calls().is_empty());
}

#[tokio::test]
async fn test_sync_prunes_entries_for_deleted_files() {
    let dir = ConfigDir::new();
    let path = dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, true);
    let AddOutcome::Registered(id) = bridge.add(&path).await else {
        panic!("add failed");
    };

    dir.delete("web.json");
    let report = bridge.sync(false).await.unwrap();

    assert_eq!(report.pruned, 1);
    assert_eq!(backend.deregister_calls(), vec![id]);
    assert!(bridge.ledger().is_empty());
    assert!(backend.registered_ids().is_empty());
}

#[tokio::test]
async fn test_sync_listing_failure_is_counted() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    backend.fail_listing(true);
    let bridge = bridge(&dir, &backend, true);

    let report = bridge.sync(false).await.unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(report.failed, 1);
    assert!(backend.deregister_calls().is_empty());
}

#[tokio::test]
async fn test_sync_missing_config_dir_is_error() {
    let dir = ConfigDir::new();
    let backend = RecordingAdapter::new();
    let config = BridgeConfig::with_identity(dir.root().join("absent"), "h1");
    let bridge = Bridge::with_adapter(Box::new(backend), config).unwrap();

    assert!(bridge.sync(false).await.is_err());
}

#[tokio::test]
async fn test_refresh_is_noop_without_ttl() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    let backend = RecordingAdapter::new();
    let bridge = bridge(&dir, &backend, false);
    bridge.sync(false).await.unwrap();

    assert_eq!(bridge.refresh().await, 0);
    assert!(backend.refresh_calls().is_empty());
}

#[tokio::test]
async fn test_refresh_renews_unchanged_registrations() {
    let dir = ConfigDir::new();
    dir.write_definition("web.json", "web", 8080);
    dir.write_definition("db.json", "db", 5432);
    let backend = RecordingAdapter::new();
    let config = BridgeConfig::with_identity(dir.root(), "h1").with_ttl(30, 10);
    let bridge = Bridge::with_adapter(Box::new(backend.clone()), config).unwrap();
    bridge.sync(false).await.unwrap();
    let web_id = bridge.ledger().service_id(&dir.root().join("web.json")).unwrap();

    // Edited but not yet reconciled: nothing to refresh for it.
    dir.write_definition("db.json", "db", 5433);

    assert_eq!(bridge.refresh().await, 1);
    assert_eq!(bridge.refresh().await, 1);
    assert_eq!(backend.refresh_calls(), vec![web_id.clone(), web_id]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_and_sync_never_sweeps_fresh_registration() {
    let dir = ConfigDir::new();
    let backend = RecordingAdapter::new();
    let bridge = Arc::new(bridge(&dir, &backend, true));

    let paths: Vec<_> = (0..16)
        .map(|i| dir.write_definition(&format!("svc-{i}.json"), "svc", 9000 + i))
        .collect();

    let mut tasks = Vec::new();
    for path in paths.clone() {
        let bridge = Arc::clone(&bridge);
        tasks.push(tokio::spawn(async move {
            bridge.add(&path).await;
        }));
    }
    for _ in 0..4 {
        let bridge = Arc::clone(&bridge);
        tasks.push(tokio::spawn(async move {
            bridge.sync(true).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(bridge.ledger().len(), 16);
    assert_eq!(backend.registered_ids().len(), 16);
    assert!(backend.deregister_calls().is_empty());
}
