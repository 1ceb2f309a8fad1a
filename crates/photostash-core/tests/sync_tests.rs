mod common;

use common::{write_file, MemoryStore};
use photostash_core::pool::worker_pool;
use photostash_core::remote::{sync_directory, RemoteTarget, SyncOutcome};
use photostash_core::SilentReporter;
use std::path::Path;
use tempfile::tempdir;

fn sync_once(store: &MemoryStore, source: &Path, target: &RemoteTarget) -> SyncOutcome {
    sync_directory(store, source, target, &worker_pool(1).unwrap(), &SilentReporter).unwrap()
}

#[test]
fn test_only_missing_objects_are_uploaded() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("hashes");
    write_file(&source.join("abc/abc1.jpg"), b"one");
    write_file(&source.join("abc/abc2.jpg"), b"two");
    write_file(&source.join("def/def3.png"), b"three");

    let store = MemoryStore::default()
        .with_object("backup/abc/abc1.jpg", b"one")
        .with_object("backup/def/def3.png", b"three");
    let target = RemoteTarget::parse("s3://bucket/backup/").unwrap();
    let pool = worker_pool(2).unwrap();

    let outcome = sync_directory(&store, &source, &target, &pool, &SilentReporter).unwrap();
    assert_eq!(outcome.uploaded, 1);
    assert_eq!(outcome.skipped, 2);
    assert!(outcome.failed.is_empty());
    assert_eq!(store.uploads(), vec!["backup/abc/abc2.jpg".to_string()]);
    assert_eq!(store.object("backup/abc/abc2.jpg").unwrap(), b"two");
    assert_eq!(store.list_calls(), 3);

    let again = sync_directory(&store, &source, &target, &pool, &SilentReporter).unwrap();
    assert_eq!(again.uploaded, 0);
    assert_eq!(again.skipped, 3);
    assert_eq!(store.uploads().len(), 1);
}

#[test]
fn test_longer_key_sharing_a_prefix_does_not_count_as_present() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("hashes");
    write_file(&source.join("abc/abc.jpg"), b"short");

    let store = MemoryStore::default().with_object("abc/abc.jpg.bak", b"old");
    let target = RemoteTarget::parse("s3://bucket").unwrap();

    let outcome = sync_once(&store, &source, &target);
    assert_eq!(outcome.uploaded, 1);
    assert_eq!(
        store.keys(),
        vec!["abc/abc.jpg".to_string(), "abc/abc.jpg.bak".to_string()]
    );
}

#[test]
fn test_transient_put_failures_are_retried() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("hashes");
    write_file(&source.join("abc/abc.jpg"), b"retry me");

    let store = MemoryStore::default().failing_puts(2);
    let target = RemoteTarget::parse("s3://bucket/p").unwrap();

    let outcome = sync_once(&store, &source, &target);
    assert_eq!(outcome.uploaded, 1);
    assert!(outcome.failed.is_empty());
    assert_eq!(store.object("p/abc/abc.jpg").unwrap(), b"retry me");
}

#[test]
fn test_persistent_failure_is_listed_and_batch_continues() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("hashes");
    write_file(&source.join("abc/abc.jpg"), b"first");
    write_file(&source.join("def/def.jpg"), b"second");

    // Enough injected failures to exhaust every attempt of the first put.
    let store = MemoryStore::default().failing_puts(3);
    let target = RemoteTarget::parse("s3://bucket/p").unwrap();

    let outcome = sync_once(&store, &source, &target);
    assert_eq!(outcome.uploaded, 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(store.uploads().len(), 1);
    let failed_key = outcome.failed[0].path.to_string_lossy().to_string();
    assert!(failed_key.starts_with("p/"));
    assert!(!store.uploads().contains(&failed_key));
}

#[cfg(unix)]
#[test]
fn test_dangling_link_is_reported_as_failed() {
    use std::os::unix::fs::symlink;

    let tmp = tempdir().unwrap();
    let source = tmp.path().join("hashes");
    write_file(&source.join("abc/abc.jpg"), b"present");
    symlink("missing.jpg", source.join("abc/gone.jpg")).unwrap();

    let store = MemoryStore::default();
    let target = RemoteTarget::parse("s3://bucket/p").unwrap();

    let outcome = sync_once(&store, &source, &target);
    assert_eq!(outcome.uploaded, 1);
    assert_eq!(outcome.failed.len(), 1);
    assert!(outcome.failed[0].path.ends_with("abc/gone.jpg"));
    assert_eq!(store.keys(), vec!["p/abc/abc.jpg".to_string()]);
}
