mod common;

use common::{datetime, write_file, FixedCaptureTime};
use photostash_core::index::Recorded;
use photostash_core::media::NoCaptureTime;
use photostash_core::pool::worker_pool;
use photostash_core::error::Result;
use photostash_core::scanner::{scan_directory, FileFilter, ScanOutcome};
use photostash_core::{ContentIndex, LookupKey, SilentReporter};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn empty_index() -> ContentIndex {
    ContentIndex::with_capture_time(Arc::new(NoCaptureTime))
}

fn scan(
    index: &ContentIndex,
    root: &Path,
    filter: FileFilter,
    threads: usize,
) -> Result<ScanOutcome> {
    let pool = worker_pool(threads)?;
    scan_directory(index, root, filter, &[], &pool, &SilentReporter)
}

/// hash -> set of paths, the order-independent view of an index.
fn mapping(index: &ContentIndex) -> BTreeMap<String, BTreeSet<PathBuf>> {
    index
        .records()
        .into_iter()
        .map(|r| (r.hash, r.paths.into_iter().collect()))
        .collect()
}

/// Layout:
///   root/
///     a/photo.jpg      ("same bytes")
///     b/copy.jpg       ("same bytes")
///     b/other.png      ("other bytes")
///     c/d/e/deep.jpg   ("deep bytes")
///     c/zero           ("")
fn create_test_tree(root: &Path) {
    write_file(&root.join("a/photo.jpg"), b"same bytes");
    write_file(&root.join("b/copy.jpg"), b"same bytes");
    write_file(&root.join("b/other.png"), b"other bytes");
    write_file(&root.join("c/d/e/deep.jpg"), b"deep bytes");
    write_file(&root.join("c/zero"), b"");
}

#[test]
fn test_identical_content_shares_one_record() {
    let tmp = tempdir().unwrap();
    let first = tmp.path().join("one.jpg");
    let second = tmp.path().join("nested/two.jpg");
    write_file(&first, b"0123456789");
    write_file(&second, b"0123456789");

    let index = empty_index();
    let hash = match index.record_file(&first).unwrap() {
        Recorded::NewContent { hash } => hash,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(
        index.record_file(&second).unwrap(),
        Recorded::Duplicate { hash: hash.clone() }
    );

    let by_first = index.lookup(LookupKey::Path(&first)).unwrap();
    let by_second = index.lookup(LookupKey::Path(&second)).unwrap();
    assert_eq!(by_first, by_second);
    assert_eq!(by_first, index.lookup(LookupKey::Hash(&hash)).unwrap());
    assert_eq!(by_first.paths, vec![first.clone(), second.clone()]);
    assert_eq!(by_first.size, 10);

    assert_eq!(index.deduped_size(), 10);
    assert_eq!(index.total_size(), 20);
}

#[test]
fn test_rescanning_without_rescan_flag_changes_nothing() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    create_test_tree(&root);

    let index = empty_index();

    let first = scan(&index, &root, FileFilter::All, 2).unwrap();
    assert_eq!(first.processed, 5);
    assert_eq!(first.new_content, 4);
    assert_eq!(first.duplicates, 1);
    let before = mapping(&index);

    let second = scan(&index, &root, FileFilter::All, 2).unwrap();
    assert_eq!(second.processed, 5);
    assert_eq!(second.already_known, 5);
    assert_eq!(mapping(&index), before);
    for record in index.records() {
        assert_eq!(
            record.paths.len(),
            record.paths.iter().collect::<BTreeSet<_>>().len(),
            "duplicate path in {}",
            record.hash
        );
    }
}

#[test]
fn test_end_state_is_independent_of_worker_count() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    for i in 0..40 {
        // Ten distinct contents spread over forty files.
        write_file(
            &root.join(format!("dir{}/file{}.jpg", i % 7, i)),
            format!("content {}", i % 10).as_bytes(),
        );
    }

    let sequential = empty_index();
    scan(&sequential, &root, FileFilter::All, 1).unwrap();

    let parallel = empty_index();
    let outcome = scan(&parallel, &root, FileFilter::All, 8).unwrap();

    assert_eq!(outcome.processed, 40);
    assert_eq!(parallel.len(), 10);
    assert_eq!(parallel.path_count(), 40);
    assert_eq!(mapping(&parallel), mapping(&sequential));
    for record in parallel.records() {
        assert_eq!(record.paths.len(), 4);
    }
}

#[test]
fn test_same_path_from_many_workers_is_recorded_once() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("contended.jpg");
    write_file(&path, b"contended");

    let index = empty_index();
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| index.record_file(&path).unwrap());
        }
    });

    let record = index.lookup_path(&path).unwrap();
    assert_eq!(record.paths, vec![path]);
    assert_eq!(index.path_count(), 1);
}

#[test]
fn test_persist_then_load_round_trips() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    create_test_tree(&root);
    let index_file = tmp.path().join("state/index.json");

    let capture = Arc::new(
        FixedCaptureTime::default().with("photo.jpg", datetime(2023, 5, 4, 10, 20, 30)),
    );
    let index = ContentIndex::with_capture_time(capture.clone());
    scan(&index, &root, FileFilter::All, 4).unwrap();

    let other = index
        .lookup_path(&root.canonicalize().unwrap().join("b/other.png"))
        .unwrap();
    index
        .annotate_link(&other.hash, Path::new("/tree/abc/other.png"))
        .unwrap();
    index.persist(&index_file).unwrap();

    let loaded = ContentIndex::load(&index_file, capture).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.path_count(), index.path_count());
    assert_eq!(mapping(&loaded), mapping(&index));
    for record in index.records() {
        let restored = loaded.lookup_hash(&record.hash).unwrap();
        assert_eq!(restored.size, record.size);
        assert_eq!(restored.captured_at, record.captured_at);
        assert_eq!(restored.canonical_link_path, record.canonical_link_path);
        for path in &record.paths {
            assert_eq!(loaded.lookup_path(path).unwrap().hash, record.hash);
        }
    }

    let dated = loaded
        .lookup_path(&root.canonicalize().unwrap().join("a/photo.jpg"))
        .unwrap();
    assert_eq!(dated.captured_at, Some(datetime(2023, 5, 4, 10, 20, 30)));
    assert_eq!(loaded.total_size(), index.total_size());
    assert_eq!(loaded.deduped_size(), index.deduped_size());
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped_not_fatal() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    create_test_tree(&root);
    let locked = root.join("b/locked.jpg");
    write_file(&locked, b"locked bytes");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read(&locked).is_ok() {
        // Privileged runs ignore file modes.
        return;
    }

    let index = empty_index();
    let outcome = scan(&index, &root, FileFilter::All, 2).unwrap();

    assert_eq!(outcome.processed, 6);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].path.ends_with("b/locked.jpg"));
    assert_eq!(index.len(), 4);
    assert_eq!(index.path_count(), 5);
}

#[test]
fn test_images_only_filter() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
    write_file(&root.join("real.png"), &png);
    write_file(&root.join("fake.jpg"), b"plain text pretending");
    write_file(&root.join("notes.txt"), b"notes");

    let index = empty_index();
    let outcome = scan(&index, &root, FileFilter::ImagesOnly, 2).unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(index.len(), 1);
    assert!(index
        .lookup_path(&root.canonicalize().unwrap().join("real.png"))
        .is_some());
}

#[test]
fn test_missing_root_is_fatal_and_names_path() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("does-not-exist");
    let err = scan(&empty_index(), &root, FileFilter::All, 1).unwrap_err();
    assert!(err.to_string().contains("does-not-exist"));
}
