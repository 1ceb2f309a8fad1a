use glob::Pattern;
use rayon::ThreadPool;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{self, AppConfig};
use crate::error::Result;
use crate::index::{ContentIndex, FileMetadata, LookupKey};
use crate::media::{CaptureTime, ExifCaptureTime};
use crate::pool::worker_pool;
use crate::progress::ProgressReporter;
use crate::remote::{self, ObjectStore, RemoteTarget, S3Store, SyncOutcome};
use crate::scanner::{self, walk, FileFilter, ScanOutcome};
use crate::tree::{self, HashTree, TreeOutcome};

/// Owns the content index and the worker pool for one run.
pub struct StashEngine {
    config: AppConfig,
    index: ContentIndex,
    pool: ThreadPool,
    ignore_patterns: Vec<Pattern>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub scan_duration: Duration,
    pub tree_duration: Duration,
    pub sync_duration: Duration,
    pub files_scanned: usize,
    pub scan_failures: usize,
    pub hash_tree: Option<TreeOutcome>,
    pub date_tree: Option<TreeOutcome>,
    pub sync: Option<SyncOutcome>,
    pub distinct_contents: usize,
    pub total_size: u64,
    pub deduped_size: u64,
}

impl StashEngine {
    /// Loads the persisted index unless `rescan` is set.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_capture_time(config, Arc::new(ExifCaptureTime))
    }

    pub fn with_capture_time(
        config: AppConfig,
        capture_time: Arc<dyn CaptureTime>,
    ) -> Result<Self> {
        let index = if config.rescan {
            info!("Rescan requested, ignoring {}", config.index_file.display());
            ContentIndex::with_capture_time(capture_time)
        } else {
            ContentIndex::load(&config.index_file, capture_time)?
        };
        let pool = worker_pool(config.worker_threads())?;
        let ignore_patterns = walk::compile_patterns(&config.ignore_patterns);
        debug!("Using {} worker threads", pool.current_num_threads());

        Ok(Self {
            config,
            index,
            pool,
            ignore_patterns,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn index(&self) -> &ContentIndex {
        &self.index
    }

    pub fn add_directory(
        &self,
        dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanOutcome> {
        scanner::scan_directory(
            &self.index,
            dir,
            FileFilter::from_only_images(self.config.only_images),
            &self.ignore_patterns,
            &self.pool,
            reporter,
        )
    }

    pub fn persist(&self) -> Result<()> {
        self.index.persist(&self.config.index_file)
    }

    pub fn build_hash_tree(
        &self,
        root: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<HashTree> {
        tree::build_hash_tree(&self.index, root, &self.pool, reporter)
    }

    pub fn build_date_tree(
        &self,
        hash_tree: &HashTree,
        root: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<TreeOutcome> {
        tree::build_date_tree(&self.index, hash_tree, root, &self.pool, reporter)
    }

    pub fn sync_remote(
        &self,
        store: &dyn ObjectStore,
        source: &Path,
        target: &RemoteTarget,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncOutcome> {
        remote::sync_directory(store, source, target, &self.pool, reporter)
    }

    pub fn lookup(&self, key: LookupKey<'_>) -> Option<FileMetadata> {
        self.index.lookup(key)
    }

    pub fn total_size(&self) -> u64 {
        self.index.total_size()
    }

    pub fn deduped_size(&self) -> u64 {
        self.index.deduped_size()
    }

    /// Runs the configured pipeline, connecting to S3 when a remote URI is set.
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunSummary> {
        self.config.validate()?;
        match &self.config.remote.uri {
            Some(uri) => {
                let target = RemoteTarget::parse(uri)?;
                let store = S3Store::connect(&target, &self.config.remote)?;
                let store: &dyn ObjectStore = &store;
                self.run_pipeline(reporter, Some((&target, store)))
            }
            None => self.run_pipeline(reporter, None),
        }
    }

    /// Runs the configured pipeline against the given store.
    pub fn run_with_store(
        &self,
        store: &dyn ObjectStore,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        self.config.validate()?;
        let target = self
            .config
            .remote
            .uri
            .as_deref()
            .map(RemoteTarget::parse)
            .transpose()?;
        self.run_pipeline(reporter, target.as_ref().map(|t| (t, store)))
    }

    /// 1. Scan every root into the index, then persist it
    /// 2. Hash tree, persisting again to keep the link annotations
    /// 3. Date tree
    /// 4. Mirror the hash tree to the remote store
    fn run_pipeline(
        &self,
        reporter: &dyn ProgressReporter,
        remote: Option<(&RemoteTarget, &dyn ObjectStore)>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let roots = config::non_overlapping_directories(self.config.directories.clone());
        info!("Processing directories: {:?}", roots);

        let scan_start = Instant::now();
        for root in &roots {
            let outcome = self.add_directory(Path::new(root), reporter)?;
            summary.files_scanned += outcome.processed;
            summary.scan_failures += outcome.failures.len();
        }
        self.persist()?;
        summary.scan_duration = scan_start.elapsed();

        let tree_start = Instant::now();
        if let Some(hash_root) = &self.config.hash_tree_dir {
            let hash_tree = self.build_hash_tree(hash_root, reporter)?;
            self.persist()?;

            if let Some(date_root) = &self.config.date_tree_dir {
                summary.date_tree = Some(self.build_date_tree(&hash_tree, date_root, reporter)?);
            }
            summary.hash_tree = Some(hash_tree.outcome().clone());

            summary.tree_duration = tree_start.elapsed();

            if let Some((target, store)) = remote {
                let sync_start = Instant::now();
                summary.sync = Some(self.sync_remote(store, hash_tree.root(), target, reporter)?);
                summary.sync_duration = sync_start.elapsed();
            }
        }

        summary.distinct_contents = self.index.len();
        summary.total_size = self.total_size();
        summary.deduped_size = self.deduped_size();
        Ok(summary)
    }
}
