use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// The pipeline stages that report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Scan,
    HashTree,
    DateTree,
    Sync,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scan => "Scanning",
            Stage::HashTree => "Linking hash tree",
            Stage::DateTree => "Linking date tree",
            Stage::Sync => "Uploading",
        };
        f.write_str(name)
    }
}

/// Trait for reporting progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_start(&self, _stage: Stage, _total: usize) {}
    /// Called once per finished entry, from whichever worker finished it.
    /// Each `completed` value is issued once, but calls from different workers
    /// may arrive out of order.
    fn on_progress(&self, _stage: Stage, _completed: usize, _total: usize) {}
    fn on_complete(&self, _stage: Stage, _completed: usize, _duration: Duration) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Completed-entry counter shared by the workers of one stage.
pub(crate) struct StageProgress<'a> {
    stage: Stage,
    total: usize,
    completed: AtomicUsize,
    started: Instant,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> StageProgress<'a> {
    pub(crate) fn start(stage: Stage, total: usize, reporter: &'a dyn ProgressReporter) -> Self {
        reporter.on_start(stage, total);
        Self {
            stage,
            total,
            completed: AtomicUsize::new(0),
            started: Instant::now(),
            reporter,
        }
    }

    pub(crate) fn tick(&self) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        self.reporter.on_progress(self.stage, completed, self.total);
    }

    /// Reports completion and returns the final count.
    pub(crate) fn finish(self) -> usize {
        let completed = self.completed.into_inner();
        self.reporter
            .on_complete(self.stage, completed, self.started.elapsed());
        completed
    }
}
