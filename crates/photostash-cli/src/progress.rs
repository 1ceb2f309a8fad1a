use indicatif::{ProgressBar, ProgressStyle};
use photostash_core::{ProgressReporter, Stage};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// One bar per stage. Every stage knows its total up front, so each gets a
/// bounded bar rather than a spinner.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

fn stage_style(stage: Stage) -> ProgressStyle {
    let template = format!(
        "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} ({{eta}} remaining)",
        stage
    );
    ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICK_CHARS)
}

fn noun(stage: Stage) -> &'static str {
    match stage {
        Stage::Scan => "files indexed",
        Stage::HashTree => "hash links",
        Stage::DateTree => "date links",
        Stage::Sync => "objects checked",
    }
}

impl ProgressReporter for CliReporter {
    fn on_start(&self, stage: Stage, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(stage_style(stage));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    /// Workers report concurrently, so `completed` values can arrive out of
    /// order. One call per finished entry; counting calls keeps the bar monotonic.
    fn on_progress(&self, _stage: Stage, _completed: usize, total: usize) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                if pb.length() != Some(total as u64) {
                    pb.set_length(total as u64);
                }
                pb.inc(1);
            }
        }
    }

    fn on_complete(&self, stage: Stage, completed: usize, duration: Duration) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} complete: {} {} in {:.2}s",
            stage,
            completed,
            noun(stage),
            duration.as_secs_f64()
        );
    }
}
