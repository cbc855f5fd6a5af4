use indicatif::{ProgressBar, ProgressStyle};
use repo_backup_core::ProgressReporter;
use std::path::Path;
use std::sync::Mutex;

/// CLI progress reporter using indicatif.
///
/// - Resolve phase: spinner (node count unknown until the query returns)
/// - Archive phase: progress bar over buckets
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

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "  {spinner:.cyan} {prefix} [{bar:30.cyan/dim}] {pos}/{len} buckets ({eta} remaining) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━╸─")
    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

impl ProgressReporter for CliReporter {
    fn on_resolve_start(&self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(spinner_style());
        pb.set_message("Querying node catalog...");
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_resolve_complete(&self, nodes: usize, buckets: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Resolved {} nodes into {} buckets in {:.2}s",
            nodes, buckets, duration_secs
        );
    }

    fn on_archive_start(&self, total_buckets: usize, dry_run: bool) {
        let pb = ProgressBar::new(total_buckets as u64);
        pb.set_style(bar_style());
        pb.set_prefix(if dry_run { "Planning" } else { "Archiving" });
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_bucket_archived(&self, done: usize, _total: usize, bucket: &Path) {
        self.with_bar(|pb| {
            pb.set_position(done as u64);
            pb.set_message(bucket.display().to_string());
        });
    }

    fn on_bucket_failed(&self, bucket: &Path, reason: &str) {
        self.with_bar(|pb| {
            pb.inc(1);
            pb.println(format!(
                "  \x1b[31m✗\x1b[0m {}: {}",
                bucket.display(),
                reason
            ));
        });
    }

    fn on_archive_complete(&self, archived: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Archive complete: {} written, {} failed in {:.2}s",
            archived, failed, duration_secs
        );
    }
}
