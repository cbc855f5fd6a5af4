use std::path::Path;

/// Trait for reporting backup progress.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations.
pub trait ProgressReporter {
    fn on_resolve_start(&self) {}
    fn on_resolve_complete(&self, _nodes: usize, _buckets: usize, _duration_secs: f64) {}
    fn on_archive_start(&self, _total_buckets: usize, _dry_run: bool) {}
    fn on_bucket_archived(&self, _done: usize, _total: usize, _bucket: &Path) {}
    fn on_bucket_failed(&self, _bucket: &Path, _reason: &str) {}
    fn on_archive_complete(&self, _archived: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
