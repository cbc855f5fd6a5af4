//! Packaging bucket directories into tar files under a destination root.
//!
//! Destination layout mirrors the repository: bucket `/repo/node/24/64` is
//! written to `<dest>/node/24/64.tar`, holding the `64/` directory tree.
//! Existing archives are removed and rebuilt in full.

pub mod builtin;
pub mod exclude;
pub mod lock;
pub mod system;

pub use builtin::BuiltinTar;
pub use exclude::ExcludeSet;
pub use lock::DestinationLock;
pub use system::SystemTar;

use crate::config::{AppConfig, ArchiverKind};
use crate::error::{Error, Result};
use crate::layout::NODE_SECTION;
use crate::progress::ProgressReporter;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Something that can write one bucket into one tar file.
pub trait Archiver {
    /// Package `job.member` under `job.base_dir` into `job.archive_path`,
    /// skipping anything matched by `excludes`.
    fn create(&self, job: &ArchiveJob, excludes: &[String]) -> Result<()>;

    /// Human readable form of what `create` would do, for logs and dry runs.
    fn describe(&self, job: &ArchiveJob, excludes: &[String]) -> String;
}

pub fn archiver_for(config: &AppConfig) -> Box<dyn Archiver> {
    match config.archiver {
        ArchiverKind::System => Box::new(SystemTar::new(&config.tar_program)),
        ArchiverKind::Builtin => Box::new(BuiltinTar),
    }
}

/// Where and how a single bucket gets archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    pub bucket: PathBuf,
    /// Directory the archive lands in, e.g. `<dest>/node/24`.
    pub destination_dir: PathBuf,
    /// e.g. `<dest>/node/24/64.tar`
    pub archive_path: PathBuf,
    /// Parent of the bucket; the archiver runs relative to it.
    pub base_dir: PathBuf,
    /// Last segment of the bucket, the single top-level archive member.
    pub member: OsString,
}

impl ArchiveJob {
    pub fn plan(bucket: &Path, destination_root: &Path) -> Result<Self> {
        let invalid = || Error::InvalidBucket(bucket.to_path_buf());
        let member = bucket.file_name().ok_or_else(invalid)?;
        let base_dir = bucket.parent().ok_or_else(invalid)?;
        let second = base_dir.file_name().ok_or_else(invalid)?;
        let section = base_dir
            .parent()
            .and_then(Path::file_name)
            .ok_or_else(invalid)?;

        let destination_dir = destination_root.join(section).join(second);
        let mut archive_name = member.to_os_string();
        archive_name.push(".tar");
        let archive_path = destination_dir.join(archive_name);

        Ok(Self {
            bucket: bucket.to_path_buf(),
            destination_dir,
            archive_path,
            base_dir: base_dir.to_path_buf(),
            member: member.to_os_string(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveOptions<'a> {
    pub destination_root: &'a Path,
    pub exclude_patterns: &'a [String],
    pub dry_run: bool,
    pub lock_destination: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFailure {
    pub bucket: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveSummary {
    /// Every job that was planned, in archiving order.
    pub jobs: Vec<ArchiveJob>,
    /// Archives actually written. Empty on a dry run.
    pub archived: Vec<PathBuf>,
    pub failed: Vec<BucketFailure>,
}

impl ArchiveSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Create `root` and `root/node` if missing.
pub fn prepare_destination(root: &Path) -> Result<()> {
    for dir in [root.to_path_buf(), root.join(NODE_SECTION)] {
        fs::create_dir_all(&dir).map_err(|e| Error::filesystem(&dir, e))?;
    }
    Ok(())
}

/// Archive every bucket in the order given.
///
/// Failing to create destination directories aborts the run. Anything that
/// goes wrong with a single bucket is logged, recorded in the summary and
/// the run moves on to the next bucket.
pub fn archive_buckets(
    buckets: &[PathBuf],
    options: &ArchiveOptions<'_>,
    archiver: &dyn Archiver,
    reporter: &dyn ProgressReporter,
) -> Result<ArchiveSummary> {
    let start = Instant::now();
    if !options.dry_run {
        prepare_destination(options.destination_root)?;
    }
    let _lock = if !options.dry_run && options.lock_destination {
        Some(DestinationLock::acquire(options.destination_root)?)
    } else {
        None
    };

    let total = buckets.len();
    reporter.on_archive_start(total, options.dry_run);
    let mut summary = ArchiveSummary::default();

    for (index, bucket) in buckets.iter().enumerate() {
        let job = match ArchiveJob::plan(bucket, options.destination_root) {
            Ok(job) => job,
            Err(err) => {
                record_failure(&mut summary, reporter, bucket, err.to_string());
                continue;
            }
        };
        debug!("Command: {}", archiver.describe(&job, options.exclude_patterns));

        if options.dry_run {
            info!(
                "Dry run: would archive {} to {}",
                job.bucket.display(),
                job.archive_path.display()
            );
            summary.jobs.push(job);
            reporter.on_bucket_archived(index + 1, total, bucket);
            continue;
        }

        fs::create_dir_all(&job.destination_dir)
            .map_err(|e| Error::filesystem(&job.destination_dir, e))?;

        if let Err(err) = remove_stale_archive(&job.archive_path) {
            let reason = format!(
                "cannot remove existing archive {}: {}",
                job.archive_path.display(),
                err
            );
            record_failure(&mut summary, reporter, bucket, reason);
            summary.jobs.push(job);
            continue;
        }

        match archiver.create(&job, options.exclude_patterns) {
            Ok(()) => {
                debug!("Wrote {}", job.archive_path.display());
                summary.archived.push(job.archive_path.clone());
                reporter.on_bucket_archived(index + 1, total, bucket);
            }
            Err(err) => {
                // Never leave a truncated archive behind looking like a good one.
                if let Err(e) = remove_stale_archive(&job.archive_path) {
                    warn!(
                        "Could not remove partial archive {}: {}",
                        job.archive_path.display(),
                        e
                    );
                }
                record_failure(&mut summary, reporter, bucket, err.to_string());
            }
        }
        summary.jobs.push(job);
    }

    let duration = start.elapsed();
    reporter.on_archive_complete(
        summary.archived.len(),
        summary.failed.len(),
        duration.as_secs_f64(),
    );
    info!(
        "Archived {} of {} buckets in {:.2}s ({} failed)",
        summary.archived.len(),
        total,
        duration.as_secs_f64(),
        summary.failed.len()
    );
    Ok(summary)
}

fn remove_stale_archive(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed existing archive {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn record_failure(
    summary: &mut ArchiveSummary,
    reporter: &dyn ProgressReporter,
    bucket: &Path,
    reason: String,
) {
    warn!("Skipping bucket {}: {}", bucket.display(), reason);
    reporter.on_bucket_failed(bucket, &reason);
    summary.failed.push(BucketFailure {
        bucket: bucket.to_path_buf(),
        reason,
    });
}
