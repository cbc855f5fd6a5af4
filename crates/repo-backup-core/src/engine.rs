use crate::archiver::{self, ArchiveOptions, ArchiveSummary, Archiver, SystemTar};
use crate::catalog::NodeCatalog;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::layout::RepositoryLayout;
use crate::marker;
use crate::progress::ProgressReporter;
use crate::resolver;
use crate::selection::{self, NodeQuery, Selection};
use chrono::{DateTime, SubsecRound, Utc};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One backup run's inputs.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub selection: Selection,
    pub destination: PathBuf,
    pub exclude_patterns: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct BackupResult {
    pub captured_at: DateTime<Utc>,
    pub query: NodeQuery,
    pub nodes_visited: usize,
    pub buckets: Vec<PathBuf>,
    pub summary: ArchiveSummary,
    pub marker_recorded: bool,
    pub resolve_duration: Duration,
    pub archive_duration: Duration,
}

pub struct BackupEngine {
    layout: RepositoryLayout,
    archiver: Box<dyn Archiver>,
    lock_destination: bool,
}

impl BackupEngine {
    pub fn new(layout: RepositoryLayout) -> Self {
        Self {
            layout,
            archiver: Box::new(SystemTar::default()),
            lock_destination: true,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let root = config.repository_path.as_ref().ok_or_else(|| {
            Error::Configuration(
                "repository_path is not set (Config.toml, REPO_BACKUP_REPOSITORY_PATH or --repository)"
                    .to_string(),
            )
        })?;
        Ok(Self::new(RepositoryLayout::new(root))
            .with_archiver(archiver::archiver_for(config))
            .with_destination_lock(config.lock_destination))
    }

    pub fn with_archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    pub fn with_destination_lock(mut self, enabled: bool) -> Self {
        self.lock_destination = enabled;
        self
    }

    pub fn layout(&self) -> &RepositoryLayout {
        &self.layout
    }

    /// Run a backup with the current time as the capture time.
    pub fn run(
        &self,
        catalog: &dyn NodeCatalog,
        request: &BackupRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<BackupResult> {
        self.run_at(Utc::now(), catalog, request, reporter)
    }

    /// Run the full pipeline:
    /// 1. Build the catalog query from the selection, relative to `now`
    /// 2. Resolve matching nodes to sorted, unique bucket directories
    /// 3. Archive each bucket under the destination
    /// 4. Append `now` to the marker file for timestamp-driven runs
    ///
    /// `now` is captured before the query runs, so nodes written during the
    /// run fall inside the next run's window.
    pub fn run_at(
        &self,
        now: DateTime<Utc>,
        catalog: &dyn NodeCatalog,
        request: &BackupRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<BackupResult> {
        let captured_at = now.trunc_subsecs(6);
        let query = selection::select(&request.selection, captured_at)?;

        // Phase 1: Resolve
        reporter.on_resolve_start();
        let resolve_start = Instant::now();
        let resolved = resolver::resolve(catalog, &self.layout, &query)?;
        let resolve_duration = resolve_start.elapsed();
        reporter.on_resolve_complete(
            resolved.nodes_visited,
            resolved.buckets.len(),
            resolve_duration.as_secs_f64(),
        );
        debug!(
            "Resolve completed in {:.2}s: {} nodes, {} buckets",
            resolve_duration.as_secs_f64(),
            resolved.nodes_visited,
            resolved.buckets.len(),
        );

        // Phase 2: Archive
        let archive_start = Instant::now();
        let options = ArchiveOptions {
            destination_root: &request.destination,
            exclude_patterns: &request.exclude_patterns,
            dry_run: request.dry_run,
            lock_destination: self.lock_destination,
        };
        let summary =
            archiver::archive_buckets(&resolved.buckets, &options, self.archiver.as_ref(), reporter)?;
        let archive_duration = archive_start.elapsed();

        // Phase 3: Record
        let marker_recorded = match request.selection.marker_file() {
            Some(path) if request.dry_run => {
                info!("Dry run: not updating {}", path.display());
                false
            }
            Some(path) if !summary.is_clean() => {
                warn!(
                    "{} buckets failed; not updating {} so the next run covers them again",
                    summary.failed.len(),
                    path.display()
                );
                false
            }
            Some(path) => {
                marker::record(path, captured_at)?;
                true
            }
            None => false,
        };

        Ok(BackupResult {
            captured_at,
            query,
            nodes_visited: resolved.nodes_visited,
            buckets: resolved.buckets,
            summary,
            marker_recorded,
            resolve_duration,
            archive_duration,
        })
    }
}
