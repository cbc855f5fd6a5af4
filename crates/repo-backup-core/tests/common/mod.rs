#![allow(dead_code)]

use chrono::{DateTime, Utc};
use repo_backup_core::archiver::{ArchiveJob, Archiver, BuiltinTar};
use repo_backup_core::catalog::{NodeCatalog, NodeRef};
use repo_backup_core::error::{Error, Result};
use repo_backup_core::layout::RepositoryLayout;
use repo_backup_core::NodeQuery;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const UUID_A: &str = "2464fd5a-749e-4572-b390-53efb766256a";
pub const UUID_B: &str = "2464b0b0-1111-4572-b390-53efb766256a";
pub const UUID_C: &str = "3102c0c0-2222-4572-b390-53efb766256a";

pub fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap()
}

pub fn node(id: i64, uuid: &str, ctime: i64, mtime: i64) -> NodeRef {
    NodeRef {
        id,
        uuid: Uuid::parse_str(uuid).unwrap(),
        ctime: at(ctime),
        mtime: at(mtime),
    }
}

/// Catalog returning a fixed node list for every query, counting calls.
pub struct FixedCatalog {
    pub nodes: Vec<NodeRef>,
    pub calls: Cell<usize>,
}

impl FixedCatalog {
    pub fn new(nodes: Vec<NodeRef>) -> Self {
        Self {
            nodes,
            calls: Cell::new(0),
        }
    }
}

impl NodeCatalog for FixedCatalog {
    fn nodes(&self, _query: &NodeQuery) -> Result<Vec<NodeRef>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.nodes.clone())
    }
}

/// Builtin archiver that records every job it is asked to run and can be
/// told to fail for one bucket.
#[derive(Default)]
pub struct RecordingArchiver {
    pub jobs: RefCell<Vec<PathBuf>>,
    pub fail_bucket: Option<PathBuf>,
}

impl Archiver for RecordingArchiver {
    fn create(&self, job: &ArchiveJob, excludes: &[String]) -> Result<()> {
        self.jobs.borrow_mut().push(job.bucket.clone());
        if self.fail_bucket.as_deref() == Some(job.bucket.as_path()) {
            // Leave a partial file behind like a crashed tar would.
            fs::write(&job.archive_path, b"partial").unwrap();
            return Err(Error::ArchiverInvocation {
                bucket: job.bucket.clone(),
                message: "simulated failure".to_string(),
            });
        }
        BuiltinTar.create(job, excludes)
    }

    fn describe(&self, job: &ArchiveJob, excludes: &[String]) -> String {
        BuiltinTar.describe(job, excludes)
    }
}

/// Create the leaf folder of each node with a couple of files in it.
pub fn populate_repository(layout: &RepositoryLayout, nodes: &[NodeRef]) {
    for node in nodes {
        let folder = layout.node_folder(&node.uuid);
        fs::create_dir_all(folder.join("path")).unwrap();
        fs::create_dir_all(folder.join("raw_input")).unwrap();
        fs::write(folder.join("path").join("aiida.out"), format!("node {}", node.id)).unwrap();
        fs::write(folder.join("path").join("cache.pyc"), b"\x00\x01").unwrap();
        fs::write(folder.join("raw_input").join("aiida.in"), "&control /").unwrap();
    }
}

/// Sorted member names of a tar file, without trailing slashes.
pub fn tar_members(archive: &Path) -> Vec<String> {
    let file = fs::File::open(archive).unwrap();
    let mut archive = tar::Archive::new(file);
    let mut members: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            path.trim_end_matches('/').to_string()
        })
        .collect();
    members.sort();
    members
}

/// Every file under `dir`, relative, sorted.
pub fn list_tree(dir: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().path().strip_prefix(dir).unwrap().to_path_buf())
        .collect();
    out.sort();
    out
}

pub fn system_tar_available() -> bool {
    std::process::Command::new("tar")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
