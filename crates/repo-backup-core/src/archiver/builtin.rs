use super::{ArchiveJob, Archiver, ExcludeSet};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// In-process tar writer. Produces an uncompressed archive with the same
/// member layout as `tar cf <archive> -C <base> <member>`, entries in name
/// order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTar;

impl Archiver for BuiltinTar {
    fn create(&self, job: &ArchiveJob, excludes: &[String]) -> Result<()> {
        let failed = |message: String| Error::ArchiverInvocation {
            bucket: job.bucket.clone(),
            message,
        };
        let excludes = ExcludeSet::new(excludes);
        let member_root = PathBuf::from(&job.member);

        let file = File::create(&job.archive_path)
            .map_err(|e| Error::filesystem(&job.archive_path, e))?;
        let mut builder = tar::Builder::new(BufWriter::new(file));
        builder.follow_symlinks(false);

        let walker = WalkDir::new(&job.bucket)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = member_name(&member_root, &job.bucket, entry.path());
                !excludes.is_excluded(&name)
            });

        for entry in walker {
            let entry = entry.map_err(|e| failed(format!("walking bucket: {}", e)))?;
            let name = member_name(&member_root, &job.bucket, entry.path());
            trace!("Adding {}", name.display());
            let added = if entry.file_type().is_dir() {
                builder.append_dir(&name, entry.path())
            } else {
                builder.append_path_with_name(entry.path(), &name)
            };
            added.map_err(|e| failed(format!("adding {}: {}", entry.path().display(), e)))?;
        }

        let mut writer = builder
            .into_inner()
            .map_err(|e| failed(format!("finishing archive: {}", e)))?;
        writer
            .flush()
            .map_err(|e| Error::filesystem(&job.archive_path, e))?;
        Ok(())
    }

    fn describe(&self, job: &ArchiveJob, excludes: &[String]) -> String {
        format!(
            "builtin tar {} <- {} (excluding {:?})",
            job.archive_path.display(),
            job.bucket.display(),
            excludes
        )
    }
}

/// Archive member name for a path inside the bucket.
fn member_name(member_root: &Path, bucket: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(bucket) {
        Ok(rel) if !rel.as_os_str().is_empty() => member_root.join(rel),
        _ => member_root.to_path_buf(),
    }
}
