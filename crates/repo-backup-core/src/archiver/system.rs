use super::{ArchiveJob, Archiver};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::trace;

/// Runs the external `tar` program and waits for it. A non-zero exit status
/// is reported as an error for the bucket, with tar's stderr attached.
#[derive(Debug, Clone)]
pub struct SystemTar {
    program: PathBuf,
}

impl Default for SystemTar {
    fn default() -> Self {
        Self::new("tar")
    }
}

impl SystemTar {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, job: &ArchiveJob, excludes: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("cf").arg(&job.archive_path);
        // Exclusions must precede the member list for GNU tar to honour them.
        for pattern in excludes {
            cmd.arg(format!("--exclude={}", pattern));
        }
        cmd.arg("-C").arg(&job.base_dir).arg(&job.member);
        cmd
    }
}

impl Archiver for SystemTar {
    fn create(&self, job: &ArchiveJob, excludes: &[String]) -> Result<()> {
        let mut cmd = self.command(job, excludes);
        trace!("Spawning {:?}", cmd);
        let output = cmd.output().map_err(|e| Error::ArchiverInvocation {
            bucket: job.bucket.clone(),
            message: format!("failed to run {}: {}", self.program.display(), e),
        })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::ArchiverInvocation {
            bucket: job.bucket.clone(),
            message: format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            ),
        })
    }

    fn describe(&self, job: &ArchiveJob, excludes: &[String]) -> String {
        let mut line = format!(
            "{} cf {}",
            self.program.display(),
            job.archive_path.display()
        );
        for pattern in excludes {
            line.push_str(&format!(" --exclude=\"{}\"", pattern));
        }
        line.push_str(&format!(
            " -C {} {}",
            job.base_dir.display(),
            job.member.to_string_lossy()
        ));
        line
    }
}
