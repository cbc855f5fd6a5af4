use clap::{Parser, ValueEnum};
use repo_backup_core::config::ArchiverKind;
use repo_backup_core::SelectionArgs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "repo-backup")]
#[command(
    about = "Incremental tar backup of a repository's node folders",
    long_about = "Archives the two-level bucketed node folders of a file repository into \
                  one tar file per bucket under LOCATION. Nodes are selected from the node \
                  catalog by id, by age, from a timestamp marker file, or all at once.",
    after_help = "EXAMPLES:\n    \
        repo-backup /mnt/backup --full\n    \
        repo-backup /mnt/backup -n 12 13 14\n    \
        repo-backup /mnt/backup -p 7 --mtime --ignore-files '*.pyc'\n    \
        repo-backup /mnt/backup -t last_backup.txt --ctime --dry-run -v 2"
)]
pub struct Cli {
    /// Location for the backup
    #[arg(value_name = "LOCATION")]
    pub location: PathBuf,

    /// Names of files to ignore (tar --exclude patterns)
    #[arg(long, num_args = 1.., value_name = "PATTERN")]
    pub ignore_files: Vec<String>,

    /// Perform a dry run: no directories, archives or marker updates
    #[arg(long)]
    pub dry_run: bool,

    /// Set verbosity level (0 quiet, 1 normal, 2+ shows archiver commands)
    #[arg(short, long, default_value_t = 1)]
    pub verbosity: u8,

    /// Specific node ids to back up
    #[arg(short, long, num_args = 1.., value_name = "ID")]
    pub node_ids: Vec<i64>,

    /// Back up nodes from the last N days
    #[arg(short, long, value_name = "DAYS", allow_negative_numbers = true)]
    pub past_days: Option<i64>,

    /// Back up everything
    #[arg(short, long)]
    pub full: bool,

    /// Back up everything stored after the time in this marker file
    #[arg(short, long, value_name = "FILE")]
    pub timestamp: Option<PathBuf>,

    /// Select by modification date (with --past-days or --timestamp)
    #[arg(short, long)]
    pub mtime: bool,

    /// Select by creation date (with --past-days or --timestamp)
    #[arg(short, long)]
    pub ctime: bool,

    /// Repository directory containing the node/ section (overrides config)
    #[arg(long, value_name = "DIR")]
    pub repository: Option<PathBuf>,

    /// Node catalog database (overrides config)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Archiver implementation (overrides config)
    #[arg(long, value_enum)]
    pub archiver: Option<ArchiverArg>,

    /// Do not take the advisory lock on the destination
    #[arg(long)]
    pub no_lock: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ArchiverArg {
    /// External tar program
    System,
    /// In-process tar writer
    Builtin,
}

impl From<ArchiverArg> for ArchiverKind {
    fn from(arg: ArchiverArg) -> Self {
        match arg {
            ArchiverArg::System => ArchiverKind::System,
            ArchiverArg::Builtin => ArchiverKind::Builtin,
        }
    }
}

impl Cli {
    pub fn selection_args(&self) -> SelectionArgs {
        SelectionArgs {
            full: self.full,
            node_ids: self.node_ids.clone(),
            past_days: self.past_days,
            timestamp_file: self.timestamp.clone(),
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }
}
