use crate::error::{Error, Result};
use crate::marker;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Node timestamp a time-windowed selection compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Modification,
    Creation,
}

impl DateField {
    /// Catalog column holding this timestamp.
    pub fn column(&self) -> &'static str {
        match self {
            DateField::Modification => "mtime",
            DateField::Creation => "ctime",
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateField::Modification => write!(f, "modification"),
            DateField::Creation => write!(f, "creation"),
        }
    }
}

/// Which nodes a run backs up. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Full,
    ByIds(BTreeSet<i64>),
    ByPastDays { days: i64, field: DateField },
    ByTimestampFile { path: PathBuf, field: DateField },
}

impl Selection {
    /// Marker file to append to once the run finishes, if any.
    pub fn marker_file(&self) -> Option<&PathBuf> {
        match self {
            Selection::ByTimestampFile { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Raw selection flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SelectionArgs {
    pub full: bool,
    pub node_ids: Vec<i64>,
    pub past_days: Option<i64>,
    pub timestamp_file: Option<PathBuf>,
    pub mtime: bool,
    pub ctime: bool,
}

impl SelectionArgs {
    /// Validate that exactly one selection mode is chosen and that a date
    /// field accompanies the time-windowed modes.
    pub fn into_selection(self) -> Result<Selection> {
        let mut chosen = Vec::new();
        if self.full {
            chosen.push("--full");
        }
        if !self.node_ids.is_empty() {
            chosen.push("--node-ids");
        }
        if self.past_days.is_some() {
            chosen.push("--past-days");
        }
        if self.timestamp_file.is_some() {
            chosen.push("--timestamp");
        }
        match chosen.len() {
            0 => {
                return Err(Error::Configuration(
                    "choose one of --full, --node-ids, --past-days or --timestamp".to_string(),
                ))
            }
            1 => {}
            _ => {
                return Err(Error::Configuration(format!(
                    "only one selection mode may be used, got {}",
                    chosen.join(", ")
                )))
            }
        }

        let field = match (self.mtime, self.ctime) {
            (true, true) => {
                return Err(Error::Configuration(
                    "--mtime and --ctime are mutually exclusive".to_string(),
                ))
            }
            (true, false) => Some(DateField::Modification),
            (false, true) => Some(DateField::Creation),
            (false, false) => None,
        };

        if self.full {
            return Ok(Selection::Full);
        }
        if !self.node_ids.is_empty() {
            return Ok(Selection::ByIds(self.node_ids.into_iter().collect()));
        }

        let field = field.ok_or_else(|| {
            Error::Configuration(
                "pass either --ctime or --mtime when selecting nodes by date".to_string(),
            )
        })?;
        match (self.past_days, self.timestamp_file) {
            (Some(days), _) if days < 1 => Err(Error::Configuration(format!(
                "past days has to be at least one, got {}",
                days
            ))),
            (Some(days), _) => Ok(Selection::ByPastDays { days, field }),
            (None, Some(path)) => Ok(Selection::ByTimestampFile { path, field }),
            (None, None) => Err(Error::Configuration("no selection mode chosen".to_string())),
        }
    }
}

/// Abstract catalog query produced from a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeQuery {
    All,
    IdIn(BTreeSet<i64>),
    DateSince {
        field: DateField,
        bound: DateTime<Utc>,
    },
}

/// Translate a selection into a catalog query. `now` is the run's capture
/// time; time windows are computed against it.
pub fn select(selection: &Selection, now: DateTime<Utc>) -> Result<NodeQuery> {
    let query = match selection {
        Selection::Full => NodeQuery::All,
        Selection::ByIds(ids) => NodeQuery::IdIn(ids.clone()),
        Selection::ByPastDays { days, field } => {
            if *days < 1 {
                return Err(Error::Configuration(format!(
                    "past days has to be at least one, got {}",
                    days
                )));
            }
            let bound = TimeDelta::try_days(*days)
                .and_then(|window| now.checked_sub_signed(window))
                .ok_or_else(|| {
                    Error::Configuration(format!("past days value {} is too large", days))
                })?;
            NodeQuery::DateSince {
                field: *field,
                bound,
            }
        }
        Selection::ByTimestampFile { path, field } => NodeQuery::DateSince {
            field: *field,
            bound: marker::read_lower_bound(path)?,
        },
    };
    debug!("Selection {:?} -> query {:?}", selection, query);
    Ok(query)
}
