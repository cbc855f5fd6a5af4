pub mod archiver;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod marker;
pub mod progress;
pub mod resolver;
pub mod selection;

pub use config::AppConfig;
pub use engine::{BackupEngine, BackupRequest, BackupResult};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use selection::{DateField, NodeQuery, Selection, SelectionArgs};
