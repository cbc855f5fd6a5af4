pub mod sqlite;

pub use sqlite::SqliteCatalog;

use crate::error::Result;
use crate::selection::NodeQuery;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A node as reported by the catalog. Never mutated by a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: i64,
    pub uuid: Uuid,
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
}

/// Source of nodes matching a query. Result order is not significant.
pub trait NodeCatalog {
    fn nodes(&self, query: &NodeQuery) -> Result<Vec<NodeRef>>;
}
