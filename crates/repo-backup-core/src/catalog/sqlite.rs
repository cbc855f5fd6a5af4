use super::{NodeCatalog, NodeRef};
use crate::error::{Error, Result};
use crate::selection::NodeQuery;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

const NODE_COLUMNS: &str = "id, uuid, ctime, mtime";

pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open an existing catalog read-only. This is the per-run backend
    /// initialisation; pair it with [`SqliteCatalog::close`].
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Configuration(format!(
                "node catalog {} does not exist",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        debug!("Opened node catalog {} read-only", path.display());
        Ok(Self { conn })
    }

    /// Open or create a writable catalog and make sure the schema exists.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let catalog = Self { conn };
        catalog.migrate_schema()?;
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self { conn };
        catalog.migrate_schema()?;
        Ok(catalog)
    }

    fn migrate_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("Node catalog schema initialized (version 1)");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Register a node. Returns the row id.
    pub fn insert_node(
        &self,
        uuid: &Uuid,
        ctime: DateTime<Utc>,
        mtime: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO db_dbnode (uuid, ctime, mtime) VALUES (?1, ?2, ?3)",
            params![
                uuid.hyphenated().to_string(),
                ctime.timestamp_micros(),
                mtime.timestamp_micros()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_nodes(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM db_dbnode", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Release the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Catalog(e))?;
        debug!("Node catalog closed");
        Ok(())
    }
}

impl NodeCatalog for SqliteCatalog {
    fn nodes(&self, query: &NodeQuery) -> Result<Vec<NodeRef>> {
        let nodes = match query {
            NodeQuery::All => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM db_dbnode ORDER BY id",
                    NODE_COLUMNS
                ))?;
                let rows = stmt.query_map([], node_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            NodeQuery::IdIn(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM db_dbnode WHERE id IN ({}) ORDER BY id",
                    NODE_COLUMNS, placeholders
                ))?;
                let rows = stmt.query_map(params_from_iter(ids.iter()), node_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            NodeQuery::DateSince { field, bound } => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM db_dbnode WHERE {} >= ?1 ORDER BY id",
                    NODE_COLUMNS,
                    field.column()
                ))?;
                let rows = stmt.query_map(params![bound.timestamp_micros()], node_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        debug!("Catalog returned {} nodes for {:?}", nodes.len(), query);
        Ok(nodes)
    }
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<NodeRef> {
    let uuid_text: String = row.get(1)?;
    let uuid = Uuid::parse_str(&uuid_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(NodeRef {
        id: row.get(0)?,
        uuid,
        ctime: micros_to_datetime(row.get(2)?, 2)?,
        mtime: micros_to_datetime(row.get(3)?, 3)?,
    })
}

fn micros_to_datetime(micros: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        column, micros,
    ))
}
