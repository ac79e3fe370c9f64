#[cfg(feature = "sqlite")]
mod sqlite;
mod memory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
pub use memory::MemoryStorage;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The durable tables. Sessions hold their games and point updates inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Players,
    Categories,
    Sessions,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Players, Table::Categories, Table::Sessions];

    pub fn name(self) -> &'static str {
        match self {
            Table::Players => "players",
            Table::Categories => "categories",
            Table::Sessions => "sessions",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "players" => Ok(Table::Players),
            "categories" => Ok(Table::Categories),
            "sessions" => Ok(Table::Sessions),
            other => Err(Error::invalid_format(format!("unknown table '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub body: Vec<u8>,
}

impl Record {
    pub fn new(id: impl Into<String>, body: Vec<u8>) -> Self {
        Self { id: id.into(), body }
    }
}

/// Flat key/value tables. `get_all` returns records in first-insertion order;
/// re-putting an existing id keeps its position.
pub trait Storage {
    fn get_all(&self, table: Table) -> Result<Vec<Record>>;
    fn get(&self, table: Table, id: &str) -> Result<Option<Record>>;
    fn put(&mut self, table: Table, record: Record) -> Result<()>;
    /// Upserts every record or none of them.
    fn put_all(&mut self, table: Table, records: Vec<Record>) -> Result<()>;
    fn delete(&mut self, table: Table, id: &str) -> Result<()>;
    fn clear(&mut self, table: Table) -> Result<()>;
    fn len(&self, table: Table) -> Result<usize>;

    fn begin_transaction(&mut self) -> Result<()>;
    fn commit_transaction(&mut self) -> Result<()>;
    fn rollback_transaction(&mut self) -> Result<()>;

    fn is_empty(&self) -> Result<bool> {
        for table in Table::ALL {
            if self.len(table)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
