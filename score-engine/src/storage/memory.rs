use std::collections::HashMap;

use indexmap::IndexMap;

use super::{Record, Storage, Table};
use crate::error::{Error, Result};

type Rows = IndexMap<String, Vec<u8>>;

/// Volatile backend with the same contract as [`super::SqliteStorage`].
pub struct MemoryStorage {
    tables: HashMap<Table, Rows>,
    checkpoint: Option<HashMap<Table, Rows>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            checkpoint: None,
            fail_writes: false,
        }
    }

    /// Makes every subsequent write fail with [`Error::Storage`].
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn rows(&self, table: Table) -> Option<&Rows> {
        self.tables.get(&table)
    }

    fn rows_mut(&mut self, table: Table) -> Result<&mut Rows> {
        if self.fail_writes {
            return Err(Error::Storage(format!("write to {} rejected", table)));
        }
        Ok(self.tables.entry(table).or_default())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get_all(&self, table: Table) -> Result<Vec<Record>> {
        Ok(self
            .rows(table)
            .map(|rows| {
                rows.iter()
                    .map(|(id, body)| Record::new(id.clone(), body.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get(&self, table: Table, id: &str) -> Result<Option<Record>> {
        Ok(self
            .rows(table)
            .and_then(|rows| rows.get(id))
            .map(|body| Record::new(id, body.clone())))
    }

    fn put(&mut self, table: Table, record: Record) -> Result<()> {
        self.rows_mut(table)?.insert(record.id, record.body);
        Ok(())
    }

    fn put_all(&mut self, table: Table, records: Vec<Record>) -> Result<()> {
        let rows = self.rows_mut(table)?;
        for record in records {
            rows.insert(record.id, record.body);
        }
        Ok(())
    }

    fn delete(&mut self, table: Table, id: &str) -> Result<()> {
        self.rows_mut(table)?.shift_remove(id);
        Ok(())
    }

    fn clear(&mut self, table: Table) -> Result<()> {
        self.rows_mut(table)?.clear();
        Ok(())
    }

    fn len(&self, table: Table) -> Result<usize> {
        Ok(self.rows(table).map_or(0, |rows| rows.len()))
    }

    fn begin_transaction(&mut self) -> Result<()> {
        if self.checkpoint.is_none() {
            self.checkpoint = Some(self.tables.clone());
        }
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        self.checkpoint = None;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        if let Some(tables) = self.checkpoint.take() {
            self.tables = tables;
        }
        Ok(())
    }
}
