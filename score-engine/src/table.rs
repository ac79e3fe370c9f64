use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::model::{Category, Player, Session};
use crate::storage::{Record, Storage, Table};
#[cfg(feature = "sqlite")]
use crate::storage::SqliteStorage;

/// A record type that lives in one durable table, keyed by its id.
pub trait TableRecord: Serialize + DeserializeOwned {
    const TABLE: Table;

    fn key(&self) -> &str;
}

impl TableRecord for Player {
    const TABLE: Table = Table::Players;

    fn key(&self) -> &str {
        &self.id
    }
}

impl TableRecord for Category {
    const TABLE: Table = Table::Categories;

    fn key(&self) -> &str {
        &self.id
    }
}

impl TableRecord for Session {
    const TABLE: Table = Table::Sessions;

    fn key(&self) -> &str {
        &self.id
    }
}

fn encode<T: TableRecord>(value: &T) -> Result<Record> {
    Ok(Record::new(value.key(), serde_json::to_vec(value)?))
}

fn decode<T: TableRecord>(record: &Record) -> Result<T> {
    Ok(serde_json::from_slice(&record.body)?)
}

/// Typed access to the durable tables. Record bodies are JSON.
#[cfg(feature = "sqlite")]
pub struct TableStore<S: Storage = SqliteStorage> {
    storage: S,
}

#[cfg(not(feature = "sqlite"))]
pub struct TableStore<S: Storage> {
    storage: S,
}

#[cfg(feature = "sqlite")]
impl TableStore<SqliteStorage> {
    pub fn open(path: &str) -> Result<Self> {
        let storage = SqliteStorage::open(path)?;
        Ok(Self { storage })
    }

    pub fn open_in_memory() -> Result<Self> {
        let storage = SqliteStorage::open_in_memory()?;
        Ok(Self { storage })
    }
}

impl<S: Storage> TableStore<S> {
    pub fn with_storage(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn load<T: TableRecord>(&self) -> Result<Vec<T>> {
        self.storage
            .get_all(T::TABLE)?
            .iter()
            .map(decode)
            .collect()
    }

    pub fn get<T: TableRecord>(&self, id: &str) -> Result<Option<T>> {
        self.storage
            .get(T::TABLE, id)?
            .map(|record| decode(&record))
            .transpose()
    }

    pub fn save<T: TableRecord>(&mut self, value: &T) -> Result<()> {
        let record = encode(value)?;
        self.storage.put(T::TABLE, record)
    }

    pub fn save_all<T: TableRecord>(&mut self, values: &[T]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let records = values.iter().map(encode).collect::<Result<Vec<_>>>()?;
        self.storage.put_all(T::TABLE, records)
    }

    pub fn delete(&mut self, table: Table, id: &str) -> Result<()> {
        self.storage.delete(table, id)
    }

    pub fn len(&self, table: Table) -> Result<usize> {
        self.storage.len(table)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.storage.is_empty()
    }

    /// Runs `f` inside one storage transaction; any error rolls back every
    /// write made by `f`.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.storage.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.storage.commit_transaction()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.storage.rollback_transaction() {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Clears all three tables and writes the given records, all-or-nothing.
    pub fn replace_all(
        &mut self,
        players: &[Player],
        categories: &[Category],
        sessions: &[Session],
    ) -> Result<()> {
        // Encode first so that a serialisation failure never clears anything.
        let players = players.iter().map(encode).collect::<Result<Vec<_>>>()?;
        let categories = categories.iter().map(encode).collect::<Result<Vec<_>>>()?;
        let sessions = sessions.iter().map(encode).collect::<Result<Vec<_>>>()?;

        self.transaction(|tables| {
            for table in Table::ALL {
                tables.storage.clear(table)?;
            }
            tables.storage.put_all(Table::Players, players)?;
            tables.storage.put_all(Table::Categories, categories)?;
            tables.storage.put_all(Table::Sessions, sessions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn player(id: &str, name: &str) -> Player {
        Player { id: id.into(), name: name.into(), color: "#ef4444".into(), avatar_image: None }
    }

    #[test]
    fn test_save_and_load_typed_records() {
        let mut tables = TableStore::open_in_memory().unwrap();
        tables.save(&player("p1", "Alice")).unwrap();
        tables.save_all(&[player("p2", "Bob"), player("p3", "Carol")]).unwrap();

        let players: Vec<Player> = tables.load().unwrap();
        assert_eq!(players.len(), 3);
        assert_eq!(players[0].name, "Alice");

        let bob: Option<Player> = tables.get("p2").unwrap();
        assert_eq!(bob.unwrap().name, "Bob");
        assert!(tables.get::<Player>("p9").unwrap().is_none());
    }

    #[test]
    fn test_replace_all_swaps_contents() {
        let mut tables = TableStore::with_storage(MemoryStorage::new());
        tables.save(&player("old", "Old")).unwrap();
        tables.save(&Category { id: "c1".into(), name: "Quiz".into() }).unwrap();

        tables.replace_all(&[player("new", "New")], &[], &[]).unwrap();

        let players: Vec<Player> = tables.load().unwrap();
        assert_eq!(players, vec![player("new", "New")]);
        assert_eq!(tables.len(Table::Categories).unwrap(), 0);
    }

    #[test]
    fn test_replace_all_failure_keeps_previous_contents() {
        let mut tables = TableStore::with_storage(MemoryStorage::new());
        tables.save(&player("old", "Old")).unwrap();
        tables.storage_mut().set_fail_writes(true);

        assert!(tables.replace_all(&[player("new", "New")], &[], &[]).is_err());

        tables.storage_mut().set_fail_writes(false);
        let players: Vec<Player> = tables.load().unwrap();
        assert_eq!(players, vec![player("old", "Old")]);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut tables = TableStore::open_in_memory().unwrap();
        let result: Result<()> = tables.transaction(|tx| {
            tx.save(&player("p1", "Alice"))?;
            Err(crate::error::Error::Storage("disk full".into()))
        });

        assert!(result.is_err());
        assert_eq!(tables.len(Table::Players).unwrap(), 0);
    }
}
