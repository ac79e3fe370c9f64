use rusqlite::{params, Connection, OptionalExtension};

use super::{Record, Storage, Table};
use crate::error::Result;

// Rowid tables so that `ORDER BY rowid` yields first-insertion order and
// upserts keep their first position.
const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id TEXT PRIMARY KEY NOT NULL,
    body BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY NOT NULL,
    body BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY NOT NULL,
    body BLOB NOT NULL
);

PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#;

pub struct SqliteStorage {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch(INIT_SQL)?;
        Ok(Self { conn, in_transaction: false })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn upsert(conn: &Connection, table: Table, record: &Record) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, body) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            table.name()
        );
        conn.execute(&sql, params![record.id, record.body])?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn get_all(&self, table: Table) -> Result<Vec<Record>> {
        let sql = format!("SELECT id, body FROM {} ORDER BY rowid", table.name());
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| Ok(Record { id: row.get(0)?, body: row.get(1)? }))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn get(&self, table: Table, id: &str) -> Result<Option<Record>> {
        let sql = format!("SELECT id, body FROM {} WHERE id = ?1", table.name());
        let record = self
            .conn
            .query_row(&sql, params![id], |row| {
                Ok(Record { id: row.get(0)?, body: row.get(1)? })
            })
            .optional()?;
        Ok(record)
    }

    fn put(&mut self, table: Table, record: Record) -> Result<()> {
        Self::upsert(&self.conn, table, &record)
    }

    fn put_all(&mut self, table: Table, records: Vec<Record>) -> Result<()> {
        if self.in_transaction {
            for record in &records {
                Self::upsert(&self.conn, table, record)?;
            }
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        for record in &records {
            Self::upsert(&tx, table, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&mut self, table: Table, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table.name());
        self.conn.execute(&sql, params![id])?;
        Ok(())
    }

    fn clear(&mut self, table: Table) -> Result<()> {
        self.conn.execute(&format!("DELETE FROM {}", table.name()), [])?;
        Ok(())
    }

    fn len(&self, table: Table) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn begin_transaction(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.execute("BEGIN", [])?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute("COMMIT", [])?;
            self.in_transaction = false;
        }
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute("ROLLBACK", [])?;
            self.in_transaction = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, body: &str) -> Record {
        Record::new(id, body.as_bytes().to_vec())
    }

    #[test]
    fn test_basic_operations() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();

        storage.put(Table::Players, record("p1", r#"{"name":"Alice"}"#)).unwrap();
        storage.put(Table::Players, record("p2", r#"{"name":"Bob"}"#)).unwrap();

        let found = storage.get(Table::Players, "p1").unwrap().unwrap();
        assert_eq!(found.body, br#"{"name":"Alice"}"#);
        assert_eq!(storage.len(Table::Players).unwrap(), 2);
        assert_eq!(storage.len(Table::Sessions).unwrap(), 0);

        storage.delete(Table::Players, "p1").unwrap();
        assert!(storage.get(Table::Players, "p1").unwrap().is_none());
    }

    #[test]
    fn test_upsert_keeps_insertion_order() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .put_all(Table::Categories, vec![record("z", "1"), record("a", "2")])
            .unwrap();
        storage.put(Table::Categories, record("z", "3")).unwrap();

        let all = storage.get_all(Table::Categories).unwrap();
        assert_eq!(all, vec![record("z", "3"), record("a", "2")]);
    }

    #[test]
    fn test_rollback_discards_clear() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.put(Table::Sessions, record("s1", "{}")).unwrap();

        storage.begin_transaction().unwrap();
        storage.clear(Table::Sessions).unwrap();
        storage.put_all(Table::Sessions, vec![record("s2", "{}")]).unwrap();
        storage.rollback_transaction().unwrap();

        let ids: Vec<_> = storage
            .get_all(Table::Sessions)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["s1".to_string()]);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.db");
        let path = path.to_str().unwrap();

        {
            let mut storage = SqliteStorage::open(path).unwrap();
            storage.put(Table::Players, record("p1", "{}")).unwrap();
        }

        let storage = SqliteStorage::open(path).unwrap();
        assert!(!storage.is_empty().unwrap());
        assert!(storage.get(Table::Players, "p1").unwrap().is_some());
    }
}
