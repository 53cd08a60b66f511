//! SQLite-backed store

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, eyre};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::record::{Filter, IndexValue, Record};

const DB_FILE: &str = "taskstore.db";

/// Persistent record store
///
/// Records keep their insertion order: `list` returns them in the order they
/// were first created, regardless of later updates.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a store in `dir`
    pub fn open(dir: impl AsRef<Path>) -> eyre::Result<Self> {
        let dir = dir.as_ref();
        debug!(dir = %dir.display(), "Store::open: called");
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create store dir {}", dir.display()))?;

        let db_path = dir.join(DB_FILE);
        let conn = Connection::open(&db_path).with_context(|| format!("Failed to open {}", db_path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        install_schema(&conn)?;

        info!(path = %db_path.display(), "Store opened");
        Ok(Self {
            conn,
            path: Some(db_path),
        })
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> eyre::Result<Self> {
        debug!("Store::open_in_memory: called");
        let conn = Connection::open_in_memory()?;
        install_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert a new record, failing if the id is already taken
    pub fn create<T: Record>(&mut self, record: T) -> eyre::Result<String> {
        debug!(collection = T::collection_name(), id = %record.id(), "Store::create: called");
        let tx = self.conn.transaction()?;
        insert_record(&tx, &record)?;
        tx.commit()?;
        Ok(record.id().to_string())
    }

    /// Fetch a record by id
    pub fn get<T: Record>(&self, id: &str) -> eyre::Result<Option<T>> {
        debug!(collection = T::collection_name(), %id, "Store::get: called");
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![T::collection_name(), id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Replace an existing record
    pub fn update<T: Record>(&mut self, record: T) -> eyre::Result<()> {
        debug!(collection = T::collection_name(), id = %record.id(), "Store::update: called");
        let tx = self.conn.transaction()?;
        update_record(&tx, &record)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a record
    pub fn upsert<T: Record>(&mut self, record: T) -> eyre::Result<()> {
        debug!(collection = T::collection_name(), id = %record.id(), "Store::upsert: called");
        let tx = self.conn.transaction()?;
        upsert_record(&tx, &record)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a record, returning whether it existed
    pub fn delete<T: Record>(&mut self, id: &str) -> eyre::Result<bool> {
        debug!(collection = T::collection_name(), %id, "Store::delete: called");
        let tx = self.conn.transaction()?;
        let existed = delete_record::<T>(&tx, id)?;
        tx.commit()?;
        Ok(existed)
    }

    /// List records matching every filter, in insertion order
    pub fn list<T: Record>(&self, filters: &[Filter]) -> eyre::Result<Vec<T>> {
        debug!(collection = T::collection_name(), filter_count = filters.len(), "Store::list: called");
        let mut sql = String::from("SELECT r.data FROM records r WHERE r.collection = ?");
        let mut values = vec![Value::Text(T::collection_name().to_string())];

        for filter in filters {
            let (column, value) = match &filter.value {
                IndexValue::String(s) => ("value_text", Value::Text(s.clone())),
                IndexValue::Int(i) => ("value_int", Value::Integer(*i)),
                IndexValue::Bool(b) => ("value_int", Value::Integer(i64::from(*b))),
            };
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM record_indexes i \
                 WHERE i.collection = r.collection AND i.id = r.id AND i.field = ? AND i.{} {} ?)",
                column,
                filter.op.as_sql()
            ));
            values.push(Value::Text(filter.field.clone()));
            values.push(value);
        }
        sql.push_str(" ORDER BY r.seq");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        debug!(count = records.len(), "Store::list: returning");
        Ok(records)
    }

    /// Recompute the secondary index for every record of a collection
    pub fn rebuild_indexes<T: Record>(&mut self) -> eyre::Result<usize> {
        debug!(collection = T::collection_name(), "Store::rebuild_indexes: called");
        let records: Vec<T> = self.list(&[])?;
        let tx = self.conn.transaction()?;
        for record in &records {
            write_indexes(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Apply several writes atomically
    ///
    /// If `f` returns an error nothing it staged is persisted.
    pub fn transaction<R>(&mut self, f: impl FnOnce(&mut Batch<'_>) -> eyre::Result<R>) -> eyre::Result<R> {
        debug!("Store::transaction: called");
        let tx = self.conn.transaction()?;
        let out = {
            let mut batch = Batch { conn: &tx };
            f(&mut batch)?
        };
        tx.commit()?;
        debug!("Store::transaction: committed");
        Ok(out)
    }
}

/// Write handle scoped to a single transaction
pub struct Batch<'a> {
    conn: &'a Connection,
}

impl Batch<'_> {
    pub fn create<T: Record>(&mut self, record: &T) -> eyre::Result<()> {
        insert_record(self.conn, record)
    }

    pub fn update<T: Record>(&mut self, record: &T) -> eyre::Result<()> {
        update_record(self.conn, record)
    }

    pub fn upsert<T: Record>(&mut self, record: &T) -> eyre::Result<()> {
        upsert_record(self.conn, record)
    }

    pub fn delete<T: Record>(&mut self, id: &str) -> eyre::Result<bool> {
        delete_record::<T>(self.conn, id)
    }
}

fn install_schema(conn: &Connection) -> eyre::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS records (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          collection TEXT NOT NULL,
          id TEXT NOT NULL,
          data TEXT NOT NULL,
          updated_at INTEGER NOT NULL,
          UNIQUE(collection, id)
        );

        CREATE TABLE IF NOT EXISTS record_indexes (
          collection TEXT NOT NULL,
          id TEXT NOT NULL,
          field TEXT NOT NULL,
          value_text TEXT,
          value_int INTEGER,
          PRIMARY KEY(collection, id, field)
        );

        CREATE INDEX IF NOT EXISTS idx_record_indexes_lookup
          ON record_indexes(collection, field, value_text, value_int);
        "#,
    )
    .context("Failed to install store schema")?;
    Ok(())
}

fn insert_record<T: Record>(conn: &Connection, record: &T) -> eyre::Result<()> {
    let data = serde_json::to_string(record)?;
    let inserted = conn.execute(
        "INSERT INTO records(collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(collection, id) DO NOTHING",
        params![T::collection_name(), record.id(), data, record.updated_at()],
    )?;
    if inserted == 0 {
        return Err(eyre!(
            "Record {} already exists in {}",
            record.id(),
            T::collection_name()
        ));
    }
    write_indexes(conn, record)
}

fn update_record<T: Record>(conn: &Connection, record: &T) -> eyre::Result<()> {
    let data = serde_json::to_string(record)?;
    let updated = conn.execute(
        "UPDATE records SET data = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
        params![T::collection_name(), record.id(), data, record.updated_at()],
    )?;
    if updated == 0 {
        return Err(eyre!("Record {} not found in {}", record.id(), T::collection_name()));
    }
    write_indexes(conn, record)
}

fn upsert_record<T: Record>(conn: &Connection, record: &T) -> eyre::Result<()> {
    let data = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO records(collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
        params![T::collection_name(), record.id(), data, record.updated_at()],
    )?;
    write_indexes(conn, record)
}

fn delete_record<T: Record>(conn: &Connection, id: &str) -> eyre::Result<bool> {
    conn.execute(
        "DELETE FROM record_indexes WHERE collection = ?1 AND id = ?2",
        params![T::collection_name(), id],
    )?;
    let deleted = conn.execute(
        "DELETE FROM records WHERE collection = ?1 AND id = ?2",
        params![T::collection_name(), id],
    )?;
    Ok(deleted > 0)
}

fn write_indexes<T: Record>(conn: &Connection, record: &T) -> eyre::Result<()> {
    conn.execute(
        "DELETE FROM record_indexes WHERE collection = ?1 AND id = ?2",
        params![T::collection_name(), record.id()],
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO record_indexes(collection, id, field, value_text, value_int) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (field, value) in record.indexed_fields() {
        let (text, int) = match value {
            IndexValue::String(s) => (Some(s), None),
            IndexValue::Int(i) => (None, Some(i)),
            IndexValue::Bool(b) => (None, Some(i64::from(b))),
        };
        stmt.execute(params![T::collection_name(), record.id(), field, text, int])?;
    }
    Ok(())
}
