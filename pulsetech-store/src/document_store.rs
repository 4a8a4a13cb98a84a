//! SQLite-backed JSON document store over named collections.
//!
//! Schema:
//!   - documents: one row per (collection, key), value is the full
//!     JSON document. Writes are whole-document upserts.

use crate::error::Result;
use rusqlite::{params, Connection, Transaction};
use serde_json::Value;
use std::ops::Deref;
use std::path::Path;
use std::sync::Mutex;

/// Collection names used by the application
pub mod collections {
    pub const USERS: &str = "Users";
    pub const MEDICAL_RECORDS: &str = "MedicalRecords";
    pub const APPOINTMENTS: &str = "Appointments";
    pub const MESSAGES: &str = "messages";
}

/// JSON document store keyed by (collection, key)
pub struct DocumentStore {
    conn: Mutex<Connection>,
}

#[allow(clippy::result_large_err)]
impl DocumentStore {
    /// Open the store (create if not exists)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for read-write concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a document by key
    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT value FROM documents WHERE collection = ? AND key = ?")?;
        let result = stmt.query_row(params![collection, key], |row| row.get::<_, String>(0));

        match result {
            Ok(value) => Ok(Some(serde_json::from_str(&value)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a document (whole-document upsert)
    pub fn put(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        let value = serde_json::to_string(document)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO documents (collection, key, value) VALUES (?, ?, ?)",
            params![collection, key, value],
        )?;

        Ok(())
    }

    /// Delete a document
    pub fn delete(&self, collection: &str, key: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn.execute(
            "DELETE FROM documents WHERE collection = ? AND key = ?",
            params![collection, key],
        )?;
        Ok(rows > 0)
    }

    /// All documents in a collection, ordered by key
    pub fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT value FROM documents WHERE collection = ? ORDER BY key")?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for value in rows {
            results.push(serde_json::from_str(&value?)?);
        }
        Ok(results)
    }

    /// Documents in a collection matching a predicate (full scan)
    pub fn find<F>(&self, collection: &str, predicate: F) -> Result<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let all = self.find_all(collection)?;
        Ok(all.into_iter().filter(|doc| predicate(doc)).collect())
    }

    /// Document counts per collection
    pub fn count_by_collection(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    /// Execute multiple operations atomically within an SQLite
    /// transaction. Read-modify-write of a single document inside the
    /// closure cannot lose updates to a concurrent writer.
    pub fn in_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&TransactionOps<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let ops = TransactionOps { tx: &tx };
        let result = f(&ops)?;
        tx.commit()?;
        Ok(result)
    }
}

/// Operations available within a transaction
pub struct TransactionOps<'a> {
    tx: &'a Transaction<'a>,
}

#[allow(clippy::result_large_err)]
impl<'a> TransactionOps<'a> {
    /// Get a document by key
    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let conn = self.tx.deref();
        let mut stmt =
            conn.prepare("SELECT value FROM documents WHERE collection = ? AND key = ?")?;
        let result = stmt.query_row(params![collection, key], |row| row.get::<_, String>(0));
        match result {
            Ok(value) => Ok(Some(serde_json::from_str(&value)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a document (whole-document upsert)
    pub fn put(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        let value = serde_json::to_string(document)?;
        let conn = self.tx.deref();

        conn.execute(
            "INSERT OR REPLACE INTO documents (collection, key, value) VALUES (?, ?, ?)",
            params![collection, key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_and_get() {
        let store = DocumentStore::open(":memory:").unwrap();

        let doc = json!({"email": "a@b.c", "username": "alice"});
        store.put(collections::USERS, "a@b.c", &doc).unwrap();

        let retrieved = store.get(collections::USERS, "a@b.c").unwrap();
        assert_eq!(retrieved, Some(doc));
    }

    #[test]
    fn test_put_is_whole_document_upsert() {
        let store = DocumentStore::open(":memory:").unwrap();

        store
            .put(collections::USERS, "a@b.c", &json!({"username": "alice", "role": "patient"}))
            .unwrap();
        store
            .put(collections::USERS, "a@b.c", &json!({"username": "alice2"}))
            .unwrap();

        let doc = store.get(collections::USERS, "a@b.c").unwrap().unwrap();
        assert_eq!(doc["username"], "alice2");
        // Replaced wholesale, not merged
        assert!(doc.get("role").is_none());
    }

    #[test]
    fn test_get_missing() {
        let store = DocumentStore::open(":memory:").unwrap();
        assert_eq!(store.get(collections::USERS, "nobody").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let store = DocumentStore::open(":memory:").unwrap();
        store.put(collections::USERS, "a@b.c", &json!({})).unwrap();

        assert!(store.delete(collections::USERS, "a@b.c").unwrap());
        assert!(!store.delete(collections::USERS, "a@b.c").unwrap());
        assert_eq!(store.get(collections::USERS, "a@b.c").unwrap(), None);
    }

    #[test]
    fn test_find_with_predicate() {
        let store = DocumentStore::open(":memory:").unwrap();

        store
            .put(collections::APPOINTMENTS, "1", &json!({"patientEmail": "a@b.c"}))
            .unwrap();
        store
            .put(collections::APPOINTMENTS, "2", &json!({"patientEmail": "x@y.z"}))
            .unwrap();
        store
            .put(collections::APPOINTMENTS, "3", &json!({"patientEmail": "a@b.c"}))
            .unwrap();

        let mine = store
            .find(collections::APPOINTMENTS, |doc| {
                doc["patientEmail"] == "a@b.c"
            })
            .unwrap();
        assert_eq!(mine.len(), 2);

        let all = store.find_all(collections::APPOINTMENTS).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_collections_are_disjoint() {
        let store = DocumentStore::open(":memory:").unwrap();
        store.put(collections::USERS, "k", &json!({"a": 1})).unwrap();
        store
            .put(collections::MEDICAL_RECORDS, "k", &json!({"b": 2}))
            .unwrap();

        assert_eq!(
            store.get(collections::USERS, "k").unwrap(),
            Some(json!({"a": 1}))
        );
        assert_eq!(
            store.get(collections::MEDICAL_RECORDS, "k").unwrap(),
            Some(json!({"b": 2}))
        );

        let counts = store.count_by_collection().unwrap();
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_in_transaction_commit() {
        let store = DocumentStore::open(":memory:").unwrap();

        store
            .in_transaction(|ops| {
                ops.put(collections::USERS, "a@b.c", &json!({"username": "alice"}))?;
                ops.put(collections::MEDICAL_RECORDS, "a@b.c", &json!({"email": "a@b.c"}))?;
                Ok(())
            })
            .unwrap();

        assert!(store.get(collections::USERS, "a@b.c").unwrap().is_some());
        assert!(store
            .get(collections::MEDICAL_RECORDS, "a@b.c")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_in_transaction_rollback() {
        let store = DocumentStore::open(":memory:").unwrap();

        let result: Result<()> = store.in_transaction(|ops| {
            ops.put(collections::USERS, "a@b.c", &json!({}))?;
            Err(crate::error::StoreError::Other("forced error".into()))
        });

        assert!(result.is_err());
        assert!(store.get(collections::USERS, "a@b.c").unwrap().is_none());
    }

    #[test]
    fn test_read_modify_write_in_transaction() {
        let store = DocumentStore::open(":memory:").unwrap();
        store
            .put(collections::MEDICAL_RECORDS, "a@b.c", &json!({"medications": []}))
            .unwrap();

        store
            .in_transaction(|ops| {
                let mut doc = ops.get(collections::MEDICAL_RECORDS, "a@b.c")?.unwrap();
                doc["medications"]
                    .as_array_mut()
                    .unwrap()
                    .push(json!({"name": "Metformin"}));
                ops.put(collections::MEDICAL_RECORDS, "a@b.c", &doc)
            })
            .unwrap();

        let doc = store.get(collections::MEDICAL_RECORDS, "a@b.c").unwrap().unwrap();
        assert_eq!(doc["medications"].as_array().unwrap().len(), 1);
    }
}
