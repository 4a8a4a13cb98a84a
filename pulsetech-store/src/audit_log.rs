//! SQLite-based operation audit log
//!
//! Separate file for easy management and rotation.

use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;

/// Operation type
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Audit log
pub struct AuditLog {
    conn: Connection,
}

#[allow(clippy::result_large_err)]
impl AuditLog {
    /// Open the audit log (create if not exists)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let audit = Self { conn };
        audit.initialize()?;
        Ok(audit)
    }

    /// Initialize tables
    fn initialize(&self) -> Result<()> {
        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                operation TEXT NOT NULL,
                collection TEXT,
                document_key TEXT,
                client_ip TEXT,
                result TEXT NOT NULL,
                error_message TEXT
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_document ON audit_log(collection, document_key)",
            [],
        )?;

        Ok(())
    }

    /// Record an audit log entry
    pub fn log(
        &self,
        operation: Operation,
        collection: Option<&str>,
        document_key: Option<&str>,
        client_ip: Option<&str>,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<()> {
        let result = if success { "success" } else { "error" };

        self.conn.execute(
            r#"
            INSERT INTO audit_log
            (operation, collection, document_key, client_ip, result, error_message)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                operation.as_str(),
                collection,
                document_key,
                client_ip,
                result,
                error_message,
            ],
        )?;

        Ok(())
    }

    /// Record a success log entry (helper)
    pub fn log_success(
        &self,
        operation: Operation,
        collection: &str,
        document_key: &str,
        client_ip: Option<&str>,
    ) -> Result<()> {
        self.log(
            operation,
            Some(collection),
            Some(document_key),
            client_ip,
            true,
            None,
        )
    }

    /// Record an error log entry (helper)
    pub fn log_error(
        &self,
        operation: Operation,
        collection: Option<&str>,
        document_key: Option<&str>,
        client_ip: Option<&str>,
        error: &str,
    ) -> Result<()> {
        self.log(
            operation,
            collection,
            document_key,
            client_ip,
            false,
            Some(error),
        )
    }

    /// Get recent audit log entries
    #[allow(clippy::type_complexity)]
    pub fn recent_entries(
        &self,
        limit: usize,
    ) -> Result<Vec<(String, String, Option<String>, Option<String>, String)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT timestamp, operation, collection, document_key, result
            FROM audit_log
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_log() {
        let audit = AuditLog::open(":memory:").unwrap();

        audit
            .log_success(
                Operation::Update,
                "MedicalRecords",
                "pat@pulsetech.test",
                Some("127.0.0.1"),
            )
            .unwrap();

        audit
            .log_error(
                Operation::Read,
                Some("Users"),
                Some("nobody@pulsetech.test"),
                Some("192.168.1.1"),
                "Document not found",
            )
            .unwrap();

        let count: i32 = audit
            .conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();

        assert_eq!(count, 2);
    }

    #[test]
    fn test_recent_entries() {
        let audit = AuditLog::open(":memory:").unwrap();

        audit
            .log_success(Operation::Create, "Users", "u1", None)
            .unwrap();
        audit
            .log_success(Operation::Read, "Users", "u1", None)
            .unwrap();
        audit
            .log_error(Operation::Update, Some("Users"), Some("u2"), None, "not found")
            .unwrap();

        let entries = audit.recent_entries(10).unwrap();
        assert_eq!(entries.len(), 3);
        // Most recent first
        assert_eq!(entries[0].1, "update");
        assert_eq!(entries[0].4, "error");
    }
}
