pub mod audit_log;
pub mod document_store;
pub mod error;

pub use audit_log::{AuditLog, Operation};
pub use document_store::{collections, DocumentStore, TransactionOps};
pub use error::{Result, StoreError};
