use axum::extract::{ConnectInfo, Request};
use pulsetech_store::{AuditLog, Operation};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Audit context extracted from HTTP request
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub client_ip: String,
}

impl AuditContext {
    /// Create audit context without connection info (for testing)
    pub fn new(client_ip: String) -> Self {
        Self { client_ip }
    }

    /// Extract audit context from an Axum request
    pub fn from_request(request: &Request) -> Self {
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Self { client_ip }
    }
}

/// Map operation string to AuditLog Operation enum
fn parse_operation(op: &str) -> Operation {
    match op.to_uppercase().as_str() {
        "CREATE" => Operation::Create,
        "UPDATE" => Operation::Update,
        "DELETE" => Operation::Delete,
        _ => Operation::Read,
    }
}

/// Log a successful operation
pub fn log_operation_success(
    context: &AuditContext,
    operation: &str,
    collection: &str,
    document_key: &str,
    audit_log: &Arc<Mutex<AuditLog>>,
) {
    tracing::info!(
        client_ip = %context.client_ip,
        operation = operation,
        collection = collection,
        document_key = document_key,
        status = "success",
        "Audit: {} {}/{}",
        operation,
        collection,
        document_key
    );

    // Write to database asynchronously in a spawned task
    let op = parse_operation(operation);
    let context = context.clone();
    let collection = collection.to_string();
    let document_key = document_key.to_string();
    let audit_log = Arc::clone(audit_log);

    tokio::spawn(async move {
        let audit = audit_log.lock().await;
        if let Err(e) =
            audit.log_success(op, &collection, &document_key, Some(&context.client_ip))
        {
            tracing::error!("Failed to write audit log to database: {}", e);
        }
    });
}

/// Log a failed operation
pub fn log_operation_error(
    context: &AuditContext,
    operation: &str,
    collection: &str,
    document_key: Option<&str>,
    error: &str,
    audit_log: &Arc<Mutex<AuditLog>>,
) {
    tracing::warn!(
        client_ip = %context.client_ip,
        operation = operation,
        collection = collection,
        document_key = document_key.unwrap_or("N/A"),
        status = "error",
        error = error,
        "Audit: {} {} failed: {}",
        operation,
        collection,
        error
    );

    // Write to database asynchronously in a spawned task
    let op = parse_operation(operation);
    let context = context.clone();
    let collection = collection.to_string();
    let document_key = document_key.map(|s| s.to_string());
    let error = error.to_string();
    let audit_log = Arc::clone(audit_log);

    tokio::spawn(async move {
        let audit = audit_log.lock().await;
        if let Err(e) = audit.log_error(
            op,
            Some(&collection),
            document_key.as_deref(),
            Some(&context.client_ip),
            &error,
        ) {
            tracing::error!("Failed to write audit log to database: {}", e);
        }
    });
}
