pub mod accounts;
pub mod appointments;
pub mod collections;
pub mod dashboard;
pub mod health_data;
pub mod medications;
pub mod records;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use pulsetech_core::{MedicalRecord, PulseError};
use pulsetech_store::{collections as coll, DocumentStore, StoreError};
use serde_json::{json, Value};

/// Request body cap, shared by the router's limit layer and
/// `parse_body` so oversized bodies always hit the layer's 413 first.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Uniform error payload: status plus a client-facing message body
pub type ApiError = (StatusCode, Json<Value>);

pub fn message(status: StatusCode, text: impl Into<String>) -> ApiError {
    (status, Json(json!({ "message": text.into() })))
}

/// Map a domain error to its HTTP representation. JSON decode
/// failures are logged server-side and surfaced as a generic 500.
pub fn domain_error(err: PulseError) -> ApiError {
    match &err {
        PulseError::InvalidInput { message: msg } => message_owned(StatusCode::BAD_REQUEST, msg),
        PulseError::NotFound { .. } => message_owned(StatusCode::NOT_FOUND, &err.to_string()),
        PulseError::InvalidJson(_) => {
            tracing::error!("Internal error: {}", err);
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

pub fn storage_error(err: StoreError) -> ApiError {
    tracing::error!("Storage error: {}", err);
    message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

fn message_owned(status: StatusCode, text: &str) -> ApiError {
    (status, Json(json!({ "message": text })))
}

/// Deserialize a JSON request body
pub async fn parse_body<T: serde::de::DeserializeOwned>(request: Request) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| message(StatusCode::BAD_REQUEST, e.to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| message(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)))
}

/// Liveness probe (GET /health)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run a read-modify-write over one user's medical record inside a
/// store transaction, bumping the record's updatedAt on success. The
/// mutation sees the freshly-read record; concurrent writers serialize
/// at the store, so the whole-list write cannot lose a sibling update.
pub fn mutate_record<F>(
    store: &DocumentStore,
    email: &str,
    mutate: F,
) -> Result<MedicalRecord, ApiError>
where
    F: FnOnce(&mut MedicalRecord) -> pulsetech_core::Result<()>,
{
    let outcome = store.in_transaction(|ops| {
        let Some(doc) = ops.get(coll::MEDICAL_RECORDS, email)? else {
            return Ok(Err(PulseError::not_found("Medical record", email)));
        };
        let mut record: MedicalRecord = serde_json::from_value(doc)?;

        if let Err(e) = mutate(&mut record) {
            return Ok(Err(e));
        }

        record.updated_at = Some(Utc::now());
        ops.put(coll::MEDICAL_RECORDS, email, &serde_json::to_value(&record)?)?;
        Ok(Ok(record))
    });

    match outcome {
        Ok(Ok(record)) => Ok(record),
        Ok(Err(domain)) => Err(domain_error(domain)),
        Err(store_err) => Err(storage_error(store_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_statuses() {
        let (status, body) = domain_error(PulseError::invalid_input("Name is required"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["message"], "Name is required");

        let (status, body) = domain_error(PulseError::not_found("Medication", "Aspirin"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0["message"], "Medication not found: Aspirin");

        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let (status, body) = domain_error(PulseError::from(json_err));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0["message"], "Internal Server Error");
    }
}
