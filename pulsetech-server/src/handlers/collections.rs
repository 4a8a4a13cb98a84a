//! Raw collection passthrough and the message box.

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::audit::{self, AuditContext};
use crate::AppState;
use pulsetech_store::collections as coll;

use super::{message, storage_error, ApiError};

/// GET /collections/{name} — every document in the named collection
pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let docs = state.store.find_all(&name).map_err(storage_error)?;
    Ok(Json(json!(docs)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub content: String,
}

/// POST /send-message
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: SendMessageRequest = super::parse_body(request).await?;

    if body.sender.is_empty() || body.recipient.is_empty() || body.content.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "All fields are required"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let doc = json!({
        "id": id,
        "sender": body.sender,
        "recipient": body.recipient,
        "content": body.content,
        "sentAt": Utc::now(),
    });

    state
        .store
        .put(coll::MESSAGES, &id, &doc)
        .map_err(storage_error)?;

    audit::log_operation_success(&audit_ctx, "CREATE", coll::MESSAGES, &id, &state.audit);

    Ok((StatusCode::CREATED, Json(json!({ "message": "Message sent" }))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub email: Option<String>,
}

/// GET /get-messages?email — messages the user sent or received
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
) -> Result<Response, ApiError> {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    };

    let messages = state
        .store
        .find(coll::MESSAGES, |doc| {
            doc.get("sender").and_then(Value::as_str) == Some(email.as_str())
                || doc.get("recipient").and_then(Value::as_str) == Some(email.as_str())
        })
        .map_err(storage_error)?;

    Ok(Json(json!(messages)).into_response())
}
