//! Medical record handlers: one record per user email, created on
//! first save and updated in place afterwards.

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::audit::{self, AuditContext};
use crate::AppState;
use pulsetech_core::MedicalRecord;
use pulsetech_store::collections as coll;

use super::{message, storage_error, ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecordRequest {
    #[serde(default)]
    pub email: String,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub conditions: Option<String>,
}

/// POST /save-medical-record — create on first save, update demographic
/// fields thereafter. Series and medication lists are never replaced
/// through this route.
pub async fn save_record(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: SaveRecordRequest = super::parse_body(request).await?;

    if body.email.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    }

    let outcome = state.store.in_transaction(|ops| {
        let mut record = match ops.get(coll::MEDICAL_RECORDS, &body.email)? {
            Some(doc) => serde_json::from_value::<MedicalRecord>(doc)?,
            None => MedicalRecord::new(&body.email),
        };

        if body.full_name.is_some() {
            record.full_name = body.full_name.clone();
        }
        if body.date_of_birth.is_some() {
            record.date_of_birth = body.date_of_birth.clone();
        }
        if body.blood_type.is_some() {
            record.blood_type = body.blood_type.clone();
        }
        if body.allergies.is_some() {
            record.allergies = body.allergies.clone();
        }
        if body.conditions.is_some() {
            record.conditions = body.conditions.clone();
        }
        record.updated_at = Some(Utc::now());

        ops.put(
            coll::MEDICAL_RECORDS,
            &body.email,
            &serde_json::to_value(&record)?,
        )?;
        Ok(record)
    });

    let record = outcome.map_err(storage_error)?;

    audit::log_operation_success(
        &audit_ctx,
        "UPDATE",
        coll::MEDICAL_RECORDS,
        &body.email,
        &state.audit,
    );

    Ok(Json(json!({
        "message": "Medical record saved successfully",
        "record": record,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub email: Option<String>,
}

/// GET /get-medical-record?email
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordQuery>,
) -> Result<Response, ApiError> {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    };

    match state.store.get(coll::MEDICAL_RECORDS, &email) {
        Ok(Some(doc)) => Ok(Json(doc).into_response()),
        Ok(None) => Err(message(StatusCode::NOT_FOUND, "Medical record not found")),
        Err(e) => Err(storage_error(e)),
    }
}
