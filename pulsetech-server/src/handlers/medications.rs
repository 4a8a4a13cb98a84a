//! Medication tracker handlers.
//!
//! All three operations are whole-list read-modify-writes over the
//! user's medical record, run inside a store transaction (see
//! `super::mutate_record`).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::audit::{self, AuditContext};
use crate::AppState;
use pulsetech_core::medication::{self, NewMedication};
use pulsetech_store::collections as coll;

use super::{message, mutate_record, ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMedicationRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub time_to_take: String,
    #[serde(default)]
    pub frequency: String,
}

/// POST /save-medication
pub async fn save_medication(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: SaveMedicationRequest = super::parse_body(request).await?;

    if body.email.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    }

    let record = mutate_record(&state.store, &body.email, |record| {
        medication::add_medication(
            record,
            NewMedication {
                name: body.name,
                time_to_take: body.time_to_take,
                frequency: body.frequency,
            },
        )
    })
    .inspect_err(|(status, _)| {
        audit::log_operation_error(
            &audit_ctx,
            "UPDATE",
            coll::MEDICAL_RECORDS,
            Some(&body.email),
            status.as_str(),
            &state.audit,
        );
    })?;

    audit::log_operation_success(
        &audit_ctx,
        "UPDATE",
        coll::MEDICAL_RECORDS,
        &body.email,
        &state.audit,
    );

    Ok(Json(json!({
        "message": "Medication saved successfully",
        "medications": record.medications,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkMedicationRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub medication_name: String,
}

/// POST /mark-medication-taken
pub async fn mark_taken(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    mark(state, request, true).await
}

/// POST /mark-medication-missed
pub async fn mark_missed(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    mark(state, request, false).await
}

async fn mark(
    state: Arc<AppState>,
    request: Request,
    taken: bool,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: MarkMedicationRequest = super::parse_body(request).await?;

    if body.email.is_empty() || body.medication_name.is_empty() {
        return Err(message(
            StatusCode::BAD_REQUEST,
            "Email and medication name are required",
        ));
    }

    let now = Utc::now();
    let record = mutate_record(&state.store, &body.email, |record| {
        if taken {
            medication::mark_taken(record, &body.medication_name, now)
        } else {
            medication::mark_missed(record, &body.medication_name, now)
        }
    })?;

    audit::log_operation_success(
        &audit_ctx,
        "UPDATE",
        coll::MEDICAL_RECORDS,
        &body.email,
        &state.audit,
    );

    let med = record
        .medications
        .iter()
        .find(|m| m.name == body.medication_name);

    Ok(Json(json!({
        "message": if taken {
            "Medication marked as taken"
        } else {
            "Medication marked as missed"
        },
        "medication": med,
    }))
    .into_response())
}
