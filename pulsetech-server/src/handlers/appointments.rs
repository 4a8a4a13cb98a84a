//! Appointment handlers. Appointments are stored as documents keyed by
//! a generated id (carried inside the document as `id`); the status
//! transition is one-way, Scheduled to Completed.

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::audit::{self, AuditContext};
use crate::AppState;
use pulsetech_core::{Appointment, AppointmentStatus};
use pulsetech_store::collections as coll;

use super::{message, storage_error, ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[serde(default)]
    pub doctor_email: String,
    #[serde(default)]
    pub patient_email: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub reason: String,
}

/// POST /schedule-appointment
pub async fn schedule(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: ScheduleRequest = super::parse_body(request).await?;

    if body.doctor_email.is_empty() || body.patient_email.is_empty() || body.reason.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "All fields are required"));
    }
    let date = DateTime::parse_from_rfc3339(&body.date)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| message(StatusCode::BAD_REQUEST, "Invalid appointment date"))?;

    let appointment = Appointment {
        doctor_email: body.doctor_email,
        patient_email: body.patient_email,
        date,
        reason: body.reason,
        status: AppointmentStatus::Scheduled,
        updated_at: Utc::now(),
    };

    let id = uuid::Uuid::new_v4().to_string();
    let mut doc = serde_json::to_value(&appointment).map_err(|e| {
        tracing::error!("Failed to serialize appointment: {}", e);
        message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })?;
    doc["id"] = json!(id);

    state
        .store
        .put(coll::APPOINTMENTS, &id, &doc)
        .map_err(storage_error)?;

    audit::log_operation_success(&audit_ctx, "CREATE", coll::APPOINTMENTS, &id, &state.audit);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Appointment scheduled", "appointment": doc })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub id: String,
}

/// POST /complete-appointment
pub async fn complete(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: CompleteRequest = super::parse_body(request).await?;

    if body.id.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "Appointment id is required"));
    }

    let doc = state
        .store
        .get(coll::APPOINTMENTS, &body.id)
        .map_err(storage_error)?;
    let Some(mut doc) = doc else {
        return Err(message(StatusCode::NOT_FOUND, "Appointment not found"));
    };

    if doc.get("status").and_then(Value::as_str) != Some("Scheduled") {
        return Err(message(
            StatusCode::BAD_REQUEST,
            "Only scheduled appointments can be completed",
        ));
    }

    doc["status"] = json!("Completed");
    doc["updatedAt"] = json!(Utc::now());

    state
        .store
        .put(coll::APPOINTMENTS, &body.id, &doc)
        .map_err(storage_error)?;

    audit::log_operation_success(&audit_ctx, "UPDATE", coll::APPOINTMENTS, &body.id, &state.audit);

    Ok(Json(json!({ "message": "Appointment completed", "appointment": doc })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct AppointmentsQuery {
    pub email: Option<String>,
}

/// GET /get-appointments?email — appointments the user participates in,
/// as either doctor or patient.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Response, ApiError> {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    };

    let appointments = state
        .store
        .find(coll::APPOINTMENTS, |doc| {
            doc.get("doctorEmail").and_then(Value::as_str) == Some(email.as_str())
                || doc.get("patientEmail").and_then(Value::as_str) == Some(email.as_str())
        })
        .map_err(storage_error)?;

    Ok(Json(json!(appointments)).into_response())
}
