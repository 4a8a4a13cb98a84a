//! Health dashboard endpoint.
//!
//! GET /get-health-dashboard?email&lastUpdated — assembles the derived
//! snapshot from the user's appointments and medical record, or short
//! circuits with a no-updates sentinel when the client already holds
//! the latest data.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;
use pulsetech_core::dashboard::{
    adherence_stats, health_alerts, latest_change_time, recent_completed, series_tail,
    upcoming_scheduled, AppointmentView, DashboardSnapshot,
};
use pulsetech_core::{Appointment, MedicalRecord};
use pulsetech_store::collections as coll;

use super::{message, storage_error, ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub email: Option<String>,
    pub last_updated: Option<String>,
}

/// GET /get-health-dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, ApiError> {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    };

    // A stale or unparseable cursor just means "send everything"
    let last_seen: Option<DateTime<Utc>> = query
        .last_updated
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    if state
        .store
        .get(coll::USERS, &email)
        .map_err(storage_error)?
        .is_none()
    {
        return Err(message(StatusCode::NOT_FOUND, "User not found"));
    }

    let appointments = load_appointments(&state, &email)?;
    let record = load_record(&state, &email)?;

    let latest = latest_change_time(record.as_ref(), &appointments);

    // Short-circuit: the client already has the latest data. Callers
    // must not re-render on this signal.
    if let (Some(seen), Some(latest)) = (last_seen, latest)
        && seen >= latest
    {
        return Ok(Json(json!({ "noUpdates": true })).into_response());
    }

    let record = record.unwrap_or_else(|| MedicalRecord::new(&email));

    let recent = annotate(&state, &email, recent_completed(&appointments))?;
    let upcoming = annotate(&state, &email, upcoming_scheduled(&appointments))?;

    let snapshot = DashboardSnapshot {
        last_updated: latest,
        recent_appointments: recent,
        upcoming_appointments: upcoming,
        medication_stats: adherence_stats(&record.medications),
        alerts: health_alerts(&record.medications, Utc::now()),
        heart_rate: series_tail(&record.heart_rate, 20),
        step_count: series_tail(&record.step_count, 20),
        sleep_tracking: series_tail(&record.sleep_tracking, 20),
        medical_logs: series_tail(&record.medical_logs, 7),
        medications: record.medications,
    };

    Ok(Json(snapshot).into_response())
}

/// All appointments involving the user. Any read or decode failure
/// aborts the whole aggregation; partial dashboards are never served.
fn load_appointments(state: &AppState, email: &str) -> Result<Vec<Appointment>, ApiError> {
    let docs = state
        .store
        .find(coll::APPOINTMENTS, |doc| {
            doc.get("doctorEmail").and_then(Value::as_str) == Some(email)
                || doc.get("patientEmail").and_then(Value::as_str) == Some(email)
        })
        .map_err(storage_error)?;

    docs.into_iter()
        .map(|doc| {
            serde_json::from_value(doc).map_err(|e| {
                tracing::error!("Corrupt appointment document: {}", e);
                message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            })
        })
        .collect()
}

fn load_record(state: &AppState, email: &str) -> Result<Option<MedicalRecord>, ApiError> {
    match state.store.get(coll::MEDICAL_RECORDS, email) {
        Ok(Some(doc)) => serde_json::from_value(doc).map(Some).map_err(|e| {
            tracing::error!("Corrupt medical record document: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }),
        Ok(None) => Ok(None),
        Err(e) => Err(storage_error(e)),
    }
}

/// Resolve the counterpart display name for each appointment, relative
/// to the requesting user: doctors render as "Dr. {fullName}", patients
/// as their plain full name, with unknown-party fallbacks.
fn annotate(
    state: &AppState,
    email: &str,
    appointments: Vec<Appointment>,
) -> Result<Vec<AppointmentView>, ApiError> {
    appointments
        .into_iter()
        .map(|appointment| {
            let counterpart_is_doctor = appointment.patient_email == email;
            let counterpart_email = if counterpart_is_doctor {
                &appointment.doctor_email
            } else {
                &appointment.patient_email
            };

            let full_name = state
                .store
                .get(coll::USERS, counterpart_email)
                .map_err(storage_error)?
                .and_then(|user| {
                    user.get("fullName")
                        .and_then(Value::as_str)
                        .map(|s| s.to_string())
                });

            let counterpart_name = match (counterpart_is_doctor, full_name) {
                (true, Some(name)) => format!("Dr. {}", name),
                (true, None) => "Unknown Doctor".to_string(),
                (false, Some(name)) => name,
                (false, None) => "Unknown Patient".to_string(),
            };

            Ok(AppointmentView {
                appointment,
                counterpart_name,
            })
        })
        .collect()
}
