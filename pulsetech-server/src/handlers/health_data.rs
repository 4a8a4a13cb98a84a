//! Time-series health data ingestion.
//!
//! The series name is a closed set (`HealthSeries`); anything outside
//! it is rejected at the boundary instead of being appended to a field
//! named by a runtime string.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::audit::{self, AuditContext};
use crate::AppState;
use pulsetech_core::{HealthSeries, SeriesEntry};
use pulsetech_store::collections as coll;

use super::{message, mutate_record, ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHealthDataRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "type")]
    pub series: String,
    #[serde(default)]
    pub date: String,
    pub value: Option<Value>,
}

/// POST /add-health-data
pub async fn add_health_data(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: AddHealthDataRequest = super::parse_body(request).await?;

    if body.email.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    }

    let Some(series) = HealthSeries::from_name(&body.series) else {
        return Err(message(
            StatusCode::BAD_REQUEST,
            format!("Invalid health data type: {}", body.series),
        ));
    };

    let time = DateTime::parse_from_rfc3339(&body.date)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| message(StatusCode::BAD_REQUEST, "Invalid date"))?;

    let Some(value) = body.value else {
        return Err(message(StatusCode::BAD_REQUEST, "Value is required"));
    };

    mutate_record(&state.store, &body.email, |record| {
        record.append_reading(series, SeriesEntry { time, value });
        Ok(())
    })?;

    audit::log_operation_success(
        &audit_ctx,
        "UPDATE",
        coll::MEDICAL_RECORDS,
        &body.email,
        &state.audit,
    );

    Ok(Json(json!({
        "message": format!("{} reading added", series.as_name()),
    }))
    .into_response())
}
