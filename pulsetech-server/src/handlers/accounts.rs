//! User account handlers: register, login, profile update.
//!
//! Accounts are plain documents in the Users collection, keyed by
//! email. Credential handling is deliberately simple; security design
//! is out of scope here.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::audit::{self, AuditContext};
use crate::AppState;
use pulsetech_core::{Role, User};
use pulsetech_store::collections as coll;

use super::{message, storage_error, ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
    pub medical_license: Option<String>,
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: RegisterRequest = super::parse_body(request).await?;

    let Some(role) = body.role else {
        return Err(message(StatusCode::BAD_REQUEST, "All fields are required"));
    };
    if body.username.is_empty() || body.email.is_empty() || body.password.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "All fields are required"));
    }

    let existing = state
        .store
        .get(coll::USERS, &body.email)
        .map_err(storage_error)?;
    if existing.is_some() {
        return Err(message(StatusCode::BAD_REQUEST, "Email already in use"));
    }

    let user = User {
        username: body.username,
        email: body.email.clone(),
        password: body.password,
        role,
        full_name: None,
        // Only doctors carry a license
        medical_license: body
            .medical_license
            .filter(|_| role == Role::Doctor),
        date_of_birth: None,
        ethnicity: None,
        address: None,
        phone_number: None,
        gender: None,
        profile_picture: None,
    };

    let doc = serde_json::to_value(&user).map_err(|e| {
        tracing::error!("Failed to serialize user: {}", e);
        message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })?;
    state
        .store
        .put(coll::USERS, &user.email, &doc)
        .map_err(storage_error)?;

    audit::log_operation_success(&audit_ctx, "CREATE", coll::USERS, &user.email, &state.audit);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "All fields are required"));
    }

    let doc = state
        .store
        .get(coll::USERS, &body.email)
        .map_err(storage_error)?;

    let Some(user) = doc else {
        return Err(message(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    };

    if user.get("password").and_then(Value::as_str) != Some(body.password.as_str()) {
        return Err(message(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    Ok(Json(json!({ "message": "Login successful", "user": user })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub date_of_birth: Option<String>,
    pub ethnicity: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub profile_picture: Option<String>,
}

/// POST /update-profile — merge the provided fields into the user doc
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let audit_ctx = AuditContext::from_request(&request);
    let body: UpdateProfileRequest = super::parse_body(request).await?;

    if body.email.is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "Email is required"));
    }

    let doc = state
        .store
        .get(coll::USERS, &body.email)
        .map_err(storage_error)?;
    let Some(mut user) = doc else {
        return Err(message(StatusCode::NOT_FOUND, "User not found"));
    };

    let updates = [
        ("fullName", body.full_name),
        ("username", body.username),
        ("dateOfBirth", body.date_of_birth),
        ("ethnicity", body.ethnicity),
        ("address", body.address),
        ("phoneNumber", body.phone_number),
        ("gender", body.gender),
        ("profilePicture", body.profile_picture),
    ];

    if let Some(obj) = user.as_object_mut() {
        for (field, value) in updates {
            if let Some(value) = value {
                obj.insert(field.to_string(), json!(value));
            }
        }
    }

    state
        .store
        .put(coll::USERS, &body.email, &user)
        .map_err(storage_error)?;

    audit::log_operation_success(&audit_ctx, "UPDATE", coll::USERS, &body.email, &state.audit);

    Ok(Json(json!({ "message": "User profile updated successfully", "user": user }))
        .into_response())
}
