//! pulsetech-server - Health records & telemedicine backend
//!
//! HTTP API over a JSON document store: accounts, medical records,
//! medication tracking, appointments, messaging, a health dashboard,
//! and an external symptom-checker subprocess.

pub mod audit;
pub mod config;
pub mod handlers;
pub mod symptom;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use pulsetech_store::{AuditLog, DocumentStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

/// Application state
pub struct AppState {
    pub store: DocumentStore,
    pub audit: Arc<Mutex<AuditLog>>,
    pub config: config::ServerConfig,
    pub sessions: symptom::SessionRegistry,
}

/// Build the application router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let frontend = &state.config.assets.frontend_dir;
    let spa = ServeDir::new(frontend)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(frontend.join("index.html")));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Accounts
        .route("/register", post(handlers::accounts::register))
        .route("/login", post(handlers::accounts::login))
        .route("/update-profile", post(handlers::accounts::update_profile))
        // Medical records
        .route("/save-medical-record", post(handlers::records::save_record))
        .route("/get-medical-record", get(handlers::records::get_record))
        // Medication tracker
        .route("/save-medication", post(handlers::medications::save_medication))
        .route("/mark-medication-taken", post(handlers::medications::mark_taken))
        .route("/mark-medication-missed", post(handlers::medications::mark_missed))
        // Health data & dashboard
        .route("/add-health-data", post(handlers::health_data::add_health_data))
        .route("/get-health-dashboard", get(handlers::dashboard::get_dashboard))
        // Appointments
        .route("/schedule-appointment", post(handlers::appointments::schedule))
        .route("/complete-appointment", post(handlers::appointments::complete))
        .route("/get-appointments", get(handlers::appointments::list))
        // Messaging
        .route("/send-message", post(handlers::collections::send_message))
        .route("/get-messages", get(handlers::collections::get_messages))
        // Raw collection passthrough
        .route("/collections/{name}", get(handlers::collections::get_collection))
        // Symptom checker sessions
        .route("/start-symptom-check", post(symptom::start_session))
        .route("/symptom-check-answer", post(symptom::answer_session))
        .route("/end-symptom-check", post(symptom::end_session))
        // Static assets: images plus the front-end bundle, with the SPA
        // index as the catch-all for client-side routes
        .nest_service("/image", ServeDir::new(&state.config.assets.image_dir))
        .fallback_service(spa)
        // Middleware
        .layer(RequestBodyLimitLayer::new(handlers::MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
