use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::router::{appointment_routes, availability_routes};
use doctor_cell::router::doctor_routes;
use shared_utils::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .route("/health", get(health))
        .nest("/api/doctors", doctor_routes(state.clone()))
        .nest("/api/appointments", appointment_routes(state.clone()))
        .nest("/api/availability", availability_routes(state))
}
