// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
};

use shared_utils::state::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/stats", get(handlers::appointment_stats))
        .route("/{appointment_id}", patch(handlers::update_appointment))
        .with_state(state)
}

pub fn availability_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::doctor_availability))
        .with_state(state)
}
