use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_utils::state::AppState;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors))
        .with_state(state)
}
