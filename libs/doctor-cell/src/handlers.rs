use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use shared_models::clinic::Doctor;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{DoctorError, DoctorSearchQuery};
use crate::services::doctor::DoctorService;

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DoctorSearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service.list_doctors(query.specialty()).await
        .map_err(|e| match e {
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        })?;

    Ok(Json(doctors))
}
