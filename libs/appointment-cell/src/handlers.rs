// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::clinic::AppointmentDetails;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{
    parse_uuid, AppointmentError, AppointmentListQuery, AvailabilityQuery, AvailabilityResponse,
    CreateAppointmentRequest, PatchAppointmentRequest, StatsQuery, StatsResponse,
};
use crate::services::{
    AppointmentBookingService, AppointmentSearchService, AppointmentStatsService,
    AvailabilityService,
};

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::Validation(msg) => AppError::ValidationError(msg),
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::Conflict => AppError::Conflict(e.to_string()),
        AppointmentError::Store(msg) => AppError::Database(msg),
    }
}

fn body_error(rejection: JsonRejection) -> AppError {
    AppError::ValidationError(rejection.body_text())
}

fn query_error(rejection: QueryRejection) -> AppError {
    AppError::ValidationError(rejection.body_text())
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AppointmentListQuery>, QueryRejection>,
) -> Result<Json<Vec<AppointmentDetails>>, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let filter = query.to_filter().map_err(map_appointment_error)?;

    let search_service = AppointmentSearchService::new(&state);
    let appointments = search_service.search_appointments(filter).await
        .map_err(map_appointment_error)?;

    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(request) = payload.map_err(body_error)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.create_appointment(request).await
        .map_err(map_appointment_error)?;

    Ok((StatusCode::CREATED, Json(json!({ "id": appointment.id }))))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    payload: Result<Json<PatchAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let appointment_id = parse_uuid("appointment id", &appointment_id)
        .map_err(map_appointment_error)?;
    let Json(request) = payload.map_err(body_error)?;

    let booking_service = AppointmentBookingService::new(&state);
    booking_service.update_appointment(appointment_id, request).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "ok": true })))
}

#[axum::debug_handler]
pub async fn appointment_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<StatsResponse>, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let (from, to) = query.range().map_err(map_appointment_error)?;

    let stats_service = AppointmentStatsService::new(&state);
    let stats = stats_service.appointment_stats(query.group(), from, to).await
        .map_err(map_appointment_error)?;

    Ok(Json(stats))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn doctor_availability(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let (doctor_id, date) = query.parse().map_err(map_appointment_error)?;

    let availability_service = AvailabilityService::new(&state);
    let availability = availability_service.occupied_slots(doctor_id, date).await
        .map_err(map_appointment_error)?;

    Ok(Json(availability))
}
