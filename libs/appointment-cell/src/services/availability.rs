use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use shared_database::{AppointmentFilter, ClinicStore};
use shared_models::clinic::AppointmentStatus;
use shared_utils::state::AppState;

use crate::models::{AppointmentError, AvailabilityResponse, OccupiedSlot};
use crate::services::store_failure;

pub struct AvailabilityService {
    store: Arc<dyn ClinicStore>,
    slot_minutes: i64,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            slot_minutes: state.config.appointment_minutes,
        }
    }

    /// Non-cancelled appointments of `doctor_id` starting on `date` (UTC day),
    /// earliest first. Unknown doctors simply have nothing booked.
    pub async fn occupied_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        let day_start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);

        debug!("Fetching occupied slots for doctor {} on {}", doctor_id, date);

        let filter = AppointmentFilter {
            exclude_status: Some(AppointmentStatus::Cancelled),
            starts_from: Some(day_start),
            starts_before: Some(day_end),
            ..AppointmentFilter::for_doctor(doctor_id)
        };

        let appointments = self.store.list_appointments(&filter).await
            .map_err(store_failure("fetch availability"))?;

        let occupied = appointments
            .into_iter()
            .map(|apt| OccupiedSlot {
                start_at: apt.start_at,
                end_at: apt.end_at,
                status: apt.status,
            })
            .collect();

        Ok(AvailabilityResponse {
            slot_minutes: self.slot_minutes,
            occupied,
        })
    }
}
