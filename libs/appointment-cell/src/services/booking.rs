// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::clinic::{Appointment, AppointmentChanges, TimeRange};
use shared_utils::locks::KeyedLocks;
use shared_utils::state::AppState;

use crate::models::{
    validate_patient_name, AppointmentError, CreateAppointmentRequest, PatchAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::store_failure;

/// Creates and modifies appointments while keeping each doctor's
/// non-cancelled intervals pairwise disjoint.
///
/// Every check-then-write runs under the doctor's entry in
/// `AppState::doctor_locks`.
pub struct AppointmentBookingService<'a> {
    store: Arc<dyn ClinicStore>,
    doctor_locks: &'a KeyedLocks<Uuid>,
    conflict_service: ConflictDetectionService,
    appointment_minutes: i64,
}

impl<'a> AppointmentBookingService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            doctor_locks: &state.doctor_locks,
            conflict_service: ConflictDetectionService::new(Arc::clone(&state.store)),
            appointment_minutes: state.config.appointment_minutes,
        }
    }

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let patient_name = validate_patient_name(&request.patient_name)?;
        let range = self.slot(request.start_at)?;

        debug!("Booking doctor {} from {} to {}", request.doctor_id, range.start, range.end);

        // Doctors are never removed, so the lookup can run before locking.
        // Only known doctor ids get a lock entry.
        let doctor = self.store.find_doctor(request.doctor_id).await
            .map_err(store_failure("fetch doctor"))?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let _guard = self.doctor_locks.lock(doctor.id).await;

        if self.conflict_service.is_overlapping(doctor.id, &range, None).await? {
            warn!("Rejected booking for doctor {} at {}: slot taken", doctor.id, range.start);
            return Err(AppointmentError::Conflict);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_name,
            doctor_id: doctor.id,
            start_at: range.start,
            end_at: range.end,
            status: request.status.unwrap_or_default(),
            created_at: Utc::now(),
        };

        self.store.insert_appointment(&appointment).await
            .map_err(store_failure("insert appointment"))?;

        info!("Appointment {} booked with doctor {} at {}",
              appointment.id, appointment.doctor_id, appointment.start_at);

        Ok(appointment)
    }

    /// Applies a status change and/or reschedule.
    ///
    /// The interval is re-validated (excluding the appointment itself) when a
    /// new start is given and when a cancelled appointment is revived.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: PatchAppointmentRequest,
    ) -> Result<(), AppointmentError> {
        let existing = self.get_appointment(appointment_id).await?;

        if request.is_empty() {
            debug!("Empty patch for appointment {}, nothing to write", appointment_id);
            return Ok(());
        }

        let _guard = self.doctor_locks.lock(existing.doctor_id).await;

        // Re-read under the lock.
        let current = self.get_appointment(appointment_id).await?;

        let new_status = request.status.unwrap_or(current.status);
        let new_range = request.start_at.map(|start| self.slot(start)).transpose()?;
        let revived = !current.status.holds_slot() && new_status.holds_slot();

        if new_range.is_some() || revived {
            let candidate = new_range.unwrap_or_else(|| current.range());
            if self.conflict_service
                .is_overlapping(current.doctor_id, &candidate, Some(current.id))
                .await?
            {
                warn!("Rejected update of appointment {}: slot {} taken", current.id, candidate.start);
                return Err(AppointmentError::Conflict);
            }
        }

        let changes = AppointmentChanges {
            status: request.status,
            range: new_range,
        };

        self.store.update_appointment(current.id, &changes).await
            .map_err(store_failure("update appointment"))?;

        info!("Appointment {} updated: status {}, start {}",
              current.id, new_status, new_range.map_or(current.start_at, |r| r.start));

        Ok(())
    }

    fn slot(&self, start: DateTime<Utc>) -> Result<TimeRange, AppointmentError> {
        TimeRange::starting_at(start, self.appointment_minutes)
            .ok_or_else(|| AppointmentError::Validation("start_at is out of range".into()))
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.find_appointment(appointment_id).await
            .map_err(store_failure("fetch appointment"))?
            .ok_or(AppointmentError::NotFound)
    }
}
