use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{AppointmentFilter, ClinicStore};
use shared_models::clinic::{AppointmentStatus, TimeRange};

use crate::models::AppointmentError;
use crate::services::store_failure;

pub struct ConflictDetectionService {
    store: Arc<dyn ClinicStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// True when a non-cancelled appointment of `doctor_id`, other than
    /// `exclude_id`, intersects `candidate`.
    ///
    /// Callers must hold the doctor's lock from this check until their write
    /// lands, otherwise two bookings can both see a free slot.
    pub async fn is_overlapping(
        &self,
        doctor_id: Uuid,
        candidate: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        debug!("Checking conflicts for doctor {} from {} to {}",
               doctor_id, candidate.start, candidate.end);

        let filter = AppointmentFilter {
            exclude_status: Some(AppointmentStatus::Cancelled),
            exclude_id,
            overlapping: Some(*candidate),
            limit: Some(1),
            ..AppointmentFilter::for_doctor(doctor_id)
        };

        let existing = self.store.list_appointments(&filter).await
            .map_err(store_failure("check appointment overlap"))?;

        // Adapters filter too; this predicate is the authoritative one.
        let conflict = existing.iter().find(|apt| {
            apt.status.holds_slot()
                && Some(apt.id) != exclude_id
                && apt.range().overlaps(candidate)
        });

        if let Some(apt) = conflict {
            warn!("Conflict detected for doctor {}: appointment {} occupies {} - {}",
                  doctor_id, apt.id, apt.start_at, apt.end_at);
            return Ok(true);
        }

        Ok(false)
    }
}
