use std::sync::Arc;

use tracing::{debug, error};

use shared_database::ClinicStore;
use shared_models::clinic::Doctor;
use shared_utils::state::AppState;

use crate::models::DoctorError;

pub struct DoctorService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    /// Active doctors, optionally narrowed to one specialty.
    pub async fn list_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors with specialty filter {:?}", specialty);

        self.store.list_doctors(specialty).await.map_err(|e| {
            error!("Failed to list doctors: {}", e);
            DoctorError::DatabaseError(e.to_string())
        })
    }
}
