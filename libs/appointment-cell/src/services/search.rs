use std::sync::Arc;

use tracing::debug;

use shared_database::{AppointmentFilter, ClinicStore};
use shared_models::clinic::AppointmentDetails;
use shared_utils::state::AppState;

use crate::models::AppointmentError;
use crate::services::store_failure;

pub const MAX_LISTED_APPOINTMENTS: usize = 1000;

pub struct AppointmentSearchService {
    store: Arc<dyn ClinicStore>,
}

impl AppointmentSearchService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    /// Matching appointments joined with their doctor, newest start first.
    pub async fn search_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let filter = AppointmentFilter {
            newest_first: true,
            limit: Some(MAX_LISTED_APPOINTMENTS),
            ..filter
        };

        debug!("Searching appointments with {:?}", filter);

        self.store.search_appointments(&filter).await
            .map_err(store_failure("search appointments"))
    }
}
