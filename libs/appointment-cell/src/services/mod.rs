pub mod availability;
pub mod booking;
pub mod conflict;
pub mod search;
pub mod stats;

pub use availability::AvailabilityService;
pub use booking::AppointmentBookingService;
pub use conflict::ConflictDetectionService;
pub use search::AppointmentSearchService;
pub use stats::AppointmentStatsService;

use tracing::error;

use crate::models::AppointmentError;

/// Logs a store failure and turns it into the cell error.
pub(crate) fn store_failure(action: &'static str) -> impl Fn(anyhow::Error) -> AppointmentError {
    move |e| {
        error!("Failed to {}: {}", action, e);
        AppointmentError::Store(e.to_string())
    }
}
