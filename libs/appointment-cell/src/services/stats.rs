use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use tracing::debug;

use shared_database::{AppointmentFilter, ClinicStore};
use shared_utils::state::AppState;

use crate::models::{AppointmentError, StatsGroup, StatsResponse, StatsRow};
use crate::services::store_failure;

pub const MAX_STATS_ROWS: usize = 60;

pub struct AppointmentStatsService {
    store: Arc<dyn ClinicStore>,
}

impl AppointmentStatsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    /// Per-bucket status counts for appointments starting in `[from, to)`,
    /// most recent bucket first.
    pub async fn appointment_stats(
        &self,
        group: StatsGroup,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<StatsResponse, AppointmentError> {
        debug!("Computing {:?} stats from {:?} to {:?}", group, from, to);

        let filter = AppointmentFilter {
            starts_from: from,
            starts_before: to,
            ..Default::default()
        };

        let appointments = self.store.list_appointments(&filter).await
            .map_err(store_failure("load appointments for stats"))?;

        let mut buckets: BTreeMap<DateTime<Utc>, StatsRow> = BTreeMap::new();
        for apt in &appointments {
            let bucket = bucket_start(group, apt.start_at);
            buckets
                .entry(bucket)
                .or_insert_with(|| StatsRow::empty(bucket))
                .count(apt.status);
        }

        let rows = buckets.into_values().rev().take(MAX_STATS_ROWS).collect();

        Ok(StatsResponse { group, rows })
    }
}

/// UTC truncation: ISO weeks start on Monday, months on the first.
pub fn bucket_start(group: StatsGroup, instant: DateTime<Utc>) -> DateTime<Utc> {
    let date = instant.date_naive();
    let first_day = match group {
        StatsGroup::Week => {
            date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        StatsGroup::Month => date.with_day(1).unwrap_or(date),
    };
    first_day.and_time(NaiveTime::MIN).and_utc()
}
