use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{ClinicStore, MemoryStore, SupabaseStore};

use crate::locks::KeyedLocks;

/// Everything a request handler needs; shared behind an `Arc` by all routers.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn ClinicStore>,
    /// Serializes check-and-write sections per doctor.
    pub doctor_locks: KeyedLocks<Uuid>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn ClinicStore>) -> Self {
        Self {
            config,
            store,
            doctor_locks: KeyedLocks::new(),
        }
    }

    /// Picks the PostgREST store when the database is configured, otherwise
    /// an in-memory store seeded with a demo roster.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn ClinicStore> = if config.is_configured() {
            info!("Using PostgREST store at {}", config.supabase_url);
            Arc::new(SupabaseStore::new(&config))
        } else {
            warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::with_demo_doctors())
        };

        Self::new(config, store)
    }
}
