use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{ClinicStore, MemoryStore};
use shared_models::clinic::{Appointment, AppointmentStatus, Doctor};

use crate::state::AppState;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub appointment_minutes: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            appointment_minutes: 30,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            appointment_minutes: self.appointment_minutes,
            ..AppConfig::default()
        }
    }
}

pub struct TestDoctor;

impl TestDoctor {
    pub fn new(name: &str, specialty: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            specialty: specialty.to_string(),
            active: true,
        }
    }

    pub fn general(name: &str) -> Doctor {
        Self::new(name, "Medicina General")
    }

    pub fn inactive(name: &str, specialty: &str) -> Doctor {
        Doctor {
            active: false,
            ..Self::new(name, specialty)
        }
    }
}

/// A memory-backed `AppState` plus a typed handle on the same store so tests
/// can seed and inspect it directly.
pub struct TestClinic {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
}

impl TestClinic {
    pub fn with_doctors(doctors: Vec<Doctor>) -> Self {
        Self::with_config(TestConfig::default(), doctors)
    }

    pub fn with_config(config: TestConfig, doctors: Vec<Doctor>) -> Self {
        let store = Arc::new(MemoryStore::with_doctors(doctors));
        let dyn_store: Arc<dyn ClinicStore> = store.clone();
        let state = Arc::new(AppState::new(config.to_app_config(), dyn_store));
        Self { state, store }
    }

    /// Inserts a row directly, bypassing every scheduling rule.
    pub async fn seed_appointment(
        &self,
        doctor_id: Uuid,
        patient_name: &str,
        start_at: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Appointment {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_name: patient_name.to_string(),
            doctor_id,
            start_at,
            end_at: start_at + Duration::minutes(self.state.config.appointment_minutes),
            status,
            created_at: Utc::now(),
        };
        self.store
            .insert_appointment(&appointment)
            .await
            .expect("seeding appointment");
        appointment
    }
}

/// Fixed UTC instant helper for readable schedules in tests.
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test instant")
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_row(doctor: &Doctor) -> serde_json::Value {
        json!({
            "id": doctor.id,
            "name": doctor.name,
            "specialty": doctor.specialty,
            "active": doctor.active
        })
    }

    pub fn appointment_row(appointment: &Appointment) -> serde_json::Value {
        json!({
            "id": appointment.id,
            "patient_name": appointment.patient_name,
            "doctor_id": appointment.doctor_id,
            "start_at": appointment.start_at.to_rfc3339(),
            "end_at": appointment.end_at.to_rfc3339(),
            "status": appointment.status.as_str(),
            "created_at": appointment.created_at.to_rfc3339()
        })
    }

    pub fn appointment_with_doctor_row(appointment: &Appointment, doctor: &Doctor) -> serde_json::Value {
        let mut row = Self::appointment_row(appointment);
        row["doctors"] = json!({
            "name": doctor.name,
            "specialty": doctor.specialty
        });
        row
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
