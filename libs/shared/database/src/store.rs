use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_models::clinic::{
    Appointment, AppointmentChanges, AppointmentDetails, AppointmentStatus, Doctor, TimeRange,
};

/// Data-access seam between the booking services and the relational store.
///
/// Implementations only persist and filter; every scheduling rule lives in
/// the appointment services, which also serialize writes per doctor.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>>;

    /// Active doctors, optionally restricted to one specialty, ordered by
    /// specialty then name.
    async fn list_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>>;

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;

    async fn search_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<AppointmentDetails>>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()>;

    async fn update_appointment(&self, id: Uuid, changes: &AppointmentChanges) -> Result<()>;
}

/// Conjunction of optional predicates over appointments.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    /// Case-insensitive substring of the patient name.
    pub patient: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub exclude_status: Option<AppointmentStatus>,
    pub exclude_id: Option<Uuid>,
    /// Exact match on the booked doctor's specialty.
    pub specialty: Option<String>,
    /// Inclusive lower bound on `start_at`.
    pub starts_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `start_at`.
    pub starts_before: Option<DateTime<Utc>>,
    /// Keep only appointments whose `[start_at, end_at)` intersects this range.
    pub overlapping: Option<TimeRange>,
    pub newest_first: bool,
    pub limit: Option<usize>,
}

impl AppointmentFilter {
    pub fn for_doctor(doctor_id: Uuid) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            ..Default::default()
        }
    }

    /// Evaluates the filter in process. `doctor` is the booked doctor and is
    /// only consulted for the specialty predicate.
    pub fn matches(&self, appointment: &Appointment, doctor: Option<&Doctor>) -> bool {
        if let Some(doctor_id) = self.doctor_id {
            if appointment.doctor_id != doctor_id {
                return false;
            }
        }
        if let Some(patient) = &self.patient {
            let needle = patient.to_lowercase();
            if !appointment.patient_name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }
        if let Some(excluded) = self.exclude_status {
            if appointment.status == excluded {
                return false;
            }
        }
        if let Some(excluded) = self.exclude_id {
            if appointment.id == excluded {
                return false;
            }
        }
        if let Some(specialty) = &self.specialty {
            match doctor {
                Some(doctor) if &doctor.specialty == specialty => {}
                _ => return false,
            }
        }
        if let Some(from) = self.starts_from {
            if appointment.start_at < from {
                return false;
            }
        }
        if let Some(before) = self.starts_before {
            if appointment.start_at >= before {
                return false;
            }
        }
        if let Some(range) = &self.overlapping {
            if !appointment.range().overlaps(range) {
                return false;
            }
        }
        true
    }
}
