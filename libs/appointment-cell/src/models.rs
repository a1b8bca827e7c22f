// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::AppointmentFilter;
use shared_models::clinic::AppointmentStatus;

pub const MIN_PATIENT_NAME_CHARS: usize = 2;

// ==============================================================================
// REQUEST BODIES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

/// Partial update. Fields left out keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchAppointmentRequest {
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
}

impl PatchAppointmentRequest {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.start_at.is_none()
    }
}

// ==============================================================================
// QUERY PARAMETERS
// ==============================================================================
//
// Query values arrive as raw strings so that blank parameters can be treated
// as absent and malformed ones reported as validation errors.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub patient: Option<String>,
    pub doctor_id: Option<String>,
    pub status: Option<String>,
    pub specialty: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AppointmentListQuery {
    pub fn to_filter(&self) -> Result<AppointmentFilter, AppointmentError> {
        Ok(AppointmentFilter {
            patient: present(&self.patient).map(str::to_string),
            doctor_id: present(&self.doctor_id)
                .map(|raw| parse_uuid("doctor_id", raw))
                .transpose()?,
            status: present(&self.status).map(parse_status).transpose()?,
            specialty: present(&self.specialty).map(str::to_string),
            starts_from: present(&self.from)
                .map(|raw| parse_instant("from", raw))
                .transpose()?,
            starts_before: present(&self.to)
                .map(|raw| parse_instant("to", raw))
                .transpose()?,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

impl AvailabilityQuery {
    pub fn parse(&self) -> Result<(Uuid, NaiveDate), AppointmentError> {
        match (present(&self.doctor_id), present(&self.date)) {
            (Some(doctor_id), Some(date)) => {
                let doctor_id = parse_uuid("doctor_id", doctor_id)?;
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                    AppointmentError::Validation(format!("date must be YYYY-MM-DD, got '{}'", date))
                })?;
                Ok((doctor_id, date))
            }
            _ => Err(AppointmentError::Validation(
                "doctor_id and date are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub group: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl StatsQuery {
    pub fn group(&self) -> StatsGroup {
        match present(&self.group) {
            Some("month") => StatsGroup::Month,
            _ => StatsGroup::Week,
        }
    }

    pub fn range(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppointmentError> {
        let from = present(&self.from)
            .map(|raw| parse_instant("from", raw))
            .transpose()?;
        let to = present(&self.to)
            .map(|raw| parse_instant("to", raw))
            .transpose()?;
        Ok((from, to))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(raw).map_err(|_| {
        AppointmentError::Validation(format!("{} must be a UUID, got '{}'", field, raw))
    })
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, AppointmentError> {
    raw.parse().map_err(AppointmentError::Validation)
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` meaning midnight UTC.
pub fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, AppointmentError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| {
            AppointmentError::Validation(format!("{} must be an ISO-8601 timestamp, got '{}'", field, raw))
        })
}

/// Trimmed patient name, rejected when shorter than two characters.
pub fn validate_patient_name(raw: &str) -> Result<String, AppointmentError> {
    let name = raw.trim();
    if name.chars().count() < MIN_PATIENT_NAME_CHARS {
        return Err(AppointmentError::Validation(format!(
            "patient_name must have at least {} characters",
            MIN_PATIENT_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

// ==============================================================================
// RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccupiedSlot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub slot_minutes: i64,
    pub occupied: Vec<OccupiedSlot>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsGroup {
    Week,
    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsRow {
    pub bucket: DateTime<Utc>,
    pub total: u32,
    pub confirmed: u32,
    pub done: u32,
    pub cancelled: u32,
}

impl StatsRow {
    pub fn empty(bucket: DateTime<Utc>) -> Self {
        Self {
            bucket,
            total: 0,
            confirmed: 0,
            done: 0,
            cancelled: 0,
        }
    }

    pub fn count(&mut self, status: AppointmentStatus) {
        self.total += 1;
        match status {
            AppointmentStatus::Confirmed => self.confirmed += 1,
            AppointmentStatus::Done => self.done += 1,
            AppointmentStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub group: StatsGroup,
    pub rows: Vec<StatsRow>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("The selected time is already booked for this doctor")]
    Conflict,

    #[error("Store error: {0}")]
    Store(String),
}
