use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// DOCTORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub active: bool,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[default]
    Confirmed,
    Done,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Done => "DONE",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Cancelled appointments never block a slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "DONE" => Ok(AppointmentStatus::Done),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status: {}", other)),
        }
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `None` when the end falls outside the representable range.
    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> Option<Self> {
        let end = Duration::try_minutes(minutes).and_then(|d| start.checked_add_signed(d))?;
        Some(Self { start, end })
    }

    /// Touching ranges (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_at, self.end_at)
    }
}

/// Appointment joined with the doctor it is booked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentDetails {
    pub id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl AppointmentDetails {
    pub fn from_parts(appointment: Appointment, doctor: &Doctor) -> Self {
        Self {
            id: appointment.id,
            patient_name: appointment.patient_name,
            doctor_id: appointment.doctor_id,
            doctor_name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            start_at: appointment.start_at,
            end_at: appointment.end_at,
            status: appointment.status,
            created_at: appointment.created_at,
        }
    }
}

/// Partial update applied by the store; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentChanges {
    pub status: Option<AppointmentStatus>,
    pub range: Option<TimeRange>,
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.range.is_none()
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(range) = self.range {
            appointment.start_at = range.start;
            appointment.end_at = range.end;
        }
    }
}
