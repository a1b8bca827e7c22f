use std::cmp::Reverse;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::clinic::{Appointment, AppointmentChanges, AppointmentDetails, Doctor};

use crate::store::{AppointmentFilter, ClinicStore};

#[derive(Default)]
struct Tables {
    doctors: Vec<Doctor>,
    appointments: Vec<Appointment>,
}

/// Process-local store. Used by the test suites and by the server when no
/// database is configured.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctors(doctors: Vec<Doctor>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                doctors,
                appointments: Vec::new(),
            }),
        }
    }

    /// Small roster so a freshly started server has something to book against.
    pub fn with_demo_doctors() -> Self {
        let roster = [
            ("Dra. Camila Rojas", "Medicina General"),
            ("Dr. Tomás Fuentes", "Medicina General"),
            ("Dra. Valentina Soto", "Pediatría"),
            ("Dr. Ignacio Morales", "Cardiología"),
            ("Dra. Francisca Vidal", "Dermatología"),
        ];

        Self::with_doctors(
            roster
                .iter()
                .map(|(name, specialty)| Doctor {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    specialty: specialty.to_string(),
                    active: true,
                })
                .collect(),
        )
    }

    pub async fn add_doctor(&self, doctor: Doctor) {
        self.tables.write().await.doctors.push(doctor);
    }

    pub async fn appointment_count(&self) -> usize {
        self.tables.read().await.appointments.len()
    }
}

impl Tables {
    fn doctor(&self, id: Uuid) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }

    fn select(&self, filter: &AppointmentFilter) -> Vec<&Appointment> {
        let mut rows: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|apt| filter.matches(apt, self.doctor(apt.doctor_id)))
            .collect();

        if filter.newest_first {
            rows.sort_by_key(|apt| Reverse(apt.start_at));
        } else {
            rows.sort_by_key(|apt| apt.start_at);
        }

        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        rows
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.tables.read().await.doctor(id).cloned())
    }

    async fn list_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>> {
        let tables = self.tables.read().await;
        let mut doctors: Vec<Doctor> = tables
            .doctors
            .iter()
            .filter(|d| d.active)
            .filter(|d| specialty.is_none_or(|s| d.specialty == s))
            .cloned()
            .collect();

        doctors.sort_by(|a, b| {
            a.specialty
                .cmp(&b.specialty)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(doctors)
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.iter().find(|apt| apt.id == id).cloned())
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(tables.select(filter).into_iter().cloned().collect())
    }

    async fn search_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<AppointmentDetails>> {
        let tables = self.tables.read().await;
        let rows = tables
            .select(filter)
            .into_iter()
            .filter_map(|apt| {
                tables
                    .doctor(apt.doctor_id)
                    .map(|doctor| AppointmentDetails::from_parts(apt.clone(), doctor))
            })
            .collect();
        Ok(rows)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Mirrors the foreign key and primary key constraints of the relational schema.
        if tables.doctor(appointment.doctor_id).is_none() {
            return Err(anyhow!("doctor {} does not exist", appointment.doctor_id));
        }
        if tables.appointments.iter().any(|apt| apt.id == appointment.id) {
            return Err(anyhow!("appointment {} already exists", appointment.id));
        }

        debug!("Inserting appointment {} in memory", appointment.id);
        tables.appointments.push(appointment.clone());
        Ok(())
    }

    async fn update_appointment(&self, id: Uuid, changes: &AppointmentChanges) -> Result<()> {
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .iter_mut()
            .find(|apt| apt.id == id)
            .ok_or_else(|| anyhow!("appointment {} does not exist", id))?;

        changes.apply_to(appointment);
        Ok(())
    }
}
