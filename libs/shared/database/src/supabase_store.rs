use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::clinic::{
    Appointment, AppointmentChanges, AppointmentDetails, AppointmentStatus, Doctor,
};

use crate::store::{AppointmentFilter, ClinicStore};
use crate::supabase::SupabaseClient;

const DOCTOR_COLUMNS: &str = "id,name,specialty,active";

/// Rows requested per page for unlimited listings. Matches PostgREST's
/// usual `max-rows`.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// `ClinicStore` backed by the `doctors` and `appointments` tables exposed
/// through PostgREST.
pub struct SupabaseStore {
    supabase: SupabaseClient,
    page_size: usize,
}

/// Row shape returned when the booked doctor is embedded in the select.
#[derive(Debug, Deserialize)]
struct AppointmentWithDoctorRow {
    #[serde(flatten)]
    appointment: Appointment,
    doctors: EmbeddedDoctor,
}

#[derive(Debug, Deserialize)]
struct EmbeddedDoctor {
    name: String,
    specialty: String,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_page_size(config, DEFAULT_PAGE_SIZE)
    }

    /// Page size must not exceed the server's `max-rows`, otherwise a
    /// truncated page looks like the last one.
    pub fn with_page_size(config: &AppConfig, page_size: usize) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            page_size: page_size.max(1),
        }
    }

    /// Runs the filter, following `offset` pages when no limit is set so the
    /// server's row cap cannot silently truncate the result.
    async fn fetch_appointment_rows(&self, filter: &AppointmentFilter, with_doctor: bool) -> Result<Vec<Value>> {
        if filter.limit.is_some() {
            let path = Self::appointments_path(filter, with_doctor);
            debug!("Listing appointments: {}", path);
            return self.supabase.request(Method::GET, &path, None).await;
        }

        let page_filter = AppointmentFilter {
            limit: Some(self.page_size),
            ..filter.clone()
        };
        let base_path = Self::appointments_path(&page_filter, with_doctor);

        let mut rows = Vec::new();
        loop {
            let path = format!("{}&offset={}", base_path, rows.len());
            debug!("Listing appointments: {}", path);

            let page: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
            let page_len = page.len();
            rows.extend(page);

            if page_len < self.page_size {
                return Ok(rows);
            }
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    /// Translates a filter into PostgREST query parameters. Embedding the
    /// doctor with `!inner` turns it into a join so the specialty predicate
    /// can drop rows.
    fn appointments_path(filter: &AppointmentFilter, with_doctor: bool) -> String {
        let mut query_parts = Vec::new();

        if with_doctor {
            query_parts.push("select=*,doctors!inner(name,specialty)".to_string());
        } else if filter.specialty.is_some() {
            query_parts.push("select=*,doctors!inner(specialty)".to_string());
        }

        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient) = &filter.patient {
            // Escaped so the name matches literally, like `AppointmentFilter::matches`.
            query_parts.push(format!(
                "patient_name=imatch.{}",
                urlencoding::encode(&regex::escape(patient))
            ));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(status) = filter.exclude_status {
            query_parts.push(format!("status=neq.{}", status));
        }
        if let Some(exclude_id) = filter.exclude_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }
        if let Some(specialty) = &filter.specialty {
            query_parts.push(format!("doctors.specialty=eq.{}", urlencoding::encode(specialty)));
        }
        if let Some(from) = filter.starts_from {
            query_parts.push(format!("start_at=gte.{}", encode_instant(from)));
        }
        if let Some(before) = filter.starts_before {
            query_parts.push(format!("start_at=lt.{}", encode_instant(before)));
        }
        if let Some(range) = &filter.overlapping {
            query_parts.push(format!("start_at=lt.{}", encode_instant(range.end)));
            query_parts.push(format!("end_at=gt.{}", encode_instant(range.start)));
        }

        let order = if filter.newest_first { "desc" } else { "asc" };
        // The id tiebreak keeps offset pages stable.
        query_parts.push(format!("order=start_at.{0},id.{0}", order));

        if let Some(limit) = filter.limit {
            query_parts.push(format!("limit={}", limit));
        }

        format!("/rest/v1/appointments?{}", query_parts.join("&"))
    }
}

fn encode_instant(instant: DateTime<Utc>) -> String {
    urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::Millis, true)).into_owned()
}

fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<Vec<T>> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| anyhow!("Failed to parse {}: {}", what, e))
}

#[async_trait]
impl ClinicStore for SupabaseStore {
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        debug!("Fetching doctor: {}", id);

        let path = format!("/rest/v1/doctors?id=eq.{}&select={}", id, DOCTOR_COLUMNS);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(parse_rows::<Doctor>(result, "doctor")?.into_iter().next())
    }

    async fn list_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>> {
        let mut query_parts = vec![
            format!("select={}", DOCTOR_COLUMNS),
            "active=eq.true".to_string(),
        ];
        if let Some(specialty) = specialty {
            query_parts.push(format!("specialty=eq.{}", urlencoding::encode(specialty)));
        }
        query_parts.push("order=specialty.asc,name.asc".to_string());

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        parse_rows(result, "doctors")
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        debug!("Fetching appointment: {}", id);

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(parse_rows::<Appointment>(result, "appointment")?.into_iter().next())
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let result = self.fetch_appointment_rows(filter, false).await?;
        parse_rows(result, "appointments")
    }

    async fn search_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<AppointmentDetails>> {
        let result = self.fetch_appointment_rows(filter, true).await?;
        let rows: Vec<AppointmentWithDoctorRow> = parse_rows(result, "appointments")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let doctor = Doctor {
                    id: row.appointment.doctor_id,
                    name: row.doctors.name,
                    specialty: row.doctors.specialty,
                    active: true,
                };
                AppointmentDetails::from_parts(row.appointment, &doctor)
            })
            .collect())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        let appointment_data = json!({
            "id": appointment.id,
            "patient_name": appointment.patient_name,
            "doctor_id": appointment.doctor_id,
            "start_at": appointment.start_at.to_rfc3339(),
            "end_at": appointment.end_at.to_rfc3339(),
            "status": appointment.status.as_str(),
            "created_at": appointment.created_at.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(appointment_data),
            Some(Self::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create appointment {}", appointment.id));
        }

        info!("Appointment {} stored for doctor {}", appointment.id, appointment.doctor_id);
        Ok(())
    }

    async fn update_appointment(&self, id: Uuid, changes: &AppointmentChanges) -> Result<()> {
        let mut update_data = Map::new();

        if let Some(status) = changes.status {
            update_data.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(range) = changes.range {
            update_data.insert("start_at".to_string(), json!(range.start.to_rfc3339()));
            update_data.insert("end_at".to_string(), json!(range.end.to_rfc3339()));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(Value::Object(update_data)),
            Some(Self::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update appointment {}", id));
        }

        Ok(())
    }
}
