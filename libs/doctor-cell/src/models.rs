use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialty: Option<String>,
}

impl DoctorSearchQuery {
    /// Blank values mean "no filter", matching what the booking UI sends.
    pub fn specialty(&self) -> Option<&str> {
        self.specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
