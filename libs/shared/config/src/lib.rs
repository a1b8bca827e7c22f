use std::env;
use tracing::warn;

pub const DEFAULT_APPOINTMENT_MINUTES: i64 = 30;
/// One day.
pub const MAX_APPOINTMENT_MINUTES: i64 = 24 * 60;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    /// Fixed length of every appointment; end time is always start + this.
    pub appointment_minutes: i64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            appointment_minutes: DEFAULT_APPOINTMENT_MINUTES,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            appointment_minutes: parse_minutes(env::var("APPOINTMENT_MINUTES").ok()),
            port: parse_port(env::var("PORT").ok()),
        };

        if !config.is_configured() {
            warn!("Database not configured - falling back to the in-memory store");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
    }
}

fn parse_minutes(raw: Option<String>) -> i64 {
    match raw.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_APPOINTMENT_MINUTES,
        Some(value) => match value.parse::<i64>() {
            Ok(minutes) if (1..=MAX_APPOINTMENT_MINUTES).contains(&minutes) => minutes,
            _ => {
                warn!("APPOINTMENT_MINUTES={} is not between 1 and {}, using default",
                      value, MAX_APPOINTMENT_MINUTES);
                DEFAULT_APPOINTMENT_MINUTES
            }
        },
    }
}

fn parse_port(raw: Option<String>) -> u16 {
    match raw.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_PORT,
        Some(value) => value.parse::<u16>().unwrap_or_else(|_| {
            warn!("PORT={} is not a valid port, using default", value);
            DEFAULT_PORT
        }),
    }
}
