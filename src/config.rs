use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    /// Default `estimated_completion_time` offset for routes submitted without one.
    pub default_completion_horizon_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            default_completion_horizon_hours: 24,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            default_completion_horizon_hours: parse_or_default(
                "DEFAULT_COMPLETION_HORIZON_HOURS",
                defaults.default_completion_horizon_hours,
            )?,
        }
        .validated()
    }

    pub fn validated(self) -> Result<Self, AppError> {
        if self.event_buffer_size == 0 {
            return Err(AppError::Internal(
                "invalid EVENT_BUFFER_SIZE: must be > 0".to_string(),
            ));
        }

        Ok(self)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
