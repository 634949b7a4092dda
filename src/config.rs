use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub eta_min_minutes: f64,
    pub eta_max_minutes: f64,
    pub progress_tick_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            eta_min_minutes: parse_or_default("ETA_MIN_MINUTES", 10.0)?,
            eta_max_minutes: parse_or_default("ETA_MAX_MINUTES", 25.0)?,
            progress_tick_ms: parse_or_default("PROGRESS_TICK_MS", 50)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.eta_min_minutes > self.eta_max_minutes {
            return Err(AppError::Internal(
                "ETA_MIN_MINUTES must not exceed ETA_MAX_MINUTES".to_string(),
            ));
        }

        // The tracking stream's timer cannot run with a zero period.
        if self.progress_tick_ms == 0 {
            return Err(AppError::Internal(
                "PROGRESS_TICK_MS must be greater than zero".to_string(),
            ));
        }

        Ok(())
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

#[cfg(test)]
mod tests {
    use super::Config;

    fn config() -> Config {
        Config {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            eta_min_minutes: 10.0,
            eta_max_minutes: 25.0,
            progress_tick_ms: 50,
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn inverted_eta_bounds_are_rejected() {
        let mut config = config();
        config.eta_min_minutes = 30.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_progress_tick_is_rejected() {
        let mut config = config();
        config.progress_tick_ms = 0;

        assert!(config.validate().is_err());
    }
}
