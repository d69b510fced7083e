use std::str::FromStr;

use anyhow::{Context, Result};

use crate::gcode::emitter::MachineSettings;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Machine defaults applied to exports that do not override them.
    pub machine: MachineSettings,
    /// Upper bound on accepted text size in bytes.
    pub max_text_bytes: usize,
    /// Seconds a finished export job stays readable before it is pruned.
    pub job_retention_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = MachineSettings::default();
        let machine = MachineSettings {
            travel_feed_rate: parse_env("TRAVEL_FEED_RATE", defaults.travel_feed_rate)?,
            draw_feed_rate: parse_env("DRAW_FEED_RATE", defaults.draw_feed_rate)?,
            pen_up_command: env_or("PEN_UP_COMMAND", &defaults.pen_up_command),
            pen_down_command: env_or("PEN_DOWN_COMMAND", &defaults.pen_down_command),
        };
        machine
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid machine configuration")?;

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            machine,
            max_text_bytes: parse_env("MAX_TEXT_BYTES", 1_000_000)?,
            job_retention_secs: parse_env("JOB_RETENTION_SECS", 3600)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            machine: MachineSettings::default(),
            max_text_bytes: 1_000_000,
            job_retention_secs: 3600,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_default_and_error() {
        assert_eq!(parse_env::<u32>("SCRIBE_TEST_UNSET_VAR", 42).unwrap(), 42);

        std::env::set_var("SCRIBE_TEST_BAD_PORT", "eighty");
        let err = parse_env::<u16>("SCRIBE_TEST_BAD_PORT", 8080).unwrap_err();
        assert!(err.to_string().contains("SCRIBE_TEST_BAD_PORT"));

        std::env::set_var("SCRIBE_TEST_GOOD_RATE", " 2500 ");
        assert_eq!(parse_env::<u32>("SCRIBE_TEST_GOOD_RATE", 0).unwrap(), 2500);
    }

    #[test]
    fn test_default_config_matches_machine_defaults() {
        let config = Config::default();
        assert_eq!(config.machine, MachineSettings::default());
        assert_eq!(config.max_text_bytes, 1_000_000);
        assert_eq!(config.job_retention_secs, 3600);
    }
}
