use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Intake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Idle time after which a session expires: 30 minutes.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;

/// Conversation entries a driver lets one session accumulate.
pub const DEFAULT_MAX_CONVERSATION_LENGTH: usize = 50;

pub const ENV_SESSION_TIMEOUT_MINUTES: &str = "INTAKE_SESSION_TIMEOUT_MINUTES";
pub const ENV_MAX_CONVERSATION_LENGTH: &str = "INTAKE_MAX_CONVERSATION_LENGTH";
pub const ENV_EXTENDED_HISTORY: &str = "INTAKE_EXTENDED_HISTORY";
pub const ENV_REAPER_INTERVAL_SECS: &str = "INTAKE_REAPER_INTERVAL_SECS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "intake=debug,intake_lib=debug,info"
    } else {
        "intake=info,intake_lib=info,warn"
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Runtime settings for the intake engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationConfig {
    pub session_timeout: Duration,
    /// Enforced by the driver, not the engine.
    pub max_conversation_length: usize,
    /// Visit the optional personal/family/reproductive/review phases.
    pub collect_extended_history: bool,
    /// Background sweep interval; `None` relies on sweeps during access.
    pub reaper_interval: Option<Duration>,
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            max_conversation_length: DEFAULT_MAX_CONVERSATION_LENGTH,
            collect_extended_history: false,
            reaper_interval: None,
        }
    }
}

impl ConsultationConfig {
    /// Defaults overridden by any `INTAKE_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_SESSION_TIMEOUT_MINUTES) {
            let minutes: u64 = parse(ENV_SESSION_TIMEOUT_MINUTES, &value)?;
            if minutes == 0 {
                return Err(invalid(ENV_SESSION_TIMEOUT_MINUTES, &value));
            }
            config.session_timeout = Duration::from_secs(minutes * 60);
        }

        if let Some(value) = lookup(ENV_MAX_CONVERSATION_LENGTH) {
            config.max_conversation_length = parse(ENV_MAX_CONVERSATION_LENGTH, &value)?;
        }

        if let Some(value) = lookup(ENV_EXTENDED_HISTORY) {
            config.collect_extended_history = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid(ENV_EXTENDED_HISTORY, &value)),
            };
        }

        if let Some(value) = lookup(ENV_REAPER_INTERVAL_SECS) {
            let secs: u64 = parse(ENV_REAPER_INTERVAL_SECS, &value)?;
            config.reaper_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ConsultationConfig::default();
        assert_eq!(config.session_timeout, Duration::from_secs(1800));
        assert_eq!(config.max_conversation_length, 50);
        assert!(!config.collect_extended_history);
        assert!(config.reaper_interval.is_none());
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ConsultationConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ConsultationConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = ConsultationConfig::from_lookup(lookup_from(&[
            (ENV_SESSION_TIMEOUT_MINUTES, "10"),
            (ENV_MAX_CONVERSATION_LENGTH, "20"),
            (ENV_EXTENDED_HISTORY, "true"),
            (ENV_REAPER_INTERVAL_SECS, "60"),
        ]))
        .unwrap();
        assert_eq!(config.session_timeout, Duration::from_secs(600));
        assert_eq!(config.max_conversation_length, 20);
        assert!(config.collect_extended_history);
        assert_eq!(config.reaper_interval, Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_reaper_interval_disables_reaper() {
        let config =
            ConsultationConfig::from_lookup(lookup_from(&[(ENV_REAPER_INTERVAL_SECS, "0")])).unwrap();
        assert!(config.reaper_interval.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ConsultationConfig::from_lookup(lookup_from(&[(ENV_SESSION_TIMEOUT_MINUTES, "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_SESSION_TIMEOUT_MINUTES,
                value: "soon".into()
            }
        );
        assert!(ConsultationConfig::from_lookup(lookup_from(&[(ENV_SESSION_TIMEOUT_MINUTES, "0")])).is_err());
        assert!(ConsultationConfig::from_lookup(lookup_from(&[(ENV_EXTENDED_HISTORY, "maybe")])).is_err());
    }

    #[test]
    fn app_name_is_intake() {
        assert_eq!(APP_NAME, "Intake");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
