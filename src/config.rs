use std::{fmt, time::Duration};

use thiserror::Error;

use crate::quiz::generator::DEFAULT_MAX_ATTEMPTS;

pub const API_KEY_VAR: &str = "CHATGPT_API_KEY";
pub const MAX_ATTEMPTS_VAR: &str = "QUIZ_MAX_ATTEMPTS";
pub const REQUEST_TIMEOUT_VAR: &str = "QUIZ_REQUEST_TIMEOUT_SECS";
pub const TEMPERATURE_VAR: &str = "QUIZ_TEMPERATURE";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Runtime settings for the question generator.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub max_attempts: u32,
    pub request_timeout: Duration,
    pub temperature: f32,
}

// The key must never end up in logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("max_attempts", &self.max_attempts)
            .field("request_timeout", &self.request_timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing(API_KEY_VAR))?;

        let max_attempts = match lookup(MAX_ATTEMPTS_VAR) {
            None => DEFAULT_MAX_ATTEMPTS,
            Some(value) => match value.trim().parse::<u32>() {
                Ok(attempts) if attempts >= 1 => attempts,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: MAX_ATTEMPTS_VAR,
                        value,
                        reason: "expected a whole number of at least 1",
                    })
                }
            },
        };

        let request_timeout = match lookup(REQUEST_TIMEOUT_VAR) {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: REQUEST_TIMEOUT_VAR,
                        value,
                        reason: "expected a positive number of seconds",
                    })
                }
            },
        };

        let temperature = match lookup(TEMPERATURE_VAR) {
            None => DEFAULT_TEMPERATURE,
            Some(value) => match value.trim().parse::<f32>() {
                Ok(t) if (0.0..=2.0).contains(&t) => t,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: TEMPERATURE_VAR,
                        value,
                        reason: "expected a number between 0 and 2",
                    })
                }
            },
        };

        Ok(Self {
            api_key,
            max_attempts,
            request_timeout,
            temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let settings = Settings::from_lookup(lookup(&[(API_KEY_VAR, "sk-test")])).unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
        assert_eq!(settings.temperature, 0.8);
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        assert_eq!(
            Settings::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing(API_KEY_VAR)
        );
        assert_eq!(
            Settings::from_lookup(lookup(&[(API_KEY_VAR, "  ")])).unwrap_err(),
            ConfigError::Missing(API_KEY_VAR)
        );
    }

    #[test]
    fn overrides_are_parsed_and_checked() {
        let settings = Settings::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-test"),
            (MAX_ATTEMPTS_VAR, "5"),
            (REQUEST_TIMEOUT_VAR, "30"),
            (TEMPERATURE_VAR, "0.2"),
        ]))
        .unwrap();
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.temperature, 0.2);

        let err = Settings::from_lookup(lookup(&[(API_KEY_VAR, "sk-test"), (MAX_ATTEMPTS_VAR, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: MAX_ATTEMPTS_VAR, .. }));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let settings = Settings::from_lookup(lookup(&[(API_KEY_VAR, "sk-secret")])).unwrap();
        assert!(!format!("{:?}", settings).contains("sk-secret"));
    }
}
