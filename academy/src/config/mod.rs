//! Central module for application-wide configuration settings.
//!
//! Configuration comes from the environment (a `.env` file is honoured).
//! The platform URL and public API key are required; without them the
//! console refuses to start. Everything else has a default.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PROFILE_TIMEOUT_MS: u64 = 5_000;
/// Pause after an auth notification before the profile is fetched, giving
/// the platform client time to finish propagating the new token. Identity
/// re-validation still guards the result.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
pub const DEFAULT_SESSION_FILE: &str = ".academy/session.json";
pub const DEFAULT_STORAGE_KEY: &str = "ibdae-academy-auth-session";
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:3000/";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

#[derive(Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub request_timeout: Duration,
    pub profile_timeout: Duration,
    pub settle_delay: Duration,
    pub session_file: PathBuf,
    pub storage_key: String,
    pub redirect_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &"***")
            .field("request_timeout", &self.request_timeout)
            .field("profile_timeout", &self.profile_timeout)
            .field("settle_delay", &self.settle_delay)
            .field("session_file", &self.session_file)
            .field("storage_key", &self.storage_key)
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Required Variables
    ///
    /// - `SUPABASE_URL` - platform base URL (http or https)
    /// - `SUPABASE_ANON_KEY` - public API key
    ///
    /// # Optional Variables
    ///
    /// - `ACADEMY_REQUEST_TIMEOUT_MS` (default 10000)
    /// - `ACADEMY_PROFILE_TIMEOUT_MS` (default 5000)
    /// - `ACADEMY_SETTLE_DELAY_MS` (default 100)
    /// - `ACADEMY_SESSION_FILE` (default `.academy/session.json`)
    /// - `ACADEMY_STORAGE_KEY` (default `ibdae-academy-auth-session`)
    /// - `ACADEMY_REDIRECT_URL` (default `http://localhost:3000/`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        let supabase_url = required("SUPABASE_URL")?;
        if !(supabase_url.starts_with("https://") || supabase_url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                var: "SUPABASE_URL".to_string(),
                message: "must start with http:// or https://".to_string(),
            });
        }
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;

        let millis = |key: &str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(Duration::from_millis(default)),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| ConfigError::InvalidValue {
                        var: key.to_string(),
                        message: e.to_string(),
                    }),
            }
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            request_timeout: millis("ACADEMY_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?,
            profile_timeout: millis("ACADEMY_PROFILE_TIMEOUT_MS", DEFAULT_PROFILE_TIMEOUT_MS)?,
            settle_delay: millis("ACADEMY_SETTLE_DELAY_MS", DEFAULT_SETTLE_DELAY_MS)?,
            session_file: lookup("ACADEMY_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
            storage_key: lookup("ACADEMY_STORAGE_KEY")
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            redirect_url: lookup("ACADEMY_REDIRECT_URL")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://project.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.profile_timeout, Duration::from_secs(5));
        assert_eq!(config.settle_delay, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn missing_url_is_fatal() {
        let err = Config::from_lookup(lookup(&[("SUPABASE_ANON_KEY", "anon")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("SUPABASE_URL".to_string()));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "  "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("SUPABASE_ANON_KEY".to_string()));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("ACADEMY_SETTLE_DELAY_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == "ACADEMY_SETTLE_DELAY_MS"));
    }

    #[test]
    fn debug_hides_key() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "very-secret"),
        ]))
        .unwrap();
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
