//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use bizdesk_observability::LogFormat;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;
/// Thirty days.
pub const MAX_SESSION_TTL_MINUTES: i64 = 30 * 24 * 60;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    /// `true` when `JWT_SECRET` was unset and the dev default is in use.
    pub insecure_jwt_secret: bool,
    pub session_ttl: chrono::Duration,
    /// Postgres when set, in-memory store otherwise.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind", &self.bind)
            .field("insecure_jwt_secret", &self.insecure_jwt_secret)
            .field("session_ttl", &self.session_ttl)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("BIZDESK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "BIZDESK_BIND",
            message: format!("'{bind_raw}': {e}"),
        })?;

        let (jwt_secret, insecure_jwt_secret) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let ttl_minutes = match get("SESSION_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|m| (1..=MAX_SESSION_TTL_MINUTES).contains(m))
                .ok_or_else(|| ConfigError::Invalid {
                    key: "SESSION_TTL_MINUTES",
                    message: format!("'{raw}' must be between 1 and {MAX_SESSION_TTL_MINUTES} minutes"),
                })?,
            None => DEFAULT_SESSION_TTL_MINUTES,
        };
        let session_ttl = chrono::Duration::try_minutes(ttl_minutes).ok_or_else(|| ConfigError::Invalid {
            key: "SESSION_TTL_MINUTES",
            message: format!("{ttl_minutes} minutes is out of range"),
        })?;

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                key: "LOG_FORMAT",
                message: e.to_string(),
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind,
            jwt_secret,
            insecure_jwt_secret,
            session_ttl,
            database_url: get("DATABASE_URL"),
            log_format,
        })
    }
}
