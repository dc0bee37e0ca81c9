use std::{env, time::Duration as StdDuration};

use thiserror::Error;
use time::Duration;

use crate::models::billing::{PlanLimitsTable, DEFAULT_PER_SEAT_RATE_CENTS};
use crate::models::invitation::INVITATION_TTL_DAYS;
use crate::services::smtp_mailer::{SmtpConfig, TlsMode};

pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub per_millisecond: u64,
    pub burst: u32,
}

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub auth_cookie_secure: bool,
    pub invitation_ttl: Duration,
    pub operation_timeout: StdDuration,
    pub plan_limits: PlanLimitsTable,
    pub bind_addr: String,
    pub smtp: Option<SmtpConfig>,
    pub rate_limit: RateLimitSettings,
    pub log_format: LogFormat,
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let per_seat_rate_cents =
            parse_or(&get, "PER_SEAT_RATE_CENTS", DEFAULT_PER_SEAT_RATE_CENTS)?;
        if per_seat_rate_cents < 0 {
            return Err(ConfigError::Invalid {
                key: "PER_SEAT_RATE_CENTS",
                reason: "must not be negative".into(),
            });
        }
        let plan_limits = match get("PLAN_LIMITS_JSON") {
            Some(raw) => PlanLimitsTable::from_json(&raw).map_err(|e| ConfigError::Invalid {
                key: "PLAN_LIMITS_JSON",
                reason: e.to_string(),
            })?,
            None => PlanLimitsTable::with_per_seat_rate(per_seat_rate_cents),
        };

        let ttl_days: i64 = parse_or(&get, "INVITATION_TTL_DAYS", INVITATION_TTL_DAYS)?;
        if ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "INVITATION_TTL_DAYS",
                reason: "must be positive".into(),
            });
        }
        let timeout_secs: u64 =
            parse_or(&get, "OPERATION_TIMEOUT_SECS", DEFAULT_OPERATION_TIMEOUT_SECS)?;

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&get, "SMTP_PORT", 587u16)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                from: required("SMTP_FROM")?,
                tls_mode: get("SMTP_TLS")
                    .map(|v| TlsMode::parse(&v))
                    .unwrap_or(TlsMode::StartTls),
            }),
            None => None,
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            frontend_origin: required("FRONTEND_ORIGIN")?
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: get("JWT_ISSUER").unwrap_or_else(|| "minutes-backend".into()),
            jwt_audience: get("JWT_AUDIENCE").unwrap_or_else(|| "minutes-app".into()),
            auth_cookie_secure: parse_or(&get, "AUTH_COOKIE_SECURE", true)?,
            invitation_ttl: Duration::days(ttl_days),
            operation_timeout: StdDuration::from_secs(timeout_secs.max(1)),
            plan_limits,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            smtp,
            rate_limit: RateLimitSettings {
                // Default: 200ms/token (~5 req/sec)
                per_millisecond: parse_or(&get, "RATE_LIMITER_MILLISECONDS", 200u64)?,
                burst: parse_or(&get, "RATE_LIMITER_BURST", 20u32)?,
            },
            log_format: match get("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            sentry_dsn: get("SENTRY_DSN"),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        frontend_origin: "https://app.minutes.test".into(),
        jwt_secret: "0123456789abcdef0123456789abcdef".into(),
        jwt_issuer: "minutes-test".into(),
        jwt_audience: "minutes-test-app".into(),
        auth_cookie_secure: false,
        invitation_ttl: Duration::days(INVITATION_TTL_DAYS),
        operation_timeout: StdDuration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
        plan_limits: PlanLimitsTable::default(),
        bind_addr: DEFAULT_BIND_ADDR.into(),
        smtp: None,
        rate_limit: RateLimitSettings {
            per_millisecond: 200,
            burst: 20,
        },
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
    }
}
