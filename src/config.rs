use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => bail!("{key} must be set"),
            }
        };

        let database_url = required("DATABASE_URL")?;
        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS")?,
            None => 10,
        };
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT").or_else(|| lookup("PORT")) {
            Some(v) => v.parse().context("APP_PORT")?,
            None => 8000,
        };

        let jwt = JwtConfig {
            access_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_secret: required("REFRESH_TOKEN_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "taskdesk".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "taskdesk-users".into()),
            access_ttl: parse_expiry(&lookup("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|| "1d".into()))
                .context("ACCESS_TOKEN_EXPIRY")?,
            refresh_ttl: parse_expiry(
                &lookup("REFRESH_TOKEN_EXPIRY").unwrap_or_else(|| "10d".into()),
            )
            .context("REFRESH_TOKEN_EXPIRY")?,
        };

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            db_max_connections,
            host,
            port,
            jwt,
            cookie_secure,
            cors_origins,
        })
    }
}

const MAX_EXPIRY_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Parses `90`, `30s`, `15m`, `12h` or `7d`. A bare number is seconds.
pub fn parse_expiry(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        Some(_) => (raw, None),
        None => bail!("empty expiry"),
    };
    let amount: u64 = digits
        .parse()
        .with_context(|| format!("invalid expiry {raw:?}"))?;
    if amount == 0 {
        bail!("expiry must be positive");
    }
    let unit_secs: u64 = match unit {
        None | Some('s') => 1,
        Some('m') => 60,
        Some('h') => 60 * 60,
        Some('d') => 60 * 60 * 24,
        Some(other) => bail!("unknown expiry unit {other:?}"),
    };
    match amount.checked_mul(unit_secs) {
        Some(secs) if secs <= MAX_EXPIRY_SECS => Ok(Duration::from_secs(secs)),
        _ => bail!("expiry {raw:?} exceeds 100 years"),
    }
}
