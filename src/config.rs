use std::fmt;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::telemetry::{LogFormat, DEFAULT_FILTER};

/// Longest lifetime accepted for either credential (one leap year).
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 366;

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub cookie_path: String,
    pub cookie_secure: bool,
}

// Hand-written so the signing secret never ends up in logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_minutes", &self.ttl_minutes)
            .field("refresh_ttl_minutes", &self.refresh_ttl_minutes)
            .field("cookie_path", &self.cookie_path)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub log_filter: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let auth = AuthConfig {
            secret,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "fintrack".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "fintrack-users".into()),
            ttl_minutes: parse_or(&var, "JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: parse_or(&var, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7)?,
            cookie_path: var("AUTH_COOKIE_PATH").unwrap_or_else(|| "/".into()),
            cookie_secure: parse_or(&var, "AUTH_COOKIE_SECURE", true)?,
        };

        for (key, minutes) in [
            ("JWT_TTL_MINUTES", auth.ttl_minutes),
            ("JWT_REFRESH_TTL_MINUTES", auth.refresh_ttl_minutes),
        ] {
            if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
                bail!("{key} must be between 1 and {MAX_TTL_MINUTES} minutes");
            }
        }

        Ok(Self {
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "APP_PORT", 8080)?,
            log_format: parse_or(&var, "LOG_FORMAT", LogFormat::default())?,
            log_filter: var("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.into()),
            auth,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = load(&[("JWT_SECRET", "s3cret")]).expect("config loads");
        assert_eq!(cfg.auth.issuer, "fintrack");
        assert_eq!(cfg.auth.audience, "fintrack-users");
        assert_eq!(cfg.auth.ttl_minutes, 60);
        assert_eq!(cfg.auth.refresh_ttl_minutes, 60 * 24 * 7);
        assert_eq!(cfg.auth.cookie_path, "/");
        assert!(cfg.auth.cookie_secure);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.log_filter, DEFAULT_FILTER);
    }

    #[test]
    fn log_settings_come_from_env() {
        let cfg = load(&[
            ("JWT_SECRET", "x"),
            ("LOG_FORMAT", "json"),
            ("RUST_LOG", "fintrack=trace"),
        ])
        .expect("config loads");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.log_filter, "fintrack=trace");

        let err = load(&[("JWT_SECRET", "x"), ("LOG_FORMAT", "xml")]).unwrap_err();
        assert!(err.to_string().contains("LOG_FORMAT"));
    }

    #[test]
    fn missing_or_blank_secret_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("JWT_SECRET", "   ")]).is_err());
    }

    #[test]
    fn unparseable_ttl_is_fatal() {
        let err = load(&[("JWT_SECRET", "x"), ("JWT_TTL_MINUTES", "soon")]).unwrap_err();
        assert!(err.to_string().contains("JWT_TTL_MINUTES"));
    }

    #[test]
    fn non_positive_ttl_is_fatal() {
        assert!(load(&[("JWT_SECRET", "x"), ("JWT_REFRESH_TTL_MINUTES", "0")]).is_err());
    }

    #[test]
    fn ttl_above_cap_is_fatal() {
        let err = load(&[("JWT_SECRET", "x"), ("JWT_TTL_MINUTES", "100000000000")]).unwrap_err();
        assert!(err.to_string().contains("JWT_TTL_MINUTES"));

        let cap = MAX_TTL_MINUTES.to_string();
        let cfg = load(&[("JWT_SECRET", "x"), ("JWT_REFRESH_TTL_MINUTES", &cap)])
            .expect("cap itself is accepted");
        assert_eq!(cfg.auth.refresh_ttl_minutes, MAX_TTL_MINUTES);

        let over = (MAX_TTL_MINUTES + 1).to_string();
        assert!(load(&[("JWT_SECRET", "x"), ("JWT_REFRESH_TTL_MINUTES", &over)]).is_err());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let cfg = load(&[("JWT_SECRET", "do-not-print-me")]).expect("config loads");
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("do-not-print-me"));
        assert!(printed.contains("<redacted>"));
    }
}
