use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use axum::http::{Request, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{field, Level, Span};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

pub const DEFAULT_FILTER: &str = "fintrack=debug,axum=info,tower_http=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Error)]
#[error("unknown log format `{0}`, expected `pretty` or `json`")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(UnknownLogFormat(s.to_owned())),
        }
    }
}

/// Installs the global subscriber. Fails on a malformed filter directive.
pub fn init(config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.with_target(false).json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
    .map_err(|e| anyhow!(e))
}

pub fn http_span<B>(req: &Request<B>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        status = field::Empty,
        latency_ms = field::Empty,
    )
}

pub fn record_response<B>(res: &Response<B>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", status.as_u16());
    span.record("latency_ms", latency.as_millis() as u64);
    let level = severity(status);
    if level == Level::ERROR {
        tracing::error!(%status, "request failed");
    } else if level == Level::WARN {
        tracing::warn!(%status, "request rejected");
    } else {
        tracing::info!(%status, "request served");
    }
}

/// Server faults are errors, client rejections (401/403 included) are warnings.
fn severity(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}
