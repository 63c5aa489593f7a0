use crate::auth::verifier::CredentialVerifier;
use crate::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Arc<CredentialVerifier>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let verifier = Arc::new(CredentialVerifier::new(&config.auth));
        Self {
            config: Arc::new(config),
            verifier,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_config(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            log_format: crate::telemetry::LogFormat::Pretty,
            log_filter: crate::telemetry::DEFAULT_FILTER.into(),
            auth: crate::auth::test_support::auth_config("test"),
        })
    }
}
