use fintrack::{app, config::AppConfig, state::AppState, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    telemetry::init(&config)?;
    tracing::info!(
        issuer = %config.auth.issuer,
        access_ttl_minutes = config.auth.ttl_minutes,
        refresh_ttl_minutes = config.auth.refresh_ttl_minutes,
        log_format = ?config.log_format,
        "auth configured"
    );

    let state = AppState::from_config(config);
    let config = state.config.clone();
    app::serve(app::build_app(state), &config).await
}
