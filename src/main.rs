use anyhow::Context;

use users_api::{
    app,
    config::{AppConfig, LoggingConfig},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("load configuration")?;
    init_tracing(&config.logging);
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "configuration loaded"
    );

    let state = AppState::init(config).await?;
    let app = app::build_app(state.clone());

    app::serve(app, &state).await?;

    state.db.close().await;
    tracing::info!("database connection closed, server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(logging.filter.as_str());
    if logging.json {
        builder.with_target(false).json().init();
    } else {
        builder.init();
    }
}
