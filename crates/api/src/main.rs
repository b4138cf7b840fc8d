use sawtfeel_api::{build_router, spawn_background_tasks, state::AppState};
use sawtfeel_config::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let state = AppState::new(settings).await?;
    spawn_background_tasks(&state);

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "SawtFeel API listening");
    axum::serve(listener, router).await?;

    Ok(())
}
