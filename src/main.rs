use anyhow::anyhow;
use hotelbook::{app, config::Config, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hotelbook=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tokio::fs::create_dir_all(&config.storage_dir).await?;

    let db_pool = db::connect(&config.database_url).await?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, db_pool)
        .await
        .map_err(|e| anyhow!("failed to set up app state: {e:?}"))?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
