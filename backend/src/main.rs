use society_ledger::{config::AppConfig, create_router, init_tracing, initialize_backend};
use tokio::net::TcpListener;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let app_state = initialize_backend(&config).await?;

    let mut changes = app_state.change_feed.subscribe_all();
    tokio::spawn(async move {
        while let Some(event) = changes.next().await {
            debug!("Change on {}: {:?}", event.collection(), event);
        }
    });

    let app = create_router(app_state, &config.cors_origin)?;

    info!("Society ledger listening on {}", config.bind_address);
    let listener = TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
