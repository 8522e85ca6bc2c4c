use tokio::net::TcpListener;
use tracing::info;
use smart_scraper_agent::{
    config::Config,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;
    info!(
        model = %config.llm.model,
        backend = ?config.browser.backend,
        data_dir = %config.data_dir.display(),
        "starting smart scraper agent"
    );

    // Create application state
    let app_state = AppState::from_config(config).await?;
    {
        let pipeline = app_state.pipeline.lock().await;
        info!(entries = pipeline.history().len(), "history loaded");
    }

    // Build the router with routes
    let app = create_router(app_state);

    // Create the listener
    let listener = TcpListener::bind(server_addr).await?;

    // Start the server
    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
