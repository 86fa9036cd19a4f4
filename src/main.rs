use basket_invoice::{router, AppConfig, AppState};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging: local timestamps, RUST_LOG filter (default info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    let state = AppState::from_config(&config)?;
    info!(
        "Catalog: {} (min price {}), exports to {}",
        config.catalog.base_url,
        config.catalog.min_price,
        config.export.output_dir.display()
    );

    let app = router(state);

    let addr = config.bind_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST   /api/sessions                       - start a workflow session");
    info!("  POST   /api/sessions/:id/search            - catalog search");
    info!("  POST   /api/sessions/:id/basket            - select into basket");
    info!("  POST   /api/sessions/:id/invoice           - basket -> invoice");
    info!("  DELETE /api/sessions/:id/invoice/:item_id  - invoice -> basket");
    info!("  POST   /api/sessions/:id/ready             - export invoice by company");
    info!("  POST   /api/sessions/:id/upload            - upload exported documents");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
