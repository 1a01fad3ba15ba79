use dotenv::dotenv;
use std::sync::Arc;
use tema_scraper::{api, config::ScraperConfig, pipeline::ScrapePipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ScraperConfig::from_env();
    tracing::info!(
        search_url = %config.search_url,
        fan_out = config.fan_out,
        render_timeout_secs = config.render_timeout.as_secs(),
        render_concurrency = config.render_concurrency,
        "configuration loaded"
    );

    let pipeline = ScrapePipeline::from_config(&config)?;
    let state = Arc::new(api::AppState {
        pipeline: Arc::new(pipeline),
    });
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Scraper listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
