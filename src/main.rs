use anyhow::{Context, Result};
use marketfeed::{server, MarketAggregator, MemoryCache, ReqwestFetcher, Settings};
use std::{net::SocketAddr, sync::Arc};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    log::info!("Starting marketfeed...");

    let settings = Settings::load().context("Loading settings")?;
    let fetcher = Arc::new(ReqwestFetcher::build(&settings.http).context("Building HTTP client")?);
    let cache = Arc::new(MemoryCache::new());
    let aggregator = Arc::new(MarketAggregator::from_settings(&settings, fetcher, cache));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Parsing listen address {}:{}",
                settings.server.host, settings.server.port
            )
        })?;
    log::info!("Listening on http://{}", addr);
    warp::serve(server::routes(aggregator).with(warp::log("marketfeed")))
        .run(addr)
        .await;
    Ok(())
}
