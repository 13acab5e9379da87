mod config;
mod error;
mod fetch;
mod ingest;
mod location;
mod output;
mod parser;
mod proxy;

use config::Settings;
use error::Result;
use fetch::HttpFetcher;
use ingest::Ingestor;
use location::GeoLocator;
use log::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::default();
    let fetcher = HttpFetcher::new(settings.fetch_timeout, settings.max_redirects);
    let locator = GeoLocator::open(&settings.geoip_db);

    let mut ingestor = Ingestor::new(&fetcher, &locator);
    for source in &settings.sources {
        ingestor.ingest_list(&source.path, source.format).await;
    }
    let registry = ingestor.into_registry();
    if registry.is_empty() {
        warn!("[Init] no proxies collected");
    }
    info!("[Init] {} unique proxies", registry.len());

    // 模板缺失时直接失败
    for target in &settings.profiles {
        output::write_profile(
            &target.template,
            &target.output,
            registry.proxies(),
            &settings.groups,
        )?;
    }

    if let Err(e) = output::write_share_links(&settings.share_links, registry.proxies()) {
        warn!("[ShareLink] {}", e);
        return Ok(());
    }
    if let Err(e) = output::write_bundle(&settings.share_links, &settings.bundle) {
        warn!("[Bundle] {}", e);
    }
    Ok(())
}
