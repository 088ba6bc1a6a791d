pub mod aggregator;
pub mod config;
pub mod display;
pub mod error;
pub mod log;
pub mod model;
pub mod providers;
pub mod rate_provider;
pub mod ui;

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::config::AppConfig;
use crate::model::{DateRange, ProviderSelection, RateQuery, TableVariant};
use crate::providers::ecb::EcbProvider;
use crate::providers::nbp::NbpProvider;
use crate::rate_provider::RateProvider;

/// A parsed fetch request from the CLI.
pub struct FetchRequest {
    pub currency: String,
    pub range: Option<DateRange>,
    pub selection: ProviderSelection,
}

pub async fn run_command(request: FetchRequest, config_path: Option<&str>) -> Result<()> {
    info!("fxrates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let aggregator = build_aggregator(&config)?;
    let query = RateQuery::new(&request.currency, request.range)?;
    let results = aggregator.fetch(&query, request.selection).await;

    display::render(&results);
    Ok(())
}

/// Builds the source registry in canonical order: NBP mid, NBP bid/ask, ECB
/// reference.
pub fn build_aggregator(config: &AppConfig) -> Result<Aggregator> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let nbp = config.providers.nbp.clone().unwrap_or_default();
    let ecb = config.providers.ecb.clone().unwrap_or_default();

    let sources: Vec<Box<dyn RateProvider>> = vec![
        Box::new(NbpProvider::new(
            &nbp.base_url,
            TableVariant::Mid,
            &nbp.currencies,
            timeout,
        )?),
        Box::new(NbpProvider::new(
            &nbp.base_url,
            TableVariant::BidAsk,
            &nbp.currencies,
            timeout,
        )?),
        Box::new(EcbProvider::new(
            &ecb.base_url,
            &ecb.fallback_url,
            &ecb.currencies,
            timeout,
        )?),
    ];
    Ok(Aggregator::new(sources))
}
