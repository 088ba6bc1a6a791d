//! Dispatches one query across the registered rate sources.

use futures::future::join_all;
use tracing::debug;

use crate::error::FetchError;
use crate::model::{ProviderSelection, RateQuery, RateResult};
use crate::rate_provider::RateProvider;

/// Holds the source registry in canonical order (NBP mid, NBP bid/ask, ECB
/// reference). Results come back in the same order; sources are never merged
/// or compared against each other.
pub struct Aggregator {
    sources: Vec<Box<dyn RateProvider>>,
}

impl Aggregator {
    pub fn new(sources: Vec<Box<dyn RateProvider>>) -> Self {
        Aggregator { sources }
    }

    /// Fetches from every selected source. The currency is validated against
    /// each source's supported set before any network call; an unsupported
    /// pair yields an error result without touching the network. Sources have
    /// no data dependency on each other, so they run concurrently.
    pub async fn fetch(
        &self,
        query: &RateQuery,
        selection: ProviderSelection,
    ) -> Vec<RateResult> {
        let fetches = self
            .sources
            .iter()
            .filter(|provider| selection.includes(provider.source()))
            .map(|provider| async move {
                if !provider.supports(query.currency()) {
                    debug!(
                        "{} does not support {}, skipping the request",
                        provider.source(),
                        query.currency()
                    );
                    return RateResult::failure(
                        provider.source(),
                        query.currency(),
                        FetchError::UnsupportedCurrency {
                            source: provider.source(),
                            currency: query.currency().to_string(),
                        },
                    );
                }
                provider.fetch(query).await
            });

        join_all(fetches).await
    }
}
