//! Rate retrieval abstractions

use async_trait::async_trait;

use crate::model::{RateQuery, RateResult, Source};

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Identifies the source this provider answers for.
    fn source(&self) -> Source;

    /// Whether the source publishes rates for the given normalized code.
    /// The aggregator checks this before `fetch` is invoked.
    fn supports(&self, currency: &str) -> bool;

    /// Fetch rates for the query. Upstream failures are captured inside the
    /// returned result; this call never aborts the surrounding aggregation.
    async fn fetch(&self, query: &RateQuery) -> RateResult;
}
