use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::model::{RateEntry, RateQuery, RateResult, RateSeries, RateValue, Source};
use crate::rate_provider::RateProvider;

/// EUR-denominated reference rates: a primary timeseries API with a mirror
/// used as automatic fallback. Both endpoints quote units of the target
/// currency per 1 EUR; the mirror pins `base=EUR` explicitly to hold that
/// invariant.
pub struct EcbProvider {
    primary_url: String,
    fallback_url: String,
    currencies: HashSet<String>,
    client: reqwest::Client,
}

impl EcbProvider {
    pub fn new(
        primary_url: &str,
        fallback_url: &str,
        currencies: &[String],
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxrates/0.1")
            .timeout(timeout)
            .build()?;
        Ok(EcbProvider {
            primary_url: primary_url.to_string(),
            fallback_url: fallback_url.to_string(),
            currencies: currencies.iter().map(|c| c.to_ascii_uppercase()).collect(),
            client,
        })
    }

    fn primary_request(&self, query: &RateQuery) -> String {
        match query.range() {
            Some(range) => format!(
                "{}/{}..{}?to={}",
                self.primary_url,
                range.start,
                range.end,
                query.currency()
            ),
            None => format!("{}/latest?to={}", self.primary_url, query.currency()),
        }
    }

    /// The mirror takes the same parameters reshaped to its contract: an
    /// explicit base currency and a symbol list.
    fn fallback_request(&self, query: &RateQuery) -> String {
        match query.range() {
            Some(range) => format!(
                "{}/timeseries?start_date={}&end_date={}&base=EUR&symbols={}",
                self.fallback_url,
                range.start,
                range.end,
                query.currency()
            ),
            None => format!(
                "{}/latest?base=EUR&symbols={}",
                self.fallback_url,
                query.currency()
            ),
        }
    }

    /// One attempt against one endpoint. Any non-2xx status, connection
    /// failure or unparseable payload is transport-class; a valid payload
    /// with no entry for the currency is a success with an empty series.
    async fn request(
        &self,
        url: &str,
        query: &RateQuery,
    ) -> Result<Vec<RateEntry>, FetchError> {
        debug!("Requesting reference rates from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request error: {e}")))?;

        if !response.status().is_success() {
            return Err(FetchError::Transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("failed to read response body: {e}")))?;

        if query.range().is_some() {
            parse_timeseries(&text, query.currency())
        } else {
            parse_latest(&text, query.currency())
        }
    }

    async fn fetch_series(&self, query: &RateQuery) -> Result<RateSeries, FetchError> {
        let primary_err = match self.request(&self.primary_request(query), query).await {
            Ok(entries) => {
                return Ok(RateSeries {
                    entries,
                    effective_date: None,
                });
            }
            Err(e) => e,
        };

        warn!(
            "Primary reference endpoint failed ({}), trying the fallback mirror",
            primary_err
        );

        match self.request(&self.fallback_request(query), query).await {
            Ok(entries) => Ok(RateSeries {
                entries,
                effective_date: None,
            }),
            Err(fallback_err) => Err(FetchError::AggregateFailure {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }
}

// Both the primary and the mirror key their payloads identically, so one
// schema per shape covers the two endpoints.

#[derive(Debug, Deserialize)]
struct LatestQuote {
    date: NaiveDate,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesQuotes {
    rates: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

fn parse_latest(payload: &str, currency: &str) -> Result<Vec<RateEntry>, FetchError> {
    let quote: LatestQuote = serde_json::from_str(payload)
        .map_err(|e| FetchError::Transport(format!("malformed reference payload: {e}")))?;
    Ok(quote
        .rates
        .get(currency)
        .map(|value| {
            vec![RateEntry {
                date: quote.date,
                value: RateValue::Mid(*value),
            }]
        })
        .unwrap_or_default())
}

fn parse_timeseries(payload: &str, currency: &str) -> Result<Vec<RateEntry>, FetchError> {
    let quotes: TimeseriesQuotes = serde_json::from_str(payload)
        .map_err(|e| FetchError::Transport(format!("malformed reference payload: {e}")))?;
    // BTreeMap keys come out ascending, which is the order the series wants.
    Ok(quotes
        .rates
        .into_iter()
        .filter_map(|(date, rates)| {
            rates.get(currency).map(|value| RateEntry {
                date,
                value: RateValue::Mid(*value),
            })
        })
        .collect())
}

#[async_trait]
impl RateProvider for EcbProvider {
    fn source(&self) -> Source {
        Source::Ecb
    }

    fn supports(&self, currency: &str) -> bool {
        self.currencies.contains(currency)
    }

    async fn fetch(&self, query: &RateQuery) -> RateResult {
        RateResult {
            source: Source::Ecb,
            currency: query.currency().to_string(),
            outcome: self.fetch_series(query).await,
        }
    }
}
