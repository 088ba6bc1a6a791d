use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::model::{
    DateRange, RateEntry, RateQuery, RateResult, RateSeries, RateValue, Source, TableVariant,
};
use crate::rate_provider::RateProvider;

/// Latest-mode backward search bound. Attempted dates run from yesterday to
/// today minus this many days; same-day rates are never published, so today
/// itself is never queried.
pub const MAX_BACKDATE_DAYS: u64 = 5;

/// NBP exchange-rate table provider. One instance serves one table variant;
/// the retrieval and retry logic is shared.
pub struct NbpProvider {
    base_url: String,
    variant: TableVariant,
    currencies: HashSet<String>,
    client: reqwest::Client,
}

impl NbpProvider {
    pub fn new(
        base_url: &str,
        variant: TableVariant,
        currencies: &[String],
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxrates/0.1")
            .timeout(timeout)
            .build()?;
        Ok(NbpProvider {
            base_url: base_url.to_string(),
            variant,
            currencies: currencies.iter().map(|c| c.to_ascii_uppercase()).collect(),
            client,
        })
    }

    fn day_url(&self, currency: &str, date: NaiveDate) -> String {
        format!(
            "{}/rates/{}/{}/{}/?format=json",
            self.base_url,
            self.variant.segment(),
            currency,
            date
        )
    }

    fn range_url(&self, currency: &str, range: DateRange) -> String {
        format!(
            "{}/rates/{}/{}/{}/{}/?format=json",
            self.base_url,
            self.variant.segment(),
            currency,
            range.start,
            range.end
        )
    }

    /// Issues one GET against the table endpoint. An HTTP 404 means "no data
    /// published"; every other failure, including an unparseable payload, is
    /// transport-class and never retried.
    async fn request(&self, url: &str) -> Result<Vec<RateEntry>, FetchError> {
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request error: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
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
        self.parse(&text)
    }

    fn parse(&self, payload: &str) -> Result<Vec<RateEntry>, FetchError> {
        let malformed = |e: serde_json::Error| {
            FetchError::Transport(format!("malformed table payload: {e}"))
        };

        let mut entries: Vec<RateEntry> = match self.variant {
            TableVariant::Mid => {
                let table: MidTable = serde_json::from_str(payload).map_err(malformed)?;
                table
                    .rates
                    .into_iter()
                    .map(|r| RateEntry {
                        date: r.effective_date,
                        value: RateValue::Mid(r.mid),
                    })
                    .collect()
            }
            TableVariant::BidAsk => {
                let table: BidAskTable = serde_json::from_str(payload).map_err(malformed)?;
                table
                    .rates
                    .into_iter()
                    .map(|r| RateEntry {
                        date: r.effective_date,
                        value: RateValue::BidAsk {
                            bid: r.bid,
                            ask: r.ask,
                        },
                    })
                    .collect()
            }
        };
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    /// Explicit range: a single request. A 404 here is a definitive absence,
    /// not transient unavailability, so it is terminal.
    async fn fetch_range(
        &self,
        currency: &str,
        range: DateRange,
    ) -> Result<RateSeries, FetchError> {
        let entries = self.request(&self.range_url(currency, range)).await?;
        Ok(RateSeries {
            entries,
            effective_date: None,
        })
    }

    /// Latest mode: bounded backward search. Tables are published with a lag
    /// (weekends, holidays), so the search starts at yesterday and walks back
    /// one day per 404, up to `MAX_BACKDATE_DAYS`. The first success wins and
    /// records the resolved date; a transport failure stops the search
    /// immediately.
    async fn fetch_latest(&self, currency: &str) -> Result<RateSeries, FetchError> {
        let today = Utc::now().date_naive();
        for back in 1..=MAX_BACKDATE_DAYS {
            let date = today - Days::new(back);
            match self.request(&self.day_url(currency, date)).await {
                Ok(entries) => {
                    return Ok(RateSeries {
                        entries,
                        effective_date: Some(date),
                    });
                }
                Err(FetchError::NotFound) => {
                    debug!("No {} rates published on {}, trying the day before", currency, date);
                }
                Err(other) => return Err(other),
            }
        }
        Err(FetchError::RetriesExhausted {
            attempts: MAX_BACKDATE_DAYS as u32,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MidTable {
    rates: Vec<MidRate>,
}

#[derive(Debug, Deserialize)]
struct MidRate {
    #[serde(rename = "effectiveDate")]
    effective_date: NaiveDate,
    mid: f64,
}

#[derive(Debug, Deserialize)]
struct BidAskTable {
    rates: Vec<BidAskRate>,
}

#[derive(Debug, Deserialize)]
struct BidAskRate {
    #[serde(rename = "effectiveDate")]
    effective_date: NaiveDate,
    bid: f64,
    ask: f64,
}

#[async_trait]
impl RateProvider for NbpProvider {
    fn source(&self) -> Source {
        match self.variant {
            TableVariant::Mid => Source::NbpMid,
            TableVariant::BidAsk => Source::NbpBidAsk,
        }
    }

    fn supports(&self, currency: &str) -> bool {
        self.currencies.contains(currency)
    }

    async fn fetch(&self, query: &RateQuery) -> RateResult {
        let outcome = match query.range() {
            Some(range) => self.fetch_range(query.currency(), range).await,
            None => self.fetch_latest(query.currency()).await,
        };
        RateResult {
            source: self.source(),
            currency: query.currency().to_string(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str, variant: TableVariant) -> NbpProvider {
        NbpProvider::new(
            base_url,
            variant,
            &["USD".to_string()],
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn query(range: Option<DateRange>) -> RateQuery {
        RateQuery::new("USD", range).unwrap()
    }

    fn june_range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        )
        .unwrap()
    }

    async fn mount_day(server: &MockServer, table: &str, date: NaiveDate, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/rates/{table}/USD/{date}/")))
            .and(query_param("format", "json"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[tokio::test]
    async fn test_range_fetch_returns_ordered_entries() {
        let server = MockServer::start().await;
        // Deliberately out of order to exercise the sort.
        let body = r#"{"rates": [
            {"effectiveDate": "2025-06-03", "mid": 3.79},
            {"effectiveDate": "2025-06-02", "mid": 3.75}
        ]}"#;
        Mock::given(method("GET"))
            .and(path("/rates/a/USD/2025-06-01/2025-06-05/"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = provider(&server.uri(), TableVariant::Mid);
        let result = provider.fetch(&query(Some(june_range()))).await;

        assert_eq!(result.source, Source::NbpMid);
        assert_eq!(result.currency, "USD");
        let series = result.outcome.unwrap();
        assert!(series.effective_date.is_none());
        assert_eq!(series.entries.len(), 2);
        assert_eq!(
            series.entries[0].date,
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
        );
        assert_eq!(series.entries[0].value, RateValue::Mid(3.75));
        assert_eq!(series.entries[1].value, RateValue::Mid(3.79));
    }

    #[tokio::test]
    async fn test_range_not_found_is_terminal_after_one_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = provider(&server.uri(), TableVariant::Mid);
        let result = provider.fetch(&query(Some(june_range()))).await;

        assert_eq!(result.outcome, Err(FetchError::NotFound));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_latest_backdates_until_published() {
        let server = MockServer::start().await;
        let today = Utc::now().date_naive();
        let day_1 = today - Days::new(1);
        let day_2 = today - Days::new(2);

        mount_day(&server, "a", day_1, ResponseTemplate::new(404)).await;
        let body = format!(
            r#"{{"rates": [{{"effectiveDate": "{day_2}", "mid": 3.82}}]}}"#
        );
        mount_day(&server, "a", day_2, ResponseTemplate::new(200).set_body_string(body)).await;

        let provider = provider(&server.uri(), TableVariant::Mid);
        let result = provider.fetch(&query(None)).await;

        let series = result.outcome.unwrap();
        assert_eq!(series.effective_date, Some(day_2));
        assert_eq!(series.entries, vec![RateEntry { date: day_2, value: RateValue::Mid(3.82) }]);
        assert_eq!(request_count(&server).await, 2);
    }

    #[tokio::test]
    async fn test_latest_attempts_strictly_decreasing_dates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let today = Utc::now().date_naive();
        let provider = provider(&server.uri(), TableVariant::Mid);
        let result = provider.fetch(&query(None)).await;

        assert_eq!(result.outcome, Err(FetchError::RetriesExhausted { attempts: 5 }));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 5);
        for (i, request) in requests.iter().enumerate() {
            let expected = today - Days::new(i as u64 + 1);
            assert_eq!(request.url.path(), format!("/rates/a/USD/{expected}/"));
        }
    }

    #[tokio::test]
    async fn test_latest_transport_failure_stops_immediately() {
        let server = MockServer::start().await;
        let today = Utc::now().date_naive();
        let day_1 = today - Days::new(1);
        let day_2 = today - Days::new(2);

        mount_day(&server, "a", day_1, ResponseTemplate::new(404)).await;
        mount_day(&server, "a", day_2, ResponseTemplate::new(500)).await;

        let provider = provider(&server.uri(), TableVariant::Mid);
        let result = provider.fetch(&query(None)).await;

        assert!(matches!(result.outcome, Err(FetchError::Transport(_))));
        assert_eq!(request_count(&server).await, 2);
    }

    #[tokio::test]
    async fn test_bid_ask_variant_parses_both_values() {
        let server = MockServer::start().await;
        let body = r#"{"rates": [
            {"effectiveDate": "2025-06-02", "bid": 3.71, "ask": 3.79}
        ]}"#;
        Mock::given(method("GET"))
            .and(path("/rates/c/USD/2025-06-01/2025-06-05/"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = provider(&server.uri(), TableVariant::BidAsk);
        let result = provider.fetch(&query(Some(june_range()))).await;

        assert_eq!(result.source, Source::NbpBidAsk);
        let series = result.outcome.unwrap();
        assert_eq!(
            series.entries[0].value,
            RateValue::BidAsk { bid: 3.71, ask: 3.79 }
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_transport_class_parse_failure() {
        let server = MockServer::start().await;
        // Bid/ask payload served to the mid-table variant: no "mid" field.
        let body = r#"{"rates": [{"effectiveDate": "2025-06-02", "bid": 3.71, "ask": 3.79}]}"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = provider(&server.uri(), TableVariant::Mid);
        let result = provider.fetch(&query(Some(june_range()))).await;

        match result.outcome {
            Err(FetchError::Transport(message)) => {
                assert!(message.contains("malformed table payload"))
            }
            other => panic!("Expected a transport-class parse failure, got: {other:?}"),
        }
    }
}
