//! Data contracts exchanged between the aggregator, the providers and the
//! renderer.

use std::fmt;

use anyhow::{Result, bail};
use chrono::NaiveDate;

use crate::error::FetchError;

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            bail!("end date {end} is earlier than start date {start}");
        }
        Ok(DateRange { start, end })
    }
}

/// A single rate request. Immutable once constructed; absence of a range
/// means "latest available".
#[derive(Debug, Clone)]
pub struct RateQuery {
    currency: String,
    range: Option<DateRange>,
}

impl RateQuery {
    /// Validates and normalizes the currency code (3 ASCII letters,
    /// upper-cased).
    pub fn new(currency: &str, range: Option<DateRange>) -> Result<Self> {
        let code = currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("'{currency}' is not a 3-letter currency code");
        }
        Ok(RateQuery {
            currency: code.to_ascii_uppercase(),
            range,
        })
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn range(&self) -> Option<DateRange> {
        self.range
    }
}

/// The two NBP rate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableVariant {
    /// Table A, mid rate.
    Mid,
    /// Table C, bid and ask rates.
    BidAsk,
}

impl TableVariant {
    /// Table letter as it appears in the request path.
    pub fn segment(self) -> &'static str {
        match self {
            TableVariant::Mid => "a",
            TableVariant::BidAsk => "c",
        }
    }
}

/// Identifies which upstream source produced a result. Registry order is
/// canonical: NBP mid, NBP bid/ask, ECB reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    NbpMid,
    NbpBidAsk,
    Ecb,
}

impl Source {
    pub fn label(self) -> &'static str {
        match self {
            Source::NbpMid => "NBP table A (mid)",
            Source::NbpBidAsk => "NBP table C (bid/ask)",
            Source::Ecb => "ECB reference (per EUR)",
        }
    }

    /// Currency the quoted values are denominated in.
    pub fn unit(self) -> &'static str {
        match self {
            Source::NbpMid | Source::NbpBidAsk => "PLN",
            Source::Ecb => "EUR",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::error::Error for Source {}

/// Which sources a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelection {
    Nbp,
    Ecb,
    All,
}

impl ProviderSelection {
    pub fn includes(self, source: Source) -> bool {
        match self {
            ProviderSelection::All => true,
            ProviderSelection::Nbp => matches!(source, Source::NbpMid | Source::NbpBidAsk),
            ProviderSelection::Ecb => source == Source::Ecb,
        }
    }
}

/// Quoted value(s) for one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateValue {
    Mid(f64),
    BidAsk { bid: f64, ask: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEntry {
    pub date: NaiveDate,
    pub value: RateValue,
}

/// Normalized series returned by a provider, sorted ascending by date.
/// `effective_date` is set only for latest-mode table retrievals and names
/// the date that was actually resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSeries {
    pub entries: Vec<RateEntry>,
    pub effective_date: Option<NaiveDate>,
}

/// One source's answer: either a series or an error, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct RateResult {
    pub source: Source,
    pub currency: String,
    pub outcome: Result<RateSeries, FetchError>,
}

impl RateResult {
    pub fn success(source: Source, currency: &str, series: RateSeries) -> Self {
        RateResult {
            source,
            currency: currency.to_string(),
            outcome: Ok(series),
        }
    }

    pub fn failure(source: Source, currency: &str, error: FetchError) -> Self {
        RateResult {
            source,
            currency: currency.to_string(),
            outcome: Err(error),
        }
    }
}
