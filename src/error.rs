//! Failure taxonomy for rate retrieval.
//!
//! Errors are carried as data inside a `RateResult` so that one source
//! failing never hides another source's answer.

use thiserror::Error;

use crate::model::Source;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The currency was rejected before any network call was made.
    #[error("currency {currency} is not supported by {source}")]
    UnsupportedCurrency { source: Source, currency: String },

    /// Upstream confirmed that no rates exist for the requested date or range.
    #[error("no rates published for the requested date or range")]
    NotFound,

    /// The latest-mode backward search ran out of days to try.
    #[error("no rates published within the last {attempts} days")]
    RetriesExhausted { attempts: u32 },

    /// Connectivity, protocol or payload-level failure. Never retried.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Both the primary and the fallback reference endpoints failed.
    #[error("primary endpoint failed: {primary}; fallback endpoint failed: {fallback}")]
    AggregateFailure { primary: String, fallback: String },
}
