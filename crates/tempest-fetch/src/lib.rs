//! Paged history fetcher for the Tempest vendor REST API
//!
//! Issues one request per requested day offset against the vendor history
//! endpoint, maps each positional tuple into a structured record at the
//! boundary, and concatenates the results. Fails fast: a single failed page
//! aborts the whole call with no partial results.

pub mod client;
pub mod forecast;

pub use client::*;
pub use forecast::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or non-success status from the vendor for one page.
    #[error("upstream request failed at day offset {day_offset}: {reason}")]
    Upstream { day_offset: u32, reason: String },

    /// The vendor returned success but the body was not a usable
    /// observation payload.
    #[error("malformed payload at day offset {day_offset}: {reason}")]
    MalformedPayload { day_offset: u32, reason: String },

    /// Station time-range request failed.
    #[error("upstream station history request failed: {reason}")]
    StationUpstream { reason: String },

    /// Station time-range payload was not usable.
    #[error("malformed station history payload: {reason}")]
    StationPayload { reason: String },

    /// Forecast request failed.
    #[error("upstream forecast request failed: {reason}")]
    ForecastUpstream { reason: String },

    /// Forecast payload was not usable.
    #[error("malformed forecast payload: {reason}")]
    ForecastPayload { reason: String },

    /// Every request succeeded but zero observations came back.
    #[error("no observations in dataset")]
    EmptyDataset,
}

pub type FetchResult<T> = Result<T, FetchError>;
