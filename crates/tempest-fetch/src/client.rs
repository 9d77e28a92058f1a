//! HTTP client for the vendor history endpoints

use crate::{FetchError, FetchResult, ForecastBundle};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;
use tempest_core::RawObservation;
use tracing::{debug, warn};

/// Day offset covering a full month of device history.
pub const MONTH_DAY_OFFSET: u32 = 30;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire shape of a history response: `{ "obs": [[...], ...] }`.
#[derive(Debug, Deserialize)]
struct ObsResponse {
    #[serde(default)]
    obs: Option<Vec<Vec<Option<f64>>>>,
}

/// Client for the vendor's observation history REST API.
///
/// Holds the bearer credential and a pooled `reqwest` client with a request
/// timeout, so a hung request surfaces as an upstream failure instead of
/// blocking the caller.
#[derive(Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HistoryClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Fetch device history for each requested day offset, in the given
    /// order, and concatenate the results.
    ///
    /// Offset 0 is the most recent day; larger offsets reach further back.
    /// Requests run sequentially. If any page fails the whole call fails
    /// with that page's offset and nothing is returned. Zero combined
    /// observations is an `EmptyDataset` failure.
    pub async fn fetch_range(
        &self,
        device_id: &str,
        day_offsets: &[u32],
    ) -> FetchResult<Vec<RawObservation>> {
        let mut all = Vec::new();

        for &day_offset in day_offsets {
            let url = format!("{}/observations/device/{}", self.base_url, device_id);
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[("day_offset", day_offset.to_string())])
                .query(&[("units_temp", "f"), ("units_precip", "in")])
                .send()
                .await
                .map_err(|e| FetchError::Upstream {
                    day_offset,
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Upstream {
                    day_offset,
                    reason: format!("status {}", status.as_u16()),
                });
            }

            let payload: ObsResponse =
                response
                    .json()
                    .await
                    .map_err(|e| FetchError::MalformedPayload {
                        day_offset,
                        reason: e.to_string(),
                    })?;

            let tuples = payload.obs.ok_or_else(|| FetchError::MalformedPayload {
                day_offset,
                reason: "missing obs field".to_string(),
            })?;

            debug!(day_offset, count = tuples.len(), "fetched history page");

            for tuple in &tuples {
                let obs = RawObservation::from_tuple(tuple).map_err(|e| {
                    FetchError::MalformedPayload {
                        day_offset,
                        reason: e.to_string(),
                    }
                })?;
                all.push(obs);
            }
        }

        if all.is_empty() {
            return Err(FetchError::EmptyDataset);
        }

        Ok(all)
    }

    /// Fetch the last month of device history in one page.
    pub async fn fetch_month(&self, device_id: &str) -> FetchResult<Vec<RawObservation>> {
        self.fetch_range(device_id, &[MONTH_DAY_OFFSET]).await
    }

    /// Fetch station history for an explicit time range.
    ///
    /// Same error contract as [`fetch_range`](Self::fetch_range) but against
    /// the station endpoint with `time_start`/`time_end` parameters.
    pub async fn fetch_station_window(
        &self,
        station_id: &str,
        time_start: DateTime<Utc>,
        time_end: DateTime<Utc>,
    ) -> FetchResult<Vec<RawObservation>> {
        let url = format!("{}/observations/station/{}", self.base_url, station_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                (
                    "time_start",
                    time_start.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
                (
                    "time_end",
                    time_end.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
            ])
            .query(&[
                ("units_temp", "f"),
                ("units_wind", "mph"),
                ("units_pressure", "inhg"),
                ("units_precip", "in"),
                ("units_distance", "mi"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::StationUpstream {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::StationUpstream {
                reason: format!("status {}", status.as_u16()),
            });
        }

        let payload: ObsResponse = response
            .json()
            .await
            .map_err(|e| FetchError::StationPayload {
                reason: e.to_string(),
            })?;

        let tuples = payload.obs.ok_or_else(|| FetchError::StationPayload {
            reason: "missing obs field".to_string(),
        })?;

        debug!(station_id, count = tuples.len(), "fetched station window");

        let mut all = Vec::with_capacity(tuples.len());
        for tuple in &tuples {
            let obs =
                RawObservation::from_tuple(tuple).map_err(|e| FetchError::StationPayload {
                    reason: e.to_string(),
                })?;
            all.push(obs);
        }

        if all.is_empty() {
            return Err(FetchError::EmptyDataset);
        }

        Ok(all)
    }

    /// Fetch current conditions and the daily outlook for a station.
    ///
    /// A response without `current_conditions` is still returned; only a
    /// failed request or an unparseable body is an error.
    pub async fn fetch_forecast(&self, station_id: &str) -> FetchResult<ForecastBundle> {
        let url = format!("{}/better_forecast", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("station_id", station_id)])
            .query(&[
                ("units_temp", "f"),
                ("units_wind", "mph"),
                ("units_pressure", "inhg"),
                ("units_precip", "in"),
                ("units_distance", "mi"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::ForecastUpstream {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ForecastUpstream {
                reason: format!("status {}", status.as_u16()),
            });
        }

        let bundle: ForecastBundle =
            response
                .json()
                .await
                .map_err(|e| FetchError::ForecastPayload {
                    reason: e.to_string(),
                })?;

        if bundle.current_conditions.is_none() {
            warn!(station_id, "no current conditions in forecast response");
        }

        debug!(
            station_id,
            daily = bundle.forecast.daily.len(),
            "fetched forecast"
        );

        Ok(bundle)
    }
}
