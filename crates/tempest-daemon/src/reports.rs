//! Aggregation passes run over freshly fetched history

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tempest_core::{
    bucket, current_month_label, select_representative, summarize, ErrorBody, MonthlySummary,
    ObservationWindow,
};
use tempest_fetch::{ForecastBundle, HistoryClient};
use tracing::{info, warn};

/// Fetch the last `days` day-offsets and reduce them to a chart window:
/// one representative sample per surviving calendar day, time-ordered.
pub async fn historical_window(
    client: &HistoryClient,
    device_id: &str,
    days: u32,
) -> Result<ObservationWindow> {
    let offsets: Vec<u32> = (0..days).collect();
    let raw = client
        .fetch_range(device_id, &offsets)
        .await
        .map_err(error_body)?;

    let samples = select_representative(&bucket(&raw));
    let window =
        ObservationWindow::build(samples.into_values().collect()).map_err(error_body)?;

    info!(
        samples = window.obs.len(),
        start_time = window.summary.start_time,
        end_time = window.summary.end_time,
        "built observation window"
    );
    Ok(window)
}

/// Fetch a month of history in one page and compute its extremes.
pub async fn monthly_summary(client: &HistoryClient, device_id: &str) -> Result<MonthlySummary> {
    let raw = client.fetch_month(device_id).await.map_err(error_body)?;
    let summary = summarize(&raw, &current_month_label()).map_err(error_body)?;

    info!(
        month = %summary.month,
        average_temp = summary.average_temp,
        total_rain = %summary.total_rain,
        "computed monthly summary"
    );
    Ok(summary)
}

/// Fetch the station's last 24 hours and reduce them to a time-ordered
/// window of complete samples.
pub async fn station_window(
    client: &HistoryClient,
    station_id: &str,
) -> Result<ObservationWindow> {
    let (time_start, time_end) = last_day_range(Utc::now());
    let raw = client
        .fetch_station_window(station_id, time_start, time_end)
        .await
        .map_err(error_body)?;

    let samples: Vec<_> = raw.iter().filter_map(|obs| obs.normalized()).collect();
    let window = ObservationWindow::build(samples).map_err(error_body)?;

    info!(
        station_id,
        samples = window.obs.len(),
        start_time = window.summary.start_time,
        end_time = window.summary.end_time,
        "built station window"
    );
    Ok(window)
}

/// Fetch the station forecast and log the headline conditions.
pub async fn station_forecast(client: &HistoryClient, station_id: &str) -> Result<ForecastBundle> {
    let bundle = client.fetch_forecast(station_id).await.map_err(error_body)?;

    if let Some(current) = &bundle.current_conditions {
        info!(
            station_id,
            air_temperature = current.air_temperature,
            relative_humidity = current.relative_humidity,
            daily = bundle.forecast.daily.len(),
            "fetched station forecast"
        );
    }
    Ok(bundle)
}

/// Time range covering the 24 hours up to `end`.
fn last_day_range(end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (end - Duration::hours(24), end)
}

/// Log the caller-facing error body before propagating the failure.
fn error_body<E>(err: E) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let body = ErrorBody::from_error(&err);
    warn!(
        body = %serde_json::to_string(&body).unwrap_or_default(),
        "pipeline call failed"
    );
    anyhow::Error::new(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_day_range_spans_24_hours() {
        let end = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let (start, range_end) = last_day_range(end);

        assert_eq!(range_end, end);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap());
    }
}
