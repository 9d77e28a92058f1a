//! Monthly extremes computed over a single fetched window

use crate::types::RawObservation;
use crate::{AggregateError, AggregateResult};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// A temperature extreme and the date it was first observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempExtreme {
    pub value: i64,
    pub date: NaiveDate,
}

/// A rain extreme, kept at two-decimal precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainExtreme {
    pub value: String,
    pub date: NaiveDate,
}

/// Summary statistics for one month of observations.
///
/// Field names on the wire match the dashboard contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: String,

    #[serde(rename = "averageTemp")]
    pub average_temp: i64,

    /// Total rain formatted to exactly two decimal places.
    #[serde(rename = "totalRain")]
    pub total_rain: String,

    #[serde(rename = "maxTemp")]
    pub max_temp: TempExtreme,

    #[serde(rename = "minTemp")]
    pub min_temp: TempExtreme,

    #[serde(rename = "rainiestDay")]
    pub rainiest_day: RainExtreme,
}

/// Compute summary statistics over a fetched month of raw observations.
///
/// Observations missing a finite temperature or rain value are excluded
/// before any statistic is computed, the same validation the day bucketer
/// applies. Extremum ties resolve to the first occurrence in fetch order.
pub fn summarize(observations: &[RawObservation], month: &str) -> AggregateResult<MonthlySummary> {
    let mut temps = Vec::with_capacity(observations.len());
    let mut rains = Vec::with_capacity(observations.len());
    let mut dates = Vec::with_capacity(observations.len());

    for obs in observations {
        if let (Some(temp), Some(rain)) = (obs.temperature, obs.rain) {
            temps.push(temp);
            rains.push(rain);
            dates.push(obs.utc_date());
        }
    }

    if temps.is_empty() {
        return Err(AggregateError::EmptyDataset);
    }

    let mean = temps.iter().sum::<f64>() / temps.len() as f64;
    let max_idx = extremum_index(&temps, |candidate, best| candidate > best);
    let min_idx = extremum_index(&temps, |candidate, best| candidate < best);
    let rain_idx = extremum_index(&rains, |candidate, best| candidate > best);

    Ok(MonthlySummary {
        month: month.to_string(),
        average_temp: mean.round() as i64,
        total_rain: format!("{:.2}", rains.iter().sum::<f64>()),
        max_temp: TempExtreme {
            value: temps[max_idx].round() as i64,
            date: dates[max_idx],
        },
        min_temp: TempExtreme {
            value: temps[min_idx].round() as i64,
            date: dates[min_idx],
        },
        rainiest_day: RainExtreme {
            value: format!("{:.2}", rains[rain_idx]),
            date: dates[rain_idx],
        },
    })
}

/// Full English name of the current month, used to label summaries.
pub fn current_month_label() -> String {
    Utc::now().format("%B").to_string()
}

/// Index of the first element winning the strict comparison.
fn extremum_index(values: &[f64], beats: impl Fn(f64, f64) -> bool) -> usize {
    let mut idx = 0;
    for (i, value) in values.iter().enumerate().skip(1) {
        if beats(*value, values[idx]) {
            idx = i;
        }
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(day: u32, temperature: f64, rain: f64) -> RawObservation {
        let epoch = NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();
        RawObservation {
            epoch,
            temperature: Some(temperature),
            humidity: Some(50.0),
            rain: Some(rain),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn test_summarize_worked_example() {
        let observations = vec![obs(1, 70.0, 0.10), obs(2, 75.0, 0.50), obs(3, 62.0, 0.00)];
        let summary = summarize(&observations, "June").unwrap();

        assert_eq!(summary.month, "June");
        assert_eq!(summary.average_temp, 69);
        assert_eq!(summary.total_rain, "0.60");
        assert_eq!(summary.max_temp.value, 75);
        assert_eq!(summary.max_temp.date, date(2));
        assert_eq!(summary.min_temp.value, 62);
        assert_eq!(summary.min_temp.date, date(3));
        assert_eq!(summary.rainiest_day.value, "0.50");
        assert_eq!(summary.rainiest_day.date, date(2));
    }

    #[test]
    fn test_extremum_ties_take_first_occurrence() {
        let observations = vec![obs(1, 75.0, 0.50), obs(2, 75.0, 0.50), obs(3, 75.0, 0.50)];
        let summary = summarize(&observations, "June").unwrap();

        assert_eq!(summary.max_temp.date, date(1));
        assert_eq!(summary.min_temp.date, date(1));
        assert_eq!(summary.rainiest_day.date, date(1));
    }

    #[test]
    fn test_average_rounds_away_from_zero() {
        let observations = vec![obs(1, 70.0, 0.0), obs(2, 71.0, 0.0)];
        let summary = summarize(&observations, "June").unwrap();
        assert_eq!(summary.average_temp, 71); // 70.5 rounds up
    }

    #[test]
    fn test_invalid_observations_are_excluded() {
        let mut gap = obs(1, 100.0, 5.0);
        gap.temperature = None;

        let observations = vec![gap, obs(2, 70.0, 0.25)];
        let summary = summarize(&observations, "June").unwrap();

        assert_eq!(summary.max_temp.value, 70);
        assert_eq!(summary.total_rain, "0.25");
    }

    #[test]
    fn test_empty_input_fails() {
        let result = summarize(&[], "June");
        assert!(matches!(result, Err(AggregateError::EmptyDataset)));
    }

    #[test]
    fn test_total_rain_keeps_two_decimals() {
        let observations = vec![obs(1, 70.0, 0.1), obs(2, 70.0, 0.2)];
        let summary = summarize(&observations, "June").unwrap();
        assert_eq!(summary.total_rain, "0.30");
    }
}
