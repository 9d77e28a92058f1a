//! Observation data types for the Tempest vendor API

use crate::{AggregateError, AggregateResult};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Vendor tuple index of the epoch-seconds timestamp
pub const IDX_EPOCH: usize = 0;
/// Vendor tuple index of air temperature
pub const IDX_TEMPERATURE: usize = 7;
/// Vendor tuple index of relative humidity
pub const IDX_HUMIDITY: usize = 8;
/// Vendor tuple index of rain accumulation
pub const IDX_RAIN: usize = 12;

/// One observation from the vendor history endpoint.
///
/// The vendor returns fixed-position numeric tuples; this is the structured
/// record built from one at the fetch boundary. Only the timestamp is
/// required up front. The metric fields stay optional so that bucketing and
/// summarization can decide what to do with gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    /// Unix timestamp (epoch seconds)
    pub epoch: i64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rain: Option<f64>,
}

impl RawObservation {
    /// Map a vendor tuple into a structured record.
    ///
    /// The tuple is positional: slot 0 is the timestamp, slot 7 temperature,
    /// slot 8 humidity, slot 12 rain. Short tuples are fine as long as the
    /// timestamp slot is present; absent or non-finite metric slots become
    /// `None`.
    pub fn from_tuple(tuple: &[Option<f64>]) -> AggregateResult<Self> {
        let epoch = tuple
            .get(IDX_EPOCH)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                AggregateError::InvalidTuple("missing or non-numeric timestamp".to_string())
            })? as i64;

        if DateTime::from_timestamp(epoch, 0).is_none() {
            return Err(AggregateError::InvalidTuple(format!(
                "timestamp {} out of range",
                epoch
            )));
        }

        Ok(Self {
            epoch,
            temperature: numeric_slot(tuple, IDX_TEMPERATURE),
            humidity: numeric_slot(tuple, IDX_HUMIDITY),
            rain: numeric_slot(tuple, IDX_RAIN),
        })
    }

    /// Dashboard sample for this observation, if every metric is present.
    pub fn normalized(&self) -> Option<NormalizedObservation> {
        Some(NormalizedObservation {
            timestamp: self.epoch * 1000,
            temperature: self.temperature?,
            humidity: self.humidity?,
            rain: self.rain?,
        })
    }

    /// UTC calendar date of this observation.
    pub fn utc_date(&self) -> NaiveDate {
        // Epoch range is validated in from_tuple.
        DateTime::from_timestamp(self.epoch, 0)
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN)
    }
}

fn numeric_slot(tuple: &[Option<f64>], index: usize) -> Option<f64> {
    tuple.get(index).copied().flatten().filter(|v| v.is_finite())
}

/// One representative sample per calendar day, in the shape the dashboard
/// consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedObservation {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub rain: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_tuple(epoch: f64, temp: f64, humidity: f64, rain: f64) -> Vec<Option<f64>> {
        let mut tuple = vec![None; 13];
        tuple[IDX_EPOCH] = Some(epoch);
        tuple[IDX_TEMPERATURE] = Some(temp);
        tuple[IDX_HUMIDITY] = Some(humidity);
        tuple[IDX_RAIN] = Some(rain);
        tuple
    }

    #[test]
    fn test_from_tuple_maps_fields() {
        let obs = RawObservation::from_tuple(&full_tuple(1718000000.0, 72.5, 40.0, 0.12)).unwrap();
        assert_eq!(obs.epoch, 1718000000);
        assert_eq!(obs.temperature, Some(72.5));
        assert_eq!(obs.humidity, Some(40.0));
        assert_eq!(obs.rain, Some(0.12));
    }

    #[test]
    fn test_from_tuple_requires_timestamp() {
        assert!(RawObservation::from_tuple(&[]).is_err());
        assert!(RawObservation::from_tuple(&[None, Some(1.0)]).is_err());
        assert!(RawObservation::from_tuple(&[Some(f64::NAN)]).is_err());
    }

    #[test]
    fn test_from_tuple_tolerates_short_tuple() {
        let obs = RawObservation::from_tuple(&[Some(1718000000.0)]).unwrap();
        assert_eq!(obs.temperature, None);
        assert_eq!(obs.humidity, None);
        assert_eq!(obs.rain, None);
    }

    #[test]
    fn test_from_tuple_drops_non_finite_metrics() {
        let mut tuple = full_tuple(1718000000.0, 72.5, 40.0, 0.0);
        tuple[IDX_TEMPERATURE] = Some(f64::NAN);
        let obs = RawObservation::from_tuple(&tuple).unwrap();
        assert_eq!(obs.temperature, None);
        assert_eq!(obs.humidity, Some(40.0));
    }

    #[test]
    fn test_normalized_requires_all_metrics() {
        let obs = RawObservation::from_tuple(&full_tuple(1718000000.0, 72.5, 40.0, 0.12)).unwrap();
        let sample = obs.normalized().unwrap();
        assert_eq!(sample.timestamp, 1718000000000);
        assert_eq!(sample.temperature, 72.5);

        let mut gappy = obs;
        gappy.rain = None;
        assert_eq!(gappy.normalized(), None);
    }

    #[test]
    fn test_utc_date() {
        // 2024-06-10T06:13:20Z
        let obs = RawObservation::from_tuple(&[Some(1718000000.0)]).unwrap();
        assert_eq!(obs.utc_date(), NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    }

    #[test]
    fn test_normalized_observation_wire_shape() {
        let sample = NormalizedObservation {
            timestamp: 1718000000000,
            temperature: 72.5,
            humidity: 40.0,
            rain: 0.12,
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["timestamp"], 1718000000000i64);
        assert_eq!(json["temperature"], 72.5);
        assert_eq!(json["humidity"], 40.0);
        assert_eq!(json["rain"], 0.12);
    }
}
