//! Time-ordered observation windows for the historical chart path

use crate::types::NormalizedObservation;
use crate::{AggregateError, AggregateResult};
use serde::Serialize;

/// Start/end bounds of a window, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSummary {
    pub start_time: i64,
    pub end_time: i64,
}

/// An ordered sequence of per-day samples with summary bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationWindow {
    pub obs: Vec<NormalizedObservation>,
    pub summary: WindowSummary,
}

impl ObservationWindow {
    /// Sort samples ascending by timestamp and record the bounds.
    ///
    /// The sort is stable, so equal timestamps keep bucketer output order.
    /// An empty input fails: a window without a first and last element has
    /// no defined bounds.
    pub fn build(mut samples: Vec<NormalizedObservation>) -> AggregateResult<Self> {
        if samples.is_empty() {
            return Err(AggregateError::EmptyDataset);
        }

        samples.sort_by_key(|s| s.timestamp);

        let summary = WindowSummary {
            start_time: samples[0].timestamp,
            end_time: samples[samples.len() - 1].timestamp,
        };

        Ok(Self {
            obs: samples,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: i64) -> NormalizedObservation {
        NormalizedObservation {
            timestamp,
            temperature: 70.0,
            humidity: 50.0,
            rain: 0.0,
        }
    }

    #[test]
    fn test_build_sorts_ascending() {
        let window =
            ObservationWindow::build(vec![sample(3000), sample(1000), sample(2000)]).unwrap();

        let timestamps: Vec<i64> = window.obs.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![1000, 2000, 3000]);
        assert_eq!(window.summary.start_time, 1000);
        assert_eq!(window.summary.end_time, 3000);
    }

    #[test]
    fn test_build_single_sample() {
        let window = ObservationWindow::build(vec![sample(1000)]).unwrap();
        assert_eq!(window.summary.start_time, window.summary.end_time);
    }

    #[test]
    fn test_start_never_exceeds_end() {
        let window = ObservationWindow::build(vec![sample(5000), sample(100)]).unwrap();
        assert!(window.summary.start_time <= window.summary.end_time);
    }

    #[test]
    fn test_build_empty_fails() {
        let result = ObservationWindow::build(Vec::new());
        assert!(matches!(result, Err(AggregateError::EmptyDataset)));
    }
}
