//! Day bucketing and representative sample selection

use crate::types::{NormalizedObservation, RawObservation};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Raw observations grouped by UTC calendar date.
///
/// Values keep fetch/concatenation order, which the representative
/// selection relies on for tie breaking.
pub type DayBucket = BTreeMap<NaiveDate, Vec<RawObservation>>;

/// Group observations by the UTC calendar date of their timestamp.
pub fn bucket(observations: &[RawObservation]) -> DayBucket {
    let mut buckets = DayBucket::new();
    for obs in observations {
        buckets
            .entry(obs.utc_date())
            .or_insert_with(Vec::new)
            .push(obs.clone());
    }
    buckets
}

/// Reduce each bucket to one representative sample.
///
/// The target instant is noon (12:00:00 UTC) of the calendar date of the
/// bucket's first-encountered observation. Note this is deliberately keyed
/// off the first element, not the bucket key, matching the upstream
/// dashboard behavior. The observation nearest the target wins; on an exact
/// tie the first-encountered candidate is kept.
///
/// A bucket whose selected candidate is missing any of temperature,
/// humidity, or rain contributes no sample at all.
pub fn select_representative(buckets: &DayBucket) -> BTreeMap<NaiveDate, NormalizedObservation> {
    let mut samples = BTreeMap::new();

    for (date, entries) in buckets {
        let first = match entries.first() {
            Some(obs) => obs,
            None => continue,
        };

        let target = noon_epoch(first.utc_date());

        let mut best = first;
        let mut best_dist = (first.epoch - target).abs();
        for obs in &entries[1..] {
            let dist = (obs.epoch - target).abs();
            if dist < best_dist {
                best = obs;
                best_dist = dist;
            }
        }

        if let Some(sample) = best.normalized() {
            samples.insert(*date, sample);
        }
    }

    samples
}

fn noon_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(12, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs_at(epoch: i64) -> RawObservation {
        RawObservation {
            epoch,
            temperature: Some(70.0),
            humidity: Some(50.0),
            rain: Some(0.0),
        }
    }

    fn noon(year: i32, month: u32, day: u32) -> i64 {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp()
    }

    #[test]
    fn test_bucket_groups_by_utc_date() {
        let observations = vec![
            obs_at(noon(2024, 6, 10) - 3600),
            obs_at(noon(2024, 6, 10) + 3600),
            obs_at(noon(2024, 6, 11)),
        ];
        let buckets = bucket(&observations);

        assert_eq!(buckets.len(), 2);
        let day_one = &buckets[&NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()];
        assert_eq!(day_one.len(), 2);
    }

    #[test]
    fn test_one_sample_per_date() {
        let observations = vec![
            obs_at(noon(2024, 6, 10) - 100),
            obs_at(noon(2024, 6, 10) + 200),
            obs_at(noon(2024, 6, 11) - 100),
            obs_at(noon(2024, 6, 12)),
        ];
        let samples = select_representative(&bucket(&observations));
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_selects_nearest_to_noon() {
        let base = noon(2024, 6, 10);
        let observations = vec![obs_at(base - 500), obs_at(base + 50), obs_at(base + 500)];
        let samples = select_representative(&bucket(&observations));

        let sample = samples[&NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()];
        assert_eq!(sample.timestamp, (base + 50) * 1000);
    }

    #[test]
    fn test_exact_tie_keeps_first_encountered() {
        let base = noon(2024, 6, 10);
        // Equidistant from noon; first pushed wins.
        let observations = vec![obs_at(base + 300), obs_at(base - 300)];
        let samples = select_representative(&bucket(&observations));

        let sample = samples[&NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()];
        assert_eq!(sample.timestamp, (base + 300) * 1000);
    }

    #[test]
    fn test_bucket_with_invalid_candidate_is_dropped() {
        let base = noon(2024, 6, 10);
        let mut broken = obs_at(base);
        broken.humidity = None;

        // The nearest-to-noon candidate is invalid; the whole bucket drops
        // rather than falling back to a farther valid observation.
        let observations = vec![broken, obs_at(base + 3600), obs_at(noon(2024, 6, 11))];
        let samples = select_representative(&bucket(&observations));

        assert_eq!(samples.len(), 1);
        assert!(samples.contains_key(&NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()));
    }

    #[test]
    fn test_empty_input() {
        let samples = select_representative(&bucket(&[]));
        assert!(samples.is_empty());
    }
}
