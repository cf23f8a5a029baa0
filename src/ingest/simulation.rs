//! Synthetic measurements for trying out the analytics without real data.

use crate::types::measurement::Measurement;
use crate::types::source::Source;
use crate::utils::round1;
use chrono::{Days, NaiveDate};
use log::warn;
use rand::Rng;
use std::ops::RangeInclusive;

pub const SIMULATION_DAYS: RangeInclusive<u32> = 1..=30;
const TEMPERATURE_RANGE: RangeInclusive<f64> = 15.0..=30.0;
const PRECIPITATION_RANGE: RangeInclusive<f64> = 0.0..=10.0;
const SUNSHINE_RANGE: RangeInclusive<f64> = 0.0..=12.0;

/// One simulated measurement per day for `days` days ending with `today`, newest first.
///
/// `days` is clamped to 1..=30. Values are drawn uniformly and rounded to one decimal.
pub fn simulate<R: Rng + ?Sized>(
    location: &str,
    days: u32,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<Measurement> {
    let clamped = days.clamp(*SIMULATION_DAYS.start(), *SIMULATION_DAYS.end());
    if clamped != days {
        warn!("Simulation length {} out of range, using {}", days, clamped);
    }

    (0..u64::from(clamped))
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| {
            Measurement::builder()
                .timestamp(date)
                .temperature(round1(rng.random_range(TEMPERATURE_RANGE)))
                .precipitation(round1(rng.random_range(PRECIPITATION_RANGE)))
                .sunshine_hours(round1(rng.random_range(SUNSHINE_RANGE)))
                .source(Source::Simulated)
                .location(location.trim())
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_simulation_days_and_ranges() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let measurements = simulate("Graz", 7, today, &mut rng);

        assert_eq!(measurements.len(), 7);
        assert_eq!(measurements[0].date(), today);
        assert_eq!(
            measurements[6].date(),
            NaiveDate::from_ymd_opt(2024, 2, 26).unwrap()
        );
        for m in &measurements {
            assert_eq!(m.source(), Source::Simulated);
            assert!(TEMPERATURE_RANGE.contains(&m.temperature().unwrap()));
            assert!(PRECIPITATION_RANGE.contains(&m.precipitation()));
            assert!(SUNSHINE_RANGE.contains(&m.sunshine_hours().unwrap()));
        }
    }

    #[test]
    fn test_simulation_length_is_clamped() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(simulate("Graz", 0, today, &mut rng).len(), 1);
        assert_eq!(simulate("Graz", 90, today, &mut rng).len(), 30);
    }
}
