//! The [`Measurement`] entity: one dated, located weather observation with provenance.

use crate::types::error::RecordError;
use crate::types::into_timestamp::IntoTimestamp;
use crate::types::record::{parse_timestamp, RawRow, Record};
use crate::types::source::Source;
use crate::utils::round1;
use bon::bon;
use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use std::fmt;

/// Location label used when an inbound row carries none.
pub const DEFAULT_LOCATION: &str = "Unbekannt";

/// The deduplication key of the store: calendar date plus location label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub date: NaiveDate,
    pub location: String,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.date, self.location)
    }
}

/// A single weather observation.
///
/// Fields are fixed at construction; the only way to change a stored observation is to
/// replace it in the [`crate::MeasurementStore`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use wetterweiser::{Measurement, Source};
///
/// let m = Measurement::builder()
///     .timestamp(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
///     .location("Hamburg")
///     .temp_min(14.0)
///     .temp_max(23.0)
///     .precipitation(1.2)
///     .source(Source::Manual)
///     .build();
///
/// assert_eq!(m.to_record().temperature, 18.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    id: String,
    timestamp: NaiveDateTime,
    temperature: Option<f64>,
    precipitation: f64,
    sunshine_hours: Option<f64>,
    source: Source,
    location: String,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[bon]
impl Measurement {
    /// Creates a measurement, generating a fresh UUID when no `id` is given.
    ///
    /// A missing `sunshine_hours` stays missing; substituting a value is a policy decision
    /// of the ingestion path (see [`crate::SunshineFallback`]).
    #[builder]
    pub fn new(
        timestamp: impl IntoTimestamp,
        temperature: Option<f64>,
        #[builder(default)] precipitation: f64,
        sunshine_hours: Option<f64>,
        #[builder(into)] id: Option<String>,
        #[builder(default)] source: Source,
        #[builder(into)] location: String,
        temp_min: Option<f64>,
        temp_max: Option<f64>,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            timestamp: timestamp.into_timestamp(),
            temperature,
            precipitation,
            sunshine_hours,
            source,
            location,
            temp_min,
            temp_max,
        }
    }
}

impl Measurement {
    /// Builds a measurement from an inbound row.
    ///
    /// Unknown provenance labels fall back to [`Source::Manual`]; the returned warning says so.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingDate`] or [`RecordError::InvalidDate`] when the row's date
    /// cannot be interpreted.
    pub fn from_raw_row(row: &RawRow) -> Result<(Measurement, Option<String>), RecordError> {
        let timestamp = parse_timestamp(row.date.as_deref().ok_or(RecordError::MissingDate)?)?;
        let (source, warning) = Source::parse_lenient(row.source.as_deref());
        let location = row
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LOCATION);

        let measurement = Measurement::builder()
            .timestamp(timestamp)
            .maybe_temperature(row.temperature)
            .precipitation(row.precipitation.unwrap_or(0.0))
            .maybe_sunshine_hours(row.sunshine_hours)
            .maybe_id(row.id.clone())
            .source(source)
            .location(location)
            .maybe_temp_min(row.temp_min)
            .maybe_temp_max(row.temp_max)
            .build();
        Ok((measurement, warning))
    }

    /// Flattens the measurement into its serialized form.
    ///
    /// This is the only place where the stored fields meet the wire format; the inverse is
    /// [`Measurement::from_raw_row`].
    pub fn to_record(&self) -> Record {
        Record {
            id: self.id.clone(),
            date: self.timestamp,
            temperature: self.effective_temperature(),
            precipitation: self.precipitation,
            sunshine_hours: self.sunshine_hours.unwrap_or(0.0),
            source: self.source,
            location: self.location.clone(),
            temp_min: self.temp_min,
            temp_max: self.temp_max,
        }
    }

    /// The stored mean, else the min/max midpoint rounded to one decimal, else 0.
    pub fn effective_temperature(&self) -> f64 {
        match (self.temperature, self.temp_min, self.temp_max) {
            (Some(t), _, _) => t,
            (None, Some(min), Some(max)) => round1((min + max) / 2.0),
            _ => 0.0,
        }
    }

    /// Backfills missing min/max bounds from the mean temperature.
    ///
    /// Legacy records only carry a mean; without bounds the extremes analytics would skip them.
    /// Applies only when both bounds are absent and a mean is present.
    pub fn with_backfilled_bounds(mut self) -> Self {
        if let (None, None, Some(t)) = (self.temp_min, self.temp_max, self.temperature) {
            self.temp_min = Some(t);
            self.temp_max = Some(t);
        }
        self
    }

    /// Fills a missing sunshine value with a random placeholder in `[0, 12]` hours.
    pub fn with_sunshine_placeholder<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        if self.sunshine_hours.is_none() {
            self.sunshine_hours = Some(round1(rng.random_range(0.0..=12.0)));
        }
        self
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            date: self.date(),
            location: self.location.clone(),
        }
    }

    /// Whether this measurement falls on `date` at `location`.
    pub fn matches(&self, date: NaiveDate, location: &str) -> bool {
        self.location == location && self.date() == date
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Calendar date of the observation.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn precipitation(&self) -> f64 {
        self.precipitation
    }

    pub fn sunshine_hours(&self) -> Option<f64> {
        self.sunshine_hours
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn temp_min(&self) -> Option<f64> {
        self.temp_min
    }

    pub fn temp_max(&self) -> Option<f64> {
        self.temp_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_builder_generates_unique_ids() {
        let a = Measurement::builder()
            .timestamp(day(2024, 1, 1))
            .location("Köln")
            .build();
        let b = Measurement::builder()
            .timestamp(day(2024, 1, 1))
            .location("Köln")
            .build();
        assert!(!a.id().is_empty());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.source(), Source::Manual);
        assert_eq!(a.precipitation(), 0.0);
        assert_eq!(a.sunshine_hours(), None);
    }

    #[test]
    fn test_record_derives_mean_from_bounds() {
        let m = Measurement::builder()
            .timestamp(day(2024, 1, 1))
            .location("Köln")
            .temp_min(3.3)
            .temp_max(8.0)
            .build();
        let record = m.to_record();
        assert_eq!(record.temperature, 5.7);
        assert_eq!(record.sunshine_hours, 0.0);
        assert_eq!(record.temp_min, Some(3.3));
    }

    #[test]
    fn test_record_falls_back_to_zero_without_bounds() {
        let m = Measurement::builder()
            .timestamp(day(2024, 1, 1))
            .location("Köln")
            .temp_max(8.0)
            .build();
        assert_eq!(m.to_record().temperature, 0.0);
        assert_eq!(m.to_record().temp_min, None);
    }

    #[test]
    fn test_explicit_mean_wins_over_bounds() {
        let m = Measurement::builder()
            .timestamp(day(2024, 1, 1))
            .location("Köln")
            .temperature(4.0)
            .temp_min(0.0)
            .temp_max(20.0)
            .build();
        assert_eq!(m.to_record().temperature, 4.0);
    }

    #[test]
    fn test_round_trip_through_record() -> Result<(), RecordError> {
        let original = Measurement::builder()
            .timestamp(day(2023, 11, 5).and_hms_opt(14, 5, 9).unwrap())
            .temperature(9.5)
            .precipitation(3.1)
            .sunshine_hours(2.5)
            .id("fixed-id")
            .source(Source::Live)
            .location("Dresden")
            .temp_min(6.0)
            .temp_max(12.5)
            .build();

        let raw = RawRow::from(&original.to_record());
        let (parsed, warning) = Measurement::from_raw_row(&raw)?;
        assert_eq!(parsed, original);
        assert!(warning.is_none());
        Ok(())
    }

    #[test]
    fn test_from_raw_row_requires_date() {
        let row = RawRow {
            location: Some("Ulm".into()),
            ..RawRow::default()
        };
        assert_eq!(
            Measurement::from_raw_row(&row).unwrap_err(),
            RecordError::MissingDate
        );
    }

    #[test]
    fn test_from_raw_row_defaults() -> Result<(), RecordError> {
        let row = RawRow {
            date: Some("2024-04-04".into()),
            source: Some("radar".into()),
            location: Some("  ".into()),
            ..RawRow::default()
        };
        let (m, warning) = Measurement::from_raw_row(&row)?;
        assert_eq!(m.location(), DEFAULT_LOCATION);
        assert_eq!(m.source(), Source::Manual);
        assert!(warning.is_some());
        assert_eq!(m.precipitation(), 0.0);
        Ok(())
    }

    #[test]
    fn test_backfill_only_when_both_bounds_missing() {
        let legacy = Measurement::builder()
            .timestamp(day(2022, 8, 8))
            .location("Ulm")
            .temperature(21.0)
            .build()
            .with_backfilled_bounds();
        assert_eq!(legacy.temp_min(), Some(21.0));
        assert_eq!(legacy.temp_max(), Some(21.0));

        let partial = Measurement::builder()
            .timestamp(day(2022, 8, 8))
            .location("Ulm")
            .temperature(21.0)
            .temp_max(25.0)
            .build()
            .with_backfilled_bounds();
        assert_eq!(partial.temp_min(), None);
        assert_eq!(partial.temp_max(), Some(25.0));
    }

    #[test]
    fn test_sunshine_placeholder_is_bounded_and_keeps_values() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let m = Measurement::builder()
                .timestamp(day(2022, 8, 8))
                .location("Ulm")
                .build()
                .with_sunshine_placeholder(&mut rng);
            let hours = m.sunshine_hours().unwrap();
            assert!((0.0..=12.0).contains(&hours));
        }
        let kept = Measurement::builder()
            .timestamp(day(2022, 8, 8))
            .location("Ulm")
            .sunshine_hours(3.0)
            .build()
            .with_sunshine_placeholder(&mut rng);
        assert_eq!(kept.sunshine_hours(), Some(3.0));
    }

    #[test]
    fn test_identity_key_uses_calendar_date() {
        let morning = Measurement::builder()
            .timestamp(day(2024, 5, 5).and_hms_opt(6, 0, 0).unwrap())
            .location("Ulm")
            .build();
        let evening = Measurement::builder()
            .timestamp(day(2024, 5, 5).and_hms_opt(22, 0, 0).unwrap())
            .location("Ulm")
            .build();
        assert_eq!(morning.identity_key(), evening.identity_key());
        assert!(morning.matches(day(2024, 5, 5), "Ulm"));
        assert!(!morning.matches(day(2024, 5, 5), "ulm"));
    }
}
