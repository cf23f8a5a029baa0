use crate::store::measurement_store::{AddOutcome, MeasurementStore};
use crate::types::measurement::{IdentityKey, Measurement, DEFAULT_LOCATION};
use crate::types::source::Source;
use chrono::NaiveDate;
use log::info;

/// One row of operator input.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualEntry {
    pub date: NaiveDate,
    pub temp_min: f64,
    pub temp_max: f64,
    pub precipitation: f64,
    pub sunshine_hours: Option<f64>,
    pub location: String,
}

impl ManualEntry {
    /// The pre-filled row an input form starts with.
    pub fn template(date: NaiveDate) -> Self {
        Self {
            date,
            temp_min: 15.0,
            temp_max: 25.0,
            precipitation: 0.0,
            sunshine_hours: Some(6.0),
            location: String::new(),
        }
    }

    /// A manual measurement whose mean temperature is derived from the bounds.
    pub fn to_measurement(&self) -> Measurement {
        let location = match self.location.trim() {
            "" => DEFAULT_LOCATION,
            trimmed => trimmed,
        };
        Measurement::builder()
            .timestamp(self.date)
            .temp_min(self.temp_min)
            .temp_max(self.temp_max)
            .precipitation(self.precipitation)
            .maybe_sunshine_hours(self.sunshine_hours)
            .source(Source::Manual)
            .location(location)
            .build()
    }
}

/// Outcome of adding a batch of manual entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualBatch {
    pub added: usize,
    /// Entries left out because their date and location already had a measurement.
    pub conflicts: Vec<IdentityKey>,
}

/// Adds every entry whose identity key is free; the others are reported, not overwritten.
pub fn add_manual_entries(store: &mut MeasurementStore, entries: &[ManualEntry]) -> ManualBatch {
    let mut batch = ManualBatch::default();
    for entry in entries {
        match store.add_if_absent(entry.to_measurement()) {
            AddOutcome::Added => batch.added += 1,
            AddOutcome::Conflict(key) => batch.conflicts.push(key),
        }
    }
    info!(
        "Added {} manual entries, {} already present",
        batch.added,
        batch.conflicts.len()
    );
    batch
}
