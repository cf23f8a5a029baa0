//! The in-memory measurement collection and its identity/merge rules.

use crate::types::measurement::{IdentityKey, Measurement};
use crate::types::record::{Record, RowResult};
use chrono::NaiveDate;
use log::{debug, info, warn};
use rand::Rng;
use std::collections::{BTreeSet, HashSet};

/// What to do with inbound rows that carry no sunshine value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SunshineFallback {
    /// Leave the value absent; it is written as 0 on export.
    #[default]
    Keep,
    /// Substitute a random placeholder in `[0, 12]` hours.
    RandomPlaceholder,
}

/// Summary of a bulk import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Rows added to the store.
    pub imported: usize,
    /// Rows skipped because their identity key was already present.
    pub duplicates: usize,
    /// One message per row that could not be turned into a measurement.
    pub skipped: Vec<String>,
    /// Non-fatal remarks about imported rows, such as an unrecognised provenance label.
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Result of [`MeasurementStore::add_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// A measurement for this date and location already exists; nothing was changed.
    Conflict(IdentityKey),
}

/// An owned collection of [`Measurement`]s.
///
/// Through [`MeasurementStore::add_if_absent`], [`MeasurementStore::import_rows`] and
/// [`MeasurementStore::replace`] the store never holds two measurements with the same
/// [`IdentityKey`]. [`MeasurementStore::add`] appends unconditionally and leaves that check to
/// the caller.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use wetterweiser::{AddOutcome, Measurement, MeasurementStore};
///
/// let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
/// let mut store = MeasurementStore::new();
/// let first = Measurement::builder().timestamp(day).location("Bonn").build();
/// let second = Measurement::builder().timestamp(day).location("Bonn").build();
///
/// assert_eq!(store.add_if_absent(first), AddOutcome::Added);
/// assert!(matches!(store.add_if_absent(second), AddOutcome::Conflict(_)));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeasurementStore {
    measurements: Vec<Measurement>,
}

impl MeasurementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a measurement without any identity check.
    pub fn add(&mut self, measurement: Measurement) {
        self.measurements.push(measurement);
    }

    /// Appends the measurement unless its identity key is already taken.
    pub fn add_if_absent(&mut self, measurement: Measurement) -> AddOutcome {
        if self.exists_for(measurement.date(), measurement.location()) {
            let key = measurement.identity_key();
            debug!("Refusing to add duplicate measurement for {}", key);
            return AddOutcome::Conflict(key);
        }
        self.add(measurement);
        AddOutcome::Added
    }

    /// Whether any measurement falls on `date` at `location`.
    pub fn exists_for(&self, date: NaiveDate, location: &str) -> bool {
        self.measurements.iter().any(|m| m.matches(date, location))
    }

    /// Removes every measurement on `date` at `location`, then appends `measurement`.
    ///
    /// # Returns
    ///
    /// The number of measurements removed. Under the store's invariant this is 0 or 1.
    pub fn replace(&mut self, date: NaiveDate, location: &str, measurement: Measurement) -> usize {
        let before = self.measurements.len();
        self.measurements.retain(|m| !m.matches(date, location));
        let removed = before - self.measurements.len();
        if removed > 1 {
            warn!(
                "Replaced {} measurements for {} @ {}; store held duplicates",
                removed, date, location
            );
        }
        self.add(measurement);
        removed
    }

    /// Removes every measurement carrying `id` and returns how many were removed.
    ///
    /// Imported documents may repeat an id, so all matches go. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.measurements.len();
        self.measurements.retain(|m| m.id() != id);
        before - self.measurements.len()
    }

    pub fn get(&self, id: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Every measurement as a [`Record`], sorted ascending by date.
    ///
    /// This is the canonical read view for analytics, display and export. Measurements on the
    /// same timestamp keep their insertion order.
    pub fn as_table(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .measurements
            .iter()
            .map(Measurement::to_record)
            .collect();
        records.sort_by_key(|r| r.date);
        records
    }

    /// Sorted, de-duplicated location labels.
    pub fn locations(&self) -> Vec<String> {
        self.measurements
            .iter()
            .map(|m| m.location().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Bulk-imports rows, keeping missing sunshine values absent.
    ///
    /// See [`MeasurementStore::import_rows_with`].
    pub fn import_rows<I>(&mut self, rows: I) -> ImportReport
    where
        I: IntoIterator<Item = RowResult>,
    {
        self.import_rows_with(rows, SunshineFallback::Keep, &mut rand::rng())
    }

    /// Bulk-imports rows from a remote document, spreadsheet or CSV.
    ///
    /// Legacy rows that only carry a mean temperature get their min/max bounds backfilled from
    /// it. Rows whose identity key is already present (in the store or earlier in the same
    /// batch) are skipped, so importing the same rows twice is a no-op. Rows that cannot be read
    /// are skipped and listed in [`ImportReport::skipped`]; the import itself never fails.
    pub fn import_rows_with<I, R>(
        &mut self,
        rows: I,
        sunshine: SunshineFallback,
        rng: &mut R,
    ) -> ImportReport
    where
        I: IntoIterator<Item = RowResult>,
        R: Rng + ?Sized,
    {
        let mut report = ImportReport::default();
        let mut known: HashSet<IdentityKey> =
            self.measurements.iter().map(Measurement::identity_key).collect();

        for (index, row) in rows.into_iter().enumerate() {
            let parsed = row.and_then(|raw| Measurement::from_raw_row(&raw));
            let (measurement, warning) = match parsed {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping row {}: {}", index, e);
                    report.skipped.push(format!("row {}: {}", index, e));
                    continue;
                }
            };

            let mut measurement = measurement.with_backfilled_bounds();
            if sunshine == SunshineFallback::RandomPlaceholder {
                measurement = measurement.with_sunshine_placeholder(rng);
            }

            if !known.insert(measurement.identity_key()) {
                report.duplicates += 1;
                continue;
            }
            if let Some(warning) = warning {
                warn!("Row {}: {}", index, warning);
                report.warnings.push(format!("row {}: {}", index, warning));
            }
            self.add(measurement);
            report.imported += 1;
        }

        info!(
            "Imported {} rows ({} duplicates, {} skipped)",
            report.imported,
            report.duplicates,
            report.skipped.len()
        );
        report
    }
}
