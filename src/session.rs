//! The logical operations a front end offers, each mutating the store first and then
//! persisting the whole table to the remote document.

use crate::analytics::engine::Analytics;
use crate::config::wetter_config::WetterConfig;
use crate::error::WetterError;
use crate::ingest::live::LiveObservation;
use crate::ingest::manual::{add_manual_entries, ManualEntry};
use crate::ingest::simulation::simulate;
use crate::store::measurement_store::{AddOutcome, ImportReport, MeasurementStore};
use crate::sync::remote_sync::{PullOutcome, PushReport, RemoteSync};
use crate::sync::transport::{ContentTransport, GithubTransport};
use crate::types::into_timestamp::IntoTimestamp;
use crate::types::measurement::{IdentityKey, Measurement};
use chrono::NaiveDate;
use log::{info, warn};
use rand::Rng;

/// What to do with a measurement whose date and location are already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the stored measurement.
    Skip,
    /// Drop the stored measurement and keep the new one.
    Replace,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadReport {
    pub import: ImportReport,
    /// Set when the remote document does not exist or is empty; the store is then empty.
    pub missing: Option<String>,
    pub from_cache: bool,
}

/// Result of an operation that adds measurements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddReport {
    pub added: usize,
    /// Identity keys that already had a measurement and were left alone.
    pub conflicts: Vec<IdentityKey>,
    /// Present when something was added and the table was pushed.
    pub push: Option<PushReport>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteReport {
    pub removed: usize,
    /// Ids that matched no measurement.
    pub unknown: Vec<String>,
    pub push: Option<PushReport>,
}

/// A measurement store bound to its remote document.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use wetterweiser::{ManualEntry, MemoryRemote, PushOutcome, RemoteSync, Session};
///
/// let sync = RemoteSync::builder().transport(MemoryRemote::new()).build();
/// let mut session = Session::new(sync);
/// session.reload(true)?;
///
/// let mut entry = ManualEntry::template(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
/// entry.location = "Bremen".to_string();
/// let report = session.add_manual(&[entry], false)?;
/// assert_eq!(report.added, 1);
/// assert_eq!(report.push.map(|p| p.outcome), Some(PushOutcome::Created));
/// # Ok::<(), wetterweiser::WetterError>(())
/// ```
#[derive(Debug)]
pub struct Session<T: ContentTransport = GithubTransport> {
    store: MeasurementStore,
    sync: RemoteSync<T>,
}

impl Session<GithubTransport> {
    /// A session over the GitHub document and snapshot cache described by `config`.
    pub fn from_config(config: &WetterConfig) -> Result<Self, WetterError> {
        let sync = RemoteSync::builder()
            .transport(config.github_transport()?)
            .cache(config.snapshot_cache()?)
            .build();
        Ok(Self::new(sync))
    }
}

impl<T: ContentTransport> Session<T> {
    /// A session with an empty store; call [`Session::reload`] to fill it.
    pub fn new(sync: RemoteSync<T>) -> Self {
        Self {
            store: MeasurementStore::new(),
            sync,
        }
    }

    pub fn store(&self) -> &MeasurementStore {
        &self.store
    }

    pub fn sync(&self) -> &RemoteSync<T> {
        &self.sync
    }

    pub fn analytics(&self) -> Analytics {
        self.store.analytics()
    }

    /// Replaces the store's contents with the remote document.
    ///
    /// Unless `bypass_cache` is set a fresh snapshot is used instead of a remote round trip.
    /// On error the store is left as it was.
    pub fn reload(&mut self, bypass_cache: bool) -> Result<ReloadReport, WetterError> {
        let pulled = if bypass_cache {
            self.sync.pull()?
        } else {
            self.sync.pull_cached()?
        };

        let mut store = MeasurementStore::new();
        let report = match pulled {
            PullOutcome::Fetched {
                rows, from_cache, ..
            } => ReloadReport {
                import: store.import_rows(rows),
                missing: None,
                from_cache,
            },
            PullOutcome::Missing { message } => ReloadReport {
                missing: Some(message),
                ..ReloadReport::default()
            },
        };
        info!(
            "Reloaded {} measurements ({} skipped, {} duplicates)",
            store.len(),
            report.import.skipped_count(),
            report.import.duplicates
        );
        self.store = store;
        Ok(report)
    }

    /// Pushes the whole table. A conflict is reported in the returned outcome, not as an error.
    pub fn persist(&mut self, developer_mode: bool) -> Result<PushReport, WetterError> {
        let report = self.sync.push(&self.store.as_table(), developer_mode)?;
        if !report.is_written() {
            warn!("Local changes were not saved; reload and reapply them");
        }
        Ok(report)
    }

    fn persist_if(
        &mut self,
        changed: bool,
        developer_mode: bool,
    ) -> Result<Option<PushReport>, WetterError> {
        if changed {
            self.persist(developer_mode).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Adds the entries whose date and location are free; persists only if any were added.
    pub fn add_manual(
        &mut self,
        entries: &[ManualEntry],
        developer_mode: bool,
    ) -> Result<AddReport, WetterError> {
        let batch = add_manual_entries(&mut self.store, entries);
        let push = self.persist_if(batch.added > 0, developer_mode)?;
        Ok(AddReport {
            added: batch.added,
            conflicts: batch.conflicts,
            push,
        })
    }

    /// Adds `days` simulated days ending with `today`. Days that already have a measurement
    /// at `location` are left untouched.
    pub fn add_simulated<R: Rng + ?Sized>(
        &mut self,
        location: &str,
        days: u32,
        today: NaiveDate,
        rng: &mut R,
        developer_mode: bool,
    ) -> Result<AddReport, WetterError> {
        let mut report = AddReport::default();
        for measurement in simulate(location, days, today, rng) {
            match self.store.add_if_absent(measurement) {
                AddOutcome::Added => report.added += 1,
                AddOutcome::Conflict(key) => report.conflicts.push(key),
            }
        }
        info!(
            "Simulated {} days for {}, {} already present",
            report.added,
            location,
            report.conflicts.len()
        );
        report.push = self.persist_if(report.added > 0, developer_mode)?;
        Ok(report)
    }

    /// Records a live observation as today's measurement at `location`, unless one exists.
    pub fn add_live(
        &mut self,
        observation: LiveObservation,
        location: &str,
        now: impl IntoTimestamp,
        developer_mode: bool,
    ) -> Result<AddReport, WetterError> {
        let measurement = observation.into_measurement(location, now);
        let mut report = AddReport::default();
        match self.store.add_if_absent(measurement) {
            AddOutcome::Added => report.added = 1,
            AddOutcome::Conflict(key) => {
                info!("Live data for {} already recorded", key);
                report.conflicts.push(key);
            }
        }
        report.push = self.persist_if(report.added > 0, developer_mode)?;
        Ok(report)
    }

    /// Settles a conflict reported by one of the add operations.
    pub fn resolve_conflict(
        &mut self,
        measurement: Measurement,
        resolution: Resolution,
        developer_mode: bool,
    ) -> Result<Option<PushReport>, WetterError> {
        match resolution {
            Resolution::Skip => Ok(None),
            Resolution::Replace => {
                let key = measurement.identity_key();
                let removed = self.store.replace(key.date, &key.location, measurement);
                info!("Replaced {} measurement(s) for {}", removed, key);
                self.persist(developer_mode).map(Some)
            }
        }
    }

    /// Removes measurements by id. Only allowed in developer mode.
    pub fn delete(
        &mut self,
        ids: &[&str],
        developer_mode: bool,
    ) -> Result<DeleteReport, WetterError> {
        if !developer_mode {
            return Err(WetterError::DeletionNotAllowed);
        }
        let mut report = DeleteReport::default();
        for id in ids {
            match self.store.remove(id) {
                0 => report.unknown.push(id.to_string()),
                removed => report.removed += removed,
            }
        }
        report.push = self.persist_if(report.removed > 0, developer_mode)?;
        Ok(report)
    }
}
