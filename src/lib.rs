mod analytics;
mod config;
mod error;
mod ingest;
mod session;
mod store;
mod sync;
mod types;
mod utils;

pub use error::WetterError;
pub use session::*;

pub use types::error::RecordError;
pub use types::into_timestamp::IntoTimestamp;
pub use types::measurement::{IdentityKey, Measurement, DEFAULT_LOCATION};
pub use types::record::*;
pub use types::source::Source;

pub use store::error::TableError;
pub use store::measurement_store::*;
pub use store::tabular::{read_csv_rows, read_csv_rows_from_bytes};

pub use sync::cache::{Snapshot, SnapshotCache, DEFAULT_SNAPSHOT_TTL};
pub use sync::error::SyncError;
pub use sync::memory::MemoryRemote;
pub use sync::remote_sync::{PullOutcome, PushOutcome, PushReport, RemoteSync};
pub use sync::transport::*;
pub use sync::wire::PutPayload;

pub use analytics::engine::*;
pub use analytics::forecast::*;
pub use analytics::scope::{LocationFilter, Scope};

pub use ingest::error::LiveDataError;
pub use ingest::live::{LiveObservation, OpenWeatherClient, DEFAULT_OWM_BASE_URL};
pub use ingest::manual::{add_manual_entries, ManualBatch, ManualEntry};
pub use ingest::simulation::{simulate, SIMULATION_DAYS};

pub use config::error::ConfigError;
pub use config::wetter_config::{CacheConfig, LiveConfig, RemoteConfig, WetterConfig};

pub use utils::get_cache_dir;
