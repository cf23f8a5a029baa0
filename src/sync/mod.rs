pub mod cache;
pub mod error;
pub mod memory;
pub mod remote_sync;
pub mod transport;
pub mod wire;
