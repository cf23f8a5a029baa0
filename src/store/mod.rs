pub mod error;
pub mod measurement_store;
pub mod tabular;
