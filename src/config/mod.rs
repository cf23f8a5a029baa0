pub mod error;
pub mod wetter_config;
