pub mod engine;
pub mod forecast;
pub mod scope;
