pub mod error;
pub mod live;
pub mod manual;
pub mod simulation;
