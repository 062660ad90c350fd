//! Domain types for EdgeLab

pub mod bar;
pub mod prediction;
pub mod trade;

pub use bar::Bar;
pub use prediction::Prediction;
pub use trade::{Direction, Trade};
