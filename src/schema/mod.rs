//! Schema module - Configuration and dataset types for particle flow diagrams.

mod config;
mod dataset;

pub use config::*;
pub use dataset::*;
