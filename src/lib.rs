//! Particle Flow - Animated flow diagrams driven by a particle simulation.
//!
//! Discrete particles travel along precomputed routes from a root population
//! to categorized destinations, so the stream visually encodes the
//! proportions of a hierarchical or tabular dataset. Live counters report
//! arrivals per destination and group.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration and dataset types
//! - `compute`: Flattening, route enumeration, geometry cache, spawning, stepping, tallies
//!
//! # Example
//!
//! ```rust,no_run
//! use particle_flow::{
//!     compute::{ColumnLayout, FlowEngine},
//!     schema::{DatasetShape, EngineConfig, LayoutConfig},
//! };
//!
//! let json = r#"{"root": {"A": {"B": {"males": 3, "females": 1}}, "C": {"males": 4}}}"#;
//! let mut engine =
//!     FlowEngine::from_json_str(json, &DatasetShape::default(), EngineConfig::default())?;
//!
//! // Geometry must exist before the first tick.
//! engine.apply_layout(&ColumnLayout::new(LayoutConfig::default()));
//!
//! for tick in 1..=600 {
//!     let frame = engine.advance(tick)?;
//!     println!("tick {}: {} particles in flight", frame.tick, frame.sprites.len());
//! }
//! # Ok::<(), particle_flow::compute::EngineError>(())
//! ```

pub mod compute;
pub mod schema;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use compute::{Driver, EngineError, FlowEngine, Frame};
pub use schema::{Dataset, DatasetShape, EngineConfig, LayoutConfig};
