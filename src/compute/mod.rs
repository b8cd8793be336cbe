//! Compute module - Particle flow simulation engine.

mod curve;
mod driver;
mod engine;
mod geometry;
mod hierarchy;
mod layout;
mod particle;
mod rng;
mod routes;
mod spawner;
mod stepper;
mod tally;

pub use curve::*;
pub use driver::*;
pub use engine::*;
pub use geometry::*;
pub use hierarchy::*;
pub use layout::*;
pub use particle::*;
pub use rng::*;
pub use routes::*;
pub use spawner::*;
pub use stepper::*;
pub use tally::*;
