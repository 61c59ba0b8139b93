//! Ant Colony Optimization engine.
//!
//! This module exports path construction, the pheromone field and the
//! colony driver.

pub mod colony;
pub mod path;
pub mod pheromone;

pub use colony::*;
pub use path::*;
pub use pheromone::*;
