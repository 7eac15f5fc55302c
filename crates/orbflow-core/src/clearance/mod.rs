//! Spatial clearance
//!
//! Finds the largest sphere around an anchor point that does not overlap any
//! obstacle, and smooths the result over time.
//!
//! # Features
//!
//! - **CollisionOracle**: the sphere-overlap query the solver is built on.
//! - **ObstacleScene**: an in-memory oracle over spheres and boxes.
//! - **ClearanceSolver**: bounded binary search plus exponential smoothing.

pub mod oracle;
pub mod solver;

pub use oracle::{
    ClearanceQuery, CollisionOracle, Hit, LayerMask, Obstacle, ObstacleScene, OwnerId, Shape,
};
pub use solver::{ClearanceConfig, ClearanceSolver, RadiusState, SearchOutcome, SearchReport};
