//! Spatial partitioning for broad-phase queries

pub mod grid;

pub use grid::{CellKey, SpatialGrid};
