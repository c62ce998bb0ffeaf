//! Foundation utilities shared across the crate

pub mod math;

pub use math::{Aabb, Vec3};
