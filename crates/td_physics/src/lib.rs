//! # TD Physics
//!
//! Real-time collision and physics subsystem for a 3D tower-defense game.
//!
//! ## Features
//!
//! - **Spatial Hash Broad-Phase**: Uniform-cell grid bounding candidate
//!   counts independent of total body count
//! - **Narrow-Phase Detection**: Exact sphere/box pair tests and ray casts
//! - **Impulse Resolution**: Point-mass collision response with restitution,
//!   penetration correction, and ground contact
//! - **Stability Guards**: Clamped timesteps, bounce rest threshold, bounded
//!   per-body candidate examination
//!
//! ## Quick Start
//!
//! ```rust
//! use td_physics::prelude::*;
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::default());
//!
//! let ball = world.register(
//!     BodyConfig::new(Collider::sphere(0.5))
//!         .position(Vec3::new(0.0, 5.0, 0.0))
//!         .mass(1.0)
//!         .restitution(0.3),
//! );
//!
//! // Game loop: advance the simulation and read the result back.
//! world.step(1.0 / 60.0);
//! let position = world.body(ball).unwrap().position();
//! assert!(position.y < 5.0);
//! ```
//!
//! The world never holds references into caller objects: [`register`] returns
//! an opaque [`BodyHandle`] and callers read post-step state through
//! accessors.
//!
//! [`register`]: physics::PhysicsWorld::register
//! [`BodyHandle`]: physics::BodyHandle

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod spatial;

pub use config::{Config, ConfigError, PhysicsConfig};
pub use physics::{
    Body, BodyConfig, BodyHandle, Collider, CollisionEvent, CollisionLayers, ForceMode,
    PhysicsWorld, Ray, RayHit,
};
pub use spatial::SpatialGrid;

/// Common imports for physics users
pub mod prelude {
    pub use crate::{
        config::{Config, PhysicsConfig},
        foundation::math::{Aabb, Vec3},
        physics::{
            Body, BodyConfig, BodyHandle, Collider, CollisionEvent, CollisionLayers, ForceMode,
            PhysicsWorld, Ray, RayHit,
        },
        spatial::SpatialGrid,
    };
}
