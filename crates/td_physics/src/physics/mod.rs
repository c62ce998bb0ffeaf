//! Physics simulation: bodies, collision detection, and response
//!
//! The broad phase prunes candidate pairs through the spatial grid, the
//! narrow phase runs exact collider-pair tests, and resolution applies
//! pairwise impulses with positional penetration correction. Point-mass
//! model throughout: no angular velocity or rotation anywhere.

pub mod body;
pub mod collision;
pub mod layers;
pub mod world;

pub use body::{Body, BodyConfig, BodyHandle, Collider, CollisionCallback, CollisionEvent};
pub use collision::{Contact, Ray, RayHit};
pub use layers::CollisionLayers;
pub use world::{ForceMode, PhysicsWorld};
