//! Body storage types for the physics world
//!
//! Bodies live in an index-addressed arena keyed by [`BodyHandle`]; gameplay
//! code holds only the opaque handle and reads state back through accessors,
//! so there is never a two-way ownership cycle between rendered objects and
//! physics bodies.

use crate::foundation::math::{Aabb, Vec3};
use crate::physics::layers::CollisionLayers;

slotmap::new_key_type! {
    /// Opaque handle to a body owned by a
    /// [`PhysicsWorld`](crate::physics::PhysicsWorld)
    pub struct BodyHandle;
}

/// Collision geometry attached to a body, immutable after registration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    /// Sphere centered on the body position
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Axis-aligned box centered on the body position
    Box {
        /// Half-size along each axis
        half_extents: Vec3,
    },
}

impl Collider {
    /// Create a sphere collider
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Create a box collider from full width/height/depth
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::Box {
            half_extents: Vec3::new(width * 0.5, height * 0.5, depth * 0.5),
        }
    }

    /// Clamp non-positive dimensions to zero extent
    ///
    /// A malformed collider must not stall the simulation: it degrades to a
    /// point that never collides, with a warning.
    pub(crate) fn sanitized(self) -> Self {
        match self {
            Self::Sphere { radius } => {
                if radius > 0.0 {
                    self
                } else {
                    log::warn!("degenerate sphere radius {radius}, using zero extent");
                    Self::Sphere { radius: 0.0 }
                }
            }
            Self::Box { half_extents } => {
                if half_extents.x > 0.0 && half_extents.y > 0.0 && half_extents.z > 0.0 {
                    self
                } else {
                    log::warn!(
                        "degenerate box half extents {half_extents:?}, clamping to zero extent"
                    );
                    Self::Box {
                        half_extents: Vec3::new(
                            half_extents.x.max(0.0),
                            half_extents.y.max(0.0),
                            half_extents.z.max(0.0),
                        ),
                    }
                }
            }
        }
    }

    /// Radius of the sphere enclosing this collider
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Box { half_extents } => half_extents.magnitude(),
        }
    }

    /// Distance from the body center down to the collider's lowest point
    pub fn lower_extent(&self) -> f32 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Box { half_extents } => half_extents.y,
        }
    }

    /// World-space bounds of this collider at the given center
    pub fn aabb(&self, center: Vec3) -> Aabb {
        match self {
            Self::Sphere { radius } => Aabb::from_sphere(center, *radius),
            Self::Box { half_extents } => Aabb::from_center_extents(center, *half_extents),
        }
    }
}

/// Contact reported to a body's collision callback
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    /// The body the callback belongs to
    pub this: BodyHandle,
    /// The other body in the contact
    pub other: BodyHandle,
    /// Contact normal pointing from `this` toward `other`
    pub normal: Vec3,
    /// Penetration depth at detection time (positive)
    pub depth: f32,
}

/// Callback invoked after collision resolution for each contact a body is
/// involved in
pub type CollisionCallback = Box<dyn FnMut(CollisionEvent)>;

/// Registration parameters for a new body
pub struct BodyConfig {
    pub(crate) collider: Collider,
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) mass: f32,
    pub(crate) restitution: f32,
    pub(crate) friction: f32,
    pub(crate) is_static: bool,
    pub(crate) use_gravity: bool,
    pub(crate) layer: u32,
    pub(crate) mask: u32,
    pub(crate) on_collision: Option<CollisionCallback>,
}

impl BodyConfig {
    /// Start a config with the given collider and defaults for everything
    /// else: unit mass, dynamic, gravity on, all collision layers
    pub fn new(collider: Collider) -> Self {
        Self {
            collider,
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            mass: 1.0,
            restitution: 0.3,
            friction: 0.5,
            is_static: false,
            use_gravity: true,
            layer: CollisionLayers::ALL,
            mask: CollisionLayers::ALL,
            on_collision: None,
        }
    }

    /// Initial position
    #[must_use]
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Initial velocity
    #[must_use]
    pub fn velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Body mass; must be positive for dynamic bodies
    #[must_use]
    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Bounce energy retention, clamped into `[0, 1]` at registration
    #[must_use]
    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Velocity-proportional drag applied while grounded
    #[must_use]
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Static bodies never move and have infinite effective mass
    #[must_use]
    pub fn is_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Whether gravity accelerates this body
    #[must_use]
    pub fn use_gravity(mut self, use_gravity: bool) -> Self {
        self.use_gravity = use_gravity;
        self
    }

    /// Collision layer bits this body occupies
    #[must_use]
    pub fn layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Collision layer bits this body collides with
    #[must_use]
    pub fn mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }

    /// Callback invoked for each contact involving this body
    #[must_use]
    pub fn on_collision(mut self, callback: impl FnMut(CollisionEvent) + 'static) -> Self {
        self.on_collision = Some(Box::new(callback));
        self
    }
}

/// A simulated body owned by the physics world
///
/// Mutated only inside [`PhysicsWorld`](crate::physics::PhysicsWorld);
/// callers observe it through the read accessors.
pub struct Body {
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) acceleration: Vec3,
    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    pub(crate) restitution: f32,
    pub(crate) friction: f32,
    pub(crate) is_static: bool,
    pub(crate) use_gravity: bool,
    pub(crate) grounded: bool,
    pub(crate) collider: Collider,
    pub(crate) layer: u32,
    pub(crate) mask: u32,
    pub(crate) on_collision: Option<CollisionCallback>,
}

impl Body {
    /// Build a body from a registration config, degrading invalid parameters
    /// instead of failing
    pub(crate) fn from_config(config: BodyConfig) -> Self {
        let collider = config.collider.sanitized();

        let mass = if config.is_static || config.mass > 0.0 {
            config.mass
        } else {
            log::warn!("non-positive mass {} on dynamic body, using 1.0", config.mass);
            1.0
        };
        let inv_mass = if config.is_static { 0.0 } else { 1.0 / mass };

        let restitution = if (0.0..=1.0).contains(&config.restitution) {
            config.restitution
        } else {
            log::warn!("restitution {} outside [0, 1], clamping", config.restitution);
            config.restitution.clamp(0.0, 1.0)
        };

        Self {
            position: config.position,
            velocity: config.velocity,
            acceleration: Vec3::zeros(),
            mass,
            inv_mass,
            restitution,
            friction: config.friction,
            is_static: config.is_static,
            use_gravity: config.use_gravity,
            grounded: false,
            collider,
            layer: config.layer,
            mask: config.mask,
            on_collision: config.on_collision,
        }
    }

    /// Current position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current velocity
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Body mass
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Bounce energy retention
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Grounded-drag coefficient
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Whether the body is immovable
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether gravity applies
    pub fn use_gravity(&self) -> bool {
        self.use_gravity
    }

    /// Whether the body touched the ground plane last step
    pub fn grounded(&self) -> bool {
        self.grounded
    }

    /// Collision geometry
    pub fn collider(&self) -> Collider {
        self.collider
    }

    /// Collision layer bits
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Collision mask bits
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// World-space bounds at the current position
    pub fn aabb(&self) -> Aabb {
        self.collider.aabb(self.position)
    }

    /// Radius of the sphere enclosing the collider
    pub fn bounding_radius(&self) -> f32 {
        self.collider.bounding_radius()
    }
}
