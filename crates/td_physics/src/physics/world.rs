//! Physics world: integration, collision detection, and response
//!
//! [`PhysicsWorld`] owns every registered body and advances them with
//! [`PhysicsWorld::step`]: integrate motion, enforce ground contact and world
//! bounds, sync the broad-phase grid, detect contacts (broad + narrow
//! phase), resolve them with pairwise impulses, then fire collision
//! callbacks. Single-threaded by design: all mutation happens inside `step`,
//! `register`/`unregister`, and `apply_force`, so no locking is needed.
//!
//! Nothing in here is fatal. Operations on unregistered handles warn and do
//! nothing, malformed colliders degrade to zero extent at registration, and
//! oversized timesteps are clamped; the worst outcome is a visibly wrong
//! physical response, never a crash.

use crate::config::PhysicsConfig;
use crate::foundation::math::{Aabb, Vec3};
use crate::physics::body::{Body, BodyConfig, BodyHandle, CollisionEvent};
use crate::physics::collision::{collider_contact, ray_collider, Contact, Ray, RayHit};
use crate::physics::layers::CollisionLayers;
use crate::spatial::SpatialGrid;
use slotmap::SlotMap;
use std::collections::HashSet;

/// How `apply_force` interprets the force vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Instantaneous momentum change: `velocity += force / mass` immediately
    Impulse,
    /// Accumulated into acceleration, consumed at the next integration step
    Continuous,
}

/// A detected contact pair queued for resolution
struct PendingContact {
    first: BodyHandle,
    second: BodyHandle,
    contact: Contact,
}

/// The physics simulation: body arena, broad-phase grid, and stepping logic
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: SlotMap<BodyHandle, Body>,
    grid: SpatialGrid<BodyHandle>,
    world_bounds: Aabb,
}

impl PhysicsWorld {
    /// Default world bounds: effectively unbounded until the game calls
    /// [`PhysicsWorld::set_world_bounds`]
    const DEFAULT_BOUNDS_EXTENT: f32 = 1.0e6;

    /// Create a world with the given tuning parameters
    pub fn new(config: PhysicsConfig) -> Self {
        let grid = SpatialGrid::new(config.cell_size);
        let extent = Self::DEFAULT_BOUNDS_EXTENT;
        Self {
            config,
            bodies: SlotMap::with_key(),
            grid,
            world_bounds: Aabb::from_center_extents(
                Vec3::zeros(),
                Vec3::new(extent, extent, extent),
            ),
        }
    }

    /// Register a body and return its handle
    ///
    /// Invalid parameters (non-positive collider dimensions or mass) degrade
    /// with a warning instead of failing; registration itself cannot fail.
    pub fn register(&mut self, config: BodyConfig) -> BodyHandle {
        let body = Body::from_config(config);
        let bounds = body.aabb();
        let handle = self.bodies.insert(body);
        self.grid.insert(handle, bounds);
        handle
    }

    /// Remove a body from the simulation
    ///
    /// Returns `false` (with a warning) for handles that were never
    /// registered or were already removed; never panics.
    pub fn unregister(&mut self, handle: BodyHandle) -> bool {
        if self.bodies.remove(handle).is_none() {
            log::warn!("unregister on unknown body handle {handle:?}");
            return false;
        }
        self.grid.remove(handle);
        true
    }

    /// Access a body's post-step state
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Check whether a handle refers to a live body
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(handle)
    }

    /// Number of registered bodies
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Check whether no bodies are registered
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Current tuning parameters
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Current world bounds
    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    /// Replace the box all dynamic bodies are clamped into
    pub fn set_world_bounds(&mut self, bounds: Aabb) {
        self.world_bounds = bounds;
    }

    /// Remove all bodies
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.grid.clear();
    }

    /// Apply a force to a dynamic body
    ///
    /// Warn-and-no-op on static or unregistered bodies: a tower selling out
    /// from under a pending explosion must not crash the frame.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3, mode: ForceMode) {
        let Some(body) = self.bodies.get_mut(handle) else {
            log::warn!("apply_force on unknown body handle {handle:?}");
            return;
        };
        if body.is_static {
            log::warn!("apply_force on static body {handle:?}");
            return;
        }

        match mode {
            ForceMode::Impulse => body.velocity += force * body.inv_mass,
            ForceMode::Continuous => body.acceleration += force * body.inv_mass,
        }
    }

    /// Advance the simulation by `delta` seconds
    ///
    /// The delta is clamped to `max_timestep` to bound integration error
    /// from frame stalls; non-positive or non-finite deltas are ignored.
    pub fn step(&mut self, delta: f32) {
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }
        let delta = delta.min(self.config.max_timestep);

        self.integrate(delta);
        self.sync_grid();

        let contacts = self.detect_contacts();
        self.resolve_contacts(&contacts);
        self.sync_grid();

        self.dispatch_callbacks(&contacts);
    }

    /// Ray cast against all bodies, returning the nearest hit
    ///
    /// The direction need not be normalized; a zero direction warns and
    /// returns `None`. `max_distance` may be `f32::INFINITY`, in which case
    /// the cast is bounded by the world bounds (bodies are clamped inside
    /// them).
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let Some(ray) = Ray::new(origin, direction) else {
            log::warn!("raycast with zero-length direction");
            return None;
        };

        let reach = if max_distance.is_finite() {
            max_distance
        } else {
            // Far enough to cross the whole world from anywhere inside it.
            (self.world_bounds.max - self.world_bounds.min).magnitude()
                + (origin - self.world_bounds.center()).magnitude()
        };
        if reach <= 0.0 {
            return None;
        }

        let segment = Aabb::new(origin, ray.point_at(reach));
        let mut nearest: Option<RayHit> = None;

        for handle in self.grid.query(&segment) {
            let Some(body) = self.bodies.get(handle) else {
                continue;
            };
            if let Some((distance, point, normal)) =
                ray_collider(&ray, body.position, body.collider)
            {
                if distance <= reach
                    && nearest.as_ref().map_or(true, |hit| distance < hit.distance)
                {
                    nearest = Some(RayHit {
                        body: handle,
                        distance,
                        point,
                        normal,
                    });
                }
            }
        }
        nearest
    }

    /// All bodies whose centers lie within `radius` of `center`
    pub fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<BodyHandle> {
        self.grid.query_radius(center, radius)
    }

    /// Integrate motion, ground contact, and world-bound clamping for every
    /// dynamic body
    fn integrate(&mut self, delta: f32) {
        let gravity = self.config.gravity;
        let air_resistance = self.config.air_resistance;
        let rest_threshold = self.config.rest_threshold;
        let bounds = self.world_bounds;

        for (_, body) in &mut self.bodies {
            if body.is_static {
                continue;
            }

            // Forces accumulated via apply_force are already in acceleration.
            if body.use_gravity {
                body.acceleration += gravity;
            }
            let drag = if body.grounded { body.friction } else { air_resistance };
            body.acceleration -= body.velocity * drag;

            body.velocity += body.acceleration * delta;
            body.position += body.velocity * delta;
            body.acceleration = Vec3::zeros();

            // Ground plane at y = 0: clamp the collider's lowest point.
            let extent = body.collider.lower_extent();
            if body.position.y <= extent {
                body.position.y = extent;
                if body.velocity.y < 0.0 {
                    body.velocity.y *= -body.restitution;
                    if body.velocity.y.abs() < rest_threshold {
                        body.velocity.y = 0.0;
                    }
                }
                body.grounded = true;
            } else {
                body.grounded = false;
            }

            // World bounds: clamp position, reflect the clamped component.
            for axis in 0..3 {
                let (min, max) = (bounds.min[axis], bounds.max[axis]);
                if body.position[axis] < min {
                    body.position[axis] = min;
                    body.velocity[axis] *= -body.restitution;
                } else if body.position[axis] > max {
                    body.position[axis] = max;
                    body.velocity[axis] *= -body.restitution;
                }
            }
        }
    }

    /// Write every dynamic body's current bounds back into the grid
    ///
    /// Keeps the invariant that a body's recorded cells exactly cover its
    /// bounds; a stale grid produces false negatives in queries.
    fn sync_grid(&mut self) {
        for (handle, body) in &self.bodies {
            if body.is_static {
                continue;
            }
            self.grid.update(handle, body.aabb());
        }
    }

    /// Broad + narrow phase: collect contacts for this step
    fn detect_contacts(&self) -> Vec<PendingContact> {
        let slack = self.config.broad_phase_slack;
        let max_candidates = self.config.max_contacts_per_body;

        let mut seen: HashSet<(BodyHandle, BodyHandle)> = HashSet::new();
        let mut contacts = Vec::new();

        for (handle, body) in &self.bodies {
            // Only dynamic bodies seed pairs; static-static never collides.
            if body.is_static {
                continue;
            }
            if !body.position.iter().all(|c| c.is_finite()) {
                log::warn!("skipping body {handle:?} with non-finite position");
                continue;
            }

            let mut examined = 0;
            for other in self.grid.query(&body.aabb()) {
                if other == handle {
                    continue;
                }
                let Some(other_body) = self.bodies.get(other) else {
                    continue;
                };
                if !CollisionLayers::should_collide(
                    body.layer,
                    body.mask,
                    other_body.layer,
                    other_body.mask,
                ) {
                    continue;
                }
                if !other_body.position.iter().all(|c| c.is_finite()) {
                    continue;
                }

                // Cheap squared-distance pre-filter before the exact test.
                let radius_sum = body.bounding_radius() + other_body.bounding_radius();
                let distance_sq = (other_body.position - body.position).magnitude_squared();
                if distance_sq > radius_sum * radius_sum * slack {
                    continue;
                }

                // Bounded work per body under dense clustering: an explicit
                // approximate-physics trade, tuned via the config. Pairs
                // already taken by the other body's seeding are not charged
                // against this body's budget.
                if examined >= max_candidates {
                    break;
                }
                let pair = if handle < other { (handle, other) } else { (other, handle) };
                if !seen.insert(pair) {
                    continue;
                }
                examined += 1;

                if let Some(contact) =
                    collider_contact(body.position, body.collider, other_body.position, other_body.collider)
                {
                    contacts.push(PendingContact {
                        first: handle,
                        second: other,
                        contact,
                    });
                }
            }
        }
        contacts
    }

    /// Impulse resolution plus positional penetration correction
    fn resolve_contacts(&mut self, contacts: &[PendingContact]) {
        let correction_factor = self.config.position_correction;

        for pending in contacts {
            let (Some(body_a), Some(body_b)) = (
                self.bodies.get(pending.first),
                self.bodies.get(pending.second),
            ) else {
                continue;
            };

            let normal = pending.contact.normal;
            let inv_mass_a = body_a.inv_mass;
            let inv_mass_b = body_b.inv_mass;
            let inv_mass_sum = inv_mass_a + inv_mass_b;
            if inv_mass_sum <= 0.0 {
                continue;
            }

            // Pairs already separating along the normal get no response at
            // all; correcting them would nudge the retreat every step.
            let normal_velocity = (body_b.velocity - body_a.velocity).dot(&normal);
            if normal_velocity >= 0.0 {
                continue;
            }

            let restitution = body_a.restitution.min(body_b.restitution);
            let j = -(1.0 + restitution) * normal_velocity / inv_mass_sum;
            let impulse = normal * j;

            // Positional correction counters sinking from repeated shallow
            // contacts, distributed inversely by mass.
            let correction = normal * (pending.contact.depth * correction_factor / inv_mass_sum);

            if let Some(body_a) = self.bodies.get_mut(pending.first) {
                if !body_a.is_static {
                    body_a.velocity -= impulse * inv_mass_a;
                    body_a.position -= correction * inv_mass_a;
                }
            }
            if let Some(body_b) = self.bodies.get_mut(pending.second) {
                if !body_b.is_static {
                    body_b.velocity += impulse * inv_mass_b;
                    body_b.position += correction * inv_mass_b;
                }
            }
        }
    }

    /// Fire collision callbacks for every contact, both endpoints
    ///
    /// Callbacks run after the whole resolution pass with post-impulse
    /// velocities. The callback is taken out of the body while it runs, so a
    /// callback never aliases world state.
    fn dispatch_callbacks(&mut self, contacts: &[PendingContact]) {
        for pending in contacts {
            self.notify(pending.first, pending.second, pending.contact.normal, pending.contact.depth);
            self.notify(pending.second, pending.first, -pending.contact.normal, pending.contact.depth);
        }
    }

    fn notify(&mut self, this: BodyHandle, other: BodyHandle, normal: Vec3, depth: f32) {
        let Some(mut callback) = self
            .bodies
            .get_mut(this)
            .and_then(|body| body.on_collision.take())
        else {
            return;
        };

        callback(CollisionEvent { this, other, normal, depth });

        if let Some(body) = self.bodies.get_mut(this) {
            body.on_collision = Some(callback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::Collider;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f32 = 1.0 / 60.0;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Config with drag disabled so impulse math is exact in assertions.
    fn frictionless_config() -> PhysicsConfig {
        PhysicsConfig {
            air_resistance: 0.0,
            ..Default::default()
        }
    }

    fn dynamic_sphere(radius: f32, position: Vec3) -> BodyConfig {
        BodyConfig::new(Collider::sphere(radius)).position(position)
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());

        let tower = world.register(
            BodyConfig::new(Collider::cuboid(2.0, 4.0, 2.0))
                .position(Vec3::new(3.0, 2.0, 3.0))
                .is_static(true),
        );
        // A dynamic sphere dropped straight onto the tower.
        world.register(
            dynamic_sphere(0.5, Vec3::new(3.0, 5.0, 3.0)).restitution(0.5),
        );

        let before = world.body(tower).unwrap().position();
        for _ in 0..240 {
            world.step(DT);
        }
        let after = world.body(tower).unwrap().position();

        // Bit-identical, not approximately equal.
        assert_eq!(before, after);
        assert_eq!(world.body(tower).unwrap().velocity(), Vec3::zeros());
    }

    #[test]
    fn test_gravity_strictly_decreases_vertical_velocity() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let ball = world.register(dynamic_sphere(0.5, Vec3::new(0.0, 100.0, 0.0)));

        let mut last_vy = world.body(ball).unwrap().velocity().y;
        for _ in 0..60 {
            world.step(DT);
            let body = world.body(ball).unwrap();
            if body.grounded() {
                break;
            }
            let vy = body.velocity().y;
            assert!(vy < last_vy, "velocity.y must strictly decrease while airborne");
            last_vy = vy;
        }
    }

    #[test]
    fn test_dropped_sphere_settles_on_ground() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let ball = world.register(
            dynamic_sphere(0.5, Vec3::new(0.0, 5.0, 0.0))
                .mass(1.0)
                .restitution(0.3),
        );

        for _ in 0..600 {
            world.step(DT);
        }

        let body = world.body(ball).unwrap();
        assert!(body.grounded(), "sphere must come to rest on the ground");
        assert!(body.velocity().y.abs() < 0.1);
        assert_relative_eq!(body.position().y, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_equal_mass_elastic_spheres_exchange_velocities() {
        let mut world = PhysicsWorld::new(frictionless_config());

        let left = world.register(
            dynamic_sphere(0.5, Vec3::new(-0.45, 5.0, 0.0))
                .velocity(Vec3::new(1.0, 0.0, 0.0))
                .restitution(1.0)
                .use_gravity(false),
        );
        let right = world.register(
            dynamic_sphere(0.5, Vec3::new(0.45, 5.0, 0.0))
                .velocity(Vec3::new(-1.0, 0.0, 0.0))
                .restitution(1.0)
                .use_gravity(false),
        );

        world.step(0.01);

        assert_relative_eq!(world.body(left).unwrap().velocity().x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(world.body(right).unwrap().velocity().x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_restitution_never_gains_energy() {
        for restitution in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let mut world = PhysicsWorld::new(frictionless_config());

            let a = world.register(
                dynamic_sphere(0.5, Vec3::new(-0.45, 5.0, 0.0))
                    .velocity(Vec3::new(1.5, 0.0, 0.0))
                    .restitution(restitution)
                    .use_gravity(false),
            );
            let b = world.register(
                dynamic_sphere(0.5, Vec3::new(0.45, 5.0, 0.0))
                    .velocity(Vec3::new(-0.5, 0.0, 0.0))
                    .restitution(restitution)
                    .use_gravity(false),
            );

            let normal = Vec3::new(1.0, 0.0, 0.0);
            let approach =
                -(world.body(b).unwrap().velocity() - world.body(a).unwrap().velocity())
                    .dot(&normal);

            world.step(0.01);

            let separating =
                (world.body(b).unwrap().velocity() - world.body(a).unwrap().velocity())
                    .dot(&normal);
            assert!(
                separating <= approach * restitution + 1e-4,
                "restitution {restitution}: separating {separating} vs approach {approach}"
            );
        }
    }

    #[test]
    fn test_sphere_bounces_off_static_box() {
        let mut world = PhysicsWorld::new(frictionless_config());

        world.register(
            BodyConfig::new(Collider::cuboid(4.0, 4.0, 4.0))
                .position(Vec3::new(0.0, 10.0, 0.0))
                .is_static(true),
        );
        let ball = world.register(
            dynamic_sphere(0.5, Vec3::new(-3.0, 10.0, 0.0))
                .velocity(Vec3::new(5.0, 0.0, 0.0))
                .restitution(1.0)
                .use_gravity(false),
        );

        for _ in 0..30 {
            world.step(DT);
        }

        // Elastic bounce off an immovable wall reverses the approach.
        let velocity = world.body(ball).unwrap().velocity();
        assert!(velocity.x < 0.0, "sphere should have bounced back, got {velocity:?}");
    }

    #[test]
    fn test_unregister_unknown_handle_is_noop() {
        init_logging();
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        assert!(!world.unregister(BodyHandle::default()));

        let ball = world.register(dynamic_sphere(0.5, Vec3::zeros()));
        assert!(world.unregister(ball));
        assert!(!world.unregister(ball), "double unregister must report false");
        assert!(world.is_empty());
    }

    #[test]
    fn test_apply_force_modes() {
        let mut world = PhysicsWorld::new(frictionless_config());
        let ball = world.register(
            dynamic_sphere(0.5, Vec3::new(0.0, 10.0, 0.0))
                .mass(2.0)
                .use_gravity(false),
        );

        world.apply_force(ball, Vec3::new(4.0, 0.0, 0.0), ForceMode::Impulse);
        assert_relative_eq!(world.body(ball).unwrap().velocity().x, 2.0);

        // Continuous force lands at the next integration, then clears.
        world.apply_force(ball, Vec3::new(12.0, 0.0, 0.0), ForceMode::Continuous);
        world.step(0.1);
        assert_relative_eq!(world.body(ball).unwrap().velocity().x, 2.6, epsilon = 1e-5);
        world.step(0.1);
        assert_relative_eq!(world.body(ball).unwrap().velocity().x, 2.6, epsilon = 1e-5);
    }

    #[test]
    fn test_apply_force_invalid_targets_are_noops() {
        init_logging();
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let tower = world.register(
            BodyConfig::new(Collider::cuboid(1.0, 1.0, 1.0)).is_static(true),
        );

        world.apply_force(tower, Vec3::new(100.0, 0.0, 0.0), ForceMode::Impulse);
        assert_eq!(world.body(tower).unwrap().velocity(), Vec3::zeros());

        // Unregistered handle: must not panic.
        world.apply_force(BodyHandle::default(), Vec3::new(1.0, 0.0, 0.0), ForceMode::Impulse);
    }

    #[test]
    fn test_raycast_returns_nearest_hit() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let near = world.register(
            dynamic_sphere(1.0, Vec3::new(0.0, 2.0, 10.0)).use_gravity(false),
        );
        world.register(
            dynamic_sphere(1.0, Vec3::new(0.0, 2.0, 20.0)).use_gravity(false),
        );

        let hit = world
            .raycast(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 1.0), f32::INFINITY)
            .expect("ray should hit the near sphere");

        assert_eq!(hit.body, near);
        assert_relative_eq!(hit.distance, 9.0, epsilon = 1e-3);
        assert_relative_eq!(hit.point.z, 9.0, epsilon = 1e-3);
    }

    #[test]
    fn test_raycast_respects_max_distance() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        world.register(dynamic_sphere(1.0, Vec3::new(0.0, 2.0, 10.0)).use_gravity(false));

        let hit = world.raycast(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 5.0);
        assert!(hit.is_none());
    }

    #[test]
    fn test_raycast_zero_direction_is_noop() {
        let world = PhysicsWorld::new(PhysicsConfig::default());
        assert!(world.raycast(Vec3::zeros(), Vec3::zeros(), 10.0).is_none());
    }

    #[test]
    fn test_query_sphere_finds_bodies_by_center_distance() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let near = world.register(dynamic_sphere(0.5, Vec3::new(1.0, 1.0, 0.0)).use_gravity(false));
        let far = world.register(dynamic_sphere(0.5, Vec3::new(30.0, 1.0, 0.0)).use_gravity(false));

        let found: std::collections::HashSet<_> =
            world.query_sphere(Vec3::new(0.0, 1.0, 0.0), 5.0).into_iter().collect();
        assert!(found.contains(&near));
        assert!(!found.contains(&far));
    }

    #[test]
    fn test_world_bounds_clamp_and_reflect() {
        let mut world = PhysicsWorld::new(frictionless_config());
        world.set_world_bounds(Aabb::new(
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(10.0, 50.0, 10.0),
        ));

        let ball = world.register(
            dynamic_sphere(0.5, Vec3::new(9.0, 25.0, 0.0))
                .velocity(Vec3::new(50.0, 0.0, 0.0))
                .restitution(0.5)
                .use_gravity(false),
        );

        world.step(0.1);

        let body = world.body(ball).unwrap();
        assert!(body.position().x <= 10.0);
        assert!(body.velocity().x < 0.0, "velocity must reflect off the bound");
    }

    #[test]
    fn test_timestep_is_clamped() {
        let mut world = PhysicsWorld::new(frictionless_config());
        let ball = world.register(
            dynamic_sphere(0.5, Vec3::new(0.0, 1000.0, 0.0))
                .velocity(Vec3::new(1.0, 0.0, 0.0))
                .use_gravity(false),
        );

        // A ten-second stall must integrate as max_timestep, not 10s.
        world.step(10.0);
        assert_relative_eq!(world.body(ball).unwrap().position().x, 0.1, epsilon = 1e-4);

        // Garbage deltas are ignored outright.
        world.step(-1.0);
        world.step(f32::NAN);
        assert_relative_eq!(world.body(ball).unwrap().position().x, 0.1, epsilon = 1e-4);
    }

    #[test]
    fn test_candidate_cap_bounds_collision_work() {
        let mut config = frictionless_config();
        config.max_contacts_per_body = 0;
        let mut world = PhysicsWorld::new(config);

        let a = world.register(
            dynamic_sphere(0.5, Vec3::new(-0.45, 0.0, 0.0))
                .velocity(Vec3::new(1.0, 0.0, 0.0))
                .use_gravity(false),
        );
        world.register(
            dynamic_sphere(0.5, Vec3::new(0.45, 0.0, 0.0))
                .velocity(Vec3::new(-1.0, 0.0, 0.0))
                .use_gravity(false),
        );

        // Cap of zero examines no candidates: the overlap goes unresolved.
        world.step(0.01);
        assert_relative_eq!(world.body(a).unwrap().velocity().x, 1.0);
    }

    #[test]
    fn test_separating_overlap_gets_no_positional_nudge() {
        let mut world = PhysicsWorld::new(frictionless_config());

        // Overlapping but already moving apart: no impulse, no correction.
        let a = world.register(
            dynamic_sphere(0.5, Vec3::new(-0.3, 5.0, 0.0))
                .velocity(Vec3::new(-1.0, 0.0, 0.0))
                .use_gravity(false),
        );
        let b = world.register(
            dynamic_sphere(0.5, Vec3::new(0.3, 5.0, 0.0))
                .velocity(Vec3::new(1.0, 0.0, 0.0))
                .use_gravity(false),
        );

        world.step(0.01);

        // Pure integration: positions moved by velocity * dt and nothing else.
        assert_relative_eq!(world.body(a).unwrap().position().x, -0.31, epsilon = 1e-6);
        assert_relative_eq!(world.body(b).unwrap().position().x, 0.31, epsilon = 1e-6);
        assert_relative_eq!(world.body(a).unwrap().velocity().x, -1.0);
        assert_relative_eq!(world.body(b).unwrap().velocity().x, 1.0);
    }

    #[test]
    fn test_deduplicated_pairs_do_not_consume_candidate_budget() {
        let mut config = frictionless_config();
        config.max_contacts_per_body = 1;
        let mut world = PhysicsWorld::new(config);

        let events: Rc<RefCell<Vec<CollisionEvent>>> = Rc::new(RefCell::new(Vec::new()));

        // Three spheres in a row: a-b and b-c overlap, a-c does not. The
        // middle body must still reach c even when it re-encounters the
        // already-seen a-b pair first.
        let sink = Rc::clone(&events);
        let a = world.register(
            dynamic_sphere(0.5, Vec3::new(-0.8, 5.0, 0.0))
                .use_gravity(false)
                .on_collision(move |event| sink.borrow_mut().push(event)),
        );
        let sink = Rc::clone(&events);
        let b = world.register(
            dynamic_sphere(0.5, Vec3::new(0.0, 5.0, 0.0))
                .use_gravity(false)
                .on_collision(move |event| sink.borrow_mut().push(event)),
        );
        let c = world.register(
            BodyConfig::new(Collider::sphere(0.5))
                .position(Vec3::new(0.8, 5.0, 0.0))
                .is_static(true),
        );

        world.step(DT);

        let events = events.borrow();
        let pairs: std::collections::HashSet<_> =
            events.iter().map(|e| (e.this, e.other)).collect();
        assert!(pairs.contains(&(a, b)), "a-b contact must be detected");
        assert!(pairs.contains(&(b, c)), "b-c contact must be detected");
    }

    #[test]
    fn test_layer_filtering_skips_pairs() {
        let mut world = PhysicsWorld::new(frictionless_config());

        // Two projectiles flying through each other: same layer, mask
        // excludes it.
        let a = world.register(
            dynamic_sphere(0.5, Vec3::new(-0.45, 0.0, 0.0))
                .velocity(Vec3::new(1.0, 0.0, 0.0))
                .use_gravity(false)
                .layer(CollisionLayers::PROJECTILE)
                .mask(CollisionLayers::ENEMY),
        );
        world.register(
            dynamic_sphere(0.5, Vec3::new(0.45, 0.0, 0.0))
                .velocity(Vec3::new(-1.0, 0.0, 0.0))
                .use_gravity(false)
                .layer(CollisionLayers::PROJECTILE)
                .mask(CollisionLayers::ENEMY),
        );

        world.step(0.01);
        assert_relative_eq!(world.body(a).unwrap().velocity().x, 1.0);
    }

    #[test]
    fn test_collision_callbacks_fire_for_both_bodies() {
        let mut world = PhysicsWorld::new(frictionless_config());
        let events: Rc<RefCell<Vec<CollisionEvent>>> = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&events);
        let a = world.register(
            dynamic_sphere(0.5, Vec3::new(-0.45, 0.0, 0.0))
                .velocity(Vec3::new(1.0, 0.0, 0.0))
                .use_gravity(false)
                .on_collision(move |event| sink.borrow_mut().push(event)),
        );
        let sink = Rc::clone(&events);
        let b = world.register(
            dynamic_sphere(0.5, Vec3::new(0.45, 0.0, 0.0))
                .velocity(Vec3::new(-1.0, 0.0, 0.0))
                .use_gravity(false)
                .on_collision(move |event| sink.borrow_mut().push(event)),
        );

        world.step(0.01);

        let events = events.borrow();
        assert_eq!(events.len(), 2);

        let for_a = events.iter().find(|e| e.this == a).expect("a must be notified");
        let for_b = events.iter().find(|e| e.this == b).expect("b must be notified");
        assert_eq!(for_a.other, b);
        assert_eq!(for_b.other, a);
        // Normals point at the other body from each side.
        assert_relative_eq!(for_a.normal.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(for_b.normal.x, -1.0, epsilon = 1e-5);
        assert!(for_a.depth > 0.0);
    }

    #[test]
    fn test_degenerate_collider_registers_and_steps() {
        init_logging();
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let point = world.register(dynamic_sphere(-1.0, Vec3::new(0.0, 5.0, 0.0)));

        assert_eq!(
            world.body(point).unwrap().collider(),
            Collider::Sphere { radius: 0.0 }
        );

        // The bad body falls like a point and never stalls the step.
        for _ in 0..120 {
            world.step(DT);
        }
        assert!(world.body(point).unwrap().position().y < 5.0);
    }

    #[test]
    fn test_positions_read_back_through_handles() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let ball = world.register(dynamic_sphere(0.5, Vec3::new(0.0, 5.0, 0.0)));

        world.step(DT);

        // The caller owns no physics state; the handle accessor is the only
        // way to observe the step result.
        let position = world.body(ball).unwrap().position();
        assert!(position.y < 5.0);
        assert!(world.contains(ball));
        assert_eq!(world.len(), 1);
    }
}
