//! Narrow-phase intersection tests
//!
//! Exact geometric tests between specific collider pairs, dispatched after
//! the broad phase has pruned the candidate set. Also provides the ray
//! intersection tests backing [`PhysicsWorld::raycast`].
//!
//! [`PhysicsWorld::raycast`]: crate::physics::PhysicsWorld::raycast

use crate::foundation::math::{Aabb, Vec3};
use crate::physics::body::{BodyHandle, Collider};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized by `new`)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    ///
    /// Returns `None` when the direction is too short to normalize.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let length = direction.magnitude();
        if length <= f32::EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / length,
        })
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray intersection test
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// The body that was hit
    pub body: BodyHandle,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The surface normal at the intersection point
    pub normal: Vec3,
}

/// A detected contact between two colliders
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Unit normal pointing from the first collider toward the second
    pub normal: Vec3,
    /// Penetration depth (positive)
    pub depth: f32,
}

/// Sphere-sphere test: distance vs. radius sum
///
/// Coincident centers have no meaningful separation direction; +Y is used so
/// the pair still resolves instead of sticking.
pub fn sphere_sphere(center_a: Vec3, radius_a: f32, center_b: Vec3, radius_b: f32) -> Option<Contact> {
    let radius_sum = radius_a + radius_b;
    let delta = center_b - center_a;
    let distance_sq = delta.magnitude_squared();
    if distance_sq > radius_sum * radius_sum {
        return None;
    }

    let distance = distance_sq.sqrt();
    if distance <= f32::EPSILON {
        return Some(Contact {
            normal: Vec3::new(0.0, 1.0, 0.0),
            depth: radius_sum,
        });
    }

    Some(Contact {
        normal: delta / distance,
        depth: radius_sum - distance,
    })
}

/// Box-box test: AABB overlap, then separation along the axis of minimum
/// penetration among x/y/z
pub fn box_box(center_a: Vec3, half_a: Vec3, center_b: Vec3, half_b: Vec3) -> Option<Contact> {
    let delta = center_b - center_a;
    let overlap_x = half_a.x + half_b.x - delta.x.abs();
    let overlap_y = half_a.y + half_b.y - delta.y.abs();
    let overlap_z = half_a.z + half_b.z - delta.z.abs();

    if overlap_x < 0.0 || overlap_y < 0.0 || overlap_z < 0.0 {
        return None;
    }

    let (depth, mut normal) = if overlap_x <= overlap_y && overlap_x <= overlap_z {
        (overlap_x, Vec3::new(1.0, 0.0, 0.0))
    } else if overlap_y <= overlap_z {
        (overlap_y, Vec3::new(0.0, 1.0, 0.0))
    } else {
        (overlap_z, Vec3::new(0.0, 0.0, 1.0))
    };

    // Orient the axis from a toward b.
    if normal.dot(&delta) < 0.0 {
        normal = -normal;
    }

    Some(Contact { normal, depth })
}

/// Sphere-box test: clamp the sphere center to the box extents to find the
/// closest point, then test distance vs. radius
///
/// The returned normal points from the sphere toward the box.
pub fn sphere_box(center: Vec3, radius: f32, box_center: Vec3, half: Vec3) -> Option<Contact> {
    let bounds = Aabb::from_center_extents(box_center, half);
    let closest = bounds.clamp_point(center);
    let delta = closest - center;
    let distance_sq = delta.magnitude_squared();

    if distance_sq > radius * radius {
        return None;
    }

    let distance = distance_sq.sqrt();
    if distance > f32::EPSILON {
        // Center outside the box: push along the closest-point direction.
        return Some(Contact {
            normal: delta / distance,
            depth: radius - distance,
        });
    }

    // Center inside the box: push out through the shallowest face.
    let offset = center - box_center;
    let face_x = half.x - offset.x.abs();
    let face_y = half.y - offset.y.abs();
    let face_z = half.z - offset.z.abs();

    let (face_depth, normal) = if face_x <= face_y && face_x <= face_z {
        (face_x, Vec3::new(-offset.x.signum(), 0.0, 0.0))
    } else if face_y <= face_z {
        (face_y, Vec3::new(0.0, -offset.y.signum(), 0.0))
    } else {
        (face_z, Vec3::new(0.0, 0.0, -offset.z.signum()))
    };

    Some(Contact {
        normal,
        depth: radius + face_depth,
    })
}

/// Dispatch the exact pair test for two colliders
///
/// The contact normal points from `a` toward `b`.
pub fn collider_contact(
    pos_a: Vec3,
    col_a: Collider,
    pos_b: Vec3,
    col_b: Collider,
) -> Option<Contact> {
    match (col_a, col_b) {
        (Collider::Sphere { radius: ra }, Collider::Sphere { radius: rb }) => {
            sphere_sphere(pos_a, ra, pos_b, rb)
        }
        (Collider::Box { half_extents: ha }, Collider::Box { half_extents: hb }) => {
            box_box(pos_a, ha, pos_b, hb)
        }
        (Collider::Sphere { radius }, Collider::Box { half_extents }) => {
            sphere_box(pos_a, radius, pos_b, half_extents)
        }
        (Collider::Box { half_extents }, Collider::Sphere { radius }) => {
            sphere_box(pos_b, radius, pos_a, half_extents).map(|contact| Contact {
                normal: -contact.normal,
                depth: contact.depth,
            })
        }
    }
}

/// Ray-sphere intersection via the quadratic formula
///
/// Solves `|origin + t*direction - center|^2 = radius^2` and returns
/// `(distance, hit_point, normal)` for the closest positive root.
pub fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<(f32, Vec3, Vec3)> {
    let oc = ray.origin - center;

    let a = ray.direction.dot(&ray.direction); // 1.0 for a normalized ray
    let b = 2.0 * oc.dot(&ray.direction);
    let c = oc.dot(&oc) - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let t1 = (-b - sqrt_discriminant) / (2.0 * a);
    let t2 = (-b + sqrt_discriminant) / (2.0 * a);

    // Use the closest positive intersection
    let t = if t1 > 0.0 {
        t1
    } else if t2 > 0.0 {
        t2
    } else {
        return None; // Behind the ray origin
    };

    let hit_point = ray.point_at(t);
    let normal = (hit_point - center).normalize();
    Some((t, hit_point, normal))
}

/// Ray-box intersection via the slab method
///
/// Returns `(distance, hit_point, normal)`; the normal is the face normal of
/// the dominant penetrated axis.
pub fn ray_box(ray: &Ray, box_center: Vec3, half: Vec3) -> Option<(f32, Vec3, Vec3)> {
    let bounds = Aabb::from_center_extents(box_center, half);
    let t = bounds.intersect_ray(ray.origin, ray.direction)?;
    let hit_point = ray.point_at(t);

    // Face normal from the largest normalized offset component.
    let offset = hit_point - box_center;
    let scaled = Vec3::new(
        if half.x > 0.0 { offset.x / half.x } else { 0.0 },
        if half.y > 0.0 { offset.y / half.y } else { 0.0 },
        if half.z > 0.0 { offset.z / half.z } else { 0.0 },
    );
    let normal = if scaled.x.abs() >= scaled.y.abs() && scaled.x.abs() >= scaled.z.abs() {
        Vec3::new(scaled.x.signum(), 0.0, 0.0)
    } else if scaled.y.abs() >= scaled.z.abs() {
        Vec3::new(0.0, scaled.y.signum(), 0.0)
    } else {
        Vec3::new(0.0, 0.0, scaled.z.signum())
    };

    Some((t, hit_point, normal))
}

/// Exact ray test against a collider at a position
pub fn ray_collider(ray: &Ray, position: Vec3, collider: Collider) -> Option<(f32, Vec3, Vec3)> {
    match collider {
        Collider::Sphere { radius } => ray_sphere(ray, position, radius),
        Collider::Box { half_extents } => ray_box(ray, position, half_extents),
    }
}
