//! CPU-side collision and ray queries.
//!
//! Everything in here works on plain `cgmath` vectors in world space and never
//! touches the GPU, which keeps the character controller testable without a
//! window or adapter.
//!
//! - [`Ray`] and [`Triangle`] are the primitive shapes
//! - [`Collider`] is a triangle soup with pick/collision flags
//! - [`CollisionWorld`] answers picking queries and moves ellipsoids with
//!   collide-and-slide

mod triangle;
mod world;

pub use triangle::Triangle;
pub use world::{Collider, CollisionWorld, Ellipsoid, PickInfo};

use cgmath::{InnerSpace, Vector3, Zero};

/// Below this length a direction is treated as zero.
pub(crate) const EPSILON: f32 = 1e-6;

/// A bounded ray with a unit direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub length: f32,
}

impl Ray {
    /// Creates a ray; `direction` is normalized, a zero direction stays zero
    /// and never hits anything.
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>, length: f32) -> Self {
        let direction = if direction.magnitude2() > EPSILON * EPSILON {
            direction.normalize()
        } else {
            Vector3::zero()
        };
        Self {
            origin,
            direction,
            length,
        }
    }

    /// A ray pointing straight down (-Y).
    pub fn down(origin: Vector3<f32>, length: f32) -> Self {
        Self::new(origin, -Vector3::unit_y(), length)
    }

    pub fn at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

/// Axis aligned bounding box used as a broad phase for colliders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    /// An inverted box; growing it by any point yields that point.
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn from_center(center: Vector3<f32>, half_extents: Vector3<f32>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn grow(&mut self, p: Vector3<f32>) {
        self.min = Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Slab test against the bounded ray.
    pub fn hit_by(&self, ray: &Ray) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut t_min = 0.0f32;
        let mut t_max = ray.length;
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            if dir.abs() < EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (self.min[axis] - origin) * inv;
            let mut t1 = (self.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new(Vector3::zero(), Vector3::new(0.0, 0.0, 5.0), 10.0);
        assert!((ray.direction.magnitude() - 1.0).abs() < 1e-6);
        assert!((ray.at(2.0).z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_direction_stays_zero() {
        let ray = Ray::new(Vector3::zero(), Vector3::zero(), 10.0);
        assert_eq!(ray.direction, Vector3::zero());
    }

    #[test]
    fn aabb_slab_test_respects_ray_length() {
        let aabb = Aabb::from_center(Vector3::new(0.0, 0.0, 5.0), Vector3::new(1.0, 1.0, 1.0));
        let short = Ray::new(Vector3::zero(), Vector3::unit_z(), 3.0);
        let long = Ray::new(Vector3::zero(), Vector3::unit_z(), 4.5);
        assert!(!aabb.hit_by(&short));
        assert!(aabb.hit_by(&long));
    }

    #[test]
    fn empty_aabb_grows_to_points() {
        let mut aabb = Aabb::empty();
        assert!(aabb.is_empty());
        aabb.grow(Vector3::new(1.0, 2.0, 3.0));
        aabb.grow(Vector3::new(-1.0, 0.0, 4.0));
        assert_eq!(aabb.min, Vector3::new(-1.0, 0.0, 3.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 2.0, 4.0));
    }
}
