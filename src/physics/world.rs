use cgmath::{ElementWise, InnerSpace, Vector3, Zero};

use super::{Aabb, EPSILON, Ray, Triangle};

/// Passes over all triangles per sub-step before giving up on a penetration.
const MAX_RESOLVE_ITERS: usize = 4;
/// Upper bound on sub-steps for a single move, so a huge displacement stays cheap.
const MAX_SUB_STEPS: usize = 64;
/// Contacts closer than this (in unit-sphere space) count as touching, not penetrating.
const CONTACT_SLOP: f32 = 1e-4;

/// A static triangle soup in world space.
///
/// `pickable` makes the collider visible to ray picking, `check_collisions`
/// makes it block moving ellipsoids. `enabled` switches both off at once.
#[derive(Clone, Debug)]
pub struct Collider {
    pub id: u32,
    pub name: String,
    pub pickable: bool,
    pub enabled: bool,
    pub check_collisions: bool,
    triangles: Vec<Triangle>,
    aabb: Aabb,
}

impl Collider {
    pub fn new(id: u32, name: impl Into<String>, triangles: Vec<Triangle>) -> Self {
        let mut aabb = Aabb::empty();
        for tri in &triangles {
            aabb.grow(tri.a);
            aabb.grow(tri.b);
            aabb.grow(tri.c);
        }
        Self {
            id,
            name: name.into(),
            pickable: true,
            enabled: true,
            check_collisions: true,
            triangles,
            aabb,
        }
    }

    pub fn with_pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable;
        self
    }

    pub fn with_collisions(mut self, check_collisions: bool) -> Self {
        self.check_collisions = check_collisions;
        self
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The default pick predicate: pickable and enabled.
    pub fn is_pickable(&self) -> bool {
        self.pickable && self.enabled
    }
}

/// Result of a successful ray pick.
#[derive(Clone, Debug, PartialEq)]
pub struct PickInfo {
    pub id: u32,
    pub name: String,
    pub distance: f32,
    pub point: Vector3<f32>,
}

/// Collision volume of a moving body. `offset` moves the ellipsoid centre
/// away from the body's position, e.g. up by half the height so the position
/// sits at the feet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    pub radii: Vector3<f32>,
    pub offset: Vector3<f32>,
}

impl Ellipsoid {
    pub fn new(radii: Vector3<f32>, offset: Vector3<f32>) -> Self {
        Self { radii, offset }
    }

    fn min_radius(&self) -> f32 {
        self.radii.x.min(self.radii.y).min(self.radii.z)
    }
}

#[derive(Debug, Default)]
pub struct CollisionWorld {
    colliders: Vec<Collider>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, collider: Collider) {
        if self.colliders.iter().any(|c| c.id == collider.id) {
            log::warn!(
                "Collider id {} ({}) is already in use; picks may report the wrong object.",
                collider.id,
                collider.name
            );
        }
        self.colliders.push(collider);
    }

    /// Removes every collider with `id` and returns how many were dropped.
    pub fn remove(&mut self, id: u32) -> usize {
        let before = self.colliders.len();
        self.colliders.retain(|c| c.id != id);
        before - self.colliders.len()
    }

    pub fn get(&self, id: u32) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Collider> {
        self.colliders.iter_mut().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Closest hit within `ray.length` among colliders accepted by `predicate`.
    pub fn pick_with_ray<P>(&self, ray: &Ray, predicate: P) -> Option<PickInfo>
    where
        P: Fn(&Collider) -> bool,
    {
        if ray.direction.is_zero() {
            return None;
        }
        let mut best: Option<(f32, &Collider)> = None;
        for collider in self.colliders.iter().filter(|c| predicate(c)) {
            if !collider.aabb.hit_by(ray) {
                continue;
            }
            for tri in &collider.triangles {
                if let Some(t) = tri.intersect(ray) {
                    if best.is_none_or(|(closest, _)| t < closest) {
                        best = Some((t, collider));
                    }
                }
            }
        }
        best.map(|(distance, collider)| PickInfo {
            id: collider.id,
            name: collider.name.clone(),
            distance,
            point: ray.at(distance),
        })
    }

    /// Moves an ellipsoid standing at `position` by `displacement` and slides
    /// it along any blocking surface. Returns the new position.
    ///
    /// The motion is split into sub-steps no longer than a quarter of the
    /// smallest radius so thin walls are not tunnelled through. After every
    /// sub-step the ellipsoid is mapped to a unit sphere and pushed out of
    /// each triangle it penetrates.
    ///
    /// At most `MAX_SUB_STEPS` sub-steps are taken. A displacement longer
    /// than `MAX_SUB_STEPS / 4` times the smallest radius therefore moves in
    /// longer sub-steps. Walls still stop it as long as a sub-step stays
    /// below the smallest radius, i.e. for moves up to `MAX_SUB_STEPS` radii.
    pub fn move_with_collisions(
        &self,
        position: Vector3<f32>,
        ellipsoid: &Ellipsoid,
        displacement: Vector3<f32>,
    ) -> Vector3<f32> {
        let distance = displacement.magnitude();
        if distance < EPSILON {
            return position;
        }
        let max_step = (ellipsoid.min_radius() * 0.25).max(EPSILON);
        let steps = ((distance / max_step).ceil() as usize).clamp(1, MAX_SUB_STEPS);
        let step = displacement / steps as f32;

        let mut center = position + ellipsoid.offset;
        for _ in 0..steps {
            center += step;
            center = self.resolve_penetrations(center, ellipsoid.radii, step);
        }
        center - ellipsoid.offset
    }

    fn resolve_penetrations(
        &self,
        center: Vector3<f32>,
        radii: Vector3<f32>,
        step: Vector3<f32>,
    ) -> Vector3<f32> {
        let mut unit_center = center.div_element_wise(radii);
        for _ in 0..MAX_RESOLVE_ITERS {
            let bounds = Aabb::from_center(unit_center.mul_element_wise(radii), radii);
            let mut pushed = false;
            for collider in self
                .colliders
                .iter()
                .filter(|c| c.enabled && c.check_collisions && c.aabb.intersects(&bounds))
            {
                for tri in &collider.triangles {
                    let tri = tri.scaled_down(radii);
                    let closest = tri.closest_point(unit_center);
                    let diff = unit_center - closest;
                    let dist = diff.magnitude();
                    if dist >= 1.0 - CONTACT_SLOP {
                        continue;
                    }
                    let normal = if dist > EPSILON {
                        diff / dist
                    } else {
                        fallback_push_direction(&tri, step)
                    };
                    if normal.is_zero() {
                        continue;
                    }
                    unit_center = closest + normal;
                    pushed = true;
                }
            }
            if !pushed {
                break;
            }
        }
        unit_center.mul_element_wise(radii)
    }
}

/// Direction to push a centre that lies exactly on a triangle: back against
/// the motion, or along the face normal when there was no motion.
fn fallback_push_direction(tri: &Triangle, step: Vector3<f32>) -> Vector3<f32> {
    let normal = tri.normal();
    if step.magnitude2() > EPSILON * EPSILON {
        if normal.dot(step) > 0.0 { -normal } else { normal }
    } else {
        normal
    }
}
