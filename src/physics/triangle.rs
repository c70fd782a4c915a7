use cgmath::{ElementWise, InnerSpace, Matrix4, Vector3, Zero};

use super::{EPSILON, Ray};

/// Barycentric slack when testing ray hits.
const EDGE_TOLERANCE: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vector3<f32>,
    pub b: Vector3<f32>,
    pub c: Vector3<f32>,
}

impl Triangle {
    pub fn new(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> Self {
        Self { a, b, c }
    }

    /// Unit normal following counter-clockwise winding, zero for degenerate triangles.
    pub fn normal(&self) -> Vector3<f32> {
        let n = (self.b - self.a).cross(self.c - self.a);
        if n.magnitude2() < EPSILON * EPSILON {
            Vector3::zero()
        } else {
            n.normalize()
        }
    }

    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        let apply = |v: Vector3<f32>| (*matrix * v.extend(1.0)).truncate();
        Self::new(apply(self.a), apply(self.b), apply(self.c))
    }

    /// Component-wise division of every vertex, used to map an ellipsoid to a unit sphere.
    pub fn scaled_down(&self, radii: Vector3<f32>) -> Self {
        Self::new(
            self.a.div_element_wise(radii),
            self.b.div_element_wise(radii),
            self.c.div_element_wise(radii),
        )
    }

    /// Two-sided Möller-Trumbore intersection. Returns the distance along the
    /// ray when the hit lies within `ray.length`.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let p = ray.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = ray.direction.dot(q) * inv_det;
        // shared edges between neighbouring triangles must not leak rays
        if v < -EDGE_TOLERANCE || u + v > 1.0 + EDGE_TOLERANCE {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0 && t <= ray.length).then_some(t)
    }

    /// Closest point on the triangle (including its interior) to `p`.
    pub fn closest_point(&self, p: Vector3<f32>) -> Vector3<f32> {
        let (a, b, c) = (self.a, self.b, self.c);
        let ab = b - a;
        let ac = c - a;
        let ap = p - a;

        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        let cp = p - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        a + ab * v + ac * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor() -> Triangle {
        Triangle::new(
            Vector3::new(-1.0, 0.0, -1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, -1.0),
        )
    }

    #[test]
    fn downward_ray_hits_floor_from_above() {
        let ray = Ray::down(Vector3::new(0.0, 0.5, 0.0), 0.6);
        let t = floor().intersect(&ray).expect("floor hit");
        assert!((t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn hits_are_two_sided() {
        let ray = Ray::new(Vector3::new(0.0, -0.5, 0.0), Vector3::unit_y(), 1.0);
        assert!(floor().intersect(&ray).is_some());
    }

    #[test]
    fn hits_beyond_length_are_ignored() {
        let ray = Ray::down(Vector3::new(0.0, 0.5, 0.0), 0.4);
        assert!(floor().intersect(&ray).is_none());
    }

    #[test]
    fn rays_outside_the_triangle_miss() {
        let ray = Ray::down(Vector3::new(3.0, 0.5, 0.0), 10.0);
        assert!(floor().intersect(&ray).is_none());
    }

    #[test]
    fn closest_point_projects_onto_interior() {
        let p = floor().closest_point(Vector3::new(0.0, 2.0, 0.0));
        assert!((p - Vector3::new(0.0, 0.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn closest_point_clamps_to_vertex() {
        let p = floor().closest_point(Vector3::new(5.0, 0.0, -5.0));
        assert!((p - Vector3::new(1.0, 0.0, -1.0)).magnitude() < 1e-5);
    }

    #[test]
    fn normal_follows_winding() {
        // (-1,0,-1) -> (0,0,1) -> (1,0,-1) is counter-clockwise seen from above
        assert!((floor().normal() - Vector3::unit_y()).magnitude() < 1e-5);
    }
}
