//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::{Aabb, Ray, Vec3};

/// Tolerance for the determinant and hit-parameter tests.
const EPSILON: f32 = 1e-7;

/// A triangle given by its three vertices.
///
/// Degenerate (collinear) triangles are allowed; the intersection test
/// rejects them through the determinant check.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Component-wise bounding box of the three vertices.
    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.v0.min(self.v1).min(self.v2),
            self.v0.max(self.v1).max(self.v2),
        )
    }

    /// Midpoint of the bounding box projected onto one axis.
    pub fn centroid_on_axis(&self, axis: usize) -> f32 {
        let aabb = self.aabb();
        (aabb.min[axis] + aabb.max[axis]) / 2.0
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns the hit parameter `t` such that the hit point is
    /// `ray.at(t)`, or `None` on a miss. Hits are accepted only for
    /// `t > EPSILON`, so a ray whose origin grazes the triangle does not
    /// report a hit against it.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to the triangle plane (or the triangle is degenerate)
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);

        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);

        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);

        (t > EPSILON).then_some(t)
    }
}
