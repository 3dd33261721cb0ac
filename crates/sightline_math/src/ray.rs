use crate::Vec3;

/// A ray in 3D space with origin and direction.
///
/// Rays represent a half-line starting at `origin` and traveling in
/// `direction`. Visibility queries pass a unit-length direction, but the
/// intersection routines do not require one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
