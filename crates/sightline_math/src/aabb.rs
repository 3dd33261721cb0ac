use crate::{Ray, Vec3};

/// Axis-aligned bounding box for spatial acceleration structures (BVH).
///
/// Stored as component-wise `min`/`max` corners. Boxes produced by the
/// builders in this workspace always satisfy `min <= max` on every axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from its corner points.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Size of the box along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties resolve to the later axis: X wins only when strictly longest,
    /// then Y over Z on equality.
    pub fn longest_axis(&self) -> usize {
        let size = self.extent();
        if size.x > size.y && size.x > size.z {
            0
        } else if size.y > size.z {
            1
        } else {
            2
        }
    }

    /// Test whether a semi-infinite ray intersects this box.
    ///
    /// Uses the slab method. All three axes are always evaluated; a zero
    /// direction component yields signed infinities from the IEEE division
    /// and the interval math stays correct, so there is no special case.
    pub fn ray_intersects(&self, ray: &Ray) -> bool {
        let mut tmin = f32::MIN;
        let mut tmax = f32::MAX;

        for axis in 0..3 {
            let inv = 1.0 / ray.direction[axis];
            let mut t0 = (self.min[axis] - ray.origin[axis]) * inv;
            let mut t1 = (self.max[axis] - ray.origin[axis]) * inv;

            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
        }

        tmax >= tmin && tmax >= 0.0
    }
}
