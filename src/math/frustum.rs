//! View frustum for culling

use crate::core::types::{Mat4, Vec3, Vec4};
use super::aabb::Aabb;

/// A frustum plane in Hessian normal form (normal.xyz, distance)
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Result of classifying an AABB against a frustum
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    /// Completely outside at least one plane
    Outside,
    /// Straddles at least one plane
    Intersect,
    /// Completely inside all planes
    Inside,
}

/// View frustum made of the 4 side planes of an orthographic projection
/// (left, right, bottom, top). Near and far are not culled.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 4],
}

impl Frustum {
    /// Create a frustum directly from 4 half-space planes
    pub fn new(planes: [Plane; 4]) -> Self {
        Self { planes }
    }

    /// Extract the side planes from a view-projection matrix.
    /// Uses the Gribb/Hartmann method.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        // Extract rows from the VP matrix (column-major storage)
        let rows = [
            Vec4::new(vp.col(0).x, vp.col(1).x, vp.col(2).x, vp.col(3).x),
            Vec4::new(vp.col(0).y, vp.col(1).y, vp.col(2).y, vp.col(3).y),
            Vec4::new(vp.col(0).w, vp.col(1).w, vp.col(2).w, vp.col(3).w),
        ];

        // Left:   row3 + row0
        // Right:  row3 - row0
        // Bottom: row3 + row1
        // Top:    row3 - row1
        let raw = [
            rows[2] + rows[0],
            rows[2] - rows[0],
            rows[2] + rows[1],
            rows[2] - rows[1],
        ];

        let mut planes = [Plane { normal: Vec3::ZERO, d: 0.0 }; 4];
        for (i, r) in raw.iter().enumerate() {
            let len = Vec3::new(r.x, r.y, r.z).length();
            if len > 0.0 {
                planes[i] = Plane {
                    normal: Vec3::new(r.x, r.y, r.z) / len,
                    d: r.w / len,
                };
            }
        }

        Self { planes }
    }

    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Classify an AABB against the frustum.
    ///
    /// For each plane the p-vertex (corner most along the plane normal) and
    /// n-vertex (corner most against it) are selected; the p-vertex behind a
    /// plane means the box is fully outside, the n-vertex behind means the
    /// box straddles that plane.
    pub fn classify_aabb(&self, aabb: &Aabb) -> Containment {
        let mut result = Containment::Inside;

        for plane in &self.planes {
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            if plane.distance_to_point(p) < 0.0 {
                return Containment::Outside;
            }

            let n = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.min.x } else { aabb.max.x },
                if plane.normal.y >= 0.0 { aabb.min.y } else { aabb.max.y },
                if plane.normal.z >= 0.0 { aabb.min.z } else { aabb.max.z },
            );
            if plane.distance_to_point(n) < 0.0 {
                result = Containment::Intersect;
            }
        }

        result
    }
}
