//! Isometric camera

use crate::core::types::{Mat4, Vec2, Vec3};
use crate::math::{Frustum, Ray};

/// Orthographic camera for the isometric view.
///
/// The camera looks diagonally down from its position: the look-at target is
/// offset by `-position.y * sqrt(1.5)` along both world X and Z, at ground
/// level. Raising the camera therefore slides the view across the map while
/// keeping the fixed isometric angle.
pub struct Camera {
    position: Vec3,
    viewport_size: Vec2,
    view: Mat4,
    proj: Mat4,
    view_dirty: bool,
    proj_dirty: bool,
}

/// Depth range of the orthographic projection
const DEPTH_RANGE: f32 = 1000.0;

impl Camera {
    /// Create a camera at a world position with a viewport size in world units
    pub fn new(viewport_size: Vec2, position: Vec3) -> Self {
        Self {
            position,
            viewport_size,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_dirty: true,
            proj_dirty: true,
        }
    }

    /// Get the world space position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Modify the world space position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.view_dirty = true;
    }

    /// Get the viewport size
    pub fn viewport_size(&self) -> Vec2 {
        self.viewport_size
    }

    /// Modify the viewport size
    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport_size = size;
        self.proj_dirty = true;
    }

    /// Get the view matrix (world to camera space)
    pub fn view_matrix(&mut self) -> Mat4 {
        if self.view_dirty {
            let offset = self.position.y * 1.5_f32.sqrt();
            let look_at = Vec3::new(self.position.x - offset, 0.0, self.position.z - offset);
            self.view = Mat4::look_at_rh(self.position, look_at, Vec3::Y);
            self.view_dirty = false;
        }
        self.view
    }

    /// Get the orthographic projection matrix (camera to clip space)
    pub fn projection_matrix(&mut self) -> Mat4 {
        if self.proj_dirty {
            let half = self.viewport_size * 0.5;
            self.proj = Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, 0.0, DEPTH_RANGE);
            self.proj_dirty = false;
        }
        self.proj
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&mut self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get the current view frustum's 4 side planes
    pub fn view_frustum(&mut self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }

    /// Get a ray going from the camera through a screen point.
    ///
    /// `point` is in pixels with the origin at the top-left corner;
    /// `screen_size` is the screen dimension in pixels.
    pub fn screen_point_to_ray(&mut self, point: Vec2, screen_size: Vec2) -> Ray {
        let ndc_x = 2.0 * point.x / screen_size.x - 1.0;
        let ndc_y = 1.0 - 2.0 * point.y / screen_size.y;

        let inv_vp = self.view_projection().inverse();
        let near = inv_vp.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inv_vp.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));

        Ray::new(near, (far - near).normalize())
    }
}
