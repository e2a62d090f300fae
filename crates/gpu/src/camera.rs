use foundation::math::{Mat4, Vec2, Vec3};
use scene::Ray;

use crate::error::RenderError;

/// Drawable area in CSS pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self, RenderError> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Pointer position (relative to the viewport's top-left) to normalized device coords.
    pub fn to_ndc(&self, x_px: f64, y_px: f64) -> Vec2 {
        Vec2::new(x_px / self.width * 2.0 - 1.0, -(y_px / self.height) * 2.0 + 1.0)
    }

    pub fn from_ndc(&self, ndc: Vec2) -> Vec2 {
        Vec2::new((ndc.x + 1.0) * 0.5 * self.width, (1.0 - ndc.y) * 0.5 * self.height)
    }
}

/// Right-handed perspective camera.
///
/// The projection matrix is cached: after changing `fov_y_deg`, `aspect`, `near` or `far`
/// call [`PerspectiveCamera::update_projection_matrix`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: Vec3,
    pub up: Vec3,
    target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f64, aspect: f64, near: f64, far: f64) -> Self {
        let mut camera = Self {
            fov_y_deg,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            up: Vec3::new(0.0, 1.0, 0.0),
            target: Vec3::new(0.0, 0.0, -1.0),
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh_z0(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Result<Mat4, RenderError> {
        Mat4::look_at_rh(self.position, self.target, self.up).ok_or(RenderError::SingularCamera)
    }

    pub fn view_proj(&self) -> Result<Mat4, RenderError> {
        Ok(self.projection.mul(&self.view()?))
    }

    /// World position → NDC (`z` in `[0, 1]` inside the frustum).
    pub fn project(&self, world: Vec3) -> Result<Option<Vec3>, RenderError> {
        let vp = self.view_proj()?;
        if vp.clip_w(world) <= 0.0 {
            return Ok(None);
        }
        Ok(vp.project_point(world))
    }

    /// NDC → world position.
    pub fn unproject(&self, ndc: Vec3) -> Result<Vec3, RenderError> {
        let inv = self.view_proj()?.inverse().ok_or(RenderError::SingularCamera)?;
        inv.project_point(ndc).ok_or(RenderError::SingularCamera)
    }

    /// Ray from the camera position through the NDC point at mid depth.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Result<Ray, RenderError> {
        let through = self.unproject(Vec3::new(ndc.x, ndc.y, 0.5))?;
        Ok(Ray::new(self.position, through - self.position)?)
    }

    /// Pixels per world unit at view-space depth `depth`.
    pub fn pixels_per_unit(&self, viewport: Viewport, depth: f64) -> f64 {
        let focal = 0.5 * viewport.height / (0.5 * self.fov_y_deg.to_radians()).tan();
        if depth <= 0.0 {
            return 0.0;
        }
        focal / depth
    }

    /// View-space depth of `world` along the viewing direction.
    pub fn depth_of(&self, world: Vec3) -> f64 {
        match (self.target - self.position).normalize() {
            Some(forward) => (world - self.position).dot(forward),
            None => 0.0,
        }
    }
}
