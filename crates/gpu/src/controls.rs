//! Orbit camera controls around a target, z-up.
//!
//! Pointer input accumulates into pending deltas; `update` applies them to the camera.
//! Calling `update` with no pending input leaves the camera where it is.

use foundation::math::Vec3;

use crate::camera::{PerspectiveCamera, Viewport};

const MIN_POLAR: f64 = 1e-6;
const MAX_POLAR: f64 = std::f64::consts::PI - 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitSettings {
    pub rotate_speed: f64,
    pub pan_speed: f64,
    pub zoom_speed: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f64::INFINITY,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitControls {
    pub settings: OrbitSettings,
    pub enabled: bool,
    target: Vec3,
    radius: f64,
    /// Azimuth around +z, from +x.
    theta: f64,
    /// Polar angle from +z.
    phi: f64,
    pending_theta: f64,
    pending_phi: f64,
    pending_scale: f64,
    pending_pan: Vec3,
}

impl OrbitControls {
    /// Derives the orbit from the camera's current position and look-at target.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let target = camera.target();
        let offset = camera.position - target;
        let radius = offset.length();
        let theta = offset.y.atan2(offset.x);
        let phi = if radius > 0.0 {
            (offset.z / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };
        Self {
            settings: OrbitSettings::default(),
            enabled: true,
            target,
            radius,
            theta,
            phi,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
            pending_pan: Vec3::ZERO,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f64 {
        self.radius
    }

    /// Pointer drag with the primary button; deltas in CSS pixels.
    pub fn rotate(&mut self, delta_x_px: f64, delta_y_px: f64, viewport: Viewport) {
        if !self.enabled {
            return;
        }
        let k = 2.0 * std::f64::consts::PI * self.settings.rotate_speed / viewport.height;
        self.pending_theta -= delta_x_px * k;
        self.pending_phi -= delta_y_px * k;
    }

    /// Pointer drag with the secondary button; moves the target in the view plane.
    pub fn pan(
        &mut self,
        delta_x_px: f64,
        delta_y_px: f64,
        camera: &PerspectiveCamera,
        viewport: Viewport,
    ) {
        if !self.enabled {
            return;
        }
        let Some(forward) = (self.target - camera.position).normalize() else {
            return;
        };
        let Some(right) = forward.cross(camera.up).normalize() else {
            return;
        };
        let up = right.cross(forward);

        // World units covered by one pixel at the target's depth.
        let half_fov = (0.5 * camera.fov_y_deg.to_radians()).tan();
        let per_px = 2.0 * self.radius * half_fov / viewport.height * self.settings.pan_speed;
        self.pending_pan = self.pending_pan + right * (-delta_x_px * per_px) + up * (delta_y_px * per_px);
    }

    /// Wheel input; positive `delta_y` zooms out.
    pub fn zoom(&mut self, wheel_delta_y: f64) {
        if !self.enabled || wheel_delta_y == 0.0 {
            return;
        }
        let step = 0.95f64.powf(self.settings.zoom_speed);
        if wheel_delta_y > 0.0 {
            self.pending_scale /= step;
        } else {
            self.pending_scale *= step;
        }
    }

    /// Applies pending input and repositions the camera. Returns whether anything moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let changed = self.pending_theta != 0.0
            || self.pending_phi != 0.0
            || self.pending_scale != 1.0
            || self.pending_pan != Vec3::ZERO;

        self.theta += self.pending_theta;
        self.phi = (self.phi + self.pending_phi).clamp(MIN_POLAR, MAX_POLAR);
        self.radius = (self.radius * self.pending_scale)
            .clamp(self.settings.min_distance, self.settings.max_distance);
        self.target = self.target + self.pending_pan;

        self.pending_theta = 0.0;
        self.pending_phi = 0.0;
        self.pending_scale = 1.0;
        self.pending_pan = Vec3::ZERO;

        if changed {
            camera.position = self.target + self.offset();
            camera.look_at(self.target);
        }
        changed
    }

    fn offset(&self) -> Vec3 {
        let s = self.phi.sin();
        Vec3::new(
            self.radius * s * self.theta.cos(),
            self.radius * s * self.theta.sin(),
            self.radius * self.phi.cos(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::OrbitControls;
    use crate::camera::{PerspectiveCamera, Viewport};
    use foundation::math::Vec3;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(10.0, 1.0, 1.0, 1e8);
        camera.position = Vec3::new(100.0, 0.0, 100.0);
        camera.up = Vec3::Z;
        camera.look_at(Vec3::ZERO);
        camera
    }

    #[test]
    fn idle_update_keeps_camera() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        assert!((controls.distance() - 100.0 * 2f64.sqrt()).abs() < 1e-9);
        assert!(!controls.update(&mut cam));
        assert_eq!(cam.position, Vec3::new(100.0, 0.0, 100.0));
    }

    #[test]
    fn rotate_keeps_distance() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        let vp = Viewport::new(800.0, 600.0).expect("viewport");
        controls.rotate(120.0, -40.0, vp);
        assert!(controls.update(&mut cam));
        assert!((cam.position.length() - controls.distance()).abs() < 1e-9);
        assert_ne!(cam.position, Vec3::new(100.0, 0.0, 100.0));
    }

    #[test]
    fn zoom_scales_distance() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        let before = controls.distance();
        controls.zoom(-100.0);
        controls.update(&mut cam);
        assert!((controls.distance() - before * 0.95).abs() < 1e-9);
        controls.zoom(100.0);
        controls.update(&mut cam);
        assert!((controls.distance() - before).abs() < 1e-9);
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        let vp = Viewport::new(800.0, 600.0).expect("viewport");
        let offset_before = cam.position - controls.target();
        controls.pan(50.0, 0.0, &cam, vp);
        controls.update(&mut cam);
        assert_ne!(controls.target(), Vec3::ZERO);
        assert!((cam.position - controls.target()).distance(offset_before) < 1e-9);
    }

    #[test]
    fn disabled_controls_ignore_input() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        controls.enabled = false;
        controls.zoom(-100.0);
        assert!(!controls.update(&mut cam));
    }
}
