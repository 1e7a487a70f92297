/// Orbit controls: rotate, dolly and pan a camera around a target point.
///
/// Input handlers accumulate deltas; [`OrbitControls::update`] applies them
/// to the camera once per frame.
use nalgebra::{Point3, Vector3};
use std::f32::consts::PI;

use crate::projection::Camera;

const POLE_EPSILON: f32 = 1e-3;

/// Spherical offset of the camera from its target (y up)
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Angle from +Y
    polar: f32,
    /// Angle around Y, measured from +Z towards +X
    azimuth: f32,
}

impl Spherical {
    fn from_offset(offset: &Vector3<f32>) -> Self {
        let radius = offset.norm();
        if radius < 1e-6 {
            return Self {
                radius: 0.0,
                polar: PI / 2.0,
                azimuth: 0.0,
            };
        }
        Self {
            radius,
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_polar = self.polar.sin();
        Vector3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        )
    }
}

/// Camera orbit around a target point
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Fraction of pending rotation applied per update; 1.0 disables damping
    pub damping: f32,
    pending_azimuth: f32,
    pending_polar: f32,
    pending_scale: f32,
    pending_pan: Vector3<f32>,
    initial_position: Point3<f32>,
    initial_target: Point3<f32>,
}

impl OrbitControls {
    pub fn new(camera: &Camera) -> Self {
        Self {
            target: camera.target,
            min_distance: 1.0,
            max_distance: 500.0,
            damping: 1.0,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_scale: 1.0,
            pending_pan: Vector3::zeros(),
            initial_position: camera.position,
            initial_target: camera.target,
        }
    }

    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max.max(min);
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping.clamp(0.01, 1.0);
        self
    }

    /// Queue a rotation (radians) around the target.
    pub fn rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        self.pending_azimuth += d_azimuth;
        self.pending_polar += d_polar;
    }

    /// Queue a dolly; factors below 1.0 move closer.
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.pending_scale *= factor;
        }
    }

    /// Queue a pan in camera-relative units, scaled by the orbit distance.
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &Camera) {
        let offset = camera.position - self.target;
        let distance = offset.norm().max(1e-3);
        let forward = (-offset).try_normalize(1e-9).unwrap_or_else(|| -Vector3::z());
        let right = forward
            .cross(&camera.up)
            .try_normalize(1e-9)
            .unwrap_or_else(Vector3::x);
        let up = right.cross(&forward);
        self.pending_pan += (right * dx + up * dy) * distance;
    }

    /// Restore the pose captured at construction.
    pub fn reset(&mut self, camera: &mut Camera) {
        self.target = self.initial_target;
        camera.position = self.initial_position;
        camera.target = self.initial_target;
        self.pending_azimuth = 0.0;
        self.pending_polar = 0.0;
        self.pending_scale = 1.0;
        self.pending_pan = Vector3::zeros();
    }

    /// Apply pending input to the camera. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let idle = self.pending_azimuth == 0.0
            && self.pending_polar == 0.0
            && self.pending_scale == 1.0
            && self.pending_pan == Vector3::zeros();
        if idle && camera.target == self.target {
            return false;
        }

        let mut spherical = Spherical::from_offset(&(camera.position - self.target));

        let d_azimuth = self.pending_azimuth * self.damping;
        let d_polar = self.pending_polar * self.damping;
        spherical.azimuth += d_azimuth;
        spherical.polar = (spherical.polar + d_polar).clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius =
            (spherical.radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pending_pan;

        let position = self.target + spherical.to_offset();
        let moved = (position - camera.position).norm() > 1e-4 || camera.target != self.target;
        camera.position = position;
        camera.target = self.target;

        self.pending_azimuth -= d_azimuth;
        self.pending_polar -= d_polar;
        if self.pending_azimuth.abs() < 1e-5 {
            self.pending_azimuth = 0.0;
        }
        if self.pending_polar.abs() < 1e-5 {
            self.pending_polar = 0.0;
        }
        self.pending_scale = 1.0;
        self.pending_pan = Vector3::zeros();

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(camera: &Camera) -> f32 {
        (camera.position - camera.target).norm()
    }

    #[test]
    fn update_without_input_keeps_pose() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera);
        let before = camera.position;
        assert!(!controls.update(&mut camera));
        assert!((camera.position - before).norm() < 1e-4);
    }

    #[test]
    fn rotate_preserves_distance() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera);
        controls.rotate(0.7, -0.3);
        assert!(controls.update(&mut camera));
        assert!((distance(&camera) - 50.0).abs() < 1e-3);
        assert!(camera.position.x.abs() > 1.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera).with_distance_limits(10.0, 80.0);
        controls.zoom(0.01);
        controls.update(&mut camera);
        assert!((distance(&camera) - 10.0).abs() < 1e-3);
        controls.zoom(100.0);
        controls.update(&mut camera);
        assert!((distance(&camera) - 80.0).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_never_reaches_pole() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera);
        controls.rotate(0.0, -10.0);
        controls.update(&mut camera);
        let offset = camera.position - camera.target;
        assert!(offset.y < distance(&camera));
        assert!(offset.x.abs() + offset.z.abs() > 0.0);
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera).with_damping(0.5);
        controls.rotate(1.0, 0.0);
        controls.update(&mut camera);
        let first = camera.position;
        assert!(controls.update(&mut camera));
        assert!((camera.position - first).norm() > 1e-3);
    }

    #[test]
    fn pan_moves_target_and_reset_restores() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera);
        controls.pan(0.1, 0.0, &camera);
        controls.update(&mut camera);
        assert!(camera.target.x > 0.0);
        assert!((distance(&camera) - 50.0).abs() < 1e-3);

        controls.reset(&mut camera);
        assert_eq!(camera.target, Point3::origin());
        assert!((camera.position - Point3::new(0.0, 0.0, 50.0)).norm() < 1e-4);
    }
}
