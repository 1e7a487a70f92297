/// Camera and world-to-screen projection
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Pixel dimensions of the surface being drawn to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// A projected point in pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    /// NDC depth, -1 at the near plane and 1 at the far plane
    pub depth: f32,
    /// Homogeneous w before division; positive when in front of the camera
    pub w: f32,
}

impl ScreenPoint {
    pub fn is_in_front(&self) -> bool {
        self.w > 0.0
    }

    /// In front of the camera, between the clip planes and inside the viewport.
    pub fn is_visible(&self, viewport: &Viewport) -> bool {
        self.is_in_front()
            && (-1.0..=1.0).contains(&self.depth)
            && (0.0..=viewport.width).contains(&self.x)
            && (0.0..=viewport.height).contains(&self.y)
    }
}

/// Project a world-space point to pixel coordinates.
///
/// Applies the view-projection matrix, divides by w, then maps NDC x from
/// `[-1, 1]` to `[0, width]` and NDC y to `[height, 0]` (screen y grows
/// downward). The division always happens, so a point on the camera plane
/// (w = 0) comes out non-finite and points behind the camera come out
/// mirrored; check [`ScreenPoint::is_in_front`] before using them.
pub fn project_to_screen(
    world: &Point3<f32>,
    view_projection: &Matrix4<f32>,
    viewport: &Viewport,
) -> ScreenPoint {
    let clip = view_projection * Vector4::new(world.x, world.y, world.z, 1.0);
    ndc_to_screen(
        clip.x / clip.w,
        clip.y / clip.w,
        clip.z / clip.w,
        clip.w,
        viewport,
    )
}

/// Map NDC coordinates to pixels.
pub fn ndc_to_screen(ndc_x: f32, ndc_y: f32, ndc_z: f32, w: f32, viewport: &Viewport) -> ScreenPoint {
    let width_half = viewport.width / 2.0;
    let height_half = viewport.height / 2.0;
    ScreenPoint {
        x: ndc_x * width_half + width_half,
        y: -ndc_y * height_half + height_half,
        depth: ndc_z,
        w,
    }
}

/// Perspective camera looking at a target
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 50.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: 75f32.to_radians(),
            aspect: Viewport::new(width, height).aspect(),
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Update the aspect ratio after a resize.
    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.aspect = viewport.aspect();
    }

    /// World to camera transform
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Camera to clip transform
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world point through this camera.
    pub fn project(&self, world: &Point3<f32>, viewport: &Viewport) -> ScreenPoint {
        project_to_screen(world, &self.view_projection(), viewport)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert!((camera.fov - 75f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_view_matrix() {
        let camera = Camera::new(800, 600);
        let view = camera.view_matrix();
        let eye = view.transform_point(&camera.position);
        assert!(eye.coords.norm() < 1e-4);
    }

    #[test]
    fn look_at_target_projects_to_center() {
        let viewport = Viewport::new(800, 600);
        let camera = Camera::new(800, 600);
        let p = camera.project(&camera.target, &viewport);
        assert!((p.x - 400.0).abs() < EPS);
        assert!((p.y - 300.0).abs() < EPS);
        assert!(p.is_in_front());
    }

    #[test]
    fn ndc_x_scales_linearly_with_width() {
        let narrow = ndc_to_screen(0.5, 0.0, 0.0, 1.0, &Viewport::new(400, 300));
        let wide = ndc_to_screen(0.5, 0.0, 0.0, 1.0, &Viewport::new(800, 300));
        assert!((narrow.x - (0.5 * 200.0 + 200.0)).abs() < EPS);
        assert!((wide.x - (0.5 * 400.0 + 400.0)).abs() < EPS);
        assert!(((wide.x - 400.0) - 2.0 * (narrow.x - 200.0)).abs() < EPS);
    }

    #[test]
    fn vertical_flip_is_symmetric() {
        let viewport = Viewport::new(800, 600);
        let up = ndc_to_screen(0.0, 0.4, 0.0, 1.0, &viewport);
        let down = ndc_to_screen(0.0, -0.4, 0.0, 1.0, &viewport);
        assert!(up.y < 300.0);
        assert!(down.y > 300.0);
        assert!(((300.0 - up.y) - (down.y - 300.0)).abs() < EPS);
    }

    #[test]
    fn projection_is_idempotent() {
        let viewport = Viewport::new(1024, 768);
        let camera = Camera::new(1024, 768);
        let point = Point3::new(3.0, -7.0, 12.0);
        assert_eq!(camera.project(&point, &viewport), camera.project(&point, &viewport));
    }

    #[test]
    fn identity_projection_scenario() {
        let viewport = Viewport::new(800, 600);
        let p = project_to_screen(&Point3::new(0.0, 5.0, 0.0), &Matrix4::identity(), &viewport);
        assert!((p.x - 400.0).abs() < EPS);
        assert!(p.y < 300.0);
    }

    #[test]
    fn point_behind_camera_is_flagged() {
        let viewport = Viewport::new(800, 600);
        let camera = Camera::new(800, 600);
        let behind = camera.project(&Point3::new(0.0, 0.0, 80.0), &viewport);
        assert!(!behind.is_in_front());
        assert!(!behind.is_visible(&viewport));
    }

    #[test]
    fn point_on_camera_plane_divides_by_zero_w() {
        let viewport = Viewport::new(800, 600);
        let camera = Camera::new(800, 600);
        let p = camera.project(&Point3::new(10.0, 0.0, 50.0), &viewport);
        assert_eq!(p.w, 0.0);
        assert!(!p.x.is_finite());
        assert!(!p.is_in_front());
    }

    #[test]
    fn zero_height_viewport_has_unit_aspect() {
        let viewport = Viewport::new(800, 0);
        assert_eq!(viewport.aspect(), 1.0);
    }
}
