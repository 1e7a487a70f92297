/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use std::io::Write;
use stellar_core::projection::ndc_to_screen;
use stellar_core::{Camera, NodeKind, OverlayAnchor, Scene, SceneNode, ScreenPoint, Viewport};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_HEIGHT: f32 = 2.0;

const GRID_CHAR: char = '·';
const STAR_CHAR: char = '*';
const LIGHT_CHAR: char = 'o';

/// Renders a [`Scene`] into a grid of colored characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
    background: Vec<Option<Color>>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::White; size],
            background: vec![None; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Projection viewport in "pixels", where one cell is 1 x [`CELL_HEIGHT`].
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width as f32,
            height: self.height as f32 * CELL_HEIGHT,
        }
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::White);
        self.background.fill(None);
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    /// Rasterize the whole scene for the given camera.
    pub fn render_scene(&mut self, scene: &Scene, camera: &Camera) {
        self.clear();
        let viewport = self.viewport();
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        let view_projection = projection * view;

        if let Some(background) = &scene.background {
            for y in 0..self.height {
                for x in 0..self.width {
                    let u = (x as f32 + 0.5) / self.width as f32;
                    let v = (y as f32 + 0.5) / self.height as f32;
                    let [r, g, b] = background.sample(u, v);
                    self.background[y * self.width + x] = Some(Color::Rgb { r, g, b });
                }
            }
        }

        if let Some(grid) = &scene.grid {
            for (a, b) in grid.lines() {
                self.render_segment(&a, &b, &view, &projection, camera.near, &viewport);
            }
        }

        for node in scene.nodes() {
            match node.kind {
                NodeKind::StarfieldPoint => {
                    let p = camera.project(&node.world_position(), &viewport);
                    self.plot(&p, STAR_CHAR, Color::White);
                }
                NodeKind::Star | NodeKind::Flower => {
                    self.render_node(node, scene, &view_projection, &viewport);
                }
            }
        }

        if scene.show_light_marker {
            let p = camera.project(&scene.lighting.point.position, &viewport);
            self.plot(&p, LIGHT_CHAR, Color::Yellow);
        }
    }

    fn render_node(
        &mut self,
        node: &SceneNode,
        scene: &Scene,
        view_projection: &Matrix4<f32>,
        viewport: &Viewport,
    ) {
        let model = node.transform.model_matrix();
        let base = node.mesh.material.color;

        'triangles: for triangle in &node.mesh.triangles {
            let world = triangle.transformed(&model);

            let mut screen = [(0.0, 0.0, 0.0); 3];
            for (out, v) in screen.iter_mut().zip(world.vertices.iter()) {
                let s = stellar_core::project_to_screen(&v.position, view_projection, viewport);
                // Triangles straddling the camera are dropped
                if !s.is_in_front() {
                    continue 'triangles;
                }
                *out = (s.x, s.y / CELL_HEIGHT, s.depth);
            }

            let mut normal = world.calculate_normal();
            if normal == Vector3::zeros() {
                continue;
            }
            let centroid = world.centroid();
            // Light both faces: STL exports are not reliably wound
            if normal.dot(&(scene.lighting.point.position - centroid)) < 0.0 {
                normal = -normal;
            }

            let brightness = scene.lighting.brightness(&centroid, &normal);
            let index = ((brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize)
                .clamp(1, LUMINOSITY_RAMP.len() - 1);
            let [r, g, b] = scene.lighting.shade(base, &centroid, &normal);
            let color = Color::Rgb {
                r: (r * 255.0) as u8,
                g: (g * 255.0) as u8,
                b: (b * 255.0) as u8,
            };

            self.rasterize_triangle(&screen, LUMINOSITY_RAMP[index], color);
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char, color: Color) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                        self.write_cell(x as usize, y as usize, depth, character, color);
                    }
                }
            }
        }
    }

    /// Draw a world-space segment, clipped against the near plane.
    fn render_segment(
        &mut self,
        a: &Point3<f32>,
        b: &Point3<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
        near: f32,
        viewport: &Viewport,
    ) {
        let Some((a, b)) = clip_to_near(&view.transform_point(a), &view.transform_point(b), near) else {
            return;
        };
        let project = |p: &Point3<f32>| {
            let clip = projection * Vector4::new(p.x, p.y, p.z, 1.0);
            ndc_to_screen(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w, clip.w, viewport)
        };
        let (sa, sb) = (project(&a), project(&b));

        let (x0, y0) = (sa.x, sa.y / CELL_HEIGHT);
        let (x1, y1) = (sb.x, sb.y / CELL_HEIGHT);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().min(4096.0) as usize;
        for i in 0..=steps {
            let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            if x < 0.0 || y < 0.0 {
                continue;
            }
            let depth = sa.depth + (sb.depth - sa.depth) * t;
            self.write_cell(x as usize, y as usize, depth, GRID_CHAR, Color::DarkGrey);
        }
    }

    fn plot(&mut self, point: &ScreenPoint, character: char, color: Color) {
        if !point.is_visible(&self.viewport()) {
            return;
        }
        self.write_cell(point.x as usize, (point.y / CELL_HEIGHT) as usize, point.depth, character, color);
    }

    fn write_cell(&mut self, x: usize, y: usize, depth: f32, character: char, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y * self.width + x;
        if depth < self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = character;
            self.color_buffer[idx] = color;
        }
    }

    /// Write the overlay button label centred on the anchor. Drawn over
    /// everything, like an HTML element above the canvas.
    pub fn draw_overlay(&mut self, anchor: &OverlayAnchor, label: &str) {
        if !anchor.visible || anchor.y < 0.0 {
            return;
        }
        let text = format!("[ {label} ]");
        let row = (anchor.y / CELL_HEIGHT) as usize;
        if row >= self.height {
            return;
        }
        let len = text.chars().count() as f32;
        let start = (anchor.x - len / 2.0).round() as i64;
        for (i, c) in text.chars().enumerate() {
            let x = start + i as i64;
            if x < 0 || x as usize >= self.width {
                continue;
            }
            let idx = row * self.width + x as usize;
            self.char_buffer[idx] = c;
            self.color_buffer[idx] = Color::White;
            self.background[idx] = Some(Color::DarkMagenta);
            self.depth_buffer[idx] = f32::NEG_INFINITY;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                writer.queue(SetBackgroundColor(self.background[idx].unwrap_or(Color::Reset)))?;
                writer.queue(SetForegroundColor(self.color_buffer[idx]))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Clip a view-space segment to the part in front of the near plane.
fn clip_to_near(a: &Point3<f32>, b: &Point3<f32>, near: f32) -> Option<(Point3<f32>, Point3<f32>)> {
    // The camera looks down -z in view space
    let limit = -near;
    match (a.z <= limit, b.z <= limit) {
        (true, true) => Some((*a, *b)),
        (false, false) => None,
        (a_in, _) => {
            let t = (limit - a.z) / (b.z - a.z);
            let cut = *a + (*b - *a) * t;
            if a_in {
                Some((*a, cut))
            } else {
                Some((cut, *b))
            }
        }
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::{OverlayAnchor, SceneConfig};

    #[test]
    fn barycentric_center_weights() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (1.0, 1.0)).unwrap();
        assert!((w0 - 1.0 / 3.0).abs() < 1e-5);
        assert!((w1 - 1.0 / 3.0).abs() < 1e-5);
        assert!((w2 - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn segment_fully_behind_camera_is_dropped() {
        let a = Point3::new(0.0, 0.0, 5.0);
        let b = Point3::new(1.0, 0.0, 1.0);
        assert!(clip_to_near(&a, &b, 0.1).is_none());
    }

    #[test]
    fn segment_crossing_near_plane_is_cut() {
        let a = Point3::new(0.0, 0.0, -10.0);
        let b = Point3::new(0.0, 0.0, 10.0);
        let (p, q) = clip_to_near(&a, &b, 0.1).unwrap();
        assert_eq!(p, a);
        assert!((q.z + 0.1).abs() < 1e-5);
    }

    #[test]
    fn overlay_label_is_centred() {
        let mut renderer = AsciiRenderer::new(40, 10);
        let anchor = OverlayAnchor {
            x: 20.0,
            y: 4.0 * CELL_HEIGHT,
            visible: true,
        };
        renderer.draw_overlay(&anchor, "Go");
        // "[ Go ]" is six wide, starting three left of the anchor
        assert_eq!(renderer.char_at(17, 4), Some('['));
        assert_eq!(renderer.char_at(19, 4), Some('G'));
        assert_eq!(renderer.char_at(22, 4), Some(']'));
    }

    #[test]
    fn hidden_overlay_draws_nothing() {
        let mut renderer = AsciiRenderer::new(40, 10);
        let anchor = OverlayAnchor {
            x: 20.0,
            y: 8.0,
            visible: false,
        };
        renderer.draw_overlay(&anchor, "Go");
        assert!((0..40).all(|x| renderer.char_at(x, 4) == Some(' ')));
    }

    #[test]
    fn star_is_rasterized_at_screen_center() {
        use stellar_core::{AppContext, AssetLoader};

        let mut config = SceneConfig::default();
        config.starfield.count = 0;
        config.lighting.show_grid = false;
        config.lighting.show_light_marker = false;
        config.flowers.positions.clear();

        let mut renderer = AsciiRenderer::new(80, 24);
        let viewport = renderer.viewport();
        let mut app = AppContext::init(config, &AssetLoader::inline(), viewport).unwrap();
        app.tick(&viewport).unwrap();

        renderer.render_scene(app.scene(), app.camera());
        assert_ne!(renderer.char_at(40, 12), Some(' '));
        assert_eq!(renderer.char_at(0, 0), Some(' '));
    }
}
