/// Painter's-algorithm drawing of the scene onto a 2D canvas.
///
/// [`display_list`] is plain Rust so it can be tested natively; only
/// [`paint`] touches the browser.
use nalgebra::Vector3;
use std::f64::consts::TAU;
use stellar_core::{Camera, NodeKind, Scene, ScreenPoint, Viewport};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const GRID_COLOR: [u8; 3] = [70, 70, 90];
const STAR_COLOR: [u8; 3] = [255, 255, 255];
const LIGHT_COLOR: [u8; 3] = [255, 220, 60];

/// One thing to draw
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Triangle {
        points: [(f32, f32); 3],
        color: [u8; 3],
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: [u8; 3],
    },
    Dot {
        center: (f32, f32),
        radius: f32,
        color: [u8; 3],
    },
}

fn in_front(p: &ScreenPoint) -> bool {
    p.is_in_front() && p.depth <= 1.0
}

/// Everything visible, sorted far to near.
pub fn display_list(scene: &Scene, camera: &Camera, viewport: &Viewport) -> Vec<Primitive> {
    let view_projection = camera.view_projection();
    let mut items: Vec<(f32, Primitive)> = Vec::new();

    if let Some(grid) = &scene.grid {
        for (a, b) in grid.lines() {
            let (pa, pb) = (camera.project(&a, viewport), camera.project(&b, viewport));
            if in_front(&pa) && in_front(&pb) {
                items.push((
                    f32::INFINITY,
                    Primitive::Line {
                        from: (pa.x, pa.y),
                        to: (pb.x, pb.y),
                        color: GRID_COLOR,
                    },
                ));
            }
        }
    }

    for node in scene.nodes() {
        if node.kind == NodeKind::StarfieldPoint {
            let p = camera.project(&node.world_position(), viewport);
            if p.is_visible(viewport) {
                items.push((
                    p.depth,
                    Primitive::Dot {
                        center: (p.x, p.y),
                        radius: 1.5,
                        color: STAR_COLOR,
                    },
                ));
            }
            continue;
        }

        let model = node.transform.model_matrix();
        for triangle in &node.mesh.triangles {
            let world = triangle.transformed(&model);
            let projected = world
                .vertices
                .map(|v| stellar_core::project_to_screen(&v.position, &view_projection, viewport));
            if !projected.iter().all(in_front) {
                continue;
            }

            let mut normal = world.calculate_normal();
            if normal == Vector3::zeros() {
                continue;
            }
            let centroid = world.centroid();
            if normal.dot(&(camera.position - centroid)) < 0.0 {
                normal = -normal;
            }
            let [r, g, b] = scene
                .lighting
                .shade(node.mesh.material.color, &centroid, &normal);
            let depth = projected.iter().map(|p| p.depth).sum::<f32>() / 3.0;
            items.push((
                depth,
                Primitive::Triangle {
                    points: projected.map(|p| (p.x, p.y)),
                    color: [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8],
                },
            ));
        }
    }

    if scene.show_light_marker {
        let p = camera.project(&scene.lighting.point.position, viewport);
        if p.is_visible(viewport) {
            items.push((
                p.depth,
                Primitive::Dot {
                    center: (p.x, p.y),
                    radius: 3.0,
                    color: LIGHT_COLOR,
                },
            ));
        }
    }

    items.sort_by(|a, b| b.0.total_cmp(&a.0));
    items.into_iter().map(|(_, p)| p).collect()
}

fn css_color([r, g, b]: [u8; 3]) -> JsValue {
    JsValue::from_str(&format!("rgb({r},{g},{b})"))
}

/// Draw a display list. With `transparent` the canvas is cleared so a CSS
/// background shows through; otherwise it is filled black.
pub fn paint(
    ctx: &CanvasRenderingContext2d,
    viewport: &Viewport,
    primitives: &[Primitive],
    transparent: bool,
) -> Result<(), JsValue> {
    let (w, h) = (viewport.width as f64, viewport.height as f64);
    if transparent {
        ctx.clear_rect(0.0, 0.0, w, h);
    } else {
        ctx.set_fill_style(&css_color([0, 0, 0]));
        ctx.fill_rect(0.0, 0.0, w, h);
    }

    ctx.set_line_width(1.0);
    for primitive in primitives {
        match primitive {
            Primitive::Triangle { points, color } => {
                ctx.set_fill_style(&css_color(*color));
                ctx.begin_path();
                ctx.move_to(points[0].0 as f64, points[0].1 as f64);
                ctx.line_to(points[1].0 as f64, points[1].1 as f64);
                ctx.line_to(points[2].0 as f64, points[2].1 as f64);
                ctx.close_path();
                ctx.fill();
            }
            Primitive::Line { from, to, color } => {
                ctx.set_stroke_style(&css_color(*color));
                ctx.begin_path();
                ctx.move_to(from.0 as f64, from.1 as f64);
                ctx.line_to(to.0 as f64, to.1 as f64);
                ctx.stroke();
            }
            Primitive::Dot {
                center,
                radius,
                color,
            } => {
                ctx.set_fill_style(&css_color(*color));
                ctx.begin_path();
                ctx.arc(center.0 as f64, center.1 as f64, *radius as f64, 0.0, TAU)?;
                ctx.fill();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::{AppContext, AssetLoader, SceneConfig};

    fn context(config: SceneConfig) -> (AppContext, Viewport) {
        let viewport = Viewport::new(800, 600);
        let mut app = AppContext::init(config, &AssetLoader::inline(), viewport).unwrap();
        app.tick(&viewport).unwrap();
        (app, viewport)
    }

    #[test]
    fn grid_is_drawn_first() {
        let mut config = SceneConfig::default();
        config.starfield.count = 3;
        let (app, viewport) = context(config);
        let list = display_list(app.scene(), app.camera(), &viewport);
        assert!(matches!(list.first(), Some(Primitive::Line { .. })));
        assert!(list.iter().any(|p| matches!(p, Primitive::Triangle { .. })));
    }

    #[test]
    fn list_is_ordered_far_to_near() {
        let mut config = SceneConfig::default();
        config.starfield.count = 0;
        config.lighting.show_grid = false;
        config.lighting.show_light_marker = false;
        let (app, viewport) = context(config);
        let list = display_list(app.scene(), app.camera(), &viewport);

        // Flower at (60, 0, -60) lands right of centre, (-60, 0, -30) left,
        // the star in the middle; the flower at (0, 0, 60) is behind the camera.
        let centroid_x = |p: &Primitive| match p {
            Primitive::Triangle { points, .. } => (points[0].0 + points[1].0 + points[2].0) / 3.0,
            _ => unreachable!("only triangles expected"),
        };
        let indices = |keep: &dyn Fn(f32) -> bool| -> Vec<usize> {
            list.iter()
                .enumerate()
                .filter(|(_, p)| keep(centroid_x(p)))
                .map(|(i, _)| i)
                .collect()
        };
        let far = indices(&|x| x > 550.0);
        let mid = indices(&|x| x < 250.0);
        let near = indices(&|x| (300.0..500.0).contains(&x));

        assert!(!far.is_empty() && !mid.is_empty() && !near.is_empty());
        assert!(far.iter().max() < mid.iter().min());
        assert!(mid.iter().max() < near.iter().min());
    }
}
