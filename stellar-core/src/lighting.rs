/// Point and ambient lights, plus the helpers drawn alongside them
use nalgebra::{Point3, Vector3};

/// Omnidirectional light at a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Point3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Uniform light reaching every surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// The scene's light rig
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub point: PointLight,
    pub ambient: AmbientLight,
}

impl Lighting {
    pub fn new(point: PointLight, ambient: AmbientLight) -> Self {
        Self { point, ambient }
    }

    /// Lambert brightness of a surface in `[0, 1]`.
    pub fn brightness(&self, position: &Point3<f32>, normal: &Vector3<f32>) -> f32 {
        (self.ambient.intensity + self.diffuse(position, normal)).clamp(0.0, 1.0)
    }

    fn diffuse(&self, position: &Point3<f32>, normal: &Vector3<f32>) -> f32 {
        let to_light = (self.point.position - position)
            .try_normalize(1e-9)
            .unwrap_or_else(Vector3::zeros);
        normal.dot(&to_light).max(0.0) * self.point.intensity
    }

    /// Lit color of a surface, each channel in `[0, 1]`.
    pub fn shade(&self, base: [f32; 3], position: &Point3<f32>, normal: &Vector3<f32>) -> [f32; 3] {
        let diffuse = self.diffuse(position, normal);
        let mut out = [0.0; 3];
        for (i, channel) in out.iter_mut().enumerate() {
            let light = self.ambient.color[i] * self.ambient.intensity
                + self.point.color[i] * diffuse;
            *channel = (base[i] * light).clamp(0.0, 1.0);
        }
        out
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            point: PointLight {
                position: Point3::new(5.0, 5.0, 5.0),
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
            },
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.2,
            },
        }
    }
}

/// Square line grid on the XZ plane, centred on the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
}

impl GridHelper {
    pub fn new(size: f32, divisions: u32) -> Self {
        Self { size, divisions }
    }

    /// Line segments making up the grid, `divisions + 1` in each direction.
    pub fn lines(&self) -> Vec<(Point3<f32>, Point3<f32>)> {
        let half = self.size / 2.0;
        let step = self.size / self.divisions.max(1) as f32;
        (0..=self.divisions.max(1))
            .flat_map(|i| {
                let k = -half + i as f32 * step;
                [
                    (Point3::new(-half, 0.0, k), Point3::new(half, 0.0, k)),
                    (Point3::new(k, 0.0, -half), Point3::new(k, 0.0, half)),
                ]
            })
            .collect()
    }
}

impl Default for GridHelper {
    fn default() -> Self {
        Self::new(200.0, 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_facing_light_is_brighter() {
        let lighting = Lighting::default();
        let p = Point3::origin();
        let toward = Vector3::new(1.0, 1.0, 1.0).normalize();
        let away = -toward;
        assert!(lighting.brightness(&p, &toward) > lighting.brightness(&p, &away));
        assert!((lighting.brightness(&p, &away) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn brightness_is_clamped() {
        let mut lighting = Lighting::default();
        lighting.ambient.intensity = 1.0;
        let n = Vector3::new(1.0, 1.0, 1.0).normalize();
        assert_eq!(lighting.brightness(&Point3::origin(), &n), 1.0);
    }

    #[test]
    fn grid_line_count() {
        let grid = GridHelper::default();
        let lines = grid.lines();
        assert_eq!(lines.len(), 51 * 2);
        assert_eq!(lines[0].0, Point3::new(-100.0, 0.0, -100.0));
    }
}
