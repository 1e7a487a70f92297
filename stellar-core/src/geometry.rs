/// Geometry primitives for scene meshes
use nalgebra::{Matrix4, Point3, Vector3};
use std::f32::consts::{PI, TAU};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }

    fn at(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding of the three positions.
    ///
    /// Degenerate triangles yield the zero vector instead of NaN.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let cross = (v1 - v0).cross(&(v2 - v0));
        cross.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    }

    pub fn centroid(&self) -> Point3<f32> {
        let [a, b, c] = self.vertices.map(|v| v.position.coords);
        Point3::from((a + b + c) / 3.0)
    }

    /// The same face moved into world space by a model matrix.
    pub fn transformed(&self, model: &Matrix4<f32>) -> Self {
        Self {
            vertices: self.vertices.map(|v| Vertex {
                position: model.transform_point(&v.position),
                normal: model
                    .transform_vector(&v.normal)
                    .try_normalize(1e-12)
                    .unwrap_or_else(Vector3::zeros),
            }),
        }
    }

    /// Build a flat-shaded triangle whose vertex normals are the face normal.
    pub fn flat(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        let mut triangle = Self::new(
            Vertex::at(a, Vector3::zeros()),
            Vertex::at(b, Vector3::zeros()),
            Vertex::at(c, Vector3::zeros()),
        );
        let normal = triangle.calculate_normal();
        for vertex in &mut triangle.vertices {
            vertex.normal = normal;
        }
        triangle
    }
}

/// Surface appearance of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Linear RGB in `[0, 1]`
    pub color: [f32; 3],
    pub opacity: f32,
    pub transparent: bool,
}

impl Material {
    pub fn solid(color: [f32; 3]) -> Self {
        Self {
            color,
            opacity: 1.0,
            transparent: false,
        }
    }

    pub fn white() -> Self {
        Self::solid([1.0, 1.0, 1.0])
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::white()
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
    pub material: Material,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
            material: Material::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
            material: Material::default(),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Force the mesh fully opaque.
    pub fn make_opaque(&mut self) {
        self.material.transparent = false;
        self.material.opacity = 1.0;
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut points = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| v.position));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }

    /// UV sphere centred on the origin.
    ///
    /// `width_segments` around the equator, `height_segments` from pole to pole.
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let point = |u: u32, v: u32| {
            let theta = v as f32 / height_segments as f32 * PI;
            let phi = u as f32 / width_segments as f32 * TAU;
            let normal = Vector3::new(
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            );
            Vertex::at(Point3::from(normal * radius), normal)
        };

        let mut mesh =
            Self::with_capacity(width_segments as usize * height_segments as usize * 2);
        for v in 0..height_segments {
            for u in 0..width_segments {
                let a = point(u, v);
                let b = point(u, v + 1);
                let c = point(u + 1, v + 1);
                let d = point(u + 1, v);
                // The pole rows collapse to a single triangle
                if v != 0 {
                    mesh.add_triangle(Triangle::new(a, b, d));
                }
                if v != height_segments - 1 {
                    mesh.add_triangle(Triangle::new(b, c, d));
                }
            }
        }
        mesh
    }

    /// Extruded five-pointed star, the stand-in for the floating star model.
    pub fn star(points: u32, outer: f32, inner: f32, depth: f32) -> Self {
        let points = points.max(3);
        let half = depth / 2.0;
        let rim: Vec<Point3<f32>> = (0..points * 2)
            .map(|i| {
                let angle = i as f32 / (points * 2) as f32 * TAU + PI / 2.0;
                let radius = if i % 2 == 0 { outer } else { inner };
                Point3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
            })
            .collect();
        let front = Point3::new(0.0, 0.0, half);
        let back = Point3::new(0.0, 0.0, -half);

        let mut mesh = Self::with_capacity(rim.len() * 2);
        for (i, a) in rim.iter().enumerate() {
            let b = rim[(i + 1) % rim.len()];
            mesh.add_triangle(Triangle::flat(*a, b, front));
            mesh.add_triangle(Triangle::flat(b, *a, back));
        }
        mesh.with_material(Material::solid([1.0, 0.85, 0.3]))
    }

    /// Stemmed flower: a ring of petals on a thin stalk.
    pub fn flower(petals: u32, petal_length: f32, stem_height: f32) -> Self {
        let petals = petals.max(3);
        let head = Point3::new(0.0, stem_height, 0.0);
        let mut mesh = Self::with_capacity(petals as usize * 2 + 4);

        for i in 0..petals {
            let angle = i as f32 / petals as f32 * TAU;
            let spread = PI / petals as f32;
            let left = angle - spread * 0.6;
            let right = angle + spread * 0.6;
            let tip = Point3::new(
                angle.cos() * petal_length,
                stem_height + petal_length * 0.2,
                angle.sin() * petal_length,
            );
            let l = Point3::new(
                left.cos() * petal_length * 0.5,
                stem_height,
                left.sin() * petal_length * 0.5,
            );
            let r = Point3::new(
                right.cos() * petal_length * 0.5,
                stem_height,
                right.sin() * petal_length * 0.5,
            );
            mesh.add_triangle(Triangle::flat(head, l, tip));
            mesh.add_triangle(Triangle::flat(head, tip, r));
        }

        let w = petal_length * 0.05;
        let base = [Point3::new(-w, 0.0, 0.0), Point3::new(w, 0.0, 0.0)];
        let top = [Point3::new(-w, stem_height, 0.0), Point3::new(w, stem_height, 0.0)];
        mesh.add_triangle(Triangle::flat(base[0], base[1], top[1]));
        mesh.add_triangle(Triangle::flat(base[0], top[1], top[0]));

        mesh.with_material(Material::solid([0.9, 0.4, 0.7]))
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = Mesh::uv_sphere(0.25, 24, 24);
        assert!(!sphere.triangles.is_empty());
        for triangle in &sphere.triangles {
            for vertex in &triangle.vertices {
                let r = vertex.position.coords.norm();
                assert!((r - 0.25).abs() < 1e-5, "radius {}", r);
            }
        }
    }

    #[test]
    fn sphere_triangle_count() {
        // Two triangles per quad minus one per pole quad
        let sphere = Mesh::uv_sphere(1.0, 8, 4);
        assert_eq!(sphere.triangles.len(), 8 * 4 * 2 - 8 * 2);
    }

    #[test]
    fn degenerate_triangle_normal_is_zero() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let t = Triangle::flat(p, p, p);
        assert_eq!(t.calculate_normal(), Vector3::zeros());
    }

    #[test]
    fn star_bounds_match_outer_radius() {
        let star = Mesh::star(5, 1.0, 0.4, 0.2);
        let (min, max) = star.bounds().unwrap();
        assert!((max.y - 1.0).abs() < 1e-5);
        assert!((max.z - 0.1).abs() < 1e-5);
        assert!((min.z + 0.1).abs() < 1e-5);
    }

    #[test]
    fn make_opaque_resets_transparency() {
        let mut mesh = Mesh::flower(6, 1.0, 2.0);
        mesh.material.transparent = true;
        mesh.material.opacity = 0.3;
        mesh.make_opaque();
        assert!(!mesh.material.transparent);
        assert_eq!(mesh.material.opacity, 1.0);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(Mesh::new().bounds().is_none());
    }

    #[test]
    fn transformed_triangle_moves_into_world() {
        let t = Triangle::flat(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let model = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)) * Matrix4::new_scaling(2.0);
        let world = t.transformed(&model);
        assert_eq!(world.vertices[1].position, Point3::new(12.0, 0.0, 0.0));
        assert_eq!(world.calculate_normal(), Vector3::z());
        assert!((world.centroid() - Point3::new(10.0 + 2.0 / 3.0, 2.0 / 3.0, 0.0)).norm() < 1e-5);
    }
}
