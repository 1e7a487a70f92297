/// Random field of small white spheres around the origin
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::geometry::{Material, Mesh};
use crate::scene::{NodeKind, SceneNode};
use crate::transform::NodeTransform;

/// Starfield generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarfieldParams {
    pub count: usize,
    /// Edge length of the cube the stars are spread across
    pub spread: f32,
    pub radius: f32,
    pub segments: u32,
    pub seed: u64,
}

impl Default for StarfieldParams {
    fn default() -> Self {
        Self {
            count: 200,
            spread: 100.0,
            radius: 0.25,
            segments: 24,
            seed: 0x5747_4152,
        }
    }
}

/// Uniform float in `[-spread / 2, spread / 2]`.
fn rand_float_spread<R: Rng>(rng: &mut R, spread: f32) -> f32 {
    if !(spread > 0.0 && spread.is_finite()) {
        return 0.0;
    }
    rng.gen_range(-spread / 2.0..=spread / 2.0)
}

/// Star positions for the given parameters; the same seed yields the same field.
pub fn star_positions(params: &StarfieldParams) -> Vec<Point3<f32>> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    (0..params.count)
        .map(|_| {
            let x = rand_float_spread(&mut rng, params.spread);
            let y = rand_float_spread(&mut rng, params.spread);
            let z = rand_float_spread(&mut rng, params.spread);
            Point3::new(x, y, z)
        })
        .collect()
}

/// Scene nodes for the starfield, all sharing one sphere mesh.
pub fn generate(params: &StarfieldParams) -> Vec<SceneNode> {
    let mesh = Arc::new(
        Mesh::uv_sphere(params.radius, params.segments, params.segments)
            .with_material(Material::white()),
    );
    star_positions(params)
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            SceneNode::new(format!("starfield-{i}"), NodeKind::StarfieldPoint, mesh.clone())
                .with_transform(NodeTransform::at(p.x, p.y, p.z))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let params = StarfieldParams::default();
        assert_eq!(star_positions(&params), star_positions(&params));

        let other = StarfieldParams {
            seed: params.seed + 1,
            ..params
        };
        assert_ne!(star_positions(&params), star_positions(&other));
    }

    #[test]
    fn stars_stay_inside_spread_cube() {
        let params = StarfieldParams::default();
        let positions = star_positions(&params);
        assert_eq!(positions.len(), 200);
        for p in positions {
            for c in [p.x, p.y, p.z] {
                assert!((-50.0..=50.0).contains(&c), "component {} out of range", c);
            }
        }
    }

    #[test]
    fn nodes_share_mesh() {
        let nodes = generate(&StarfieldParams {
            count: 3,
            ..Default::default()
        });
        assert_eq!(nodes.len(), 3);
        assert!(Arc::ptr_eq(&nodes[0].mesh, &nodes[2].mesh));
        assert!(nodes.iter().all(|n| n.kind == NodeKind::StarfieldPoint));
    }

    #[test]
    fn zero_spread_collapses_to_origin() {
        let positions = star_positions(&StarfieldParams {
            count: 4,
            spread: 0.0,
            ..Default::default()
        });
        assert!(positions.iter().all(|p| *p == Point3::origin()));
    }

    #[test]
    fn non_finite_spread_collapses_to_origin() {
        for spread in [f32::NAN, f32::INFINITY] {
            let positions = star_positions(&StarfieldParams {
                count: 2,
                spread,
                ..Default::default()
            });
            assert!(positions.iter().all(|p| *p == Point3::origin()));
        }
    }
}
