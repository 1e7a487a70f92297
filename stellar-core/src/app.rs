/// Application context: owns the scene, camera and controls, and advances
/// them one frame at a time.
///
/// Hosts create one [`AppContext`], call [`AppContext::tick`] from their
/// frame loop, draw the scene, and call [`AppContext::shutdown`] on exit.
use nalgebra::Point3;
use std::sync::Arc;

use crate::assets::{AssetLoader, LoadedModel, PendingAsset};
use crate::config::SceneConfig;
use crate::controls::OrbitControls;
use crate::error::AppError;
use crate::geometry::Mesh;
use crate::overlay::{OverlayAnchor, OverlayButton};
use crate::projection::{Camera, Viewport};
use crate::scene::{Background, NodeId, NodeKind, Scene, SceneNode};
use crate::starfield;
use crate::transform::NodeTransform;

/// Name of the star node
pub const STAR_NODE: &str = "star";

/// Which configured model a load fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSlot {
    Star,
    Flowers,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Star,
    Flower(usize),
}

impl Placement {
    fn slot(&self) -> ModelSlot {
        match self {
            Placement::Star => ModelSlot::Star,
            Placement::Flower(_) => ModelSlot::Flowers,
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub frame: u64,
    /// Present once the star has loaded
    pub overlay: Option<OverlayAnchor>,
    pub camera_moved: bool,
    /// Names of nodes attached this frame
    pub attached: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    ShutDown,
}

/// Everything one running scene needs
pub struct AppContext {
    config: SceneConfig,
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    pending_models: Vec<(Placement, PendingAsset<LoadedModel>)>,
    pending_background: Option<PendingAsset<Background>>,
    star: Option<NodeId>,
    overlay: Option<OverlayButton>,
    frame: u64,
    lifecycle: Lifecycle,
}

impl AppContext {
    /// Build the static scene and start loading models and the background.
    pub fn init(config: SceneConfig, loader: &AssetLoader, viewport: Viewport) -> Result<Self, AppError> {
        config.validate()?;

        let mut camera = Camera::new(viewport.width as u32, viewport.height as u32);
        let [x, y, z] = config.camera.position;
        camera.position = Point3::new(x, y, z);
        camera.fov = config.camera.fov_degrees.to_radians();
        camera.near = config.camera.near;
        camera.far = config.camera.far;
        camera.set_viewport(&viewport);

        let controls = OrbitControls::new(&camera)
            .with_distance_limits(config.camera.min_distance, config.camera.max_distance)
            .with_damping(config.camera.damping);

        let mut scene = Scene::new();
        scene.lighting = config.lighting.lighting();
        scene.grid = config.lighting.grid();
        scene.show_light_marker = config.lighting.show_light_marker;
        for node in starfield::generate(&config.starfield.params()) {
            scene.add_node(node);
        }

        let mut pending_models = vec![(
            Placement::Star,
            loader.load_model(STAR_NODE, config.star.model.clone()),
        )];
        for i in 0..config.flowers.positions.len() {
            pending_models.push((
                Placement::Flower(i),
                loader.load_model(format!("flower-{i}"), config.flowers.model.clone()),
            ));
        }
        let pending_background = config
            .background
            .clone()
            .map(|path| loader.load_background(path));

        tracing::info!(
            "scene initialised with {} starfield points, {} model loads pending",
            scene.len(),
            pending_models.len()
        );

        Ok(Self {
            config,
            scene,
            camera,
            controls,
            pending_models,
            pending_background,
            star: None,
            overlay: None,
            frame: 0,
            lifecycle: Lifecycle::Running,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn overlay_button(&self) -> Option<&OverlayButton> {
        self.overlay.as_ref()
    }

    pub fn star(&self) -> Option<&SceneNode> {
        self.star.and_then(|id| self.scene.node(id))
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Number of model loads still in flight.
    pub fn pending_loads(&self) -> usize {
        self.pending_models.len() + usize::from(self.pending_background.is_some())
    }

    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.camera.set_viewport(viewport);
    }

    pub fn orbit(&mut self, d_azimuth: f32, d_polar: f32) {
        self.controls.rotate(d_azimuth, d_polar);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.controls.zoom(factor);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.controls.pan(dx, dy, &self.camera);
    }

    pub fn reset_view(&mut self) {
        self.controls.reset(&mut self.camera);
    }

    /// Fill a model slot directly, cancelling any load still pending for it.
    ///
    /// Used by hosts that fetch model bytes themselves.
    pub fn provide_model(&mut self, slot: ModelSlot, mesh: Mesh) -> Vec<String> {
        let placements: Vec<Placement> = match slot {
            ModelSlot::Star => vec![Placement::Star],
            ModelSlot::Flowers => (0..self.config.flowers.positions.len())
                .map(Placement::Flower)
                .collect(),
        };
        self.pending_models.retain(|(p, _)| p.slot() != slot);

        let mesh = Arc::new(mesh);
        placements
            .into_iter()
            .filter_map(|placement| self.attach(placement, mesh.clone()))
            .collect()
    }

    pub fn provide_background(&mut self, background: Background) {
        self.pending_background = None;
        self.scene.background = Some(background);
    }

    /// Advance one frame.
    pub fn tick(&mut self, viewport: &Viewport) -> Result<FrameOutput, AppError> {
        if self.lifecycle == Lifecycle::ShutDown {
            return Err(AppError::ShutDown);
        }

        let attached = self.poll_loads();

        if let Some(star) = self.star.and_then(|id| self.scene.node_mut(id)) {
            let step = self.config.star.rotation_step;
            star.transform.rotation.rotate(step, step, step);
        }

        self.camera.set_viewport(viewport);
        let camera_moved = self.controls.update(&mut self.camera);

        let overlay = self.overlay_anchor(viewport);

        self.frame += 1;
        Ok(FrameOutput {
            frame: self.frame,
            overlay,
            camera_moved,
            attached,
        })
    }

    /// Anchor of the overlay button for the current camera, if the star exists.
    pub fn overlay_anchor(&self, viewport: &Viewport) -> Option<OverlayAnchor> {
        let button = self.overlay.as_ref()?;
        let star = self.star()?;
        Some(button.anchor(&star.world_position(), &self.camera, viewport))
    }

    /// Drop pending loads and the scene. Further ticks fail.
    pub fn shutdown(&mut self) {
        if self.lifecycle == Lifecycle::ShutDown {
            return;
        }
        let abandoned = self.pending_loads();
        self.pending_models.clear();
        self.pending_background = None;
        self.scene.clear();
        self.star = None;
        self.overlay = None;
        self.lifecycle = Lifecycle::ShutDown;
        tracing::info!(
            "scene shut down after {} frames ({abandoned} loads abandoned)",
            self.frame
        );
    }

    fn poll_loads(&mut self) -> Vec<String> {
        let mut completed = Vec::new();
        self.pending_models.retain_mut(|(placement, pending)| match pending.try_take() {
            None => true,
            Some(result) => {
                completed.push((*placement, pending.label().to_string(), result));
                false
            }
        });

        let mut attached = Vec::new();
        for (placement, label, result) in completed {
            match result {
                Ok(model) => {
                    tracing::debug!("{label}: {} triangles", model.mesh.triangles.len());
                    if let Some(name) = self.attach(placement, Arc::new(model.mesh)) {
                        attached.push(name);
                    }
                }
                Err(e) => tracing::warn!("model load {label} failed: {e}"),
            }
        }

        if let Some(result) = self.pending_background.as_mut().and_then(|p| p.try_take()) {
            self.pending_background = None;
            match result {
                Ok(background) => {
                    tracing::info!(
                        "background loaded ({}x{})",
                        background.width,
                        background.height
                    );
                    self.scene.background = Some(background);
                }
                Err(e) => tracing::warn!("background load failed: {e}"),
            }
        }

        attached
    }

    fn attach(&mut self, placement: Placement, mesh: Arc<Mesh>) -> Option<String> {
        match placement {
            Placement::Star => {
                let [x, y, z] = self.config.star.position;
                let transform = NodeTransform::at(x, y, z).with_uniform_scale(self.config.star.scale);
                let node = SceneNode::new(STAR_NODE, NodeKind::Star, mesh).with_transform(transform);
                match self.star {
                    Some(id) => {
                        if let Some(existing) = self.scene.node_mut(id) {
                            let rotation = existing.transform.rotation;
                            *existing = node;
                            existing.transform.rotation = rotation;
                        }
                    }
                    None => self.star = Some(self.scene.add_node(node)),
                }
                if self.overlay.is_none() {
                    self.overlay = Some(OverlayButton::from_config(&self.config.overlay));
                }
                tracing::info!("star attached");
                Some(STAR_NODE.to_string())
            }
            Placement::Flower(i) => {
                let [x, y, z] = *self.config.flowers.positions.get(i)?;
                let mut mesh = Arc::unwrap_or_clone(mesh);
                mesh.make_opaque();
                let name = format!("flower-{i}");
                let transform = NodeTransform::at(x, y, z).with_uniform_scale(self.config.flowers.scale);
                let node = SceneNode::new(name.clone(), NodeKind::Flower, Arc::new(mesh))
                    .with_transform(transform);
                match self.scene.find_by_name(&name).and_then(|id| self.scene.node_mut(id)) {
                    Some(existing) => *existing = node,
                    None => {
                        self.scene.add_node(node);
                    }
                }
                tracing::info!("{name} attached at ({x}, {y}, {z})");
                Some(name)
            }
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuiltinModel, ModelSource};
    use crate::error::ConfigError;
    use std::path::PathBuf;

    fn small_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.starfield.count = 10;
        config.starfield.segments = 4;
        config
    }

    fn viewport() -> Viewport {
        Viewport::new(800, 600)
    }

    #[test]
    fn first_tick_attaches_inline_models() {
        let mut app = AppContext::init(small_config(), &AssetLoader::inline(), viewport()).unwrap();
        assert_eq!(app.pending_loads(), 4);

        let out = app.tick(&viewport()).unwrap();
        assert_eq!(out.frame, 1);
        assert_eq!(out.attached.len(), 4);
        assert_eq!(app.pending_loads(), 0);
        assert_eq!(app.scene().nodes_of_kind(NodeKind::Flower).count(), 3);
        assert!(app.star().is_some());
        assert!(out.overlay.unwrap().visible);
    }

    #[test]
    fn star_rotation_grows_by_step_per_tick() {
        let mut app = AppContext::init(small_config(), &AssetLoader::inline(), viewport()).unwrap();
        for _ in 0..10 {
            app.tick(&viewport()).unwrap();
        }
        let rotation = app.star().unwrap().transform.rotation;
        assert!((rotation.x - 0.05).abs() < 1e-5);
        assert!((rotation.y - 0.05).abs() < 1e-5);
        assert!((rotation.z - 0.05).abs() < 1e-5);
    }

    #[test]
    fn no_overlay_until_star_loads() {
        let mut config = small_config();
        config.star.model = ModelSource::Path(PathBuf::from("/missing/star.stl"));
        let mut app = AppContext::init(config, &AssetLoader::inline(), viewport()).unwrap();
        let out = app.tick(&viewport()).unwrap();
        assert!(out.overlay.is_none());
        assert_eq!(out.attached.len(), 3);

        let attached = app.provide_model(ModelSlot::Star, Mesh::star(5, 1.0, 0.5, 0.2));
        assert_eq!(attached, vec![STAR_NODE.to_string()]);
        assert!(app.tick(&viewport()).unwrap().overlay.is_some());
    }

    #[test]
    fn flowers_are_scaled_and_opaque() {
        let mut config = small_config();
        config.flowers.model = ModelSource::Builtin(BuiltinModel::Flower);
        let mut app = AppContext::init(config, &AssetLoader::inline(), viewport()).unwrap();
        app.tick(&viewport()).unwrap();
        let flower = app.scene().nodes_of_kind(NodeKind::Flower).next().unwrap();
        assert_eq!(flower.transform.scale.x, 5.0);
        assert_eq!(flower.mesh.material.opacity, 1.0);
        assert!(!flower.mesh.material.transparent);
    }

    #[test]
    fn orbit_moves_overlay() {
        let mut app = AppContext::init(small_config(), &AssetLoader::inline(), viewport()).unwrap();
        let before = app.tick(&viewport()).unwrap().overlay.unwrap();
        app.orbit(0.0, 0.6);
        let out = app.tick(&viewport()).unwrap();
        assert!(out.camera_moved);
        assert_ne!(out.overlay.unwrap(), before);
    }

    #[test]
    fn tick_after_shutdown_fails() {
        let mut app = AppContext::init(small_config(), &AssetLoader::inline(), viewport()).unwrap();
        app.tick(&viewport()).unwrap();
        app.shutdown();
        assert!(!app.is_running());
        assert!(app.scene().is_empty());
        assert!(matches!(app.tick(&viewport()), Err(AppError::ShutDown)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = small_config();
        config.frame.fps = 0;
        assert!(matches!(
            AppContext::init(config, &AssetLoader::inline(), viewport()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn provided_flowers_replace_pending_loads() {
        let mut app = AppContext::init(small_config(), &AssetLoader::inline(), viewport()).unwrap();
        assert_eq!(app.pending_loads(), 4);

        let mesh = Mesh::star(3, 1.0, 0.5, 0.2);
        let triangles = mesh.triangles.len();
        let attached = app.provide_model(ModelSlot::Flowers, mesh);
        assert_eq!(attached, vec!["flower-0", "flower-1", "flower-2"]);
        assert_eq!(app.pending_loads(), 1);

        // Only the star load is left to attach
        let out = app.tick(&viewport()).unwrap();
        assert_eq!(out.attached, vec![STAR_NODE.to_string()]);
        let flowers: Vec<_> = app.scene().nodes_of_kind(NodeKind::Flower).collect();
        assert_eq!(flowers.len(), 3);
        assert!(flowers.iter().all(|f| f.mesh.triangles.len() == triangles));

        // Providing again swaps in place
        app.provide_model(ModelSlot::Flowers, Mesh::flower(4, 1.0, 1.0));
        assert_eq!(app.scene().nodes_of_kind(NodeKind::Flower).count(), 3);
        assert!(app
            .scene()
            .nodes_of_kind(NodeKind::Flower)
            .all(|f| f.mesh.triangles.len() != triangles));
    }

    #[test]
    fn non_finite_config_is_rejected_before_building() {
        let mut config = small_config();
        config.starfield.spread = f32::NAN;
        assert!(matches!(
            AppContext::init(config, &AssetLoader::inline(), viewport()),
            Err(AppError::Config(ConfigError::Validation(_)))
        ));
    }
}
