/// Stellar Core Library - Scene, projection and frame logic
///
/// This library provides everything the hosts share: the scene graph, camera
/// and orbit controls, world-to-screen projection, STL model loading, the
/// starfield, overlay anchoring, and the application context that advances
/// the scene one frame at a time.

pub mod app;
pub mod assets;
pub mod config;
pub mod controls;
pub mod error;
pub mod frame_loop;
pub mod geometry;
pub mod lighting;
pub mod overlay;
pub mod projection;
pub mod scene;
pub mod starfield;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use app::{AppContext, FrameOutput, ModelSlot};
pub use assets::{AssetLoader, LoadedModel, PendingAsset};
pub use config::{BuiltinModel, ModelSource, SceneConfig};
pub use controls::OrbitControls;
pub use error::{AppError, AssetError, ConfigError, ParseError};
pub use frame_loop::{CancelToken, FrameLoop, FrameTick};
pub use geometry::{Material, Mesh, Triangle, Vertex};
pub use lighting::{GridHelper, Lighting};
pub use overlay::{OverlayAnchor, OverlayButton};
pub use projection::{project_to_screen, Camera, ScreenPoint, Viewport};
pub use scene::{Background, NodeId, NodeKind, Scene, SceneNode};
pub use transform::{NodeTransform, RotationState};
