/// Asynchronous model and background loading.
///
/// Each request runs on its own worker thread and reports back through a
/// one-shot channel. The frame loop polls [`PendingAsset::try_take`] and
/// never blocks. On wasm there are no threads, so loads resolve inline.
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::config::{BuiltinModel, ModelSource};
use crate::error::AssetError;
use crate::geometry::Mesh;
use crate::scene::Background;
use crate::stl;

/// A model that finished loading
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub mesh: Mesh,
}

/// Result of a load that may still be in flight
#[derive(Debug)]
pub struct PendingAsset<T> {
    label: String,
    rx: Receiver<Result<T, AssetError>>,
    finished: bool,
}

impl<T> PendingAsset<T> {
    /// An asset whose result is already known.
    pub fn ready(label: impl Into<String>, result: Result<T, AssetError>) -> Self {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(result);
        Self {
            label: label.into(),
            rx,
            finished: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the result if the load has completed. Yields a result at most once.
    pub fn try_take(&mut self) -> Option<Result<T, AssetError>> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(Err(AssetError::WorkerLost(self.label.clone())))
            }
        }
    }

    /// Block until the load completes.
    pub fn wait(mut self) -> Result<T, AssetError> {
        if self.finished {
            return Err(AssetError::WorkerLost(self.label.clone()));
        }
        self.finished = true;
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(AssetError::WorkerLost(self.label.clone())))
    }
}

/// Issues asset loads
#[derive(Debug, Clone, Copy)]
pub struct AssetLoader {
    inline: bool,
}

impl AssetLoader {
    /// Loader that runs each request on a worker thread.
    pub fn threaded() -> Self {
        Self {
            inline: cfg!(target_arch = "wasm32"),
        }
    }

    /// Loader that resolves every request before returning.
    pub fn inline() -> Self {
        Self { inline: true }
    }

    pub fn load_model(&self, name: impl Into<String>, source: ModelSource) -> PendingAsset<LoadedModel> {
        let name = name.into();
        let label = format!("{name} ({})", source.describe());
        self.spawn(label, move || {
            let mesh = load_model_source(&source)?;
            Ok(LoadedModel { name, mesh })
        })
    }

    pub fn load_background(&self, path: PathBuf) -> PendingAsset<Background> {
        let label = path.display().to_string();
        self.spawn(label, move || load_background_file(&path))
    }

    fn spawn<T, F>(&self, label: String, job: F) -> PendingAsset<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AssetError> + Send + 'static,
    {
        if self.inline {
            return PendingAsset::ready(label, job());
        }

        let (tx, rx) = mpsc::channel();
        tracing::debug!("loading {label}");
        let spawned = std::thread::Builder::new()
            .name(format!("asset:{label}"))
            .spawn(move || {
                let _ = tx.send(job());
            });
        if let Err(e) = spawned {
            tracing::warn!("could not start asset worker for {label}: {e}");
        }
        // A failed spawn drops the sender, which try_take reports as WorkerLost
        PendingAsset {
            label,
            rx,
            finished: false,
        }
    }
}

/// Load a model synchronously.
pub fn load_model_source(source: &ModelSource) -> Result<Mesh, AssetError> {
    match source {
        ModelSource::Builtin(model) => Ok(builtin_mesh(*model)),
        ModelSource::Path(path) => {
            let data = std::fs::read(path).map_err(|source| AssetError::Io {
                path: path.clone(),
                source,
            })?;
            load_model_bytes(&path.display().to_string(), &data)
        }
    }
}

/// Parse STL bytes supplied by the host.
pub fn load_model_bytes(name: &str, data: &[u8]) -> Result<Mesh, AssetError> {
    stl::parse_stl(data).map_err(|source| AssetError::Parse {
        name: name.to_string(),
        source,
    })
}

/// Resolve a built-in model by its config name.
pub fn builtin_by_name(name: &str) -> Result<Mesh, AssetError> {
    match name {
        "star" => Ok(builtin_mesh(BuiltinModel::Star)),
        "flower" => Ok(builtin_mesh(BuiltinModel::Flower)),
        other => Err(AssetError::UnknownBuiltin(other.to_string())),
    }
}

pub fn builtin_mesh(model: BuiltinModel) -> Mesh {
    match model {
        BuiltinModel::Star => Mesh::star(5, 1.0, 0.45, 0.35),
        BuiltinModel::Flower => Mesh::flower(8, 0.8, 1.5),
    }
}

pub fn load_background_file(path: &Path) -> Result<Background, AssetError> {
    let data = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_background(path, &data)
}

/// Decode PNG or JPEG bytes into an RGB background.
pub fn decode_background(path: &Path, data: &[u8]) -> Result<Background, AssetError> {
    let image = image::load_from_memory(data)
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = image.dimensions();
    let pixels = image.pixels().map(|p| p.0).collect();
    Ok(Background {
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_loads_through_worker() {
        let loader = AssetLoader::threaded();
        let pending = loader.load_model("star", ModelSource::Builtin(BuiltinModel::Star));
        let model = pending.wait().unwrap();
        assert_eq!(model.name, "star");
        assert!(!model.mesh.triangles.is_empty());
    }

    #[test]
    fn result_is_taken_once() {
        let mut pending = AssetLoader::inline()
            .load_model("flower", ModelSource::Builtin(BuiltinModel::Flower));
        assert!(matches!(pending.try_take(), Some(Ok(_))));
        assert!(pending.is_finished());
        assert!(pending.try_take().is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut pending = AssetLoader::inline().load_model(
            "flower",
            ModelSource::Path(PathBuf::from("/no/such/flower.stl")),
        );
        match pending.try_take() {
            Some(Err(AssetError::Io { path, .. })) => {
                assert_eq!(path, PathBuf::from("/no/such/flower.stl"))
            }
            other => panic!("expected io error, got {:?}", other.map(|r| r.is_ok())),
        }
    }

    #[test]
    fn unknown_builtin() {
        assert!(matches!(
            builtin_by_name("comet"),
            Err(AssetError::UnknownBuiltin(_))
        ));
        assert!(builtin_by_name("flower").is_ok());
    }

    #[test]
    fn garbage_background_fails_to_decode() {
        let err = decode_background(Path::new("bg.jpg"), b"not an image").unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }
}
