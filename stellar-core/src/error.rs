/// Error types shared across the scene crates
use std::path::PathBuf;

/// Failure while decoding an STL model.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("unexpected end of file in triangle {index} of {declared}")]
    Truncated { index: usize, declared: usize },

    #[error("malformed ASCII STL: {0}")]
    Ascii(String),
}

/// Failure while loading a model or background image.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unknown built-in model: {0}")]
    UnknownBuiltin(String),

    #[error("asset worker for {0} exited without a result")]
    WorkerLost(String),
}

/// Failure while reading or validating the scene configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Failure in the application context lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("application context has been shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::Truncated {
            index: 3,
            declared: 10,
        };
        assert_eq!(err.to_string(), "unexpected end of file in triangle 3 of 10");
    }

    #[test]
    fn app_error_wraps_config_error() {
        let err: AppError = ConfigError::Validation("fps must be positive".into()).into();
        assert_eq!(
            err.to_string(),
            "config validation error: fps must be positive"
        );
    }
}
