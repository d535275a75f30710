use thiserror::Error;

/// Failure of an external detector for a single frame.
///
/// Always recovered locally: the frame is skipped and no state changes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("{detector} detector failed: {reason}")]
    Failed { detector: &'static str, reason: String },

    #[error("{detector} detector is not available")]
    Unavailable { detector: &'static str },
}

impl DetectionError {
    pub fn failed(detector: &'static str, reason: impl Into<String>) -> Self {
        DetectionError::Failed { detector, reason: reason.into() }
    }

    pub fn is_recoverable(&self) -> bool {
        // every detection failure degrades to "wait for the next frame"
        true
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("classifier failed: {0}")]
    Model(String),

    #[error("classifier returned unknown label: {0}")]
    UnknownLabel(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported config format: {path}")]
    UnsupportedFormat { path: String },

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn is_recoverable(&self) -> bool {
        // callers may fall back to the default config for anything but a bad value
        !matches!(self, ConfigError::Invalid { .. })
    }
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn frame worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("frame worker is not running")]
    Stopped,
}

/// Top-level error for the fallible entry points (config loading, runner start-up).
#[derive(Error, Debug)]
pub enum PongError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

impl PongError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            PongError::Config(err) => err.is_recoverable(),
            PongError::Runner(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PongError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DetectionError::failed("trajectory", "request timed out");
        assert_eq!(err.to_string(), "trajectory detector failed: request timed out");
        assert!(err.is_recoverable());

        let err = ClassificationError::UnknownLabel("sidearm".into());
        assert_eq!(err.to_string(), "classifier returned unknown label: sidearm");
    }

    #[test]
    fn test_config_error_recoverability() {
        let invalid = ConfigError::Invalid { field: "tracking.frame_limit", reason: "zero".into() };
        assert!(!invalid.is_recoverable());
        let missing =
            ConfigError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert!(missing.is_recoverable());
    }

    #[test]
    fn test_top_level_conversion() {
        let err: PongError = RunnerError::Stopped.into();
        assert_eq!(err.to_string(), "frame worker is not running");
        assert!(!err.is_recoverable());

        let err: PongError = ConfigError::UnsupportedFormat { path: "game.toml".into() }.into();
        assert!(err.is_recoverable());
    }
}
