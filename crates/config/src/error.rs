use std::fmt;
use std::path::Path;

use permcascade_engine::EngineError;

#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read or written.
    Io { path: String, message: String },
    /// File was read but its contents are malformed.
    Parse { path: String, message: String },
    /// The engine rejected the parsed contents.
    Engine(EngineError),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, err: impl fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, err: impl fmt::Display) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "{path}: {message}"),
            Self::Parse { path, message } => write!(f, "{path}: parse error: {message}"),
            Self::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for ConfigError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}
