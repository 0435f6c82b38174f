// Top-level runtime error

use crate::config::ConfigError;
use crate::serial::SerialError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Zenoh error: {0}")]
    Zenoh(zenoh::Error),

    #[error(transparent)]
    Serial(#[from] SerialError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duty output closed")]
    OutputClosed,
}

// zenoh::Error is a boxed trait object, which thiserror cannot use as a source
impl From<zenoh::Error> for RuntimeError {
    fn from(e: zenoh::Error) -> Self {
        RuntimeError::Zenoh(e)
    }
}
