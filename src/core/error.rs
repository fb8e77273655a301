//! Error types for the Isoterra engine

use thiserror::Error;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("Terrain error: {0}")]
    Terrain(String),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
