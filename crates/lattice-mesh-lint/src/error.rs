//! Error types for the CLI

use std::path::PathBuf;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: lattice_mesh_validation::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{count} DestinationRules share a host and subset with another rule")]
    Findings { count: usize },
}

impl Error {
    pub fn read_manifest(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ReadManifest {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_manifest(
        path: impl Into<PathBuf>,
        source: lattice_mesh_validation::Error,
    ) -> Self {
        Error::InvalidManifest {
            path: path.into(),
            source,
        }
    }
}
