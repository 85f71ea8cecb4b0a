//! Typed errors for layer loading.
//!
//! Everything downstream of the loader propagates `anyhow::Error`; only the
//! file-level failures get a dedicated type so callers can tell "the input is
//! missing or unreadable" apart from a computation failure.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("layer file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("cannot parse layer {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("unsupported layer format for {path} (expected .geojson, .json or .shp)")]
    UnsupportedFormat { path: PathBuf },

    #[error("unsupported geometry type {kind} in {path}")]
    UnsupportedGeometry { path: PathBuf, kind: String },
}

impl LoadError {
    pub fn parse(path: &Path, reason: impl std::fmt::Display) -> Self {
        LoadError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported_geometry(path: &Path, kind: impl Into<String>) -> Self {
        LoadError::UnsupportedGeometry {
            path: path.to_path_buf(),
            kind: kind.into(),
        }
    }
}
