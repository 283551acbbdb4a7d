//! Pipeline error types.

use std::path::PathBuf;

use crate::build::format::FormatError;
use crate::build::render::RenderError;

/// Errors that can occur during pipeline processing.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("no content format handles '.{0}' files")]
    UnsupportedFormat(String),

    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("{path}: {stage}: {source}")]
    Document {
        path: String,
        stage: &'static str,
        source: Box<PipelineError>,
    },

    #[error("output path {} is produced by both {first} and {second}", path.display())]
    PathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Create a stage-specific error.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
