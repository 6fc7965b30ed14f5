use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipError {
    #[error("Failed to generate thumbnail for '{path}': {message}")]
    GenerationFailed { path: PathBuf, message: String },

    #[error("Failed to decode thumbnail '{path}': {source}")]
    DecodeFailed {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Thumbnail file does not exist: {0}")]
    ThumbnailMissing(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to probe '{path}': {message}")]
    ProbeFailed { path: PathBuf, message: String },

    #[error("Failed to read sidecar '{path}': {source}")]
    SidecarRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write sidecar '{path}': {source}")]
    SidecarWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("End time must be greater than start time (start {start:.2}s, end {end:.2}s)")]
    InvalidTrimRange { start: f64, end: f64 },

    #[error("Failed to export '{path}': {message}")]
    ExportFailed { path: PathBuf, message: String },

    #[error("Library path does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("No clips found in library")]
    NoClips,
}

impl ClipError {
    /// Cancellation is an expected outcome, not a failure worth reporting.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClipError::Cancelled)
    }
}
