//! Error types for patchgrid

use thiserror::Error;

/// Result type alias for patchgrid operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Corner quadrilateral cannot support a stable perspective transform
    #[error("Degenerate quadrilateral: {reason}")]
    DegenerateQuad { reason: String },

    /// A vector arrived with the wrong number of components
    #[error("Invalid dimensionality for {what}: expected {expected} components, got {actual}")]
    InvalidDimension {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Chart definition contains no patches")]
    EmptyChart,

    /// Normalized chart data outside the unit square
    #[error("Patch {patch}: {field} = {value} is outside [0, 1]")]
    PatchOutOfRange {
        patch: String,
        field: &'static str,
        value: f64,
    },

    #[error("Duplicate patch name: {0}")]
    DuplicatePatch(String),

    #[error("Unknown patch: {0}")]
    UnknownPatch(String),

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    /// Colour filter array description could not be interpreted
    #[error("Invalid CFA pattern: {0}")]
    InvalidPattern(String),

    /// Buffer length does not match the declared image geometry
    #[error("Image buffer mismatch: {0}")]
    ImageMismatch(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Error::DegenerateQuad {
            reason: reason.into(),
        }
    }

    pub fn dimension(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::InvalidDimension {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Whether the caller can keep its last good state and carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DegenerateQuad { .. } | Error::UnknownWorkflow(_))
    }
}
