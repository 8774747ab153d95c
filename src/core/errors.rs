//! Error types for the translation pipeline.
//!
//! A single enum covers every failure kind the pipeline can surface. The
//! policy is deliberately coarse: no per-region recovery, any component
//! failure aborts the current run and reaches the caller as one
//! human-readable message. The two exceptions are font embedding (which
//! degrades to a standard font with a warning, handled inside the writer)
//! and cancellation, which gets a dedicated variant so callers can tell it
//! apart from genuine errors.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Errors that can occur during a translation run.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The settings name an unknown translator, provider, or model.
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// What was wrong with the configuration.
        message: String,
    },

    /// A required asset (model or font) is missing or unreadable.
    #[error("asset unavailable: {path}: {reason}")]
    AssetMissing {
        /// Path that could not be used.
        path: String,
        /// Why the asset could not be loaded.
        reason: String,
    },

    /// A page could not be rasterized.
    #[error("failed to render page {page}: {message}")]
    RenderFailed {
        /// One-based page number.
        page: usize,
        /// Renderer diagnostic.
        message: String,
    },

    /// The layout model could not be run or its output could not be decoded.
    #[error("layout inference failed: {message}")]
    InferenceFailed {
        /// Inference diagnostic.
        message: String,
    },

    /// The embedded text layer could not be read.
    #[error("text extraction failed: {message}")]
    ExtractionFailed {
        /// Extraction diagnostic.
        message: String,
    },

    /// A translation call failed (network, auth, rate limit, empty response).
    #[error("translation failed: {message}")]
    TranslationFailed {
        /// Translator diagnostic.
        message: String,
    },

    /// The output PDF could not be serialized.
    #[error("failed to write output PDF: {message}")]
    WriteFailed {
        /// Writer diagnostic.
        message: String,
    },

    /// The run was aborted by the caller.
    #[error("translation cancelled")]
    Cancelled,

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor shape operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Creates an asset error for a path that could not be loaded.
    pub fn asset(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetMissing {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a translation error.
    pub fn translation(message: impl Into<String>) -> Self {
        Self::TranslationFailed {
            message: message.into(),
        }
    }

    /// True when the run ended because the caller set the abort flag.
    ///
    /// UI layers use this to suppress the error banner a genuine failure
    /// would raise.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<lopdf::Error> for TranslateError {
    fn from(error: lopdf::Error) -> Self {
        Self::WriteFailed {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_distinguishable() {
        assert!(TranslateError::Cancelled.is_cancelled());
        assert!(!TranslateError::config("bad provider").is_cancelled());
    }

    #[test]
    fn messages_are_single_line() {
        let err = TranslateError::RenderFailed {
            page: 3,
            message: "bitmap allocation failed".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to render page 3: bitmap allocation failed"
        );
    }
}
