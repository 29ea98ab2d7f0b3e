//! Error types for split normal computation.
//!
//! Degenerate geometry is never an error here. Zero-length group normals are
//! written as `Vec3::ZERO` and counted in [`SplitNormals`](crate::SplitNormals);
//! only failures that invalidate a whole pass are surfaced.

use thiserror::Error;

/// Unified error type for the split normal engine.
#[derive(Debug, Error)]
pub enum NormalError {
    /// Merge distance is zero, negative or NaN.
    #[error("Invalid merge distance: {0} (must be greater than zero)")]
    InvalidMergeDistance(f32),

    /// A worker terminated before finishing its vertex range.
    #[error("Normal worker {worker} failed on vertices {start}..{end}")]
    WorkerFailed {
        worker: usize,
        start: usize,
        end: usize,
    },

    /// The pass was cancelled before every worker finished.
    #[error("Split normal computation cancelled")]
    Cancelled,

    /// A per-element layer does not fit the mesh it is used with.
    #[error("Layer `{layer}` has {found} entries but the mesh has {expected}")]
    LayerMismatch {
        layer: &'static str,
        expected: usize,
        found: usize,
    },

    /// Settings could not be parsed or serialized.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading or writing the settings file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, NormalError>`.
pub type NormalResult<T> = Result<T, NormalError>;
