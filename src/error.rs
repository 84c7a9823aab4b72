//! Error types for packr

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using packr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in packr operations
///
/// Dimension and dtype mismatches are programming defects; callers inside
/// tight numerical loops are expected to treat them as fatal rather than
/// recover with partially-updated matrix state.
#[derive(Error, Debug)]
pub enum Error {
    /// Operand dimensions disagree
    #[error("Dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: Vec<usize>,
        /// Actual dimensions
        got: Vec<usize>,
    },

    /// DType mismatch between operands
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Backend failure detected at a synchronization point
    #[error("Backend error: {0}")]
    Backend(String),

    /// CUDA-specific error
    #[cfg(feature = "cuda")]
    #[error("CUDA error: {0}")]
    Cuda(#[from] cudarc::driver::DriverError),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a dimension mismatch error
    pub fn dim_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}
