//! # packr
//!
//! **Packed symmetric and triangular matrices with transparent CPU/CUDA dispatch.**
//!
//! packr stores the `n(n+1)/2` significant entries of an n×n symmetric or
//! triangular matrix in compact lower-triangular form and runs decomposition,
//! inversion, and scaled-update operations on either the host CPU or a CUDA
//! device - with numerically equivalent results on both paths.
//!
//! ## Why packr?
//!
//! - **Dual backend**: the same API runs on CPU and CUDA
//! - **No vendor lock-in**: native kernels, no cuSOLVER dependency
//! - **Packed storage**: half the memory of a dense symmetric matrix
//! - **Backend parity**: CPU and CUDA paths are tested against each other
//!
//! ## Features
//!
//! - **Symmetric matrices**: trace products, Frobenius norm, rank-1/rank-k
//!   updates, scaled addition, Cholesky-based inversion
//! - **Triangular matrices**: Cholesky factorization, in-place inversion,
//!   triangle extraction from dense sources
//! - **Dense staging**: row-major [`DenseMatrix`](matrix::DenseMatrix) for
//!   serialization and for device kernels that need full matrices
//! - **Two precisions**: f32 and f64, selected per matrix
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use packr::prelude::*;
//!
//! let device = CpuRuntime::default_device();
//! let client = CpuRuntime::default_client(&device);
//!
//! let a = DenseMatrix::<CpuRuntime>::from_slice(&[4.0f64, 2.0, 2.0, 3.0], 2, 2, &device);
//! let sp = SymmetricPacked::from_mat(&client, &a, SpCopyType::TakeLower)?;
//!
//! let mut l = TriangularPacked::new(2, DType::F64, &device);
//! client.tp_cholesky(&mut l, &sp)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cuda`: NVIDIA CUDA backend (the CPU backend is always available)
//! - `rayon` (default): multi-threaded host kernels

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dtype;
pub mod error;
pub mod matrix;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::DType;
    pub use crate::error::{Error, Result};
    pub use crate::matrix::{
        DenseMatrix, DenseVector, PackedLinalg, PackedStorage, ResizePolicy, SpCopyType,
        SymmetricPacked, Trans, TriangularPacked, trace_sp_sp,
    };
    pub use crate::runtime::{Device, Runtime, RuntimeClient};

    pub use crate::runtime::cpu::CpuRuntime;

    #[cfg(feature = "cuda")]
    pub use crate::runtime::cuda::CudaRuntime;
}

/// Default runtime based on enabled features
///
/// - With `cuda` feature: `CudaRuntime`
/// - Otherwise: `CpuRuntime`
#[cfg(feature = "cuda")]
pub type DefaultRuntime = runtime::cuda::CudaRuntime;

/// Default runtime based on enabled features
#[cfg(not(feature = "cuda"))]
pub type DefaultRuntime = runtime::cpu::CpuRuntime;
