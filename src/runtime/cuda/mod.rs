//! CUDA runtime implementation
//!
//! GPU backend built on cudarc with native packed-matrix kernels compiled
//! from `kernels/packed.cu` by build.rs. Clients are cached per device so a
//! context and stream are created once; all kernels for a device launch on
//! that client's stream.
//!
//! Factorization and inversion run directly in the packed domain on the
//! device. The scalar reductions fall back to the host over a single
//! buffer read, which keeps their arithmetic identical to the CPU backend.

mod cache;
mod client;
mod device;
mod packed;
mod runtime;

pub(crate) mod kernels;

pub use client::CudaClient;
pub use device::{CudaDevice, CudaError};
pub use runtime::{CudaRuntime, cuda_device, is_cuda_available};
