//! CUDA kernel infrastructure for packed operations
//!
//! - `loader`: PTX module loading, caching, and launch configuration
//! - `packed`: type-safe launchers for the packed-matrix kernels

pub mod loader;
mod packed;

pub use packed::*;
