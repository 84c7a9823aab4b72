//! CPU runtime implementation
//!
//! The CPU runtime uses standard heap allocation and provides the reference
//! implementation for all packed-matrix operations. Algorithms run directly
//! in the packed domain; no dense staging buffers are needed on this path.

mod client;
mod device;
mod packed;
mod runtime;

pub use client::CpuClient;
pub use device::CpuDevice;
pub use runtime::CpuRuntime;
