//! Runtime backends for packed-matrix computation
//!
//! This module defines the `Runtime` trait and provides implementations
//! for the two compute backends (CPU, CUDA).
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies a specific GPU/CPU)
//! └── Client (dispatches operations, owns stream/context)
//! ```
//!
//! The backend is selected once, by type, when a matrix is constructed.
//! Every algorithm is written against the generic `Runtime`/`RuntimeClient`
//! seam, so there is no per-call "is the accelerator enabled" branch.

mod traits;

pub mod cpu;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use traits::{Device, Runtime, RuntimeClient};
