//! Packed-matrix types and algorithms
//!
//! A symmetric or lower-triangular n×n matrix has only `n(n+1)/2` significant
//! entries. This module stores them contiguously ("packed" storage, the
//! LAPACK `sp`/`tp` layout) on either backend and layers two capability
//! wrappers on top:
//!
//! - [`SymmetricPacked`]: logical entry (r, c) equals (c, r); every stored
//!   off-diagonal entry represents two positions of the full matrix.
//! - [`TriangularPacked`]: a single lower-triangular factor; the upper
//!   triangle is implicitly zero.
//!
//! Both wrappers share one [`PackedStorage`] value type and delegate their
//! numeric operations to the backend client through [`PackedLinalg`].
//! [`DenseMatrix`] is the row-major staging buffer used where an operation's
//! device implementation only exists on full matrices.

mod buffer;
mod dense;
pub(crate) mod linalg;
mod storage;
mod symmetric;
mod triangular;

pub(crate) mod impl_generic;

pub(crate) use buffer::Buffer;

pub use dense::{DenseMatrix, DenseVector};
pub use linalg::{PackedLinalg, SpCopyType, Trans, trace_sp_sp};
pub use storage::{PackedStorage, ResizePolicy, packed_index, packed_len};
pub use symmetric::SymmetricPacked;
pub use triangular::TriangularPacked;
