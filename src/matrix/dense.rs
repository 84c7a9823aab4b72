//! Dense staging buffers
//!
//! [`DenseMatrix`] is the full row-major n×n expansion of a packed matrix.
//! It is used transiently: as a staging area for device kernels that only
//! operate on full matrices, and as the interchange format with external
//! dense-matrix code. It never aliases packed storage.

use super::buffer::Buffer;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// Dense row-major matrix
pub struct DenseMatrix<R: Runtime> {
    buf: Buffer<R>,
    rows: usize,
    cols: usize,
    dtype: DType,
}

impl<R: Runtime> DenseMatrix<R> {
    /// Create a zero-filled rows×cols matrix (fallible version).
    pub fn try_zeros(rows: usize, cols: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        Ok(Self {
            buf: Buffer::new_zeroed(rows * cols, dtype, device)?,
            rows,
            cols,
            dtype,
        })
    }

    /// Create a zero-filled rows×cols matrix.
    pub fn zeros(rows: usize, cols: usize, dtype: DType, device: &R::Device) -> Self {
        Self::try_zeros(rows, cols, dtype, device).expect("DenseMatrix::zeros failed")
    }

    /// Create a matrix from row-major host data (fallible version).
    ///
    /// Returns `DimensionMismatch` if `data.len() != rows * cols`.
    pub fn try_from_slice<T: Element>(
        data: &[T],
        rows: usize,
        cols: usize,
        device: &R::Device,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::dim_mismatch(&[rows, cols], &[data.len()]));
        }
        Ok(Self {
            buf: Buffer::from_slice(data, device)?,
            rows,
            cols,
            dtype: T::DTYPE,
        })
    }

    /// Create a matrix from row-major host data.
    pub fn from_slice<T: Element>(
        data: &[T],
        rows: usize,
        cols: usize,
        device: &R::Device,
    ) -> Self {
        Self::try_from_slice(data, rows, cols, device).expect("DenseMatrix::from_slice failed")
    }

    /// Number of rows
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Device holding the buffer
    #[inline]
    pub fn device(&self) -> &R::Device {
        self.buf.device()
    }

    /// Raw device pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.buf.ptr()
    }

    /// Copy the matrix to a row-major host vector.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        assert_eq!(T::DTYPE, self.dtype, "element type mismatch");
        self.buf
            .to_vec()
            .expect("device read failed in DenseMatrix::to_vec")
    }

    /// Overwrite the matrix with row-major host data of the same size.
    pub fn copy_from_slice<T: Element>(&mut self, data: &[T]) -> Result<()> {
        assert_eq!(T::DTYPE, self.dtype, "element type mismatch");
        if data.len() != self.rows * self.cols {
            return Err(Error::dim_mismatch(
                &[self.rows, self.cols],
                &[data.len()],
            ));
        }
        self.buf.write_slice(data)
    }
}

impl<R: Runtime> std::fmt::Debug for DenseMatrix<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("dtype", &self.dtype)
            .finish()
    }
}

/// Dense vector, used by the rank-1 symmetric update
pub struct DenseVector<R: Runtime> {
    buf: Buffer<R>,
    len: usize,
    dtype: DType,
}

impl<R: Runtime> DenseVector<R> {
    /// Create a zero-filled vector of length `len` (fallible version).
    pub fn try_zeros(len: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        Ok(Self {
            buf: Buffer::new_zeroed(len, dtype, device)?,
            len,
            dtype,
        })
    }

    /// Create a zero-filled vector of length `len`.
    pub fn zeros(len: usize, dtype: DType, device: &R::Device) -> Self {
        Self::try_zeros(len, dtype, device).expect("DenseVector::zeros failed")
    }

    /// Create a vector from host data (fallible version).
    pub fn try_from_slice<T: Element>(data: &[T], device: &R::Device) -> Result<Self> {
        Ok(Self {
            buf: Buffer::from_slice(data, device)?,
            len: data.len(),
            dtype: T::DTYPE,
        })
    }

    /// Create a vector from host data.
    pub fn from_slice<T: Element>(data: &[T], device: &R::Device) -> Self {
        Self::try_from_slice(data, device).expect("DenseVector::from_slice failed")
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the vector has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Device holding the buffer
    #[inline]
    pub fn device(&self) -> &R::Device {
        self.buf.device()
    }

    /// Raw device pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.buf.ptr()
    }

    /// Copy the vector to a host vector.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        assert_eq!(T::DTYPE, self.dtype, "element type mismatch");
        self.buf
            .to_vec()
            .expect("device read failed in DenseVector::to_vec")
    }
}

impl<R: Runtime> std::fmt::Debug for DenseVector<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseVector")
            .field("len", &self.len)
            .field("dtype", &self.dtype)
            .finish()
    }
}
