//! Packed triangular storage: the shared representation of symmetric and
//! triangular matrices

use super::buffer::Buffer;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuRuntime;
use crate::runtime::Runtime;
use crate::dispatch_float;

/// Number of stored elements of an n×n packed matrix
#[inline]
pub const fn packed_len(num_rows: usize) -> usize {
    num_rows * (num_rows + 1) / 2
}

/// Index of element (r, c) in packed storage
///
/// Only the lower triangle is physically stored, so an access with `c > r`
/// is canonicalized by swapping the indices before addressing.
#[inline]
pub const fn packed_index(r: usize, c: usize) -> usize {
    let (r, c) = if c > r { (c, r) } else { (r, c) };
    r * (r + 1) / 2 + c
}

/// Fill policy for [`PackedStorage::resize`]
///
/// Resizing reallocates; old contents are never preserved across a size
/// change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResizePolicy {
    /// New buffer is zero-filled
    ZeroFill,
    /// New buffer contents are left undefined
    LeaveUndefined,
}

/// Contiguous storage of the `n(n+1)/2` significant entries of an n×n matrix
///
/// Element (r, c) with `r >= c` is stored at index `r(r+1)/2 + c`. The
/// buffer lives on the backend selected by `R` and is freed (including
/// device memory) when the storage is dropped.
pub struct PackedStorage<R: Runtime> {
    buf: Buffer<R>,
    num_rows: usize,
    dtype: DType,
}

impl<R: Runtime> PackedStorage<R> {
    /// Create zero-filled storage for an n×n matrix.
    pub fn try_new(num_rows: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        Ok(Self {
            buf: Buffer::new_zeroed(packed_len(num_rows), dtype, device)?,
            num_rows,
            dtype,
        })
    }

    /// Create storage with undefined contents.
    pub fn try_new_undefined(num_rows: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        Ok(Self {
            buf: Buffer::new_undefined(packed_len(num_rows), dtype, device)?,
            num_rows,
            dtype,
        })
    }

    /// Create zero-filled storage, panicking on allocation failure.
    pub fn new(num_rows: usize, dtype: DType, device: &R::Device) -> Self {
        Self::try_new(num_rows, dtype, device).expect("PackedStorage::new failed")
    }

    /// Dimension n of the n×n matrix
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of stored elements, `n(n+1)/2`
    #[inline]
    pub fn packed_len(&self) -> usize {
        packed_len(self.num_rows)
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

    /// Raw device pointer to the packed buffer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.buf.ptr()
    }

    /// Change dimension to `num_rows`, reallocating the buffer.
    ///
    /// Old contents are never preserved. With [`ResizePolicy::ZeroFill`] the
    /// buffer reads as all zeros afterwards; with
    /// [`ResizePolicy::LeaveUndefined`] it holds whatever the fresh
    /// allocation holds.
    pub fn resize(&mut self, num_rows: usize, policy: ResizePolicy) -> Result<()> {
        if num_rows == self.num_rows {
            if policy == ResizePolicy::ZeroFill {
                self.buf.fill_zero()?;
            }
            return Ok(());
        }
        let buf = match policy {
            ResizePolicy::ZeroFill => {
                Buffer::new_zeroed(packed_len(num_rows), self.dtype, self.device())?
            }
            ResizePolicy::LeaveUndefined => {
                Buffer::new_undefined(packed_len(num_rows), self.dtype, self.device())?
            }
        };
        self.buf = buf;
        self.num_rows = num_rows;
        Ok(())
    }

    /// Overwrite all stored entries with zero.
    pub fn set_zero(&mut self) -> Result<()> {
        self.buf.fill_zero()
    }

    /// Read element (r, c), canonicalizing the indices.
    ///
    /// Performs a single-element transfer from whichever memory backs the
    /// storage.
    ///
    /// # Panics
    ///
    /// Panics if `max(r, c) >= n` or if `T` does not match the storage dtype.
    pub fn get<T: Element>(&self, r: usize, c: usize) -> T {
        let (r, c) = if c > r { (c, r) } else { (r, c) };
        assert!(
            r < self.num_rows,
            "packed index ({}, {}) out of range for dimension {}",
            r,
            c,
            self.num_rows
        );
        assert_eq!(T::DTYPE, self.dtype, "element type mismatch");
        self.buf
            .read_elem(packed_index(r, c))
            .expect("device read failed in PackedStorage::get")
    }

    /// Write element (r, c), canonicalizing the indices.
    ///
    /// The write goes through to whichever memory backs the storage (host
    /// write, or a single-element device write).
    ///
    /// # Panics
    ///
    /// Panics if `max(r, c) >= n` or if `T` does not match the storage dtype.
    pub fn set<T: Element>(&mut self, r: usize, c: usize, value: T) {
        let (r, c) = if c > r { (c, r) } else { (r, c) };
        assert!(
            r < self.num_rows,
            "packed index ({}, {}) out of range for dimension {}",
            r,
            c,
            self.num_rows
        );
        assert_eq!(T::DTYPE, self.dtype, "element type mismatch");
        self.buf
            .write_elem(packed_index(r, c), value)
            .expect("device write failed in PackedStorage::set")
    }

    /// Dump the packed buffer to a host vector, preserving storage order.
    ///
    /// This is the serialization surface: element k of the result is stored
    /// element k.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        assert_eq!(T::DTYPE, self.dtype, "element type mismatch");
        self.buf
            .to_vec()
            .expect("device read failed in PackedStorage::to_vec")
    }

    /// Load the packed buffer from a host slice in storage order.
    ///
    /// Fails with `DimensionMismatch` if `data.len() != n(n+1)/2`.
    pub fn copy_from_slice<T: Element>(&mut self, data: &[T]) -> Result<()> {
        assert_eq!(T::DTYPE, self.dtype, "element type mismatch");
        if data.len() != self.packed_len() {
            return Err(Error::dim_mismatch(&[self.packed_len()], &[data.len()]));
        }
        self.buf.write_slice(data)
    }

    /// Element-wise copy from storage of the same dimension and dtype.
    pub fn copy_from(&mut self, other: &PackedStorage<R>) -> Result<()> {
        if other.num_rows != self.num_rows {
            return Err(Error::dim_mismatch(&[self.num_rows], &[other.num_rows]));
        }
        if other.dtype != self.dtype {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype,
                rhs: other.dtype,
            });
        }
        R::copy_within_device(
            other.buf.ptr(),
            self.buf.ptr(),
            self.buf.size_bytes(),
            self.device(),
        )
    }

    /// Real-copy conversion to host storage.
    ///
    /// Always copies, even when `R` is already the CPU runtime; the result
    /// never aliases this storage.
    pub fn to_host(&self) -> Result<PackedStorage<CpuRuntime>> {
        let device = CpuRuntime::default_device();
        let host =
            PackedStorage::<CpuRuntime>::try_new_undefined(self.num_rows, self.dtype, &device)?;
        dispatch_float!(self.dtype, T => {
            let data: Vec<T> = self.buf.to_vec()?;
            host.buf.write_slice(&data)?;
        });
        Ok(host)
    }

    /// Real-copy conversion from host storage onto `device`.
    pub fn from_host(host: &PackedStorage<CpuRuntime>, device: &R::Device) -> Result<Self> {
        let out = Self::try_new_undefined(host.num_rows, host.dtype, device)?;
        dispatch_float!(host.dtype, T => {
            let data: Vec<T> = host.buf.to_vec()?;
            out.buf.write_slice(&data)?;
        });
        Ok(out)
    }
}

impl<R: Runtime> std::fmt::Debug for PackedStorage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedStorage")
            .field("num_rows", &self.num_rows)
            .field("dtype", &self.dtype)
            .field("buf", &self.buf)
            .finish()
    }
}
