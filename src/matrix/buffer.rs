//! Owned device buffer underlying packed and dense matrices

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// Exclusively-owned device memory
///
/// Unlike a shared tensor storage there is no reference counting here: a
/// matrix owns its buffer exclusively, and the buffer is freed on its device
/// when the matrix is dropped. Contents of a fresh allocation are undefined;
/// use [`Buffer::fill_zero`] for deterministic contents.
pub(crate) struct Buffer<R: Runtime> {
    /// Raw device pointer (GPU address or CPU ptr cast to u64)
    ptr: u64,
    /// Allocation size in bytes
    size_bytes: usize,
    /// Device where memory is allocated
    device: R::Device,
}

impl<R: Runtime> Buffer<R> {
    /// Allocate a buffer for `len` elements of `dtype`, contents undefined.
    pub fn new_undefined(len: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        let size_bytes = len * dtype.size_in_bytes();
        let ptr = R::allocate(size_bytes, device)?;
        Ok(Self {
            ptr,
            size_bytes,
            device: device.clone(),
        })
    }

    /// Allocate a zero-filled buffer for `len` elements of `dtype`.
    pub fn new_zeroed(len: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        let buf = Self::new_undefined(len, dtype, device)?;
        buf.fill_zero()?;
        Ok(buf)
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn from_slice<T: Element>(data: &[T], device: &R::Device) -> Result<Self> {
        let buf = Self::new_undefined(data.len(), T::DTYPE, device)?;
        buf.write_slice(data)?;
        Ok(buf)
    }

    /// Get the raw device pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.device
    }

    /// Get the allocation size in bytes
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Overwrite the whole buffer with zero bytes.
    pub fn fill_zero(&self) -> Result<()> {
        if self.size_bytes == 0 {
            return Ok(());
        }
        let zeros = vec![0u8; self.size_bytes];
        R::copy_to_device(&zeros, self.ptr, &self.device)
    }

    /// Copy the whole buffer to a host vector.
    ///
    /// Allocates with the alignment of `T` first, then casts to bytes for
    /// the copy, to avoid alignment violations with f64 elements.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let len = self.size_bytes / std::mem::size_of::<T>();
        let mut result = vec![T::zeroed(); len];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut result);
        R::copy_from_device(self.ptr, bytes, &self.device)?;
        Ok(result)
    }

    /// Overwrite the buffer with host data of exactly the buffer's length.
    pub fn write_slice<T: Element>(&self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() != self.size_bytes {
            return Err(Error::Internal(format!(
                "buffer write of {} bytes into {}-byte buffer",
                bytes.len(),
                self.size_bytes
            )));
        }
        R::copy_to_device(bytes, self.ptr, &self.device)
    }

    /// Read a single element at `index`.
    pub fn read_elem<T: Element>(&self, index: usize) -> Result<T> {
        let elem_size = std::mem::size_of::<T>();
        let mut value = T::zeroed();
        let bytes: &mut [u8] = bytemuck::bytes_of_mut(&mut value);
        debug_assert!((index + 1) * elem_size <= self.size_bytes);
        R::copy_from_device(
            self.ptr + (index * elem_size) as u64,
            bytes,
            &self.device,
        )?;
        Ok(value)
    }

    /// Write a single element at `index`.
    pub fn write_elem<T: Element>(&self, index: usize, value: T) -> Result<()> {
        let elem_size = std::mem::size_of::<T>();
        let bytes: &[u8] = bytemuck::bytes_of(&value);
        debug_assert!((index + 1) * elem_size <= self.size_bytes);
        R::copy_to_device(bytes, self.ptr + (index * elem_size) as u64, &self.device)
    }
}

impl<R: Runtime> Drop for Buffer<R> {
    fn drop(&mut self) {
        if self.ptr != 0 {
            R::deallocate(self.ptr, self.size_bytes, &self.device);
        }
    }
}

impl<R: Runtime> std::fmt::Debug for Buffer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("ptr", &format!("0x{:x}", self.ptr))
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}
