//! Packed lower-triangular matrices

use super::dense::DenseMatrix;
use super::linalg::{PackedLinalg, Trans};
use super::storage::{PackedStorage, ResizePolicy};
use super::symmetric::SymmetricPacked;
use crate::dtype::{DType, Element};
use crate::error::Result;
use crate::runtime::Runtime;

use crate::runtime::cpu::CpuRuntime;

/// A lower-triangular n x n matrix stored as its lower triangle
///
/// The layout is identical to [`SymmetricPacked`], but the access semantics
/// differ above the diagonal: reading an upper-triangle entry returns zero,
/// and writing one panics, because those entries do not exist.
///
/// The canonical producer is [`cholesky`](Self::cholesky); the canonical
/// consumer is [`invert`](Self::invert), which turns the factor into the
/// triangular inverse used to whiten or solve.
pub struct TriangularPacked<R: Runtime> {
    storage: PackedStorage<R>,
}

impl<R: Runtime> TriangularPacked<R> {
    /// Create a zero-initialized triangular matrix.
    pub fn try_new(num_rows: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        Ok(Self {
            storage: PackedStorage::try_new(num_rows, dtype, device)?,
        })
    }

    /// Create a zero-initialized triangular matrix, panicking on allocation
    /// failure.
    pub fn new(num_rows: usize, dtype: DType, device: &R::Device) -> Self {
        Self {
            storage: PackedStorage::new(num_rows, dtype, device),
        }
    }

    /// Extract a triangle of a square dense matrix.
    ///
    /// [`Trans::NoTrans`] takes the lower triangle as-is; [`Trans::Trans`]
    /// takes the upper triangle, transposed into lower storage.
    pub fn from_mat(
        client: &impl PackedLinalg<R>,
        src: &DenseMatrix<R>,
        trans: Trans,
    ) -> Result<Self> {
        let mut out = Self::try_new(src.rows(), src.dtype(), src.device())?;
        client.tp_copy_from_mat(&mut out, src, trans)?;
        Ok(out)
    }

    /// Matrix dimension n.
    pub fn num_rows(&self) -> usize {
        self.storage.num_rows()
    }

    /// Element type of the stored entries.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Device holding the backing buffer.
    pub fn device(&self) -> &R::Device {
        self.storage.device()
    }

    /// The underlying packed storage.
    pub fn storage(&self) -> &PackedStorage<R> {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut PackedStorage<R> {
        &mut self.storage
    }

    /// Read element (r, c). Entries above the diagonal read as zero.
    ///
    /// # Panics
    ///
    /// Panics if `max(r, c) >= n` or if `T` does not match the dtype.
    pub fn get<T: Element>(&self, r: usize, c: usize) -> T {
        if c > r {
            let n = self.num_rows();
            assert!(
                c < n,
                "packed index ({}, {}) out of range for dimension {}",
                r,
                c,
                n
            );
            assert_eq!(T::DTYPE, self.dtype(), "element type mismatch");
            return T::zero();
        }
        self.storage.get(r, c)
    }

    /// Write element (r, c).
    ///
    /// # Panics
    ///
    /// Panics if `c > r` (the entry does not exist), if `max(r, c) >= n`, or
    /// if `T` does not match the dtype.
    pub fn set<T: Element>(&mut self, r: usize, c: usize, value: T) {
        assert!(
            c <= r,
            "cannot write upper-triangle entry ({}, {}) of a triangular matrix",
            r,
            c
        );
        self.storage.set(r, c, value)
    }

    /// Change the dimension to `num_rows`. Existing contents are never
    /// preserved.
    pub fn resize(&mut self, num_rows: usize, policy: ResizePolicy) -> Result<()> {
        self.storage.resize(num_rows, policy)
    }

    /// Zero every stored entry.
    pub fn set_zero(&mut self) -> Result<()> {
        self.storage.set_zero()
    }

    /// Set to the identity matrix.
    pub fn set_unit(&mut self, client: &impl PackedLinalg<R>) -> Result<()> {
        client.packed_set_unit(&mut self.storage)
    }

    /// Scale every entry by `alpha`.
    pub fn scale(&mut self, client: &impl PackedLinalg<R>, alpha: f64) -> Result<()> {
        client.packed_scale(&mut self.storage, alpha)
    }

    /// Sum of the diagonal.
    pub fn trace(&self, client: &impl PackedLinalg<R>) -> Result<f64> {
        client.packed_trace(&self.storage)
    }

    /// Overwrite with the lower Cholesky factor of `src`, so that
    /// `L * L^T == src`.
    ///
    /// `src` must be positive definite; this is not checked, and a non-PD
    /// source yields NaN entries.
    pub fn cholesky(
        &mut self,
        client: &impl PackedLinalg<R>,
        src: &SymmetricPacked<R>,
    ) -> Result<()> {
        client.tp_cholesky(self, src)
    }

    /// Invert in place. The diagonal must be non-zero; `n = 0` is a no-op.
    pub fn invert(&mut self, client: &impl PackedLinalg<R>) -> Result<()> {
        client.tp_invert(self)
    }

    /// Expand into a freshly allocated dense matrix with a zero upper
    /// triangle.
    pub fn to_mat(&self, client: &impl PackedLinalg<R>) -> Result<DenseMatrix<R>> {
        let n = self.num_rows();
        let mut out = DenseMatrix::try_zeros(n, n, self.dtype(), self.device())?;
        client.tp_copy_to_mat(self, &mut out)?;
        Ok(out)
    }

    /// Dump the packed entries to a host vector in storage order.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.storage.to_vec()
    }

    /// Load the packed entries from a host slice in storage order.
    pub fn copy_from_slice<T: Element>(&mut self, data: &[T]) -> Result<()> {
        self.storage.copy_from_slice(data)
    }

    /// Element-wise copy from a matrix of the same dimension and dtype.
    pub fn copy_from(&mut self, other: &TriangularPacked<R>) -> Result<()> {
        self.storage.copy_from(&other.storage)
    }

    /// Real-copy conversion to a host-resident matrix.
    pub fn to_host(&self) -> Result<TriangularPacked<CpuRuntime>> {
        Ok(TriangularPacked {
            storage: self.storage.to_host()?,
        })
    }

    /// Real-copy conversion from a host-resident matrix onto `device`.
    pub fn from_host(host: &TriangularPacked<CpuRuntime>, device: &R::Device) -> Result<Self> {
        Ok(Self {
            storage: PackedStorage::from_host(&host.storage, device)?,
        })
    }
}

impl<R: Runtime> std::fmt::Debug for TriangularPacked<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriangularPacked")
            .field("num_rows", &self.num_rows())
            .field("dtype", &self.dtype())
            .finish()
    }
}
