//! Packed symmetric matrices

use super::dense::{DenseMatrix, DenseVector};
use super::linalg::{PackedLinalg, SpCopyType, Trans};
use super::storage::{PackedStorage, ResizePolicy};
use crate::dtype::{DType, Element};
use crate::error::Result;
use crate::runtime::Runtime;

use crate::runtime::cpu::CpuRuntime;

/// A symmetric n x n matrix stored as its lower triangle
///
/// Only the `n(n+1)/2` lower-triangular entries exist in memory. Reads and
/// writes canonicalize their indices, so `get(r, c)` and `get(c, r)` touch
/// the same stored entry and the matrix cannot become asymmetric.
///
/// Compute goes through a backend client implementing
/// [`PackedLinalg`]; the convenience methods here take the client
/// explicitly, like every other dispatched operation in the crate.
pub struct SymmetricPacked<R: Runtime> {
    storage: PackedStorage<R>,
}

impl<R: Runtime> SymmetricPacked<R> {
    /// Create a zero-initialized symmetric matrix.
    pub fn try_new(num_rows: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        Ok(Self {
            storage: PackedStorage::try_new(num_rows, dtype, device)?,
        })
    }

    /// Create a zero-initialized symmetric matrix, panicking on allocation
    /// failure.
    pub fn new(num_rows: usize, dtype: DType, device: &R::Device) -> Self {
        Self {
            storage: PackedStorage::new(num_rows, dtype, device),
        }
    }

    /// Project the chosen triangle of a square dense matrix into packed
    /// symmetric form.
    pub fn from_mat(
        client: &impl PackedLinalg<R>,
        src: &DenseMatrix<R>,
        copy_type: SpCopyType,
    ) -> Result<Self> {
        let mut out = Self::try_new(src.rows(), src.dtype(), src.device())?;
        client.sp_copy_from_mat(&mut out, src, copy_type)?;
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

    /// Read element (r, c). `get(r, c) == get(c, r)` always.
    ///
    /// # Panics
    ///
    /// Panics if `max(r, c) >= n` or if `T` does not match the dtype.
    pub fn get<T: Element>(&self, r: usize, c: usize) -> T {
        self.storage.get(r, c)
    }

    /// Write element (r, c); the logical (c, r) entry changes with it.
    ///
    /// # Panics
    ///
    /// Panics if `max(r, c) >= n` or if `T` does not match the dtype.
    pub fn set<T: Element>(&mut self, r: usize, c: usize, value: T) {
        self.storage.set(r, c, value)
    }

    /// Change the dimension to `num_rows`. Existing contents are never
    /// preserved; see [`ResizePolicy`] for what the new buffer holds.
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

    /// Set the diagonal to `alpha`, leaving off-diagonal entries untouched.
    pub fn set_diag(&mut self, client: &impl PackedLinalg<R>, alpha: f64) -> Result<()> {
        client.packed_set_diag(&mut self.storage, alpha)
    }

    /// Scale every entry by `alpha`.
    pub fn scale(&mut self, client: &impl PackedLinalg<R>, alpha: f64) -> Result<()> {
        client.packed_scale(&mut self.storage, alpha)
    }

    /// Scale only the diagonal by `alpha`.
    pub fn scale_diag(&mut self, client: &impl PackedLinalg<R>, alpha: f64) -> Result<()> {
        client.packed_scale_diag(&mut self.storage, alpha)
    }

    /// Add `value` to every diagonal entry.
    pub fn add_to_diag(&mut self, client: &impl PackedLinalg<R>, value: f64) -> Result<()> {
        client.packed_add_to_diag(&mut self.storage, value)
    }

    /// Sum of the diagonal.
    pub fn trace(&self, client: &impl PackedLinalg<R>) -> Result<f64> {
        client.packed_trace(&self.storage)
    }

    /// Frobenius norm, `sqrt(tr(A*A))`.
    pub fn frobenius_norm(&self, client: &impl PackedLinalg<R>) -> Result<f64> {
        Ok(client.trace_sp_sp(self, self)?.sqrt())
    }

    /// True iff the matrix is within `tol` of the identity, element-wise.
    pub fn is_unit(&self, client: &impl PackedLinalg<R>, tol: f64) -> Result<bool> {
        client.sp_is_unit(self, tol)
    }

    /// True iff every stored entry differs from `other`'s by at most `tol`.
    pub fn approx_equal(
        &self,
        client: &impl PackedLinalg<R>,
        other: &SymmetricPacked<R>,
        tol: f64,
    ) -> Result<bool> {
        client.sp_approx_equal(self, other, tol)
    }

    /// `self += alpha * other`, entry-wise over the stored triangle.
    pub fn add_sp(
        &mut self,
        client: &impl PackedLinalg<R>,
        alpha: f64,
        other: &SymmetricPacked<R>,
    ) -> Result<()> {
        client.packed_axpy(&mut self.storage, alpha, &other.storage)
    }

    /// Rank-1 update `self += alpha * v * v^T`.
    pub fn add_vec2(
        &mut self,
        client: &impl PackedLinalg<R>,
        alpha: f64,
        v: &DenseVector<R>,
    ) -> Result<()> {
        client.sp_add_vec2(self, alpha, v)
    }

    /// Rank-k update `self = beta*self + alpha*op(M)*op(M)^T`.
    pub fn add_mat2(
        &mut self,
        client: &impl PackedLinalg<R>,
        alpha: f64,
        m: &DenseMatrix<R>,
        trans: Trans,
        beta: f64,
    ) -> Result<()> {
        client.sp_add_mat2(self, alpha, m, trans, beta)
    }

    /// Invert in place. The matrix must be positive definite; this is not
    /// checked.
    pub fn invert(&mut self, client: &impl PackedLinalg<R>) -> Result<()> {
        client.sp_invert(self)
    }

    /// Expand into a freshly allocated dense matrix.
    pub fn to_mat(&self, client: &impl PackedLinalg<R>) -> Result<DenseMatrix<R>> {
        let n = self.num_rows();
        let mut out = DenseMatrix::try_zeros(n, n, self.dtype(), self.device())?;
        client.sp_copy_to_mat(self, &mut out)?;
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
    pub fn copy_from(&mut self, other: &SymmetricPacked<R>) -> Result<()> {
        self.storage.copy_from(&other.storage)
    }

    /// Real-copy conversion to a host-resident matrix.
    pub fn to_host(&self) -> Result<SymmetricPacked<CpuRuntime>> {
        Ok(SymmetricPacked {
            storage: self.storage.to_host()?,
        })
    }

    /// Real-copy conversion from a host-resident matrix onto `device`.
    pub fn from_host(host: &SymmetricPacked<CpuRuntime>, device: &R::Device) -> Result<Self> {
        Ok(Self {
            storage: PackedStorage::from_host(&host.storage, device)?,
        })
    }
}

impl<R: Runtime> std::fmt::Debug for SymmetricPacked<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricPacked")
            .field("num_rows", &self.num_rows())
            .field("dtype", &self.dtype())
            .finish()
    }
}
