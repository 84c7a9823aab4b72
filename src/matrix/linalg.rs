//! Backend-agnostic packed linear algebra
//!
//! [`PackedLinalg`] is the seam between the matrix types and the compute
//! backends: each backend's client implements it once, and every matrix
//! operation delegates through it. There is no per-call "is the accelerator
//! enabled" branch anywhere; the backend was chosen when the matrix was
//! constructed.
//!
//! Scalar reductions and comparisons (`trace_sp_sp`, `packed_trace`,
//! `sp_is_unit`, `sp_approx_equal`) have default implementations that dump
//! the packed buffer to the host and run the shared scalar core; both
//! backends produce identical results for them by construction. Everything
//! that mutates a matrix is implemented natively per backend.

use super::dense::{DenseMatrix, DenseVector};
use super::impl_generic;
use super::storage::PackedStorage;
use super::symmetric::SymmetricPacked;
use super::triangular::TriangularPacked;
use crate::dispatch_float;
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::runtime::{Runtime, RuntimeClient};

/// Which triangle of a dense source a symmetric projection reads
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpCopyType {
    /// Copy the lower triangle of the source
    TakeLower,
    /// Copy the upper triangle of the source
    TakeUpper,
}

/// Transposition flag for rank-k updates and triangle extraction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trans {
    /// Use the operand as-is
    NoTrans,
    /// Use the transposed operand
    Trans,
}

/// Packed-matrix operations implemented by each backend's client
///
/// Dimension or dtype disagreements between operands fail with
/// `DimensionMismatch` / `DTypeMismatch`; these are programming defects and
/// callers are expected to treat them as fatal.
///
/// Cholesky and the inversions require positive-definite input. This is a
/// caller responsibility: it is not checked, and violating it produces
/// unspecified numeric output (NaN or garbage), not an error.
pub trait PackedLinalg<R: Runtime>: RuntimeClient<R> {
    // ------------------------------------------------------------------
    // Storage-level operations (shared by both matrix kinds)
    // ------------------------------------------------------------------

    /// Set the diagonal to `alpha`, leaving off-diagonal entries untouched.
    fn packed_set_diag(&self, s: &mut PackedStorage<R>, alpha: f64) -> Result<()>;

    /// Scale every stored entry by `alpha`.
    fn packed_scale(&self, s: &mut PackedStorage<R>, alpha: f64) -> Result<()>;

    /// Scale only the diagonal entries by `alpha`.
    fn packed_scale_diag(&self, s: &mut PackedStorage<R>, alpha: f64) -> Result<()>;

    /// Add `value` to every diagonal entry.
    fn packed_add_to_diag(&self, s: &mut PackedStorage<R>, value: f64) -> Result<()>;

    /// `dst += alpha * src` element-wise over stored entries.
    fn packed_axpy(
        &self,
        dst: &mut PackedStorage<R>,
        alpha: f64,
        src: &PackedStorage<R>,
    ) -> Result<()>;

    /// Set to the identity: zero everywhere, ones on the diagonal.
    fn packed_set_unit(&self, s: &mut PackedStorage<R>) -> Result<()> {
        s.set_zero()?;
        self.packed_set_diag(s, 1.0)
    }

    /// Sum of the diagonal entries.
    fn packed_trace(&self, s: &PackedStorage<R>) -> Result<f64> {
        let n = s.num_rows();
        dispatch_float!(s.dtype(), T => {
            let data: Vec<T> = s.to_vec();
            Ok(impl_generic::trace_core(&data, n))
        })
    }

    // ------------------------------------------------------------------
    // Symmetric operations
    // ------------------------------------------------------------------

    /// tr(A·B) for packed symmetric A and B.
    ///
    /// Only the lower triangle is stored, so each stored off-diagonal entry
    /// contributes twice and each diagonal entry once. This weighting is the
    /// central correctness subtlety of the packed representation.
    fn trace_sp_sp(&self, a: &SymmetricPacked<R>, b: &SymmetricPacked<R>) -> Result<f64> {
        check_same_dim(a.num_rows(), b.num_rows())?;
        check_same_dtype(a.dtype(), b.dtype())?;
        let n = a.num_rows();
        dispatch_float!(a.dtype(), T => {
            let av: Vec<T> = a.storage().to_vec();
            let bv: Vec<T> = b.storage().to_vec();
            Ok(impl_generic::trace_sp_sp_core(&av, &bv, n))
        })
    }

    /// True iff the diagonal is within `tol` of 1 and every off-diagonal
    /// entry within `tol` of 0.
    fn sp_is_unit(&self, a: &SymmetricPacked<R>, tol: f64) -> Result<bool> {
        let n = a.num_rows();
        dispatch_float!(a.dtype(), T => {
            let data: Vec<T> = a.storage().to_vec();
            Ok(impl_generic::is_unit_core(&data, n, tol))
        })
    }

    /// True iff every stored entry of `a` and `b` differs by at most `tol`.
    fn sp_approx_equal(
        &self,
        a: &SymmetricPacked<R>,
        b: &SymmetricPacked<R>,
        tol: f64,
    ) -> Result<bool> {
        check_same_dim(a.num_rows(), b.num_rows())?;
        check_same_dtype(a.dtype(), b.dtype())?;
        dispatch_float!(a.dtype(), T => {
            let av: Vec<T> = a.storage().to_vec();
            let bv: Vec<T> = b.storage().to_vec();
            Ok(impl_generic::approx_equal_core(&av, &bv, tol))
        })
    }

    /// Project a square dense source into packed symmetric form by copying
    /// the chosen triangle.
    fn sp_copy_from_mat(
        &self,
        dst: &mut SymmetricPacked<R>,
        src: &DenseMatrix<R>,
        copy_type: SpCopyType,
    ) -> Result<()>;

    /// Expand into a dense matrix, mirroring the lower triangle into both
    /// triangles.
    fn sp_copy_to_mat(&self, src: &SymmetricPacked<R>, dst: &mut DenseMatrix<R>) -> Result<()>;

    /// Rank-1 symmetric update `A += alpha * v * v^T` over the stored
    /// triangle.
    fn sp_add_vec2(
        &self,
        a: &mut SymmetricPacked<R>,
        alpha: f64,
        v: &DenseVector<R>,
    ) -> Result<()>;

    /// Rank-k symmetric update `A = beta*A + alpha*(M·M^T)` (or `M^T·M` with
    /// [`Trans::Trans`]); only the stored triangle is written, so the result
    /// is symmetric by construction.
    fn sp_add_mat2(
        &self,
        a: &mut SymmetricPacked<R>,
        alpha: f64,
        m: &DenseMatrix<R>,
        trans: Trans,
        beta: f64,
    ) -> Result<()>;

    /// In-place inversion via a Cholesky-based route.
    ///
    /// The matrix must be positive definite; this is not checked.
    fn sp_invert(&self, a: &mut SymmetricPacked<R>) -> Result<()>;

    // ------------------------------------------------------------------
    // Triangular operations
    // ------------------------------------------------------------------

    /// Compute the lower-triangular factor L with `L·L^T = src`.
    ///
    /// `src` must be positive definite; this is not checked.
    fn tp_cholesky(&self, dst: &mut TriangularPacked<R>, src: &SymmetricPacked<R>) -> Result<()>;

    /// In-place inversion of the triangular factor. `n = 0` is a no-op.
    fn tp_invert(&self, a: &mut TriangularPacked<R>) -> Result<()>;

    /// Extract the lower triangle ([`Trans::NoTrans`]) or the transposed
    /// upper triangle ([`Trans::Trans`]) of a square dense source.
    fn tp_copy_from_mat(
        &self,
        dst: &mut TriangularPacked<R>,
        src: &DenseMatrix<R>,
        trans: Trans,
    ) -> Result<()>;

    /// Expand into a dense matrix with the upper triangle zeroed.
    fn tp_copy_to_mat(&self, src: &TriangularPacked<R>, dst: &mut DenseMatrix<R>) -> Result<()>;
}

/// tr(A·B) for packed symmetric matrices, as a free function
///
/// This is the bilinear-form primitive consumed by quadratic-form code;
/// `FrobeniusNorm(A)` is `sqrt(trace_sp_sp(A, A))`.
pub fn trace_sp_sp<R: Runtime>(
    client: &R::Client,
    a: &SymmetricPacked<R>,
    b: &SymmetricPacked<R>,
) -> Result<f64>
where
    R::Client: PackedLinalg<R>,
{
    client.trace_sp_sp(a, b)
}

// ----------------------------------------------------------------------
// Shared operand validation
// ----------------------------------------------------------------------

pub(crate) fn check_same_dim(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::dim_mismatch(&[expected], &[got]));
    }
    Ok(())
}

pub(crate) fn check_same_dtype(lhs: DType, rhs: DType) -> Result<()> {
    if lhs != rhs {
        return Err(Error::DTypeMismatch { lhs, rhs });
    }
    Ok(())
}

/// Check that `mat` is a square dense matrix of dimension `n` and dtype
/// `dtype`.
pub(crate) fn check_square_mat<R: Runtime>(
    mat: &DenseMatrix<R>,
    n: usize,
    dtype: DType,
) -> Result<()> {
    if mat.rows() != mat.cols() || mat.rows() != n {
        return Err(Error::dim_mismatch(&[n, n], &[mat.rows(), mat.cols()]));
    }
    check_same_dtype(dtype, mat.dtype())
}
