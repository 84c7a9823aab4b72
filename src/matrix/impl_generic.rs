//! Scalar cores for packed operations
//!
//! Every routine here works on plain host slices in packed lower-triangular
//! order and is generic over the element type. The CPU backend runs these in
//! place over its buffers; the default host-fallback reductions in the
//! [`PackedLinalg`](super::linalg::PackedLinalg) trait run them on copies
//! dumped from the device. Keeping the arithmetic in one place is what makes
//! the backends numerically comparable.

use super::linalg::Trans;
use super::storage::{packed_index, packed_len};
use crate::dtype::RealElement;

/// Sum of the diagonal, accumulated in f64.
pub(crate) fn trace_core<T: RealElement>(data: &[T], n: usize) -> f64 {
    let mut acc = 0.0f64;
    for r in 0..n {
        acc += data[packed_index(r, r)].to_f64();
    }
    acc
}

/// tr(A·B) over packed symmetric operands, accumulated in f64.
///
/// Off-diagonal stored entries appear in both triangles of the logical
/// matrices, so they are weighted by two.
pub(crate) fn trace_sp_sp_core<T: RealElement>(a: &[T], b: &[T], n: usize) -> f64 {
    let mut acc = 0.0f64;
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..=r {
            let prod = a[i].to_f64() * b[i].to_f64();
            acc += if r == c { prod } else { 2.0 * prod };
            i += 1;
        }
    }
    acc
}

pub(crate) fn is_unit_core<T: RealElement>(data: &[T], n: usize, tol: f64) -> bool {
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..=r {
            let target = if r == c { T::one() } else { T::zero() };
            if (data[i] - target).abs_val().to_f64() > tol {
                return false;
            }
            i += 1;
        }
    }
    true
}

pub(crate) fn approx_equal_core<T: RealElement>(a: &[T], b: &[T], tol: f64) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| (*x - *y).abs_val().to_f64() <= tol)
}

// ----------------------------------------------------------------------
// Dense <-> packed projection
// ----------------------------------------------------------------------

/// packed[r][c] = dense[r][c] for the lower triangle of a row-major n x n
/// source.
pub(crate) fn take_lower_core<T: RealElement>(src: &[T], dst: &mut [T], n: usize) {
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..=r {
            dst[i] = src[r * n + c];
            i += 1;
        }
    }
}

/// packed[r][c] = dense[c][r]: the upper triangle, transposed into lower
/// storage.
pub(crate) fn take_upper_core<T: RealElement>(src: &[T], dst: &mut [T], n: usize) {
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..=r {
            dst[i] = src[c * n + r];
            i += 1;
        }
    }
}

/// Expand packed symmetric storage into a full row-major dense matrix,
/// mirroring across the diagonal.
pub(crate) fn expand_sp_core<T: RealElement>(src: &[T], dst: &mut [T], n: usize) {
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..=r {
            dst[r * n + c] = src[i];
            dst[c * n + r] = src[i];
            i += 1;
        }
    }
}

/// Expand packed triangular storage into a dense matrix with a zero upper
/// triangle.
pub(crate) fn expand_tp_core<T: RealElement>(src: &[T], dst: &mut [T], n: usize) {
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..n {
            dst[r * n + c] = if c <= r {
                let v = src[i];
                i += 1;
                v
            } else {
                T::zero()
            };
        }
    }
}

// ----------------------------------------------------------------------
// Element-wise packed updates
// ----------------------------------------------------------------------

pub(crate) fn scale_core<T: RealElement>(data: &mut [T], alpha: T) {
    for x in data.iter_mut() {
        *x = *x * alpha;
    }
}

pub(crate) fn set_diag_core<T: RealElement>(data: &mut [T], n: usize, alpha: T) {
    for r in 0..n {
        data[packed_index(r, r)] = alpha;
    }
}

pub(crate) fn scale_diag_core<T: RealElement>(data: &mut [T], n: usize, alpha: T) {
    for r in 0..n {
        let i = packed_index(r, r);
        data[i] = data[i] * alpha;
    }
}

pub(crate) fn add_to_diag_core<T: RealElement>(data: &mut [T], n: usize, value: T) {
    for r in 0..n {
        let i = packed_index(r, r);
        data[i] = data[i] + value;
    }
}

pub(crate) fn axpy_core<T: RealElement>(dst: &mut [T], alpha: T, src: &[T]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = *d + alpha * *s;
    }
}

/// Rank-1 update `A += alpha * v * v^T` over the stored triangle.
pub(crate) fn add_vec2_core<T: RealElement>(a: &mut [T], n: usize, alpha: T, v: &[T]) {
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..=r {
            a[i] = a[i] + alpha * v[r] * v[c];
            i += 1;
        }
    }
}

/// Rank-k update `A = beta*A + alpha*op(M)·op(M)^T` over the stored
/// triangle. `m` is row-major with `rows * cols` entries; `NoTrans` needs
/// `rows == n`, `Trans` needs `cols == n` (checked by the caller).
pub(crate) fn add_mat2_core<T: RealElement>(
    a: &mut [T],
    n: usize,
    alpha: T,
    m: &[T],
    rows: usize,
    cols: usize,
    trans: Trans,
    beta: T,
) {
    let inner = match trans {
        Trans::NoTrans => cols,
        Trans::Trans => rows,
    };
    let entry = |r: usize, c: usize| -> T {
        let mut sum = T::zero();
        match trans {
            Trans::NoTrans => {
                for k in 0..inner {
                    sum = sum + m[r * cols + k] * m[c * cols + k];
                }
            }
            Trans::Trans => {
                for k in 0..inner {
                    sum = sum + m[k * cols + r] * m[k * cols + c];
                }
            }
        }
        sum
    };

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        let mut rest = &mut a[..];
        let mut row_slices = Vec::with_capacity(n);
        for r in 0..n {
            let (row, tail) = rest.split_at_mut(r + 1);
            row_slices.push(row);
            rest = tail;
        }
        row_slices.into_par_iter().enumerate().for_each(|(r, row)| {
            for (c, slot) in row.iter_mut().enumerate() {
                *slot = beta * *slot + alpha * entry(r, c);
            }
        });
    }

    #[cfg(not(feature = "rayon"))]
    {
        let mut i = 0usize;
        for r in 0..n {
            for c in 0..=r {
                a[i] = beta * a[i] + alpha * entry(r, c);
                i += 1;
            }
        }
    }
}

// ----------------------------------------------------------------------
// Factorization and inversion
// ----------------------------------------------------------------------

/// Packed Cholesky (Banachiewicz order): `dst` receives the lower factor L
/// with L·L^T = src. Requires positive-definite input; a non-PD source
/// yields NaN entries rather than an error.
pub(crate) fn cholesky_packed_core<T: RealElement>(src: &[T], dst: &mut [T], n: usize) {
    for r in 0..n {
        for c in 0..=r {
            let mut sum = src[packed_index(r, c)];
            for k in 0..c {
                sum = sum - dst[packed_index(r, k)] * dst[packed_index(c, k)];
            }
            dst[packed_index(r, c)] = if r == c {
                sum.sqrt_val()
            } else {
                sum / dst[packed_index(c, c)]
            };
        }
    }
}

/// In-place inversion of a packed lower-triangular factor.
///
/// Row r of the inverse depends on rows < r (already inverted) and row r of
/// the original, so each row is staged in `scratch` before being written
/// back.
pub(crate) fn tp_invert_core<T: RealElement>(l: &mut [T], n: usize) {
    let mut scratch = vec![T::zero(); n];
    for r in 0..n {
        let inv_d = T::one() / l[packed_index(r, r)];
        for c in 0..r {
            let mut sum = T::zero();
            for k in c..r {
                sum = sum + l[packed_index(r, k)] * l[packed_index(k, c)];
            }
            scratch[c] = T::zero() - sum * inv_d;
        }
        for c in 0..r {
            l[packed_index(r, c)] = scratch[c];
        }
        l[packed_index(r, r)] = inv_d;
    }
}

/// In-place symmetric inversion: factor, invert the factor, then form
/// A^-1 = L^-T · L^-1 directly in packed storage.
pub(crate) fn sp_invert_core<T: RealElement>(a: &mut [T], n: usize) {
    let mut l = vec![T::zero(); packed_len(n)];
    cholesky_packed_core(a, &mut l, n);
    tp_invert_core(&mut l, n);
    let mut i = 0usize;
    for r in 0..n {
        for c in 0..=r {
            // (A^-1)[r][c] = sum_k Linv[k][r] * Linv[k][c]; both columns are
            // zero above the diagonal, so k starts at r (>= c here).
            let mut sum = T::zero();
            for k in r..n {
                sum = sum + l[packed_index(k, r)] * l[packed_index(k, c)];
            }
            a[i] = sum;
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b} (tol {tol})");
    }

    #[test]
    fn cholesky_2x2() {
        // [[4, 2], [2, 3]] => L = [[2, 0], [1, sqrt(2)]]
        let src = [4.0f64, 2.0, 3.0];
        let mut l = [0.0f64; 3];
        cholesky_packed_core(&src, &mut l, 2);
        assert_close(l[0], 2.0, 1e-12);
        assert_close(l[1], 1.0, 1e-12);
        assert_close(l[2], 2.0f64.sqrt(), 1e-12);
    }

    #[test]
    fn tp_invert_reconstructs_identity() {
        let l = [2.0f64, 1.0, 2.0f64.sqrt(), 0.5, -1.0, 3.0];
        let mut inv = l;
        tp_invert_core(&mut inv, 3);
        // L * Linv must be the identity.
        for r in 0..3 {
            for c in 0..=r {
                let mut sum = 0.0;
                for k in c..=r {
                    sum += l[packed_index(r, k)] * inv[packed_index(k, c)];
                }
                let expect = if r == c { 1.0 } else { 0.0 };
                assert_close(sum, expect, 1e-12);
            }
        }
    }

    #[test]
    fn sp_invert_times_original_is_identity() {
        let a = [4.0f64, 2.0, 3.0];
        let mut inv = a;
        sp_invert_core(&mut inv, 2);

        // Expand both and multiply densely.
        let mut ad = [0.0f64; 4];
        let mut id = [0.0f64; 4];
        expand_sp_core(&a, &mut ad, 2);
        expand_sp_core(&inv, &mut id, 2);
        for r in 0..2 {
            for c in 0..2 {
                let mut sum = 0.0;
                for k in 0..2 {
                    sum += ad[r * 2 + k] * id[k * 2 + c];
                }
                let expect = if r == c { 1.0 } else { 0.0 };
                assert_close(sum, expect, 1e-10);
            }
        }
    }

    #[test]
    fn trace_sp_sp_doubles_off_diagonal() {
        // A = [[1, 2], [2, 3]]: tr(A*A) = 1 + 4 + 4 + 9 = 18.
        let a = [1.0f64, 2.0, 3.0];
        assert_close(trace_sp_sp_core(&a, &a, 2), 18.0, 1e-12);
    }

    #[test]
    fn add_mat2_trans_matches_manual() {
        // M is 3x2; A = M^T * M with n = 2.
        let m = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut a = [0.0f64; 3];
        add_mat2_core(&mut a, 2, 1.0, &m, 3, 2, Trans::Trans, 0.0);
        assert_close(a[0], 1.0 + 9.0 + 25.0, 1e-12);
        assert_close(a[1], 2.0 + 12.0 + 30.0, 1e-12);
        assert_close(a[2], 4.0 + 16.0 + 36.0, 1e-12);
    }

    #[test]
    fn unit_detection_honors_tolerance() {
        let mut a = [1.0f64, 0.0, 1.0];
        assert!(is_unit_core(&a, 2, 0.0));
        a[1] = 1e-6;
        assert!(!is_unit_core(&a, 2, 1e-9));
        assert!(is_unit_core(&a, 2, 1e-3));
    }

    #[test]
    fn comparisons_use_magnitudes() {
        // Deviations below the identity/reference must fail the same way
        // deviations above it do.
        let low = [1.0f64 - 1e-6, -1e-6, 1.0];
        assert!(!is_unit_core(&low, 2, 1e-9));
        assert!(is_unit_core(&low, 2, 1e-3));

        let a = [1.0f32, -2.0, 3.0];
        let b = [1.0f32, -2.5, 3.0];
        assert!(!approx_equal_core(&a, &b, 0.4));
        assert!(approx_equal_core(&a, &b, 0.6));
    }

    #[test]
    fn take_upper_transposes() {
        let dense = [1.0f64, 2.0, 3.0, 4.0];
        let mut packed = [0.0f64; 3];
        take_upper_core(&dense, &mut packed, 2);
        assert_eq!(packed, [1.0, 2.0, 4.0]);
        take_lower_core(&dense, &mut packed, 2);
        assert_eq!(packed, [1.0, 3.0, 4.0]);
    }
}
