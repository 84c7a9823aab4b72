//! CPU implementation of the packed operations
//!
//! Host buffers are ordinary heap memory, so every operation runs the shared
//! scalar cores in place over a typed view of the buffer. No staging copies
//! are needed on this backend.

use super::client::CpuClient;
use super::runtime::CpuRuntime;
use crate::dispatch_float;
use crate::dtype::{Element, RealElement};
use crate::error::Result;
use crate::matrix::linalg::{check_same_dim, check_same_dtype, check_square_mat};
use crate::matrix::{
    DenseMatrix, DenseVector, PackedLinalg, PackedStorage, SpCopyType, SymmetricPacked, Trans,
    TriangularPacked,
};
use crate::matrix::impl_generic as core_ops;

/// Typed immutable view of a host buffer. `ptr` must be a valid host
/// allocation of at least `len` elements (or zero when `len == 0`).
unsafe fn view<'a, T: RealElement>(ptr: u64, len: usize) -> &'a [T] {
    if len == 0 {
        return &[];
    }
    unsafe { std::slice::from_raw_parts(ptr as *const T, len) }
}

/// Typed mutable view of a host buffer; same contract as [`view`].
unsafe fn view_mut<'a, T: RealElement>(ptr: u64, len: usize) -> &'a mut [T] {
    if len == 0 {
        return &mut [];
    }
    unsafe { std::slice::from_raw_parts_mut(ptr as *mut T, len) }
}

impl PackedLinalg<CpuRuntime> for CpuClient {
    fn packed_set_diag(&self, s: &mut PackedStorage<CpuRuntime>, alpha: f64) -> Result<()> {
        let n = s.num_rows();
        dispatch_float!(s.dtype(), T => {
            let data = unsafe { view_mut::<T>(s.ptr(), s.packed_len()) };
            core_ops::set_diag_core(data, n, T::from_f64(alpha));
        });
        Ok(())
    }

    fn packed_scale(&self, s: &mut PackedStorage<CpuRuntime>, alpha: f64) -> Result<()> {
        dispatch_float!(s.dtype(), T => {
            let data = unsafe { view_mut::<T>(s.ptr(), s.packed_len()) };
            core_ops::scale_core(data, T::from_f64(alpha));
        });
        Ok(())
    }

    fn packed_scale_diag(&self, s: &mut PackedStorage<CpuRuntime>, alpha: f64) -> Result<()> {
        let n = s.num_rows();
        dispatch_float!(s.dtype(), T => {
            let data = unsafe { view_mut::<T>(s.ptr(), s.packed_len()) };
            core_ops::scale_diag_core(data, n, T::from_f64(alpha));
        });
        Ok(())
    }

    fn packed_add_to_diag(&self, s: &mut PackedStorage<CpuRuntime>, value: f64) -> Result<()> {
        let n = s.num_rows();
        dispatch_float!(s.dtype(), T => {
            let data = unsafe { view_mut::<T>(s.ptr(), s.packed_len()) };
            core_ops::add_to_diag_core(data, n, T::from_f64(value));
        });
        Ok(())
    }

    fn packed_axpy(
        &self,
        dst: &mut PackedStorage<CpuRuntime>,
        alpha: f64,
        src: &PackedStorage<CpuRuntime>,
    ) -> Result<()> {
        check_same_dim(dst.num_rows(), src.num_rows())?;
        check_same_dtype(dst.dtype(), src.dtype())?;
        dispatch_float!(dst.dtype(), T => {
            let d = unsafe { view_mut::<T>(dst.ptr(), dst.packed_len()) };
            let s = unsafe { view::<T>(src.ptr(), src.packed_len()) };
            core_ops::axpy_core(d, T::from_f64(alpha), s);
        });
        Ok(())
    }

    fn sp_copy_from_mat(
        &self,
        dst: &mut SymmetricPacked<CpuRuntime>,
        src: &DenseMatrix<CpuRuntime>,
        copy_type: SpCopyType,
    ) -> Result<()> {
        let n = dst.num_rows();
        check_square_mat(src, n, dst.dtype())?;
        dispatch_float!(dst.dtype(), T => {
            let s = unsafe { view::<T>(src.ptr(), n * n) };
            let storage = dst.storage_mut();
            let d = unsafe { view_mut::<T>(storage.ptr(), storage.packed_len()) };
            match copy_type {
                SpCopyType::TakeLower => core_ops::take_lower_core(s, d, n),
                SpCopyType::TakeUpper => core_ops::take_upper_core(s, d, n),
            }
        });
        Ok(())
    }

    fn sp_copy_to_mat(
        &self,
        src: &SymmetricPacked<CpuRuntime>,
        dst: &mut DenseMatrix<CpuRuntime>,
    ) -> Result<()> {
        let n = src.num_rows();
        check_square_mat(dst, n, src.dtype())?;
        dispatch_float!(src.dtype(), T => {
            let s = unsafe { view::<T>(src.storage().ptr(), src.storage().packed_len()) };
            let d = unsafe { view_mut::<T>(dst.ptr(), n * n) };
            core_ops::expand_sp_core(s, d, n);
        });
        Ok(())
    }

    fn sp_add_vec2(
        &self,
        a: &mut SymmetricPacked<CpuRuntime>,
        alpha: f64,
        v: &DenseVector<CpuRuntime>,
    ) -> Result<()> {
        let n = a.num_rows();
        check_same_dim(n, v.len())?;
        check_same_dtype(a.dtype(), v.dtype())?;
        dispatch_float!(a.dtype(), T => {
            let vs = unsafe { view::<T>(v.ptr(), n) };
            let storage = a.storage_mut();
            let data = unsafe { view_mut::<T>(storage.ptr(), storage.packed_len()) };
            core_ops::add_vec2_core(data, n, T::from_f64(alpha), vs);
        });
        Ok(())
    }

    fn sp_add_mat2(
        &self,
        a: &mut SymmetricPacked<CpuRuntime>,
        alpha: f64,
        m: &DenseMatrix<CpuRuntime>,
        trans: Trans,
        beta: f64,
    ) -> Result<()> {
        let n = a.num_rows();
        let outer = match trans {
            Trans::NoTrans => m.rows(),
            Trans::Trans => m.cols(),
        };
        check_same_dim(n, outer)?;
        check_same_dtype(a.dtype(), m.dtype())?;
        let (rows, cols) = (m.rows(), m.cols());
        dispatch_float!(a.dtype(), T => {
            let ms = unsafe { view::<T>(m.ptr(), rows * cols) };
            let storage = a.storage_mut();
            let data = unsafe { view_mut::<T>(storage.ptr(), storage.packed_len()) };
            core_ops::add_mat2_core(
                data,
                n,
                T::from_f64(alpha),
                ms,
                rows,
                cols,
                trans,
                T::from_f64(beta),
            );
        });
        Ok(())
    }

    fn sp_invert(&self, a: &mut SymmetricPacked<CpuRuntime>) -> Result<()> {
        let n = a.num_rows();
        dispatch_float!(a.dtype(), T => {
            let storage = a.storage_mut();
            let data = unsafe { view_mut::<T>(storage.ptr(), storage.packed_len()) };
            core_ops::sp_invert_core(data, n);
        });
        Ok(())
    }

    fn tp_cholesky(
        &self,
        dst: &mut TriangularPacked<CpuRuntime>,
        src: &SymmetricPacked<CpuRuntime>,
    ) -> Result<()> {
        let n = src.num_rows();
        check_same_dim(dst.num_rows(), n)?;
        check_same_dtype(dst.dtype(), src.dtype())?;
        dispatch_float!(src.dtype(), T => {
            let s = unsafe { view::<T>(src.storage().ptr(), src.storage().packed_len()) };
            let storage = dst.storage_mut();
            let d = unsafe { view_mut::<T>(storage.ptr(), storage.packed_len()) };
            core_ops::cholesky_packed_core(s, d, n);
        });
        Ok(())
    }

    fn tp_invert(&self, a: &mut TriangularPacked<CpuRuntime>) -> Result<()> {
        let n = a.num_rows();
        dispatch_float!(a.dtype(), T => {
            let storage = a.storage_mut();
            let data = unsafe { view_mut::<T>(storage.ptr(), storage.packed_len()) };
            core_ops::tp_invert_core(data, n);
        });
        Ok(())
    }

    fn tp_copy_from_mat(
        &self,
        dst: &mut TriangularPacked<CpuRuntime>,
        src: &DenseMatrix<CpuRuntime>,
        trans: Trans,
    ) -> Result<()> {
        let n = dst.num_rows();
        check_square_mat(src, n, dst.dtype())?;
        dispatch_float!(dst.dtype(), T => {
            let s = unsafe { view::<T>(src.ptr(), n * n) };
            let storage = dst.storage_mut();
            let d = unsafe { view_mut::<T>(storage.ptr(), storage.packed_len()) };
            match trans {
                Trans::NoTrans => core_ops::take_lower_core(s, d, n),
                Trans::Trans => core_ops::take_upper_core(s, d, n),
            }
        });
        Ok(())
    }

    fn tp_copy_to_mat(
        &self,
        src: &TriangularPacked<CpuRuntime>,
        dst: &mut DenseMatrix<CpuRuntime>,
    ) -> Result<()> {
        let n = src.num_rows();
        check_square_mat(dst, n, src.dtype())?;
        dispatch_float!(src.dtype(), T => {
            let s = unsafe { view::<T>(src.storage().ptr(), src.storage().packed_len()) };
            let d = unsafe { view_mut::<T>(dst.ptr(), n * n) };
            core_ops::expand_tp_core(s, d, n);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::runtime::Runtime;

    fn client() -> CpuClient {
        CpuRuntime::default_client(&CpuRuntime::default_device())
    }

    // Scalar parameters arrive as f64 and are narrowed to the buffer's
    // element type inside the dispatch; exercise that path for both dtypes.
    #[test]
    fn scalar_params_reach_both_dtypes() {
        let client = client();
        let device = CpuRuntime::default_device();

        let mut s32 = PackedStorage::<CpuRuntime>::new(3, DType::F32, &device);
        client.packed_set_diag(&mut s32, 2.5).unwrap();
        client.packed_scale(&mut s32, 2.0).unwrap();
        let v32: Vec<f32> = s32.to_vec();
        assert_eq!(v32, vec![5.0, 0.0, 5.0, 0.0, 0.0, 5.0]);

        let mut s64 = PackedStorage::<CpuRuntime>::new(3, DType::F64, &device);
        client.packed_set_diag(&mut s64, 2.5).unwrap();
        client.packed_add_to_diag(&mut s64, 0.5).unwrap();
        let v64: Vec<f64> = s64.to_vec();
        assert_eq!(v64, vec![3.0, 0.0, 3.0, 0.0, 0.0, 3.0]);
    }
}
