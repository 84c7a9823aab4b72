//! CUDA implementation of the packed operations
//!
//! Mutating operations launch native kernels in the packed domain; they stay
//! asynchronous on the client's stream, and any read-back through the buffer
//! layer synchronizes. The scalar reductions (`trace`, `trace_sp_sp`,
//! `is_unit`, `approx_equal`) use the trait's host-fallback defaults, so
//! both backends reduce with identical host arithmetic.

use super::client::CudaClient;
use super::kernels;
use super::runtime::CudaRuntime;
use crate::error::Result;
use crate::matrix::linalg::{check_same_dim, check_same_dtype, check_square_mat};
use crate::runtime::Runtime;
use crate::matrix::{
    Buffer, DenseMatrix, DenseVector, PackedLinalg, PackedStorage, SpCopyType, SymmetricPacked,
    Trans, TriangularPacked,
};

impl PackedLinalg<CudaRuntime> for CudaClient {
    fn packed_set_diag(&self, s: &mut PackedStorage<CudaRuntime>, alpha: f64) -> Result<()> {
        unsafe {
            kernels::launch_packed_diag(
                &self.context,
                &self.stream,
                self.device.index,
                "set_diag_packed",
                s.dtype(),
                s.ptr(),
                alpha,
                s.num_rows(),
            )
        }
    }

    fn packed_scale(&self, s: &mut PackedStorage<CudaRuntime>, alpha: f64) -> Result<()> {
        unsafe {
            kernels::launch_packed_scale(
                &self.context,
                &self.stream,
                self.device.index,
                s.dtype(),
                s.ptr(),
                alpha,
                s.packed_len(),
            )
        }
    }

    fn packed_scale_diag(&self, s: &mut PackedStorage<CudaRuntime>, alpha: f64) -> Result<()> {
        unsafe {
            kernels::launch_packed_diag(
                &self.context,
                &self.stream,
                self.device.index,
                "scale_diag_packed",
                s.dtype(),
                s.ptr(),
                alpha,
                s.num_rows(),
            )
        }
    }

    fn packed_add_to_diag(&self, s: &mut PackedStorage<CudaRuntime>, value: f64) -> Result<()> {
        unsafe {
            kernels::launch_packed_diag(
                &self.context,
                &self.stream,
                self.device.index,
                "add_diag_packed",
                s.dtype(),
                s.ptr(),
                value,
                s.num_rows(),
            )
        }
    }

    fn packed_axpy(
        &self,
        dst: &mut PackedStorage<CudaRuntime>,
        alpha: f64,
        src: &PackedStorage<CudaRuntime>,
    ) -> Result<()> {
        check_same_dim(dst.num_rows(), src.num_rows())?;
        check_same_dtype(dst.dtype(), src.dtype())?;
        unsafe {
            kernels::launch_packed_axpy(
                &self.context,
                &self.stream,
                self.device.index,
                dst.dtype(),
                dst.ptr(),
                src.ptr(),
                alpha,
                dst.packed_len(),
            )
        }
    }

    fn sp_copy_from_mat(
        &self,
        dst: &mut SymmetricPacked<CudaRuntime>,
        src: &DenseMatrix<CudaRuntime>,
        copy_type: SpCopyType,
    ) -> Result<()> {
        let n = dst.num_rows();
        check_square_mat(src, n, dst.dtype())?;
        let op = match copy_type {
            SpCopyType::TakeLower => "take_lower",
            SpCopyType::TakeUpper => "take_upper",
        };
        unsafe {
            kernels::launch_take_triangle(
                &self.context,
                &self.stream,
                self.device.index,
                op,
                dst.dtype(),
                src.ptr(),
                dst.storage_mut().ptr(),
                n,
            )
        }
    }

    fn sp_copy_to_mat(
        &self,
        src: &SymmetricPacked<CudaRuntime>,
        dst: &mut DenseMatrix<CudaRuntime>,
    ) -> Result<()> {
        let n = src.num_rows();
        check_square_mat(dst, n, src.dtype())?;
        unsafe {
            kernels::launch_expand(
                &self.context,
                &self.stream,
                self.device.index,
                "expand_sp",
                src.dtype(),
                src.storage().ptr(),
                dst.ptr(),
                n,
            )
        }
    }

    fn sp_add_vec2(
        &self,
        a: &mut SymmetricPacked<CudaRuntime>,
        alpha: f64,
        v: &DenseVector<CudaRuntime>,
    ) -> Result<()> {
        let n = a.num_rows();
        check_same_dim(n, v.len())?;
        check_same_dtype(a.dtype(), v.dtype())?;
        unsafe {
            kernels::launch_add_vec2(
                &self.context,
                &self.stream,
                self.device.index,
                a.dtype(),
                a.storage_mut().ptr(),
                v.ptr(),
                alpha,
                n,
            )
        }
    }

    fn sp_add_mat2(
        &self,
        a: &mut SymmetricPacked<CudaRuntime>,
        alpha: f64,
        m: &DenseMatrix<CudaRuntime>,
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
        unsafe {
            kernels::launch_add_mat2(
                &self.context,
                &self.stream,
                self.device.index,
                a.dtype(),
                a.storage_mut().ptr(),
                m.ptr(),
                m.rows(),
                m.cols(),
                matches!(trans, Trans::Trans),
                alpha,
                beta,
                n,
            )
        }
    }

    fn sp_invert(&self, a: &mut SymmetricPacked<CudaRuntime>) -> Result<()> {
        let n = a.num_rows();
        if n == 0 {
            return Ok(());
        }
        let dtype = a.dtype();
        let pl = a.storage().packed_len();
        let device = a.device().clone();

        // Factor into l, invert into linv, then assemble Linv^T * Linv back
        // into a. The factor kernels need distinct in/out buffers.
        let l = Buffer::<CudaRuntime>::new_undefined(pl, dtype, &device)?;
        let linv = Buffer::<CudaRuntime>::new_undefined(pl, dtype, &device)?;
        unsafe {
            kernels::launch_cholesky_packed(
                &self.context,
                &self.stream,
                self.device.index,
                dtype,
                a.storage().ptr(),
                l.ptr(),
                n,
            )?;
            kernels::launch_tp_invert(
                &self.context,
                &self.stream,
                self.device.index,
                dtype,
                l.ptr(),
                linv.ptr(),
                n,
            )?;
            kernels::launch_sp_from_factor(
                &self.context,
                &self.stream,
                self.device.index,
                dtype,
                linv.ptr(),
                a.storage_mut().ptr(),
                n,
            )?;
        }
        Ok(())
    }

    fn tp_cholesky(
        &self,
        dst: &mut TriangularPacked<CudaRuntime>,
        src: &SymmetricPacked<CudaRuntime>,
    ) -> Result<()> {
        let n = src.num_rows();
        check_same_dim(dst.num_rows(), n)?;
        check_same_dtype(dst.dtype(), src.dtype())?;
        if n == 0 {
            return Ok(());
        }
        unsafe {
            kernels::launch_cholesky_packed(
                &self.context,
                &self.stream,
                self.device.index,
                src.dtype(),
                src.storage().ptr(),
                dst.storage_mut().ptr(),
                n,
            )
        }
    }

    fn tp_invert(&self, a: &mut TriangularPacked<CudaRuntime>) -> Result<()> {
        let n = a.num_rows();
        if n == 0 {
            return Ok(());
        }
        let dtype = a.dtype();
        let device = a.device().clone();

        // The substitution reads the original factor while writing the
        // inverse, so stage the input in a scratch buffer.
        let src = Buffer::<CudaRuntime>::new_undefined(a.storage().packed_len(), dtype, &device)?;
        CudaRuntime::copy_within_device(a.storage().ptr(), src.ptr(), src.size_bytes(), &device)?;
        unsafe {
            kernels::launch_tp_invert(
                &self.context,
                &self.stream,
                self.device.index,
                dtype,
                src.ptr(),
                a.storage_mut().ptr(),
                n,
            )
        }
    }

    fn tp_copy_from_mat(
        &self,
        dst: &mut TriangularPacked<CudaRuntime>,
        src: &DenseMatrix<CudaRuntime>,
        trans: Trans,
    ) -> Result<()> {
        let n = dst.num_rows();
        check_square_mat(src, n, dst.dtype())?;
        let op = match trans {
            Trans::NoTrans => "take_lower",
            Trans::Trans => "take_upper",
        };
        unsafe {
            kernels::launch_take_triangle(
                &self.context,
                &self.stream,
                self.device.index,
                op,
                dst.dtype(),
                src.ptr(),
                dst.storage_mut().ptr(),
                n,
            )
        }
    }

    fn tp_copy_to_mat(
        &self,
        src: &TriangularPacked<CudaRuntime>,
        dst: &mut DenseMatrix<CudaRuntime>,
    ) -> Result<()> {
        let n = src.num_rows();
        check_square_mat(dst, n, src.dtype())?;
        unsafe {
            kernels::launch_expand(
                &self.context,
                &self.stream,
                self.device.index,
                "expand_tp",
                src.dtype(),
                src.storage().ptr(),
                dst.ptr(),
                n,
            )
        }
    }
}
