//! Launchers for the packed-matrix CUDA kernels
//!
//! Every launcher resolves its kernel from the `packed` PTX module, keyed by
//! dtype suffix, and launches on the caller's stream. Scalars are converted
//! to the element type on the host so each kernel takes its natural typed
//! arguments.
//!
//! All functions are unsafe: the caller must pass valid device pointers with
//! the advertised extents, allocated on the same device as `context`.

use cudarc::driver::PushKernelArg;
use cudarc::driver::safe::{CudaContext, CudaStream};
use std::sync::Arc;

use super::loader::{
    BLOCK_SIZE, PACKED_MODULE, elementwise_launch_config, get_kernel_function, get_or_load_module,
    kernel_name, launch_config,
};
use crate::dispatch_float;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};

fn launch_err(op: &str, e: impl std::fmt::Debug) -> Error {
    Error::Internal(format!("CUDA packed kernel '{}' launch failed: {:?}", op, e))
}

/// Scale `numel` packed elements in place by `alpha`.
pub unsafe fn launch_packed_scale(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    dtype: DType,
    data: u64,
    alpha: f64,
    numel: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name("scale_packed", dtype))?;
    let cfg = launch_config(elementwise_launch_config(numel), (BLOCK_SIZE, 1, 1), 0);
    let n = numel as u32;
    dispatch_float!(dtype, T => {
        let alpha_t = <T as Element>::from_f64(alpha);
        let mut builder = stream.launch_builder(&func);
        builder.arg(&data);
        builder.arg(&alpha_t);
        builder.arg(&n);
        unsafe { builder.launch(cfg) }.map_err(|e| launch_err("scale_packed", e))?;
    });
    Ok(())
}

/// `dst += alpha * src` over `numel` packed elements.
pub unsafe fn launch_packed_axpy(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    dtype: DType,
    dst: u64,
    src: u64,
    alpha: f64,
    numel: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name("axpy_packed", dtype))?;
    let cfg = launch_config(elementwise_launch_config(numel), (BLOCK_SIZE, 1, 1), 0);
    let n = numel as u32;
    dispatch_float!(dtype, T => {
        let alpha_t = <T as Element>::from_f64(alpha);
        let mut builder = stream.launch_builder(&func);
        builder.arg(&dst);
        builder.arg(&src);
        builder.arg(&alpha_t);
        builder.arg(&n);
        unsafe { builder.launch(cfg) }.map_err(|e| launch_err("axpy_packed", e))?;
    });
    Ok(())
}

/// Diagonal kernels: `op` is one of `set_diag_packed`, `scale_diag_packed`,
/// `add_diag_packed`. One thread per diagonal entry.
pub unsafe fn launch_packed_diag(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    op: &str,
    dtype: DType,
    data: u64,
    value: f64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name(op, dtype))?;
    let cfg = launch_config(elementwise_launch_config(num_rows), (BLOCK_SIZE, 1, 1), 0);
    let n = num_rows as u32;
    dispatch_float!(dtype, T => {
        let value_t = <T as Element>::from_f64(value);
        let mut builder = stream.launch_builder(&func);
        builder.arg(&data);
        builder.arg(&value_t);
        builder.arg(&n);
        unsafe { builder.launch(cfg) }.map_err(|e| launch_err(op, e))?;
    });
    Ok(())
}

/// Triangle extraction from a row-major dense source: `op` is `take_lower`
/// or `take_upper`. One thread per packed element.
pub unsafe fn launch_take_triangle(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    op: &str,
    dtype: DType,
    src_dense: u64,
    dst_packed: u64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name(op, dtype))?;
    let numel = num_rows * (num_rows + 1) / 2;
    let cfg = launch_config(elementwise_launch_config(numel), (BLOCK_SIZE, 1, 1), 0);
    let n = num_rows as u32;
    let mut builder = stream.launch_builder(&func);
    builder.arg(&src_dense);
    builder.arg(&dst_packed);
    builder.arg(&n);
    unsafe { builder.launch(cfg) }.map_err(|e| launch_err(op, e))?;
    Ok(())
}

/// Expansion into a row-major dense destination: `op` is `expand_sp`
/// (mirrored) or `expand_tp` (zero upper triangle). One thread per dense
/// element.
pub unsafe fn launch_expand(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    op: &str,
    dtype: DType,
    src_packed: u64,
    dst_dense: u64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name(op, dtype))?;
    let numel = num_rows * num_rows;
    let cfg = launch_config(elementwise_launch_config(numel), (BLOCK_SIZE, 1, 1), 0);
    let n = num_rows as u32;
    let mut builder = stream.launch_builder(&func);
    builder.arg(&src_packed);
    builder.arg(&dst_dense);
    builder.arg(&n);
    unsafe { builder.launch(cfg) }.map_err(|e| launch_err(op, e))?;
    Ok(())
}

/// Rank-1 update `A += alpha * v * v^T`. One thread per packed element.
pub unsafe fn launch_add_vec2(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    dtype: DType,
    a: u64,
    v: u64,
    alpha: f64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name("add_vec2_packed", dtype))?;
    let numel = num_rows * (num_rows + 1) / 2;
    let cfg = launch_config(elementwise_launch_config(numel), (BLOCK_SIZE, 1, 1), 0);
    let n = num_rows as u32;
    dispatch_float!(dtype, T => {
        let alpha_t = <T as Element>::from_f64(alpha);
        let mut builder = stream.launch_builder(&func);
        builder.arg(&a);
        builder.arg(&v);
        builder.arg(&alpha_t);
        builder.arg(&n);
        unsafe { builder.launch(cfg) }.map_err(|e| launch_err("add_vec2_packed", e))?;
    });
    Ok(())
}

/// Rank-k update `A = beta*A + alpha*op(M)*op(M)^T`. One thread per packed
/// element; each thread runs the inner-product loop for its entry.
#[allow(clippy::too_many_arguments)]
pub unsafe fn launch_add_mat2(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    dtype: DType,
    a: u64,
    m: u64,
    m_rows: usize,
    m_cols: usize,
    transposed: bool,
    alpha: f64,
    beta: f64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name("add_mat2_packed", dtype))?;
    let numel = num_rows * (num_rows + 1) / 2;
    let cfg = launch_config(elementwise_launch_config(numel), (BLOCK_SIZE, 1, 1), 0);
    let rows = m_rows as u32;
    let cols = m_cols as u32;
    let trans = transposed as u32;
    let n = num_rows as u32;
    dispatch_float!(dtype, T => {
        let alpha_t = <T as Element>::from_f64(alpha);
        let beta_t = <T as Element>::from_f64(beta);
        let mut builder = stream.launch_builder(&func);
        builder.arg(&a);
        builder.arg(&m);
        builder.arg(&rows);
        builder.arg(&cols);
        builder.arg(&trans);
        builder.arg(&alpha_t);
        builder.arg(&beta_t);
        builder.arg(&n);
        unsafe { builder.launch(cfg) }.map_err(|e| launch_err("add_mat2_packed", e))?;
    });
    Ok(())
}

/// Packed Cholesky factorization `dst = chol(src)`.
///
/// Single-block kernel: columns are processed sequentially, rows within a
/// column in parallel. Launch order on the stream serializes it against the
/// surrounding operations.
pub unsafe fn launch_cholesky_packed(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    dtype: DType,
    src: u64,
    dst: u64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name("cholesky_packed", dtype))?;
    let cfg = launch_config((1, 1, 1), (BLOCK_SIZE, 1, 1), 0);
    let n = num_rows as u32;
    let mut builder = stream.launch_builder(&func);
    builder.arg(&src);
    builder.arg(&dst);
    builder.arg(&n);
    unsafe { builder.launch(cfg) }.map_err(|e| launch_err("cholesky_packed", e))?;
    Ok(())
}

/// Triangular inversion `dst = src^-1` for a packed lower factor.
///
/// Columns of the inverse are independent; one thread per column runs the
/// forward substitution.
pub unsafe fn launch_tp_invert(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    dtype: DType,
    src: u64,
    dst: u64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name("tp_invert_packed", dtype))?;
    let cfg = launch_config(elementwise_launch_config(num_rows), (BLOCK_SIZE, 1, 1), 0);
    let n = num_rows as u32;
    let mut builder = stream.launch_builder(&func);
    builder.arg(&src);
    builder.arg(&dst);
    builder.arg(&n);
    unsafe { builder.launch(cfg) }.map_err(|e| launch_err("tp_invert_packed", e))?;
    Ok(())
}

/// Assemble `dst = Linv^T * Linv` in packed storage from an inverted lower
/// factor. One thread per packed element.
pub unsafe fn launch_sp_from_factor(
    context: &Arc<CudaContext>,
    stream: &CudaStream,
    device_index: usize,
    dtype: DType,
    linv: u64,
    dst: u64,
    num_rows: usize,
) -> Result<()> {
    let module = get_or_load_module(context, device_index, PACKED_MODULE)?;
    let func = get_kernel_function(&module, &kernel_name("sp_from_factor", dtype))?;
    let numel = num_rows * (num_rows + 1) / 2;
    let cfg = launch_config(elementwise_launch_config(numel), (BLOCK_SIZE, 1, 1), 0);
    let n = num_rows as u32;
    let mut builder = stream.launch_builder(&func);
    builder.arg(&linv);
    builder.arg(&dst);
    builder.arg(&n);
    unsafe { builder.launch(cfg) }.map_err(|e| launch_err("sp_from_factor", e))?;
    Ok(())
}
