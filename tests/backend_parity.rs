//! CPU/CUDA backend parity tests
//!
//! Every test builds the same inputs on both backends, runs the same
//! operation, and compares the packed results element-wise. Tests skip
//! cleanly when no CUDA device is present.

#![cfg(feature = "cuda")]

use packr::prelude::*;
use packr::runtime::cuda::is_cuda_available;

fn assert_parity_f64(a: &[f64], b: &[f64], op: &str) {
    let rtol = 1e-12f64;
    let atol = 1e-14f64;
    assert_eq!(
        a.len(),
        b.len(),
        "parity_f64[{}]: length mismatch: {} vs {}",
        op,
        a.len(),
        b.len()
    );

    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();

        if diff > tol {
            panic!(
                "parity_f64[{}] at index {}: {} vs {} (diff={}, tol={})",
                op, i, x, y, diff, tol
            );
        }
    }
}

fn assert_parity_f32(a: &[f32], b: &[f32], op: &str) {
    let rtol = 1e-5f32;
    let atol = 1e-7f32;
    assert_eq!(a.len(), b.len(), "parity_f32[{}]: length mismatch", op);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        if diff > tol {
            panic!(
                "parity_f32[{}] at index {}: {} vs {} (diff={}, tol={})",
                op, i, x, y, diff, tol
            );
        }
    }
}

/// A well-conditioned positive-definite test matrix in packed storage:
/// diagonally dominant with varied off-diagonal entries.
fn pd_packed(n: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(n * (n + 1) / 2);
    for r in 0..n {
        for c in 0..=r {
            if r == c {
                data.push(n as f64 + 1.0 + r as f64);
            } else {
                data.push(0.3 * ((r * 31 + c * 17) % 7) as f64 / 7.0 - 0.1);
            }
        }
    }
    data
}

fn cpu_pair() -> (packr::runtime::cpu::CpuDevice, packr::runtime::cpu::CpuClient) {
    let device = CpuRuntime::default_device();
    let client = CpuRuntime::default_client(&device);
    (device, client)
}

fn cuda_pair() -> (
    packr::runtime::cuda::CudaDevice,
    packr::runtime::cuda::CudaClient,
) {
    let device = CudaRuntime::default_device();
    let client = CudaRuntime::default_client(&device);
    (device, client)
}

macro_rules! skip_without_cuda {
    () => {
        if !is_cuda_available() {
            eprintln!("skipping: no CUDA device available");
            return;
        }
    };
}

#[test]
fn test_parity_roundtrip_through_device() {
    skip_without_cuda!();
    let (cuda_dev, _) = cuda_pair();
    let host_dev = CpuRuntime::default_device();

    let data = pd_packed(8);
    let mut host = SymmetricPacked::<CpuRuntime>::new(8, DType::F64, &host_dev);
    host.copy_from_slice(&data).unwrap();

    let dev = SymmetricPacked::<CudaRuntime>::from_host(&host, &cuda_dev).unwrap();
    let back = dev.to_host().unwrap();
    assert_parity_f64(&back.to_vec::<f64>(), &data, "roundtrip");
}

#[test]
fn test_parity_cholesky() {
    skip_without_cuda!();
    let (cpu_dev, cpu) = cpu_pair();
    let (cuda_dev, cuda) = cuda_pair();
    let n = 16;
    let data = pd_packed(n);

    let mut a_cpu = SymmetricPacked::<CpuRuntime>::new(n, DType::F64, &cpu_dev);
    a_cpu.copy_from_slice(&data).unwrap();
    let mut l_cpu = TriangularPacked::<CpuRuntime>::new(n, DType::F64, &cpu_dev);
    l_cpu.cholesky(&cpu, &a_cpu).unwrap();

    let a_cuda = SymmetricPacked::<CudaRuntime>::from_host(&a_cpu, &cuda_dev).unwrap();
    let mut l_cuda = TriangularPacked::<CudaRuntime>::new(n, DType::F64, &cuda_dev);
    l_cuda.cholesky(&cuda, &a_cuda).unwrap();

    assert_parity_f64(
        &l_cuda.to_host().unwrap().to_vec::<f64>(),
        &l_cpu.to_vec::<f64>(),
        "cholesky",
    );
}

#[test]
fn test_parity_tp_invert() {
    skip_without_cuda!();
    let (cpu_dev, cpu) = cpu_pair();
    let (cuda_dev, cuda) = cuda_pair();
    let n = 12;
    let data = pd_packed(n);

    let mut a = SymmetricPacked::<CpuRuntime>::new(n, DType::F64, &cpu_dev);
    a.copy_from_slice(&data).unwrap();
    let mut l_cpu = TriangularPacked::<CpuRuntime>::new(n, DType::F64, &cpu_dev);
    l_cpu.cholesky(&cpu, &a).unwrap();

    let mut l_cuda =
        TriangularPacked::<CudaRuntime>::from_host(&l_cpu, &cuda_dev).unwrap();

    l_cpu.invert(&cpu).unwrap();
    l_cuda.invert(&cuda).unwrap();

    assert_parity_f64(
        &l_cuda.to_host().unwrap().to_vec::<f64>(),
        &l_cpu.to_vec::<f64>(),
        "tp_invert",
    );
}

#[test]
fn test_parity_sp_invert() {
    skip_without_cuda!();
    let (cpu_dev, cpu) = cpu_pair();
    let (cuda_dev, cuda) = cuda_pair();
    let n = 10;
    let data = pd_packed(n);

    let mut a_cpu = SymmetricPacked::<CpuRuntime>::new(n, DType::F64, &cpu_dev);
    a_cpu.copy_from_slice(&data).unwrap();
    let mut a_cuda =
        SymmetricPacked::<CudaRuntime>::from_host(&a_cpu, &cuda_dev).unwrap();

    a_cpu.invert(&cpu).unwrap();
    a_cuda.invert(&cuda).unwrap();

    assert_parity_f64(
        &a_cuda.to_host().unwrap().to_vec::<f64>(),
        &a_cpu.to_vec::<f64>(),
        "sp_invert",
    );
}

#[test]
fn test_parity_add_vec2_and_add_mat2() {
    skip_without_cuda!();
    let (cpu_dev, cpu) = cpu_pair();
    let (cuda_dev, cuda) = cuda_pair();
    let n = 6;
    let data = pd_packed(n);
    let vdata: Vec<f64> = (0..n).map(|i| 0.25 * i as f64 - 0.5).collect();
    let mdata: Vec<f64> = (0..n * 3).map(|i| (i as f64).sin()).collect();

    let mut a_cpu = SymmetricPacked::<CpuRuntime>::new(n, DType::F64, &cpu_dev);
    a_cpu.copy_from_slice(&data).unwrap();
    let v_cpu = DenseVector::<CpuRuntime>::from_slice(&vdata, &cpu_dev);
    let m_cpu = DenseMatrix::<CpuRuntime>::from_slice(&mdata, n, 3, &cpu_dev);

    let mut a_cuda =
        SymmetricPacked::<CudaRuntime>::from_host(&a_cpu, &cuda_dev).unwrap();
    let v_cuda = DenseVector::<CudaRuntime>::from_slice(&vdata, &cuda_dev);
    let m_cuda = DenseMatrix::<CudaRuntime>::from_slice(&mdata, n, 3, &cuda_dev);

    a_cpu.add_vec2(&cpu, 0.7, &v_cpu).unwrap();
    a_cuda.add_vec2(&cuda, 0.7, &v_cuda).unwrap();

    a_cpu.add_mat2(&cpu, 1.3, &m_cpu, Trans::NoTrans, 0.5).unwrap();
    a_cuda
        .add_mat2(&cuda, 1.3, &m_cuda, Trans::NoTrans, 0.5)
        .unwrap();

    assert_parity_f64(
        &a_cuda.to_host().unwrap().to_vec::<f64>(),
        &a_cpu.to_vec::<f64>(),
        "add_vec2+add_mat2",
    );
}

#[test]
fn test_parity_triangle_extraction_and_expansion() {
    skip_without_cuda!();
    let (cpu_dev, cpu) = cpu_pair();
    let (cuda_dev, cuda) = cuda_pair();
    let n = 5;
    let dense: Vec<f64> = (0..n * n).map(|i| i as f64 * 0.5 - 3.0).collect();

    let d_cpu = DenseMatrix::<CpuRuntime>::from_slice(&dense, n, n, &cpu_dev);
    let d_cuda = DenseMatrix::<CudaRuntime>::from_slice(&dense, n, n, &cuda_dev);

    for copy_type in [SpCopyType::TakeLower, SpCopyType::TakeUpper] {
        let sp_cpu = SymmetricPacked::from_mat(&cpu, &d_cpu, copy_type).unwrap();
        let sp_cuda = SymmetricPacked::from_mat(&cuda, &d_cuda, copy_type).unwrap();
        assert_parity_f64(
            &sp_cuda.to_host().unwrap().to_vec::<f64>(),
            &sp_cpu.to_vec::<f64>(),
            "sp_copy_from_mat",
        );

        let back_cpu = sp_cpu.to_mat(&cpu).unwrap().to_vec::<f64>();
        let back_cuda = sp_cuda.to_mat(&cuda).unwrap().to_vec::<f64>();
        assert_parity_f64(&back_cuda, &back_cpu, "sp_copy_to_mat");
    }

    for trans in [Trans::NoTrans, Trans::Trans] {
        let tp_cpu = TriangularPacked::from_mat(&cpu, &d_cpu, trans).unwrap();
        let tp_cuda = TriangularPacked::from_mat(&cuda, &d_cuda, trans).unwrap();
        assert_parity_f64(
            &tp_cuda.to_host().unwrap().to_vec::<f64>(),
            &tp_cpu.to_vec::<f64>(),
            "tp_copy_from_mat",
        );

        let back_cpu = tp_cpu.to_mat(&cpu).unwrap().to_vec::<f64>();
        let back_cuda = tp_cuda.to_mat(&cuda).unwrap().to_vec::<f64>();
        assert_parity_f64(&back_cuda, &back_cpu, "tp_copy_to_mat");
    }
}

#[test]
fn test_parity_scalar_reductions_match_exactly() {
    skip_without_cuda!();
    let (cpu_dev, cpu) = cpu_pair();
    let (cuda_dev, cuda) = cuda_pair();
    let n = 9;
    let data = pd_packed(n);

    let mut a_cpu = SymmetricPacked::<CpuRuntime>::new(n, DType::F64, &cpu_dev);
    a_cpu.copy_from_slice(&data).unwrap();
    let a_cuda =
        SymmetricPacked::<CudaRuntime>::from_host(&a_cpu, &cuda_dev).unwrap();

    // Both backends reduce on the host over identical bytes, so these are
    // bit-equal, not merely close.
    assert_eq!(
        trace_sp_sp(&cpu, &a_cpu, &a_cpu).unwrap(),
        trace_sp_sp(&cuda, &a_cuda, &a_cuda).unwrap()
    );
    assert_eq!(
        a_cpu.trace(&cpu).unwrap(),
        a_cuda.trace(&cuda).unwrap()
    );
    assert_eq!(
        a_cpu.frobenius_norm(&cpu).unwrap(),
        a_cuda.frobenius_norm(&cuda).unwrap()
    );
}

#[test]
fn test_parity_f32_cholesky() {
    skip_without_cuda!();
    let (cpu_dev, cpu) = cpu_pair();
    let (cuda_dev, cuda) = cuda_pair();
    let n = 8;
    let data: Vec<f32> = pd_packed(n).iter().map(|&x| x as f32).collect();

    let mut a_cpu = SymmetricPacked::<CpuRuntime>::new(n, DType::F32, &cpu_dev);
    a_cpu.copy_from_slice(&data).unwrap();
    let mut l_cpu = TriangularPacked::<CpuRuntime>::new(n, DType::F32, &cpu_dev);
    l_cpu.cholesky(&cpu, &a_cpu).unwrap();

    let a_cuda =
        SymmetricPacked::<CudaRuntime>::from_host(&a_cpu, &cuda_dev).unwrap();
    let mut l_cuda = TriangularPacked::<CudaRuntime>::new(n, DType::F32, &cuda_dev);
    l_cuda.cholesky(&cuda, &a_cuda).unwrap();

    assert_parity_f32(
        &l_cuda.to_host().unwrap().to_vec::<f32>(),
        &l_cpu.to_vec::<f32>(),
        "cholesky_f32",
    );
}
