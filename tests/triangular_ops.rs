//! Integration tests for triangular packed matrices on the CPU backend

use packr::prelude::*;

fn cpu_client() -> (packr::runtime::cpu::CpuDevice, packr::runtime::cpu::CpuClient) {
    let device = CpuRuntime::default_device();
    let client = CpuRuntime::default_client(&device);
    (device, client)
}

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
}

#[test]
fn test_upper_triangle_reads_zero() {
    let device = CpuRuntime::default_device();
    let mut l = TriangularPacked::<CpuRuntime>::new(3, DType::F64, &device);
    l.set(2, 1, 5.0f64);

    assert_eq!(l.get::<f64>(2, 1), 5.0);
    // The transposed position is not the same entry; it does not exist.
    assert_eq!(l.get::<f64>(1, 2), 0.0);
}

#[test]
#[should_panic(expected = "upper-triangle")]
fn test_writing_upper_triangle_panics() {
    let device = CpuRuntime::default_device();
    let mut l = TriangularPacked::<CpuRuntime>::new(3, DType::F64, &device);
    l.set(1, 2, 1.0f64);
}

#[test]
fn test_cholesky_2x2() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(2, DType::F64, &device);
    a.copy_from_slice(&[4.0, 2.0, 3.0]).unwrap();

    let mut l = TriangularPacked::<CpuRuntime>::new(2, DType::F64, &device);
    l.cholesky(&client, &a).unwrap();

    // [[4, 2], [2, 3]] => L = [[2, 0], [1, sqrt(2)]].
    let got = l.to_vec::<f64>();
    assert_close(got[0], 2.0, 1e-12);
    assert_close(got[1], 1.0, 1e-12);
    assert_close(got[2], 2.0f64.sqrt(), 1e-12);
}

#[test]
fn test_cholesky_reconstructs_source() {
    let (device, client) = cpu_client();
    let src = [4.0, 2.0, 5.0, 1.0, 0.5, 6.0];
    let mut a = SymmetricPacked::<CpuRuntime>::new(3, DType::F64, &device);
    a.copy_from_slice(&src).unwrap();

    let mut l = TriangularPacked::<CpuRuntime>::new(3, DType::F64, &device);
    l.cholesky(&client, &a).unwrap();

    // L * L^T must reproduce the source entry-wise.
    for r in 0..3 {
        for c in 0..=r {
            let mut sum = 0.0;
            for k in 0..=c {
                sum += l.get::<f64>(r, k) * l.get::<f64>(c, k);
            }
            assert_close(sum, a.get::<f64>(r, c), 1e-10);
        }
    }
}

#[test]
fn test_cholesky_dimension_mismatch() {
    let (device, client) = cpu_client();
    let a = SymmetricPacked::<CpuRuntime>::new(3, DType::F64, &device);
    let mut l = TriangularPacked::<CpuRuntime>::new(2, DType::F64, &device);
    assert!(l.cholesky(&client, &a).is_err());
}

#[test]
fn test_invert_against_forward_product() {
    let (device, client) = cpu_client();
    let entries = [2.0, 1.0, 3.0, 0.5, -1.0, 4.0];
    let mut l = TriangularPacked::<CpuRuntime>::new(3, DType::F64, &device);
    l.copy_from_slice(&entries).unwrap();

    let mut inv = TriangularPacked::<CpuRuntime>::new(3, DType::F64, &device);
    inv.copy_from(&l).unwrap();
    inv.invert(&client).unwrap();

    // L * Linv must be the identity.
    for r in 0..3 {
        for c in 0..=r {
            let mut sum = 0.0;
            for k in c..=r {
                sum += l.get::<f64>(r, k) * inv.get::<f64>(k, c);
            }
            let expect = if r == c { 1.0 } else { 0.0 };
            assert_close(sum, expect, 1e-12);
        }
    }
}

#[test]
fn test_double_invert_restores() {
    let (device, client) = cpu_client();
    let entries = [2.0, 1.0, 3.0, 0.5, -1.0, 4.0];
    let mut l = TriangularPacked::<CpuRuntime>::new(3, DType::F64, &device);
    l.copy_from_slice(&entries).unwrap();

    l.invert(&client).unwrap();
    l.invert(&client).unwrap();

    for (x, y) in l.to_vec::<f64>().iter().zip(entries.iter()) {
        assert_close(*x, *y, 1e-4);
    }
}

#[test]
fn test_invert_empty_is_noop() {
    let (device, client) = cpu_client();
    let mut l = TriangularPacked::<CpuRuntime>::new(0, DType::F64, &device);
    l.invert(&client).unwrap();
    assert_eq!(l.num_rows(), 0);
}

#[test]
fn test_from_mat_no_trans_and_trans() {
    let (device, client) = cpu_client();
    let dense = DenseMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0], 2, 2, &device);

    let lower = TriangularPacked::from_mat(&client, &dense, Trans::NoTrans).unwrap();
    assert_eq!(lower.to_vec::<f64>(), vec![1.0, 3.0, 4.0]);

    // Trans takes the upper triangle, transposed into lower storage.
    let upper = TriangularPacked::from_mat(&client, &dense, Trans::Trans).unwrap();
    assert_eq!(upper.to_vec::<f64>(), vec![1.0, 2.0, 4.0]);
}

#[test]
fn test_to_mat_zeroes_upper_triangle() {
    let (device, client) = cpu_client();
    let mut l = TriangularPacked::<CpuRuntime>::new(2, DType::F64, &device);
    l.copy_from_slice(&[1.0, 2.0, 3.0]).unwrap();

    let dense = l.to_mat(&client).unwrap();
    assert_eq!(dense.to_vec::<f64>(), vec![1.0, 0.0, 2.0, 3.0]);
}

#[test]
fn test_whitening_pipeline() {
    // The canonical consumer chain: factor a covariance, invert the factor,
    // and check that Linv * A * Linv^T is the identity.
    let (device, client) = cpu_client();
    let src = [4.0, 2.0, 5.0, 1.0, 0.5, 6.0];
    let mut a = SymmetricPacked::<CpuRuntime>::new(3, DType::F64, &device);
    a.copy_from_slice(&src).unwrap();

    let mut l = TriangularPacked::<CpuRuntime>::new(3, DType::F64, &device);
    l.cholesky(&client, &a).unwrap();
    l.invert(&client).unwrap();

    let ad = a.to_mat(&client).unwrap().to_vec::<f64>();
    let ld = l.to_mat(&client).unwrap().to_vec::<f64>();
    let n = 3;
    // tmp = Linv * A
    let mut tmp = vec![0.0; n * n];
    for r in 0..n {
        for c in 0..n {
            for k in 0..n {
                tmp[r * n + c] += ld[r * n + k] * ad[k * n + c];
            }
        }
    }
    // out = tmp * Linv^T
    for r in 0..n {
        for c in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += tmp[r * n + k] * ld[c * n + k];
            }
            let expect = if r == c { 1.0 } else { 0.0 };
            assert_close(sum, expect, 1e-10);
        }
    }
}
