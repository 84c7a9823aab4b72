//! Integration tests for symmetric packed matrices on the CPU backend

use packr::prelude::*;

fn cpu_client() -> (packr::runtime::cpu::CpuDevice, packr::runtime::cpu::CpuClient) {
    let device = CpuRuntime::default_device();
    let client = CpuRuntime::default_client(&device);
    (device, client)
}

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
}

fn sp_from(data: &[f64], n: usize) -> SymmetricPacked<CpuRuntime> {
    let device = CpuRuntime::default_device();
    let mut a = SymmetricPacked::new(n, DType::F64, &device);
    a.copy_from_slice(data).unwrap();
    a
}

#[test]
fn test_from_mat_take_lower_and_upper() {
    let (device, client) = cpu_client();
    // Deliberately asymmetric dense source.
    let dense = DenseMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0], 2, 2, &device);

    let lower = SymmetricPacked::from_mat(&client, &dense, SpCopyType::TakeLower).unwrap();
    assert_eq!(lower.to_vec::<f64>(), vec![1.0, 3.0, 4.0]);

    let upper = SymmetricPacked::from_mat(&client, &dense, SpCopyType::TakeUpper).unwrap();
    assert_eq!(upper.to_vec::<f64>(), vec![1.0, 2.0, 4.0]);
}

#[test]
fn test_from_mat_rejects_non_square() {
    let (device, client) = cpu_client();
    let dense = DenseMatrix::<CpuRuntime>::from_slice(&[1.0f64; 6], 2, 3, &device);
    assert!(SymmetricPacked::from_mat(&client, &dense, SpCopyType::TakeLower).is_err());
}

#[test]
fn test_to_mat_mirrors_lower_triangle() {
    let (_, client) = cpu_client();
    let a = sp_from(&[1.0, 2.0, 3.0], 2);
    let dense = a.to_mat(&client).unwrap();
    assert_eq!(dense.to_vec::<f64>(), vec![1.0, 2.0, 2.0, 3.0]);
}

#[test]
fn test_trace_sp_sp_weights_off_diagonal_twice() {
    let (_, client) = cpu_client();
    // A = [[1, 2], [2, 3]]: tr(A*A) = 1 + 4 + 4 + 9 = 18.
    let a = sp_from(&[1.0, 2.0, 3.0], 2);
    assert_close(trace_sp_sp(&client, &a, &a).unwrap(), 18.0, 1e-12);
}

#[test]
fn test_frobenius_norm_squares_to_self_trace() {
    let (_, client) = cpu_client();
    let a = sp_from(&[2.0, -1.0, 4.0, 0.5, 1.5, 3.0], 3);
    let norm = a.frobenius_norm(&client).unwrap();
    let trace = trace_sp_sp(&client, &a, &a).unwrap();
    assert_close(norm * norm, trace, 1e-10);
}

#[test]
fn test_trace_sp_sp_dimension_mismatch() {
    let (_, client) = cpu_client();
    let a = sp_from(&[1.0, 2.0, 3.0], 2);
    let b = sp_from(&[1.0], 1);
    assert!(trace_sp_sp(&client, &a, &b).is_err());
}

#[test]
fn test_set_unit_and_is_unit() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(3, DType::F64, &device);
    assert!(!a.is_unit(&client, 0.0).unwrap());

    a.set_unit(&client).unwrap();
    assert!(a.is_unit(&client, 0.0).unwrap());
    assert_eq!(a.to_vec::<f64>(), vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);

    // Perturb one off-diagonal entry beyond the tolerance.
    a.set(2, 0, 1e-3f64);
    assert!(!a.is_unit(&client, 1e-6).unwrap());
    assert!(a.is_unit(&client, 1e-2).unwrap());
}

#[test]
fn test_empty_matrix_is_unit() {
    let (device, client) = cpu_client();
    let a = SymmetricPacked::<CpuRuntime>::new(0, DType::F64, &device);
    assert!(a.is_unit(&client, 0.0).unwrap());
    assert_close(a.frobenius_norm(&client).unwrap(), 0.0, 0.0);
}

#[test]
fn test_approx_equal_is_reflexive_and_symmetric() {
    let (_, client) = cpu_client();
    let a = sp_from(&[1.0, 2.0, 3.0], 2);
    let mut b = sp_from(&[1.0, 2.0, 3.0], 2);
    b.set(1, 0, 2.0 + 5e-5);

    assert!(a.approx_equal(&client, &a, 0.0).unwrap());
    assert_eq!(
        a.approx_equal(&client, &b, 1e-4).unwrap(),
        b.approx_equal(&client, &a, 1e-4).unwrap()
    );
    assert!(!a.approx_equal(&client, &b, 1e-6).unwrap());
}

#[test]
fn test_add_vec2_rank_one_update() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(2, DType::F64, &device);
    let v = DenseVector::<CpuRuntime>::from_slice(&[2.0f64, 3.0], &device);

    a.add_vec2(&client, 0.5, &v).unwrap();
    // 0.5 * v v^T = [[2, 3], [3, 4.5]] over the stored triangle.
    assert_eq!(a.to_vec::<f64>(), vec![2.0, 3.0, 4.5]);
}

#[test]
fn test_add_vec2_dimension_mismatch() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(2, DType::F64, &device);
    let v = DenseVector::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &device);
    assert!(a.add_vec2(&client, 1.0, &v).is_err());
}

#[test]
fn test_add_mat2_no_trans() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(2, DType::F64, &device);
    a.copy_from_slice(&[1.0, 1.0, 1.0]).unwrap();

    // M is 2x3; M*M^T = [[14, 32], [32, 77]].
    let m = DenseMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3, &device);
    a.add_mat2(&client, 1.0, &m, Trans::NoTrans, 2.0).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![16.0, 34.0, 79.0]);
}

#[test]
fn test_add_mat2_trans() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(2, DType::F64, &device);

    // M is 3x2; M^T*M = [[35, 44], [44, 56]].
    let m = DenseMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2, &device);
    a.add_mat2(&client, 1.0, &m, Trans::Trans, 0.0).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![35.0, 44.0, 56.0]);
}

#[test]
fn test_add_mat2_shape_mismatch() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(2, DType::F64, &device);
    let m = DenseMatrix::<CpuRuntime>::from_slice(&[1.0f64; 6], 3, 2, &device);
    // NoTrans needs m.rows() == 2, but it is 3.
    assert!(a.add_mat2(&client, 1.0, &m, Trans::NoTrans, 0.0).is_err());
}

#[test]
fn test_add_sp_and_restore() {
    let (_, client) = cpu_client();
    let mut a = sp_from(&[4.0, 2.0, 3.0], 2);
    let b = sp_from(&[1.0, -1.0, 2.0], 2);

    a.add_sp(&client, 0.5, &b).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![4.5, 1.5, 4.0]);

    // Adding -0.5 * b restores the original entries exactly.
    a.add_sp(&client, -0.5, &b).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![4.0, 2.0, 3.0]);
}

#[test]
fn test_scale_and_diag_ops() {
    let (_, client) = cpu_client();
    let mut a = sp_from(&[1.0, 2.0, 3.0], 2);

    a.scale(&client, 2.0).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![2.0, 4.0, 6.0]);

    a.scale_diag(&client, 0.5).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![1.0, 4.0, 3.0]);

    a.add_to_diag(&client, 1.0).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![2.0, 4.0, 4.0]);

    a.set_diag(&client, 9.0).unwrap();
    assert_eq!(a.to_vec::<f64>(), vec![9.0, 4.0, 9.0]);

    assert_close(a.trace(&client).unwrap(), 18.0, 1e-12);
}

#[test]
fn test_invert_then_invert_restores() {
    let (_, client) = cpu_client();
    let original = [4.0, 2.0, 5.0, 1.0, 0.5, 6.0];
    let mut a = sp_from(&original, 3);

    a.invert(&client).unwrap();
    a.invert(&client).unwrap();

    let restored = a.to_vec::<f64>();
    for (x, y) in restored.iter().zip(original.iter()) {
        assert_close(*x, *y, 1e-10);
    }
}

#[test]
fn test_invert_matches_identity_product() {
    let (_, client) = cpu_client();
    let a = sp_from(&[4.0, 2.0, 3.0], 2);
    let mut inv = sp_from(&[4.0, 2.0, 3.0], 2);
    inv.invert(&client).unwrap();

    let ad = a.to_mat(&client).unwrap().to_vec::<f64>();
    let id = inv.to_mat(&client).unwrap().to_vec::<f64>();
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
fn test_f32_precision_path() {
    let (device, client) = cpu_client();
    let mut a = SymmetricPacked::<CpuRuntime>::new(2, DType::F32, &device);
    a.copy_from_slice(&[4.0f32, 2.0, 3.0]).unwrap();

    a.invert(&client).unwrap();
    a.invert(&client).unwrap();

    let restored = a.to_vec::<f32>();
    for (x, y) in restored.iter().zip([4.0f32, 2.0, 3.0].iter()) {
        assert!((x - y).abs() < 1e-4, "{} vs {}", x, y);
    }
}
