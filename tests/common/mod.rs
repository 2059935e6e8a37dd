//! Common test utilities
#![allow(dead_code)]

use samplegrad::runtime::{CpuClient, CpuConfig};
use samplegrad::tensor::Tensor;

/// Create a CPU client for testing
///
/// Also installs `env_logger` once so `RUST_LOG=samplegrad=trace` shows
/// dispatch and backward logs.
pub fn create_cpu_client() -> CpuClient {
    let _ = env_logger::builder().is_test(true).try_init();
    CpuClient::with_config(CpuConfig::from_env())
}

/// Deterministic, non-constant test data in roughly [-1.5, 1.5]
pub fn test_data(len: usize, seed: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = (i * 7 + seed * 13) as f32;
            (t * 0.37).sin() + 0.5 * (t * 0.11).cos()
        })
        .collect()
}

/// Deterministic f32 tensor of the given shape
pub fn test_tensor(shape: &[usize], seed: usize) -> Tensor {
    let len = shape.iter().product();
    Tensor::from_slice(&test_data(len, seed), shape)
}

/// Reference per-sample gradients of group norm's affine parameters
///
/// Returns `(weight_grad_sample, bias_grad_sample)`, each `[N, C]` row-major,
/// computed directly in f64.
pub fn reference_per_sample_grads(
    input: &[f32],
    grad_output: &[f32],
    shape: &[usize],
    num_groups: usize,
    eps: f64,
) -> (Vec<f64>, Vec<f64>) {
    let (n, c) = (shape[0], shape[1]);
    let hxw: usize = shape[2..].iter().product();
    let channels_per_group = c / num_groups;
    let group_len = channels_per_group * hxw;

    let mut weight = vec![0.0f64; n * c];
    let mut bias = vec![0.0f64; n * c];
    for sample in 0..n {
        for group in 0..num_groups {
            let start = sample * c * hxw + group * group_len;
            let values = &input[start..start + group_len];
            let mean = values.iter().map(|&v| v as f64).sum::<f64>() / group_len as f64;
            let var = values
                .iter()
                .map(|&v| (v as f64 - mean).powi(2))
                .sum::<f64>()
                / group_len as f64;
            let rstd = 1.0 / (var + eps).sqrt();

            for ch in 0..channels_per_group {
                let channel = group * channels_per_group + ch;
                for s in 0..hxw {
                    let idx = start + ch * hxw + s;
                    let normalized = (input[idx] as f64 - mean) * rstd;
                    weight[sample * c + channel] += normalized * grad_output[idx] as f64;
                    bias[sample * c + channel] += grad_output[idx] as f64;
                }
            }
        }
    }
    (weight, bias)
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Widen f32 data for comparison against f64 references
pub fn widen(data: &[f32]) -> Vec<f64> {
    data.iter().map(|&v| v as f64).collect()
}
