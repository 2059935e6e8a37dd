//! Integration tests for per-sample group-norm gradients
//!
//! Tests verify:
//! - grad_sample values against a direct reference computation
//! - consistency with the standard batched path (input grad, summed weight grads)
//! - argument validation and mixed-argument behavior
//! - accumulation when one weight is used twice

mod common;

use common::{
    assert_allclose_f32, assert_allclose_f64, create_cpu_client, reference_per_sample_grads,
    test_data, test_tensor, widen,
};
use samplegrad::autograd::{apply, backward, backward_with_grad, var_add, var_group_norm, var_sum, Var};
use samplegrad::dtype::DType;
use samplegrad::error::{Error, Result};
use samplegrad::expanded_weights::{
    group_norm, ExpandedArg, ExpandedWeight, GroupNormPerSampleGrad, DEFAULT_EPS,
};
use samplegrad::ops::{
    BinaryOps, EinsumOps, GroupNormGrads, GroupNormStats, NormalizationOps, ReduceOps,
};
use samplegrad::runtime::CpuClient;
use samplegrad::tensor::Tensor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn expanded(shape: &[usize], seed: usize, batch_size: usize) -> ExpandedWeight {
    let weight = Var::new(test_tensor(shape, seed), true);
    ExpandedWeight::new(weight, batch_size).unwrap()
}

fn check_against_reference(shape: &[usize], num_groups: usize) {
    let client = create_cpu_client();
    let (n, c) = (shape[0], shape[1]);

    let x = Var::new(test_tensor(shape, 1), true);
    let weight = expanded(&[c], 2, n);
    let bias = expanded(&[c], 3, n);
    let grad_output = test_tensor(shape, 4);

    let y = group_norm(&client, &x, num_groups, &weight, &bias, DEFAULT_EPS).unwrap();
    assert_eq!(y.shape(), shape);
    backward_with_grad(&y, grad_output.clone(), &client).unwrap();

    let (want_w, want_b) = reference_per_sample_grads(
        &x.tensor().to_vec::<f32>(),
        &grad_output.to_vec::<f32>(),
        shape,
        num_groups,
        DEFAULT_EPS,
    );

    let gw = weight.grad_sample().unwrap();
    let gb = bias.grad_sample().unwrap();
    assert_eq!(gw.shape(), &[n, c]);
    assert_eq!(gb.shape(), &[n, c]);
    assert_allclose_f64(&widen(&gw.to_vec::<f32>()), &want_w, 1e-4, 1e-4, "weight grad_sample");
    assert_allclose_f64(&widen(&gb.to_vec::<f32>()), &want_b, 1e-5, 1e-5, "bias grad_sample");
}

#[test]
fn test_grad_sample_matches_reference() {
    check_against_reference(&[4, 6, 8], 2);
}

#[test]
fn test_grad_sample_single_group() {
    check_against_reference(&[3, 4, 5], 1);
}

#[test]
fn test_grad_sample_spatial_2d() {
    check_against_reference(&[2, 6, 3, 4], 3);
}

#[test]
fn test_grad_sample_no_spatial_dims() {
    check_against_reference(&[5, 4], 4);
}

#[test]
fn test_grad_sample_matches_batch_of_one() {
    let client = create_cpu_client();
    let shape = [3, 4, 6];
    let sample_len = 4 * 6;

    let x_data = test_data(3 * sample_len, 5);
    let go_data = test_data(3 * sample_len, 6);
    let w_tensor = test_tensor(&[4], 7);

    let x = Var::new(Tensor::from_slice(&x_data, &shape), true);
    let weight = ExpandedWeight::new(Var::new(w_tensor.clone(), true), 3).unwrap();
    let y = group_norm(&client, &x, 2, &weight, ExpandedArg::None, DEFAULT_EPS).unwrap();
    backward_with_grad(&y, Tensor::from_slice(&go_data, &shape), &client).unwrap();
    let grad_sample = weight.grad_sample().unwrap().to_vec::<f32>();

    for i in 0..3 {
        let range = i * sample_len..(i + 1) * sample_len;
        let xi = Var::new(Tensor::from_slice(&x_data[range.clone()], &[1, 4, 6]), false);
        let wi = Var::new(w_tensor.clone(), true);
        let yi = var_group_norm(&xi, 2, Some(&wi), None, DEFAULT_EPS, &client).unwrap();
        let grads =
            backward_with_grad(&yi, Tensor::from_slice(&go_data[range], &[1, 4, 6]), &client)
                .unwrap();
        let expected = grads.get(wi.id()).unwrap().to_vec::<f32>();
        assert_allclose_f32(&grad_sample[i * 4..(i + 1) * 4], &expected, 1e-4, 1e-5, "sample");
    }
}

#[test]
fn test_input_grad_and_summed_grads_match_batched_path() {
    let client = create_cpu_client();
    let shape = [4, 6, 8];
    let grad_output = test_tensor(&shape, 9);

    // per-sample path
    let x = Var::new(test_tensor(&shape, 8), true);
    let weight = expanded(&[6], 10, 4);
    let bias = expanded(&[6], 11, 4);
    let y = group_norm(&client, &x, 2, &weight, &bias, DEFAULT_EPS).unwrap();
    let grads = backward_with_grad(&y, grad_output.clone(), &client).unwrap();

    // batched path on the same values
    let xb = Var::new(x.tensor().clone(), true);
    let wb = Var::new(weight.weight().tensor().clone(), true);
    let bb = Var::new(bias.weight().tensor().clone(), true);
    let yb = var_group_norm(&xb, 2, Some(&wb), Some(&bb), DEFAULT_EPS, &client).unwrap();
    let grads_b = backward_with_grad(&yb, grad_output, &client).unwrap();

    assert_allclose_f32(
        &y.tensor().to_vec::<f32>(),
        &yb.tensor().to_vec::<f32>(),
        1e-6,
        1e-6,
        "forward output",
    );
    assert_allclose_f32(
        &grads.get(x.id()).unwrap().to_vec::<f32>(),
        &grads_b.get(xb.id()).unwrap().to_vec::<f32>(),
        1e-4,
        1e-5,
        "input grad",
    );

    let summed_w = client.sum(&weight.grad_sample().unwrap(), &[0], false).unwrap();
    let summed_b = client.sum(&bias.grad_sample().unwrap(), &[0], false).unwrap();
    assert_allclose_f32(
        &summed_w.to_vec::<f32>(),
        &grads_b.get(wb.id()).unwrap().to_vec::<f32>(),
        1e-4,
        1e-4,
        "summed weight grad_sample",
    );
    assert_allclose_f32(
        &summed_b.to_vec::<f32>(),
        &grads_b.get(bb.id()).unwrap().to_vec::<f32>(),
        1e-5,
        1e-5,
        "summed bias grad_sample",
    );

    // expanded weights receive no aggregated gradient
    assert!(grads.get(weight.weight().id()).is_none());
    assert!(grads.get(bias.weight().id()).is_none());
}

#[test]
fn test_scalar_loss_backward() {
    let client = create_cpu_client();
    let x = Var::new(test_tensor(&[2, 4, 3], 12), true);
    let bias = expanded(&[4], 13, 2);

    let y = group_norm(&client, &x, 2, ExpandedArg::None, &bias, DEFAULT_EPS).unwrap();
    let loss = var_sum(&y, &[0, 1, 2], false, &client).unwrap();
    let grads = backward(&loss, &client).unwrap();

    assert_eq!(bias.grad_sample().unwrap().to_vec::<f32>(), vec![3.0; 8]);
    // the sum of a normalized group does not depend on the input
    let gx = grads.get(x.id()).unwrap().to_vec::<f32>();
    assert!(gx.iter().all(|g| g.abs() < 1e-4));
}

#[test]
fn test_sum_loss_grad_samples() {
    let client = create_cpu_client();
    let shape = [4, 6, 8];
    let x = Var::new(test_tensor(&shape, 30), true);
    let weight = expanded(&[6], 31, 4);
    let bias = expanded(&[6], 32, 4);

    let y = group_norm(&client, &x, 2, &weight, &bias, DEFAULT_EPS).unwrap();
    let loss = var_sum(&y, &[0, 1, 2], false, &client).unwrap();
    backward(&loss, &client).unwrap();

    let gb = bias.grad_sample().unwrap();
    assert_eq!(gb.shape(), &[4, 6]);
    assert_eq!(gb.to_vec::<f32>(), vec![8.0; 24]);

    // each entry is the spatial sum of the normalized input
    let ones = vec![1.0f32; 4 * 6 * 8];
    let (want_w, _) = reference_per_sample_grads(
        &x.tensor().to_vec::<f32>(),
        &ones,
        &shape,
        2,
        DEFAULT_EPS,
    );
    let gw = widen(&weight.grad_sample().unwrap().to_vec::<f32>());
    assert_allclose_f64(&gw, &want_w, 1e-4, 1e-4, "weight grad_sample");

    // a normalized group sums to zero, so its channels cancel
    for row in gw.chunks(3) {
        assert!(row.iter().sum::<f64>().abs() < 1e-3);
    }
}

#[test]
fn test_plain_weight_without_grad_gets_no_grad_sample() {
    let client = create_cpu_client();
    let x = Var::new(test_tensor(&[2, 4, 3], 14), true);
    let weight = Var::new(test_tensor(&[4], 15), false);
    let bias = expanded(&[4], 16, 2);

    let y = group_norm(&client, &x, 2, &weight, &bias, DEFAULT_EPS).unwrap();
    let grads = backward_with_grad(&y, test_tensor(&[2, 4, 3], 17), &client).unwrap();

    assert!(grads.get(x.id()).is_some());
    assert!(grads.get(weight.id()).is_none());
    assert_eq!(bias.grad_sample().unwrap().shape(), &[2, 4]);
}

#[test]
fn test_plain_weight_requiring_grad_is_rejected() {
    let client = create_cpu_client();
    let x = Var::new(test_tensor(&[2, 4, 3], 18), true);
    let weight = Var::new(test_tensor(&[4], 19), true);
    let bias = expanded(&[4], 20, 2);

    let y = group_norm(&client, &x, 2, &weight, &bias, DEFAULT_EPS).unwrap();
    let err = backward_with_grad(&y, test_tensor(&[2, 4, 3], 21), &client).unwrap_err();
    assert!(matches!(err, Error::NotImplemented { .. }));
}

#[test]
fn test_batch_size_mismatch() {
    let client = create_cpu_client();
    let x = Var::new(test_tensor(&[4, 6, 8], 22), true);
    let weight = expanded(&[6], 23, 3);

    let err = group_norm(&client, &x, 2, &weight, ExpandedArg::None, DEFAULT_EPS).unwrap_err();
    assert!(matches!(
        err,
        Error::BatchSizeMismatch {
            input: 4,
            expanded: 3,
            ..
        }
    ));
    assert!(weight.grad_sample().is_none());
}

#[test]
fn test_invalid_inputs() {
    let client = create_cpu_client();
    let weight = expanded(&[6], 24, 4);

    // channels not divisible by groups
    let x = Var::new(test_tensor(&[4, 6, 8], 25), true);
    assert!(group_norm(&client, &x, 4, &weight, ExpandedArg::None, DEFAULT_EPS).is_err());

    // zero-dimensional input
    let scalar = Var::new(Tensor::from_slice(&[1.0f32], &[]), true);
    assert!(group_norm(&client, &scalar, 1, &weight, ExpandedArg::None, DEFAULT_EPS).is_err());
}

#[test]
fn test_grad_sample_accumulates_across_uses() {
    let client = create_cpu_client();
    let shape = [2, 4, 3];
    let x1 = Var::new(test_tensor(&shape, 26), true);
    let x2 = Var::new(test_tensor(&shape, 27), true);
    let weight = expanded(&[4], 28, 2);
    let bias = expanded(&[4], 29, 2);

    let y1 = group_norm(&client, &x1, 2, &weight, &bias, DEFAULT_EPS).unwrap();
    let y2 = group_norm(&client, &x2, 2, &weight, &bias, DEFAULT_EPS).unwrap();
    let y = var_add(&y1, &y2, &client).unwrap();
    let grad_output = test_tensor(&shape, 30);
    backward_with_grad(&y, grad_output.clone(), &client).unwrap();

    let (w1, b1) = reference_per_sample_grads(
        &x1.tensor().to_vec::<f32>(),
        &grad_output.to_vec::<f32>(),
        &shape,
        2,
        DEFAULT_EPS,
    );
    let (w2, b2) = reference_per_sample_grads(
        &x2.tensor().to_vec::<f32>(),
        &grad_output.to_vec::<f32>(),
        &shape,
        2,
        DEFAULT_EPS,
    );
    let want_w: Vec<f64> = w1.iter().zip(&w2).map(|(a, b)| a + b).collect();
    let want_b: Vec<f64> = b1.iter().zip(&b2).map(|(a, b)| a + b).collect();

    assert_allclose_f64(
        &widen(&weight.grad_sample().unwrap().to_vec::<f32>()),
        &want_w,
        1e-4,
        1e-4,
        "accumulated weight grad_sample",
    );
    assert_allclose_f64(
        &widen(&bias.grad_sample().unwrap().to_vec::<f32>()),
        &want_b,
        1e-5,
        1e-5,
        "accumulated bias grad_sample",
    );
}

#[test]
fn test_backward_result_length_is_checked() {
    let client = create_cpu_client();
    let x = Var::new(test_tensor(&[2, 4, 3], 31), true);
    let bias = expanded(&[4], 32, 2);

    // the backward returns 1 + len(flat_args) slots; extra keyword slots are trailing Nones
    let flat = vec![
        ExpandedArg::from(&x),
        ExpandedArg::from(2usize),
        ExpandedArg::None,
        ExpandedArg::from(&bias),
        ExpandedArg::from(DEFAULT_EPS),
    ];
    let y = apply::<GroupNormPerSampleGrad, CpuClient>(&client, &["weight", "bias", "eps"], &flat)
        .unwrap();
    let grads = y.grad_fn().unwrap().backward(&test_tensor(&[2, 4, 3], 33)).unwrap();

    // routed to the differentiable inputs: x and the bias weight
    assert_eq!(grads.len(), 2);
    assert_eq!(grads[0].as_ref().unwrap().shape(), &[2, 4, 3]);
    assert!(grads[1].is_none());
}

/// Client that counts native group-norm backward launches
#[derive(Clone)]
struct CountingClient {
    inner: CpuClient,
    backward_calls: Arc<AtomicUsize>,
}

impl CountingClient {
    fn new() -> Self {
        Self {
            inner: create_cpu_client(),
            backward_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn backward_calls(&self) -> usize {
        self.backward_calls.load(Ordering::SeqCst)
    }
}

impl BinaryOps for CountingClient {
    fn add(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.inner.add(a, b)
    }

    fn sub(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.inner.sub(a, b)
    }

    fn mul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        self.inner.mul(a, b)
    }
}

impl ReduceOps for CountingClient {
    fn sum(&self, a: &Tensor, dims: &[usize], keepdim: bool) -> Result<Tensor> {
        self.inner.sum(a, dims, keepdim)
    }
}

impl EinsumOps for CountingClient {
    fn einsum(&self, notation: &str, inputs: &[&Tensor]) -> Result<Tensor> {
        self.inner.einsum(notation, inputs)
    }
}

impl NormalizationOps for CountingClient {
    fn group_norm_all_outputs(
        &self,
        input: &Tensor,
        num_groups: usize,
        weight: Option<&Tensor>,
        bias: Option<&Tensor>,
        eps: f64,
    ) -> Result<GroupNormStats> {
        self.inner
            .group_norm_all_outputs(input, num_groups, weight, bias, eps)
    }

    #[allow(clippy::too_many_arguments)]
    fn group_norm_backward(
        &self,
        grad_output: &Tensor,
        input: &Tensor,
        mean: &Tensor,
        rstd: &Tensor,
        weight: Option<&Tensor>,
        n: usize,
        c: usize,
        hxw: usize,
        num_groups: usize,
        output_mask: [bool; 3],
    ) -> Result<GroupNormGrads> {
        assert_eq!(output_mask, [true, false, false]);
        self.backward_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.group_norm_backward(
            grad_output, input, mean, rstd, weight, n, c, hxw, num_groups, output_mask,
        )
    }
}

fn apply_counting(client: &CountingClient, x: &Var, bias: &ExpandedWeight) -> Var {
    let flat = vec![
        ExpandedArg::from(x),
        ExpandedArg::from(2usize),
        ExpandedArg::None,
        ExpandedArg::from(bias),
        ExpandedArg::from(DEFAULT_EPS),
    ];
    apply::<GroupNormPerSampleGrad, CountingClient>(client, &["weight", "bias", "eps"], &flat)
        .unwrap()
}

#[test]
fn test_native_backward_skipped_when_input_needs_no_grad() {
    let client = CountingClient::new();
    let x = Var::new(test_tensor(&[2, 4, 3], 34), false);
    let bias = expanded(&[4], 35, 2);

    let y = apply_counting(&client, &x, &bias);
    let grads = backward_with_grad(&y, Tensor::ones(&[2, 4, 3], DType::F32), &client).unwrap();

    assert_eq!(client.backward_calls(), 0);
    assert!(grads.get(x.id()).is_none());
    assert_eq!(bias.grad_sample().unwrap().to_vec::<f32>(), vec![3.0; 8]);
}

#[test]
fn test_native_backward_runs_once_for_input() {
    let client = CountingClient::new();
    let x = Var::new(test_tensor(&[2, 4, 3], 36), true);
    let bias = expanded(&[4], 37, 2);

    let y = apply_counting(&client, &x, &bias);
    let grads = backward_with_grad(&y, Tensor::ones(&[2, 4, 3], DType::F32), &client).unwrap();

    assert_eq!(client.backward_calls(), 1);
    assert_eq!(grads.get(x.id()).unwrap().shape(), &[2, 4, 3]);
}
