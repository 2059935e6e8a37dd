//! CPU implementation of normalization operations.

use crate::error::{Error, Result};
use crate::ops::{GroupNormGrads, GroupNormStats, NormalizationOps};
use crate::runtime::cpu::{
    helpers::{dispatch_dtype, ensure_contiguous},
    kernels::{self, GroupNormDims},
    CpuClient,
};
use crate::tensor::Tensor;

/// Check that an optional affine parameter is a `[C]` tensor of the input's dtype
fn validate_affine(param: Option<&Tensor>, input: &Tensor, channels: usize) -> Result<()> {
    let Some(param) = param else {
        return Ok(());
    };
    if param.dtype() != input.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: input.dtype(),
            rhs: param.dtype(),
        });
    }
    if param.shape() != [channels] {
        return Err(Error::ShapeMismatch {
            expected: vec![channels],
            got: param.shape().to_vec(),
        });
    }
    Ok(())
}

/// Derive `(N, C, HxW, G)` from an `[N, C, *]` input
fn group_norm_dims(input: &Tensor, num_groups: usize) -> Result<GroupNormDims> {
    let shape = input.shape();
    if shape.len() < 2 {
        return Err(Error::invalid_argument(
            "input",
            format!("group_norm expects at least 2 dimensions, got shape {shape:?}"),
        ));
    }
    let (n, c) = (shape[0], shape[1]);
    if num_groups == 0 || c % num_groups != 0 {
        return Err(Error::invalid_argument(
            "num_groups",
            format!("expected number of channels {c} to be divisible by num_groups {num_groups}"),
        ));
    }
    Ok(GroupNormDims {
        n,
        c,
        hxw: shape[2..].iter().product(),
        groups: num_groups,
    })
}

fn contiguous_opt(t: Option<&Tensor>) -> Option<Tensor> {
    t.map(ensure_contiguous)
}

/// NormalizationOps implementation for CPU runtime.
impl NormalizationOps for CpuClient {
    fn group_norm_all_outputs(
        &self,
        input: &Tensor,
        num_groups: usize,
        weight: Option<&Tensor>,
        bias: Option<&Tensor>,
        eps: f64,
    ) -> Result<GroupNormStats> {
        let dims = group_norm_dims(input, num_groups)?;
        validate_affine(weight, input, dims.c)?;
        validate_affine(bias, input, dims.c)?;

        let input_contig = ensure_contiguous(input);
        let weight_contig = contiguous_opt(weight);
        let bias_contig = contiguous_opt(bias);
        let parallel = self.use_parallel(dims.numel());

        dispatch_dtype!(input.dtype(), T => {
            let (out, mean, rstd) = kernels::group_norm_forward_kernel::<T>(
                input_contig.as_slice::<T>()?,
                weight_contig.as_ref().map(|w| w.as_slice::<T>()).transpose()?,
                bias_contig.as_ref().map(|b| b.as_slice::<T>()).transpose()?,
                dims,
                eps,
                parallel,
            );
            let stats_shape = [dims.n, dims.groups];
            Ok((
                Tensor::try_from_vec(out, input.shape())?,
                Tensor::try_from_vec(mean, &stats_shape)?,
                Tensor::try_from_vec(rstd, &stats_shape)?,
            ))
        })
    }

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
        if grad_output.shape() != input.shape() {
            return Err(Error::shape_mismatch(input.shape(), grad_output.shape()));
        }
        if n * c * hxw != input.numel() {
            return Err(Error::invalid_argument(
                "hxw",
                format!(
                    "N={n}, C={c}, HxW={hxw} does not describe an input of {} elements",
                    input.numel()
                ),
            ));
        }
        if num_groups == 0 || c % num_groups != 0 {
            return Err(Error::invalid_argument(
                "num_groups",
                format!("expected number of channels {c} to be divisible by num_groups {num_groups}"),
            ));
        }
        for stat in [mean, rstd] {
            if stat.numel() != n * num_groups {
                return Err(Error::shape_mismatch(&[n, num_groups], stat.shape()));
            }
        }
        for t in [grad_output, mean, rstd] {
            if t.dtype() != input.dtype() {
                return Err(Error::DTypeMismatch {
                    lhs: input.dtype(),
                    rhs: t.dtype(),
                });
            }
        }
        validate_affine(weight, input, c)?;

        let dims = GroupNormDims {
            n,
            c,
            hxw,
            groups: num_groups,
        };
        let grad_contig = ensure_contiguous(grad_output);
        let input_contig = ensure_contiguous(input);
        let mean_contig = ensure_contiguous(mean);
        let rstd_contig = ensure_contiguous(rstd);
        let weight_contig = contiguous_opt(weight);
        let parallel = self.use_parallel(dims.numel());

        dispatch_dtype!(input.dtype(), T => {
            let (dx, dw, db) = kernels::group_norm_backward_kernel::<T>(
                grad_contig.as_slice::<T>()?,
                input_contig.as_slice::<T>()?,
                mean_contig.as_slice::<T>()?,
                rstd_contig.as_slice::<T>()?,
                weight_contig.as_ref().map(|w| w.as_slice::<T>()).transpose()?,
                dims,
                output_mask,
                parallel,
            );
            Ok((
                dx.map(|v| Tensor::try_from_vec(v, input.shape())).transpose()?,
                dw.map(|v| Tensor::try_from_vec(v, &[c])).transpose()?,
                db.map(|v| Tensor::try_from_vec(v, &[c])).transpose()?,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::ops::ReduceOps;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| ((i * 7) % 11) as f64 * 0.25 - 1.0).collect()
    }

    #[test]
    fn test_group_norm_zero_mean_unit_var() {
        let client = CpuClient::default();
        let x = Tensor::from_slice(&ramp(4 * 6 * 8), &[4, 6, 8]);

        let (out, mean, rstd) = client
            .group_norm_all_outputs(&x, 2, None, None, 1e-5)
            .unwrap();
        assert_eq!(out.shape(), &[4, 6, 8]);
        assert_eq!(mean.shape(), &[4, 2]);
        assert_eq!(rstd.shape(), &[4, 2]);

        // each (n, g) block of 3 channels x 8 positions is normalized
        let grouped = out.reshape(&[4, 2, 24]).unwrap();
        let sums = client.sum(&grouped, &[2], false).unwrap().to_vec::<f64>();
        for s in sums {
            assert!(s.abs() < 1e-9, "group mean not zero: {s}");
        }
    }

    #[test]
    fn test_group_norm_affine() {
        let client = CpuClient::default();
        let x = Tensor::from_slice(&[1.0f32, 3.0, 5.0, 7.0], &[1, 2, 2]);
        let w = Tensor::from_slice(&[2.0f32, 1.0], &[2]);
        let b = Tensor::from_slice(&[0.0f32, 10.0], &[2]);

        let out = client.group_norm(&x, 2, Some(&w), Some(&b), 0.0).unwrap();
        let v = out.to_vec::<f32>();
        let expected = [-2.0f32, 2.0, 9.0, 11.0];
        for (a, e) in v.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{a} vs {e}");
        }
    }

    #[test]
    fn test_group_norm_validation() {
        let client = CpuClient::default();
        let x = Tensor::zeros(&[2, 6, 4], DType::F32);
        assert!(client.group_norm(&x, 4, None, None, 1e-5).is_err());
        assert!(client.group_norm(&x, 0, None, None, 1e-5).is_err());

        let flat = Tensor::zeros(&[6], DType::F32);
        assert!(client.group_norm(&flat, 1, None, None, 1e-5).is_err());

        let bad_weight = Tensor::zeros(&[5], DType::F32);
        assert!(client
            .group_norm(&x, 2, Some(&bad_weight), None, 1e-5)
            .is_err());
        let wrong_dtype = Tensor::zeros(&[6], DType::F64);
        assert!(matches!(
            client.group_norm(&x, 2, Some(&wrong_dtype), None, 1e-5),
            Err(Error::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_group_norm_backward_input_only() {
        let client = CpuClient::default();
        let x = Tensor::from_slice(&ramp(2 * 4 * 3), &[2, 4, 3]);
        let dy = Tensor::from_slice(&ramp(2 * 4 * 3 + 5)[5..], &[2, 4, 3]);
        let (_, mean, rstd) = client
            .group_norm_all_outputs(&x, 2, None, None, 1e-5)
            .unwrap();

        let (dx, dw, db) = client
            .group_norm_backward(&dy, &x, &mean, &rstd, None, 2, 4, 3, 2, [true, false, false])
            .unwrap();
        let dx = dx.unwrap();
        assert_eq!(dx.shape(), &[2, 4, 3]);
        assert!(dw.is_none());
        assert!(db.is_none());

        // the input gradient of a normalization sums to zero over each group
        let grouped = dx.reshape(&[2, 2, 6]).unwrap();
        for s in client.sum(&grouped, &[2], false).unwrap().to_vec::<f64>() {
            assert!(s.abs() < 1e-9);
        }
    }

    #[test]
    fn test_group_norm_backward_validation() {
        let client = CpuClient::default();
        let x = Tensor::zeros(&[2, 4, 3], DType::F64);
        let stats = Tensor::ones(&[2, 2], DType::F64);
        let short = Tensor::ones(&[2], DType::F64);

        assert!(client
            .group_norm_backward(&x, &x, &short, &stats, None, 2, 4, 3, 2, [true; 3])
            .is_err());
        assert!(client
            .group_norm_backward(&x, &x, &stats, &stats, None, 2, 4, 4, 2, [true; 3])
            .is_err());
        let dy = Tensor::zeros(&[2, 12], DType::F64);
        assert!(client
            .group_norm_backward(&dy, &x, &stats, &stats, None, 2, 4, 3, 2, [true; 3])
            .is_err());
    }
}
