//! CPU implementation of reduction operations.

use crate::error::Result;
use crate::ops::ReduceOps;
use crate::runtime::cpu::{helpers::sum_impl, CpuClient};
use crate::tensor::Tensor;

/// ReduceOps implementation for CPU runtime.
impl ReduceOps for CpuClient {
    fn sum(&self, a: &Tensor, dims: &[usize], keepdim: bool) -> Result<Tensor> {
        sum_impl(a, dims, keepdim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_dims() {
        let client = CpuClient::default();
        let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);

        let rows = client.sum(&a, &[1], false).unwrap();
        assert_eq!(rows.shape(), &[2]);
        assert_eq!(rows.to_vec::<f32>(), vec![6.0, 15.0]);

        let cols = client.sum(&a, &[0], true).unwrap();
        assert_eq!(cols.shape(), &[1, 3]);
        assert_eq!(cols.to_vec::<f32>(), vec![5.0, 7.0, 9.0]);

        let all = client.sum(&a, &[0, 1], false).unwrap();
        assert!(all.shape().is_empty());
        assert_eq!(all.item::<f32>().unwrap(), 21.0);
    }

    #[test]
    fn test_sum_no_dims_is_copy() {
        let client = CpuClient::default();
        let a = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2]);
        let t = a.transpose(0, 1).unwrap();
        let out = client.sum(&t, &[], false).unwrap();
        assert!(out.is_contiguous());
        assert_eq!(out.to_vec::<f64>(), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_sum_invalid_dim() {
        let client = CpuClient::default();
        let a = Tensor::from_slice(&[1.0f32, 2.0], &[2]);
        assert!(client.sum(&a, &[1], false).is_err());
    }
}
