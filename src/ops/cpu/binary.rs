//! CPU implementation of binary operations.

use crate::error::Result;
use crate::ops::{BinaryOp, BinaryOps};
use crate::runtime::cpu::{helpers::binary_op_impl, CpuClient};
use crate::tensor::Tensor;

/// BinaryOps implementation for CPU runtime.
impl BinaryOps for CpuClient {
    fn add(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        binary_op_impl(BinaryOp::Add, a, b)
    }

    fn sub(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        binary_op_impl(BinaryOp::Sub, a, b)
    }

    fn mul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        binary_op_impl(BinaryOp::Mul, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::error::Error;

    #[test]
    fn test_add_broadcast_channels() {
        let client = CpuClient::default();
        let x = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let b = Tensor::from_slice(&[10.0f32, 20.0, 30.0], &[3]);

        let out = client.add(&x, &b).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.to_vec::<f32>(), vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn test_mul_transposed_operand() {
        let client = CpuClient::default();
        let a = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2]);
        let at = a.transpose(0, 1).unwrap();

        let out = client.mul(&a, &at).unwrap();
        assert_eq!(out.to_vec::<f64>(), vec![1.0, 6.0, 6.0, 16.0]);
        let diff = client.sub(&a, &at).unwrap();
        assert_eq!(diff.to_vec::<f64>(), vec![0.0, -1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_binary_errors() {
        let client = CpuClient::default();
        let a = Tensor::zeros(&[2, 3], DType::F32);
        let b = Tensor::zeros(&[4], DType::F32);
        assert!(matches!(client.add(&a, &b), Err(Error::BroadcastError { .. })));

        let c = Tensor::zeros(&[2, 3], DType::F64);
        assert!(matches!(client.mul(&a, &c), Err(Error::DTypeMismatch { .. })));
    }
}
