//! CPU implementation of einsum operations.

use crate::error::Result;
use crate::ops::impl_generic::einsum::einsum_impl;
use crate::ops::EinsumOps;
use crate::runtime::cpu::CpuClient;
use crate::tensor::Tensor;

impl EinsumOps for CpuClient {
    fn einsum(&self, notation: &str, inputs: &[&Tensor]) -> Result<Tensor> {
        einsum_impl(self, notation, inputs)
    }
}
