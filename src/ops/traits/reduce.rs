//! Reduction operations trait.

use crate::error::Result;
use crate::tensor::Tensor;

/// Reduction operations
pub trait ReduceOps {
    /// Sum along specified dimensions
    ///
    /// With `keepdim`, reduced dimensions are kept with size 1. Reducing over
    /// no dims returns a contiguous copy of the input.
    fn sum(&self, a: &Tensor, dims: &[usize], keepdim: bool) -> Result<Tensor>;
}
