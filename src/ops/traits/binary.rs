//! Binary operations trait.

use crate::error::Result;
use crate::tensor::Tensor;

/// Elementwise binary operations with NumPy-style broadcasting
pub trait BinaryOps {
    /// Elementwise addition: a + b
    fn add(&self, a: &Tensor, b: &Tensor) -> Result<Tensor>;

    /// Elementwise subtraction: a - b
    fn sub(&self, a: &Tensor, b: &Tensor) -> Result<Tensor>;

    /// Elementwise multiplication: a * b
    fn mul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor>;
}
