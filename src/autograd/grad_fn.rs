//! Gradient function trait

use crate::error::Result;
use crate::tensor::{Tensor, TensorId};
use std::sync::Arc;

/// Trait for computing gradients during backward pass
///
/// Each operation that participates in autograd has an associated
/// `GradFn` that knows how to compute gradients for its inputs.
pub trait GradFn: Send + Sync {
    /// Compute gradients for input tensors given the gradient of the output
    ///
    /// Returns a vector of optional gradients - one per input.
    /// `None` indicates that input doesn't need a gradient.
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>>;

    /// Get the IDs of input tensors
    ///
    /// Used for topological sorting during backward pass.
    fn inputs(&self) -> &[TensorId];

    /// Get the grad_fns of input tensors for graph traversal
    ///
    /// Returns a vector of optional grad_fns - one per input.
    /// `None` indicates a leaf tensor.
    fn input_grad_fns(&self) -> Vec<Option<Arc<dyn GradFn>>> {
        vec![None; self.inputs().len()]
    }

    /// Get tensors saved during forward pass
    fn saved_tensors(&self) -> &[Tensor] {
        &[]
    }

    /// Human-readable name for debugging
    fn name(&self) -> &'static str;
}
