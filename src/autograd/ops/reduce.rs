//! Backward implementations for reduction operations

use crate::autograd::GradFn;
use crate::error::Result;
use crate::ops::{normalize_reduce_dims, reduce_output_shape};
use crate::tensor::{Tensor, TensorId};
use std::sync::Arc;

// ============================================================================
// SumBackward
// ============================================================================

/// Backward for sum reduction: z = sum(a, dims)
///
/// The gradient of sum is broadcast expansion.
/// For z = sum(a, dims), dL/da = broadcast(dL/dz, original_shape)
///
/// If keepdim=false, the reduced dims are restored with size 1 before broadcasting.
pub struct SumBackward {
    input_id: TensorId,
    input_shape: Vec<usize>,
    dims: Vec<usize>,
    keepdim: bool,
    input_grad_fn: Option<Arc<dyn GradFn>>,
}

impl SumBackward {
    /// Create a new SumBackward
    pub fn new(
        input_id: TensorId,
        input_shape: &[usize],
        dims: &[usize],
        keepdim: bool,
        input_grad_fn: Option<Arc<dyn GradFn>>,
    ) -> Self {
        Self {
            input_id,
            input_shape: input_shape.to_vec(),
            dims: dims.to_vec(),
            keepdim,
            input_grad_fn,
        }
    }
}

impl GradFn for SumBackward {
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>> {
        let mut grad = grad_output.clone();

        if !self.keepdim {
            let mask = normalize_reduce_dims(&self.dims, self.input_shape.len())?;
            grad = grad.reshape(&reduce_output_shape(&self.input_shape, &mask, true))?;
        }

        let grad = grad.broadcast_to(&self.input_shape)?.contiguous();
        Ok(vec![Some(grad)])
    }

    fn inputs(&self) -> &[TensorId] {
        std::slice::from_ref(&self.input_id)
    }

    fn input_grad_fns(&self) -> Vec<Option<Arc<dyn GradFn>>> {
        vec![self.input_grad_fn.clone()]
    }

    fn name(&self) -> &'static str {
        "SumBackward"
    }
}
