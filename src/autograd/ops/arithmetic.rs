//! Backward implementations for arithmetic operations

use crate::autograd::GradFn;
use crate::error::Result;
use crate::ops::ReduceOps;
use crate::tensor::{Tensor, TensorId};
use std::sync::Arc;

/// Sum a broadcast gradient back down to `shape`
///
/// Leading dims added by broadcasting are summed away, and dims that were
/// size 1 in `shape` are summed with keepdim.
pub fn reduce_grad_to_shape<C: ReduceOps>(client: &C, grad: &Tensor, shape: &[usize]) -> Result<Tensor> {
    if grad.shape() == shape {
        return Ok(grad.clone());
    }

    let lead = grad.ndim() - shape.len();
    let dims: Vec<usize> = (0..grad.ndim())
        .filter(|&d| d < lead || (shape[d - lead] == 1 && grad.shape()[d] != 1))
        .collect();

    client.sum(grad, &dims, true)?.reshape(shape)
}

// ============================================================================
// AddBackward
// ============================================================================

/// Backward for addition: z = a + b
///
/// dL/da = dL/dz, dL/db = dL/dz, each reduced to its operand's shape.
pub struct AddBackward<C> {
    input_ids: [TensorId; 2],
    a_shape: Vec<usize>,
    b_shape: Vec<usize>,
    a_grad_fn: Option<Arc<dyn GradFn>>,
    b_grad_fn: Option<Arc<dyn GradFn>>,
    client: C,
}

impl<C> AddBackward<C> {
    /// Create a new AddBackward
    pub fn new(
        a_id: TensorId,
        b_id: TensorId,
        a_shape: &[usize],
        b_shape: &[usize],
        a_grad_fn: Option<Arc<dyn GradFn>>,
        b_grad_fn: Option<Arc<dyn GradFn>>,
        client: C,
    ) -> Self {
        Self {
            input_ids: [a_id, b_id],
            a_shape: a_shape.to_vec(),
            b_shape: b_shape.to_vec(),
            a_grad_fn,
            b_grad_fn,
            client,
        }
    }
}

impl<C> GradFn for AddBackward<C>
where
    C: ReduceOps + Send + Sync,
{
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>> {
        let grad_a = reduce_grad_to_shape(&self.client, grad_output, &self.a_shape)?;
        let grad_b = reduce_grad_to_shape(&self.client, grad_output, &self.b_shape)?;
        Ok(vec![Some(grad_a), Some(grad_b)])
    }

    fn inputs(&self) -> &[TensorId] {
        &self.input_ids
    }

    fn input_grad_fns(&self) -> Vec<Option<Arc<dyn GradFn>>> {
        vec![self.a_grad_fn.clone(), self.b_grad_fn.clone()]
    }

    fn name(&self) -> &'static str {
        "AddBackward"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::CpuClient;

    #[test]
    fn test_reduce_grad_to_shape() {
        let client = CpuClient::default();
        let grad = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);

        let row = reduce_grad_to_shape(&client, &grad, &[3]).unwrap();
        assert_eq!(row.to_vec::<f32>(), vec![5.0, 7.0, 9.0]);

        let col = reduce_grad_to_shape(&client, &grad, &[2, 1]).unwrap();
        assert_eq!(col.shape(), &[2, 1]);
        assert_eq!(col.to_vec::<f32>(), vec![6.0, 15.0]);
    }
}
