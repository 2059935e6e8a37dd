//! Backward implementations for normalization operations

use crate::autograd::{GradFn, Var};
use crate::error::Result;
use crate::ops::NormalizationOps;
use crate::tensor::{Tensor, TensorId};
use std::sync::Arc;

// ============================================================================
// GroupNormBackward
// ============================================================================

/// Backward for group normalization with aggregated parameter gradients
///
/// Inputs are `[input, weight?, bias?]` in that order, absent affine
/// parameters are skipped. Only gradients for inputs that require them are
/// requested from the native backward.
pub struct GroupNormBackward<C> {
    input_ids: Vec<TensorId>,
    input_grad_fns: Vec<Option<Arc<dyn GradFn>>>,
    output_mask: [bool; 3],
    /// input, mean, rstd, then weight if present
    saved: Vec<Tensor>,
    has_weight: bool,
    has_bias: bool,
    num_groups: usize,
    client: C,
}

impl<C> GroupNormBackward<C> {
    /// Create a new GroupNormBackward from the forward's operands and statistics
    pub fn new(
        input: &Var,
        weight: Option<&Var>,
        bias: Option<&Var>,
        mean: Tensor,
        rstd: Tensor,
        num_groups: usize,
        client: C,
    ) -> Self {
        let operands: Vec<&Var> = std::iter::once(input).chain(weight).chain(bias).collect();

        let mut saved = vec![input.tensor().clone(), mean, rstd];
        if let Some(w) = weight {
            saved.push(w.tensor().clone());
        }

        Self {
            input_ids: operands.iter().map(|v| v.id()).collect(),
            input_grad_fns: operands.iter().map(|v| v.grad_fn().cloned()).collect(),
            output_mask: [
                input.requires_grad(),
                weight.is_some_and(Var::requires_grad),
                bias.is_some_and(Var::requires_grad),
            ],
            saved,
            has_weight: weight.is_some(),
            has_bias: bias.is_some(),
            num_groups,
            client,
        }
    }
}

impl<C> GradFn for GroupNormBackward<C>
where
    C: NormalizationOps + Send + Sync,
{
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>> {
        let (input, mean, rstd) = (&self.saved[0], &self.saved[1], &self.saved[2]);
        let weight = self.saved.get(3);
        let shape = input.shape();
        let (n, c) = (shape[0], shape[1]);
        let hxw = shape[2..].iter().product();

        let (dx, dw, db) = self.client.group_norm_backward(
            grad_output,
            input,
            mean,
            rstd,
            weight,
            n,
            c,
            hxw,
            self.num_groups,
            self.output_mask,
        )?;

        let mut grads = vec![dx];
        if self.has_weight {
            grads.push(dw);
        }
        if self.has_bias {
            grads.push(db);
        }
        Ok(grads)
    }

    fn inputs(&self) -> &[TensorId] {
        &self.input_ids
    }

    fn input_grad_fns(&self) -> Vec<Option<Arc<dyn GradFn>>> {
        self.input_grad_fns.clone()
    }

    fn saved_tensors(&self) -> &[Tensor] {
        &self.saved
    }

    fn name(&self) -> &'static str {
        "GroupNormBackward"
    }
}
