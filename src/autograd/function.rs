//! Custom differentiable functions
//!
//! A [`Function`] supplies its own forward and backward. Forward receives a
//! flat argument list (positional arguments followed by keyword values, with
//! the keyword names passed separately) and backward returns one gradient
//! slot per forward argument, plus a leading slot for the keyword names.
//!
//! ```text
//! apply::<F>(client, kwarg_names, flat_args)
//!     ├── F::forward  -> (output, ctx)
//!     └── FunctionNode { ctx }          (only if some slot is differentiable)
//!             └── F::backward(ctx, grad_output)
//!                     -> [kwarg_names, arg0, arg1, ...]
//! ```

use super::{GradFn, Var};
use crate::error::{Error, Result};
use crate::ops::TensorOps;
use crate::tensor::{Tensor, TensorId};
use std::marker::PhantomData;
use std::sync::Arc;

/// One slot of a custom function's flat argument list
pub trait FunctionInput {
    /// The variable gradients flow to through this slot, if any
    ///
    /// Returning `None` marks the slot non-differentiable: backward must
    /// return `None` for it.
    fn differentiable(&self) -> Option<&Var>;
}

impl FunctionInput for Var {
    fn differentiable(&self) -> Option<&Var> {
        self.requires_grad().then_some(self)
    }
}

impl FunctionInput for Option<Var> {
    fn differentiable(&self) -> Option<&Var> {
        self.as_ref().and_then(FunctionInput::differentiable)
    }
}

/// A differentiable operation with a hand-written backward
pub trait Function: 'static {
    /// Flat argument type
    type Arg: FunctionInput;

    /// State saved by forward for backward
    type Ctx: Send + Sync + 'static;

    /// Name reported in errors and logs
    const NAME: &'static str;

    /// Compute the output and the context backward will need
    fn forward<C: TensorOps>(
        client: &C,
        kwarg_names: &[&'static str],
        flat_args: &[Self::Arg],
    ) -> Result<(Tensor, Self::Ctx)>;

    /// Gradients aligned with `[kwarg_names, flat_args...]`
    ///
    /// Trailing extra slots are tolerated as long as they are `None`.
    fn backward<C: TensorOps>(
        ctx: &Self::Ctx,
        client: &C,
        grad_output: &Tensor,
    ) -> Result<Vec<Option<Tensor>>>;
}

/// Run `F` forward and record it in the graph
///
/// The result only carries a grad_fn when at least one argument slot is
/// differentiable.
pub fn apply<F, C>(client: &C, kwarg_names: &[&'static str], flat_args: &[F::Arg]) -> Result<Var>
where
    F: Function,
    C: TensorOps + Clone + Send + Sync + 'static,
{
    let (output, ctx) = F::forward(client, kwarg_names, flat_args)?;

    let mut slots = Vec::with_capacity(flat_args.len());
    let mut inputs: Vec<&Var> = Vec::new();
    for arg in flat_args {
        match arg.differentiable() {
            Some(var) => {
                slots.push(Some(inputs.len()));
                inputs.push(var);
            }
            None => slots.push(None),
        }
    }

    if inputs.is_empty() {
        return Ok(Var::new(output, false));
    }

    log::debug!(
        "{}: recording node with {} differentiable of {} arguments",
        F::NAME,
        inputs.len(),
        flat_args.len()
    );
    let node = FunctionNode::<F, C> {
        ctx,
        client: client.clone(),
        input_ids: inputs.iter().map(|v| v.id()).collect(),
        input_shapes: inputs.iter().map(|v| v.shape().to_vec()).collect(),
        input_grad_fns: inputs.iter().map(|v| v.grad_fn().cloned()).collect(),
        slots,
        _function: PhantomData,
    };
    Ok(Var::from_op(output, Arc::new(node)))
}

/// Graph node wrapping a [`Function`]'s saved context
pub struct FunctionNode<F: Function, C> {
    ctx: F::Ctx,
    client: C,
    input_ids: Vec<TensorId>,
    input_shapes: Vec<Vec<usize>>,
    input_grad_fns: Vec<Option<Arc<dyn GradFn>>>,
    /// For each flat argument, its index among the differentiable inputs
    slots: Vec<Option<usize>>,
    _function: PhantomData<fn() -> F>,
}

impl<F: Function, C> FunctionNode<F, C> {
    /// Map a slot-aligned backward result onto the differentiable inputs
    fn route(&self, grads: Vec<Option<Tensor>>) -> Result<Vec<Option<Tensor>>> {
        let expected = self.slots.len() + 1;
        let got = grads.len();
        let mismatch = Error::GradientCountMismatch {
            function: F::NAME,
            expected,
            got,
        };
        if got < expected || grads[expected..].iter().any(Option::is_some) {
            return Err(mismatch);
        }

        let mut grads = grads.into_iter();
        if grads.next().flatten().is_some() {
            return Err(Error::InvalidGradient {
                function: F::NAME,
                position: 0,
            });
        }

        let mut routed = vec![None; self.input_ids.len()];
        for (position, (grad, slot)) in grads.zip(&self.slots).enumerate() {
            let Some(grad) = grad else {
                continue;
            };
            let Some(index) = *slot else {
                return Err(Error::InvalidGradient {
                    function: F::NAME,
                    position: position + 1,
                });
            };
            if grad.shape() != self.input_shapes[index].as_slice() {
                return Err(Error::shape_mismatch(&self.input_shapes[index], grad.shape()));
            }
            routed[index] = Some(grad);
        }
        Ok(routed)
    }
}

impl<F, C> GradFn for FunctionNode<F, C>
where
    F: Function,
    C: TensorOps + Send + Sync,
{
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>> {
        let grads = F::backward(&self.ctx, &self.client, grad_output)?;
        self.route(grads)
    }

    fn inputs(&self) -> &[TensorId] {
        &self.input_ids
    }

    fn input_grad_fns(&self) -> Vec<Option<Arc<dyn GradFn>>> {
        self.input_grad_fns.clone()
    }

    fn name(&self) -> &'static str {
        F::NAME
    }
}
