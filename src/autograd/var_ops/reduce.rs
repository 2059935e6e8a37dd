//! Reduction operations

use crate::autograd::ops::SumBackward;
use crate::autograd::Var;
use crate::error::Result;
use crate::ops::ReduceOps;
use std::sync::Arc;

/// Sum along dimensions: z = sum(a, dims)
pub fn var_sum<C>(a: &Var, dims: &[usize], keepdim: bool, client: &C) -> Result<Var>
where
    C: ReduceOps,
{
    let output = client.sum(a.tensor(), dims, keepdim)?;

    if a.requires_grad() {
        let grad_fn = SumBackward::new(a.id(), a.shape(), dims, keepdim, a.grad_fn().cloned());
        Ok(Var::from_op(output, Arc::new(grad_fn)))
    } else {
        Ok(Var::new(output, false))
    }
}
