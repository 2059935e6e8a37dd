//! Arithmetic operations

use crate::autograd::ops::AddBackward;
use crate::autograd::Var;
use crate::error::Result;
use crate::ops::{BinaryOps, ReduceOps};
use std::sync::Arc;

/// Element-wise addition with broadcasting: z = a + b
pub fn var_add<C>(a: &Var, b: &Var, client: &C) -> Result<Var>
where
    C: BinaryOps + ReduceOps + Clone + Send + Sync + 'static,
{
    let output = client.add(a.tensor(), b.tensor())?;

    if a.requires_grad() || b.requires_grad() {
        let grad_fn = AddBackward::new(
            a.id(),
            b.id(),
            a.shape(),
            b.shape(),
            a.grad_fn().cloned(),
            b.grad_fn().cloned(),
            client.clone(),
        );
        Ok(Var::from_op(output, Arc::new(grad_fn)))
    } else {
        Ok(Var::new(output, false))
    }
}
