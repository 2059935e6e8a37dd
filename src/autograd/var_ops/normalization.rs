//! Normalization operations

use crate::autograd::ops::GroupNormBackward;
use crate::autograd::Var;
use crate::error::Result;
use crate::ops::NormalizationOps;
use std::sync::Arc;

/// Group normalization with aggregated gradients for input, weight and bias
///
/// This is the standard batched path: parameter gradients are summed over
/// the batch.
pub fn var_group_norm<C>(
    input: &Var,
    num_groups: usize,
    weight: Option<&Var>,
    bias: Option<&Var>,
    eps: f64,
    client: &C,
) -> Result<Var>
where
    C: NormalizationOps + Clone + Send + Sync + 'static,
{
    let (output, mean, rstd) = client.group_norm_all_outputs(
        input.tensor(),
        num_groups,
        weight.map(Var::tensor),
        bias.map(Var::tensor),
        eps,
    )?;

    let tracked = input.requires_grad()
        || weight.is_some_and(Var::requires_grad)
        || bias.is_some_and(Var::requires_grad);
    if !tracked {
        return Ok(Var::new(output, false));
    }

    let grad_fn = GroupNormBackward::new(
        input,
        weight,
        bias,
        mean,
        rstd,
        num_groups,
        client.clone(),
    );
    Ok(Var::from_op(output, Arc::new(grad_fn)))
}
