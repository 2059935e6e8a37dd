//! Operator dispatch with per-sample gradient routing

use super::group_norm::{optional_tensor, GroupNormArgs};
use super::{per_sample_grad_rule, ExpandedArg, Kwargs, Operator};
use crate::autograd::{var_group_norm, var_sum, Var};
use crate::error::{Error, Result};
use crate::runtime::CpuClient;

/// Call `op`, routing through its per-sample rule when any argument is expanded
///
/// Without expanded weights the operator runs on the standard batched path
/// with aggregated gradients. With them, keyword arguments are flattened
/// after the positional ones and the registered rule is applied; an
/// operator without a rule fails with [`Error::UnsupportedOperator`].
pub fn call_operator(
    op: Operator,
    client: &CpuClient,
    args: Vec<ExpandedArg>,
    kwargs: Kwargs,
) -> Result<Var> {
    let expanded = args
        .iter()
        .chain(kwargs.values())
        .any(ExpandedArg::is_expanded);
    if !expanded {
        log::debug!("{op}: no expanded weights, running batched");
        return call_batched(op, client, &args, &kwargs);
    }

    let rule = per_sample_grad_rule(op).ok_or(Error::UnsupportedOperator { op: op.name() })?;
    log::debug!("{op}: dispatching to {}", rule.name());

    let (kwarg_names, kwarg_values) = kwargs.flatten();
    let mut flat_args = args;
    flat_args.extend(kwarg_values);
    rule.apply(client, &kwarg_names, &flat_args)
}

/// Standard batched execution of `op`
fn call_batched(op: Operator, client: &CpuClient, args: &[ExpandedArg], kwargs: &Kwargs) -> Result<Var> {
    match op {
        Operator::GroupNorm => {
            let p = GroupNormArgs::parse(args, kwargs)?;
            // reject non-tensor parameters before reading the variables
            optional_tensor(p.weight, "weight")?;
            optional_tensor(p.bias, "bias")?;
            var_group_norm(
                p.input,
                p.num_groups,
                p.weight.as_var(),
                p.bias.as_var(),
                p.eps,
                client,
            )
        }
        Operator::Sum => {
            let input = args.first().and_then(ExpandedArg::as_var).ok_or_else(|| {
                Error::invalid_argument("input", "sum expects a Tensor as its first argument")
            })?;
            let dims: Vec<usize> = (0..input.ndim()).collect();
            var_sum(input, &dims, false, client)
        }
    }
}

/// `group_norm(input, num_groups, weight, bias, eps)`
///
/// `weight` and `bias` accept a [`Var`], an
/// [`ExpandedWeight`](super::ExpandedWeight), `None` (as `ExpandedArg::None`
/// or `Option::None`). Use [`DEFAULT_EPS`](super::DEFAULT_EPS) for the usual
/// `eps`.
///
/// # Example
///
/// ```
/// use samplegrad::prelude::*;
///
/// let client = CpuClient::default();
/// let x = Var::new(Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &[2, 2, 2]), true);
/// let bias = ExpandedWeight::new(Var::new(Tensor::zeros(&[2], DType::F32), true), 2)?;
///
/// let y = group_norm(&client, &x, 1, ExpandedArg::None, &bias, DEFAULT_EPS)?;
/// backward_with_grad(&y, Tensor::ones(&[2, 2, 2], DType::F32), &client)?;
///
/// assert_eq!(bias.grad_sample().unwrap().to_vec::<f32>(), vec![2.0; 4]);
/// # Ok::<(), samplegrad::error::Error>(())
/// ```
pub fn group_norm(
    client: &CpuClient,
    input: &Var,
    num_groups: usize,
    weight: impl Into<ExpandedArg>,
    bias: impl Into<ExpandedArg>,
    eps: f64,
) -> Result<Var> {
    let args = vec![ExpandedArg::from(input), ExpandedArg::from(num_groups)];
    let kwargs = Kwargs::new()
        .with("weight", weight)
        .with("bias", bias)
        .with("eps", eps);
    call_operator(Operator::GroupNorm, client, args, kwargs)
}
