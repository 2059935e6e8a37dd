//! Per-sample gradients for group normalization

use super::utils::{forward_helper, set_grad_sample_if_exists, unpack_expanded_weight_or_tensor};
use super::{standard_kwargs, ExpandedArg, Kwargs, Operator};
use crate::autograd::{Function, Var};
use crate::error::{Error, Result};
use crate::ops::TensorOps;
use crate::tensor::Tensor;

/// Default `eps` of group normalization
pub const DEFAULT_EPS: f64 = 1e-5;

static ABSENT: ExpandedArg = ExpandedArg::None;

/// Group-norm arguments read back from `(args, kwargs)`
pub(crate) struct GroupNormArgs<'a> {
    pub input: &'a Var,
    pub num_groups: usize,
    pub weight: &'a ExpandedArg,
    pub bias: &'a ExpandedArg,
    pub eps: f64,
}

impl<'a> GroupNormArgs<'a> {
    /// `args = (input, num_groups)`, `kwargs = {weight, bias, eps}`; missing
    /// keywords take their defaults
    pub fn parse(args: &'a [ExpandedArg], kwargs: &'a Kwargs) -> Result<Self> {
        let [input, num_groups] = args else {
            return Err(Error::invalid_argument(
                "args",
                format!(
                    "group_norm expects (input, num_groups), got {} positional arguments",
                    args.len()
                ),
            ));
        };
        let input = input.as_var().ok_or_else(|| {
            Error::invalid_argument("input", format!("expected a Tensor, got {}", input.kind()))
        })?;
        let eps = match kwargs.get("eps") {
            Some(eps) => eps.as_f64("eps")?,
            None => DEFAULT_EPS,
        };

        Ok(Self {
            input,
            num_groups: num_groups.as_usize("num_groups")?,
            weight: kwargs.get("weight").unwrap_or(&ABSENT),
            bias: kwargs.get("bias").unwrap_or(&ABSENT),
            eps,
        })
    }
}

/// The tensor behind an optional affine parameter
pub(crate) fn optional_tensor<'a>(arg: &'a ExpandedArg, name: &'static str) -> Result<Option<&'a Tensor>> {
    match arg {
        ExpandedArg::None => Ok(None),
        other => other.tensor().map(Some).ok_or_else(|| {
            Error::invalid_argument(name, format!("expected a Tensor or None, got {}", other.kind()))
        }),
    }
}

/// State kept between forward and backward
pub struct GroupNormCtx {
    args: Vec<ExpandedArg>,
    kwargs: Kwargs,
    mean: Tensor,
    rstd: Tensor,
}

impl GroupNormCtx {
    /// Per-(example, group) mean, shape `[N, G]`
    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    /// Per-(example, group) inverse standard deviation, shape `[N, G]`
    pub fn rstd(&self) -> &Tensor {
        &self.rstd
    }
}

/// Group normalization producing per-sample weight and bias gradients
///
/// Backward returns the aggregated input gradient only. Weight and bias
/// slots are always `None`; when they are [`ExpandedWeight`](super::ExpandedWeight)s
/// they instead receive `[N, C]` per-sample gradients:
///
/// ```text
/// weight.grad_sample[n, c] = Σ_spatial group_norm(input)[n, c, ...] * grad_output[n, c, ...]
/// bias.grad_sample[n, c]   = Σ_spatial grad_output[n, c, ...]
/// ```
pub struct GroupNormPerSampleGrad;

impl Function for GroupNormPerSampleGrad {
    type Arg = ExpandedArg;
    type Ctx = GroupNormCtx;
    const NAME: &'static str = "GroupNormPerSampleGrad";

    fn forward<C: TensorOps>(
        client: &C,
        kwarg_names: &[&'static str],
        flat_args: &[ExpandedArg],
    ) -> Result<(Tensor, GroupNormCtx)> {
        let (args, kwargs) = standard_kwargs(kwarg_names, flat_args)?;
        let (output, mean, rstd) =
            forward_helper(Operator::GroupNorm, &args, &kwargs, |args, kwargs| {
                let p = GroupNormArgs::parse(args, kwargs)?;
                client.group_norm_all_outputs(
                    p.input.tensor(),
                    p.num_groups,
                    optional_tensor(p.weight, "weight")?,
                    optional_tensor(p.bias, "bias")?,
                    p.eps,
                )
            })?;

        Ok((
            output,
            GroupNormCtx {
                args,
                kwargs,
                mean,
                rstd,
            },
        ))
    }

    fn backward<C: TensorOps>(
        ctx: &GroupNormCtx,
        client: &C,
        grad_output: &Tensor,
    ) -> Result<Vec<Option<Tensor>>> {
        let p = GroupNormArgs::parse(&ctx.args, &ctx.kwargs)?;
        let input = p.input.tensor();

        // slot 0 is kwarg_names
        let mut results = vec![None];

        if p.input.requires_grad() {
            let weight_c = unpack_expanded_weight_or_tensor(p.weight, Tensor::contiguous)?;
            let input_c = input.contiguous();
            let grad_output_c = grad_output.contiguous();
            let shape = input.shape();
            let (n, c) = (shape[0], shape[1]);
            let hxw = shape[2..].iter().product();

            let (input_grad, _, _) = client.group_norm_backward(
                &grad_output_c,
                &input_c,
                &ctx.mean,
                &ctx.rstd,
                weight_c.as_ref(),
                n,
                c,
                hxw,
                p.num_groups,
                [true, false, false],
            )?;
            let input_grad = input_grad.ok_or_else(|| {
                Error::Internal("group_norm_backward did not return the input gradient".into())
            })?;
            results.push(Some(input_grad));
        } else {
            results.push(None);
        }

        // weight and bias don't compute batched gradients; no other arguments are differentiable
        let remaining = ctx.args.len() - 1 + ctx.kwargs.len();
        results.extend(std::iter::repeat_with(|| None).take(remaining));

        set_grad_sample_if_exists(client, p.weight, |_| {
            let normalized = client.group_norm(input, p.num_groups, None, None, p.eps)?;
            let scaled = client.mul(&normalized, grad_output)?;
            client.einsum("ni...->ni", &[&scaled])
        })?;
        set_grad_sample_if_exists(client, p.bias, |_| {
            client.einsum("ni...->ni", &[grad_output])
        })?;

        Ok(results)
    }
}
