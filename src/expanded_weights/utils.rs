//! Helpers shared by per-sample gradient rules

use super::{ExpandedArg, Kwargs, Operator};
use crate::error::{Error, Result};
use crate::ops::BinaryOps;
use crate::tensor::Tensor;

/// Validate expanded arguments and invoke the batched primitive on them
///
/// The first positional argument must be a plain tensor with a non-empty
/// leading batch dimension, and every [`ExpandedWeight`](super::ExpandedWeight)
/// must have been built for that batch size. Expanded weights are replaced
/// by their original weight before `primitive` runs; its result is returned
/// unchanged.
pub fn forward_helper<T, F>(op: Operator, args: &[ExpandedArg], kwargs: &Kwargs, primitive: F) -> Result<T>
where
    F: FnOnce(&[ExpandedArg], &Kwargs) -> Result<T>,
{
    let (args, kwargs) = check_and_unexpand_args(op, args, kwargs)?;
    primitive(&args, &kwargs)
}

fn check_and_unexpand_args(
    op: Operator,
    args: &[ExpandedArg],
    kwargs: &Kwargs,
) -> Result<(Vec<ExpandedArg>, Kwargs)> {
    let input = match args.first() {
        Some(ExpandedArg::Tensor(var)) => var,
        Some(ExpandedArg::Expanded(_)) => {
            return Err(Error::invalid_argument(
                "input",
                format!(
                    "Expanded Weights do not support inputs that are also ExpandedWeights. \
                     Input must be a Tensor in {}",
                    op.name()
                ),
            ))
        }
        other => {
            return Err(Error::invalid_argument(
                "input",
                format!(
                    "Expanded Weights requires a Tensor as the first input to get the batch \
                     dimension, got {} in {}",
                    other.map_or("nothing", ExpandedArg::kind),
                    op.name()
                ),
            ))
        }
    };

    let batch_size = match input.shape().first() {
        None => {
            return Err(Error::invalid_argument(
                "input",
                format!(
                    "Expanded Weights requires a batch dimension but got an input of size 0 in {}",
                    op.name()
                ),
            ))
        }
        Some(0) => {
            return Err(Error::invalid_argument(
                "input",
                format!(
                    "0 is not a valid batch size for Expanded Weights but got input tensor of \
                     shape {:?} in {}",
                    input.shape(),
                    op.name()
                ),
            ))
        }
        Some(&n) => n,
    };

    for arg in args.iter().chain(kwargs.values()) {
        if let ExpandedArg::Expanded(ew) = arg {
            if ew.batch_size() != batch_size {
                return Err(Error::BatchSizeMismatch {
                    input: batch_size,
                    expanded: ew.batch_size(),
                    op: op.name(),
                });
            }
        }
    }

    let unexpand = |arg: &ExpandedArg| match arg {
        ExpandedArg::Expanded(ew) => ExpandedArg::Tensor(ew.weight().clone()),
        other => other.clone(),
    };
    let args = args.iter().map(unexpand).collect();
    let mut plain = Kwargs::new();
    for (name, value) in kwargs.names().zip(kwargs.values()) {
        plain.insert(name, unexpand(value));
    }
    Ok((args, plain))
}

/// Compute and store a per-sample gradient, if `arg` asked for one
///
/// `compute` receives the original weight and only runs for
/// [`ExpandedArg::Expanded`]; for anything else this is a no-op. A second
/// contribution for the same weight (one weight used twice in a batch) is
/// added to the first.
pub fn set_grad_sample_if_exists<C, F>(client: &C, arg: &ExpandedArg, compute: F) -> Result<()>
where
    C: BinaryOps,
    F: FnOnce(&Tensor) -> Result<Tensor>,
{
    let ExpandedArg::Expanded(ew) = arg else {
        return Ok(());
    };
    let sample = compute(ew.weight().tensor())?;
    log::trace!(
        "grad_sample {:?} for weight {}",
        sample.shape(),
        ew.weight().id()
    );
    ew.accumulate_grad_sample(client, sample)
}

/// Apply `f` to the tensor behind a plain tensor or an expanded weight
///
/// Returns `Ok(None)` for non-tensor arguments. A plain tensor that requires
/// grad is rejected: it would silently lose its gradient when mixed with
/// expanded weights in one call.
pub fn unpack_expanded_weight_or_tensor<T, F>(arg: &ExpandedArg, f: F) -> Result<Option<T>>
where
    F: FnOnce(&Tensor) -> T,
{
    match arg {
        ExpandedArg::Expanded(ew) => Ok(Some(f(ew.weight().tensor()))),
        ExpandedArg::Tensor(var) if !var.requires_grad() => Ok(Some(f(var.tensor()))),
        ExpandedArg::Tensor(_) => Err(Error::NotImplemented {
            feature: "mixing ExpandedWeight parameters with plain parameters that require grad",
        }),
        _ => Ok(None),
    }
}
