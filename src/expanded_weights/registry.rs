//! Operator to per-sample rule lookup table

use super::{ExpandedArg, GroupNormPerSampleGrad};
use crate::autograd::{apply, Function, Var};
use crate::error::Result;
use crate::runtime::CpuClient;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

/// Operators the dispatcher knows how to call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `group_norm(input, num_groups, weight=None, bias=None, eps=1e-5)`
    GroupNorm,
    /// `sum(input)` over every dimension
    Sum,
}

impl Operator {
    /// Operator name used in errors and logs
    pub fn name(self) -> &'static str {
        match self {
            Operator::GroupNorm => "group_norm",
            Operator::Sum => "sum",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A per-sample gradient implementation for one operator
pub trait PerSampleGradRule: Send + Sync {
    /// Name of the rule
    fn name(&self) -> &'static str;

    /// Run the operator with flattened keyword arguments and record it in the graph
    fn apply(
        &self,
        client: &CpuClient,
        kwarg_names: &[&'static str],
        flat_args: &[ExpandedArg],
    ) -> Result<Var>;
}

/// Adapts a custom [`Function`] over [`ExpandedArg`]s into a rule
struct FunctionRule<F>(PhantomData<fn() -> F>);

impl<F> PerSampleGradRule for FunctionRule<F>
where
    F: Function<Arg = ExpandedArg>,
{
    fn name(&self) -> &'static str {
        F::NAME
    }

    fn apply(
        &self,
        client: &CpuClient,
        kwarg_names: &[&'static str],
        flat_args: &[ExpandedArg],
    ) -> Result<Var> {
        apply::<F, CpuClient>(client, kwarg_names, flat_args)
    }
}

type Registry = HashMap<Operator, Box<dyn PerSampleGradRule>>;

fn implements<F>(registry: &mut Registry, op: Operator)
where
    F: Function<Arg = ExpandedArg>,
{
    registry.insert(op, Box::new(FunctionRule::<F>(PhantomData)));
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = Registry::new();
        implements::<GroupNormPerSampleGrad>(&mut registry, Operator::GroupNorm);
        log::debug!("per-sample gradient rules registered for {} operators", registry.len());
        registry
    })
}

/// Whether `op` has a per-sample gradient rule
pub fn implements_per_sample_grads(op: Operator) -> bool {
    registry().contains_key(&op)
}

/// The per-sample gradient rule registered for `op`
pub fn per_sample_grad_rule(op: Operator) -> Option<&'static dyn PerSampleGradRule> {
    registry().get(&op).map(|rule| &**rule)
}
