//! Automatic differentiation (autograd)
//!
//! This module provides reverse-mode automatic differentiation for
//! computing gradients of tensor computations.
//!
//! - [`Var`] wraps a tensor and records the [`GradFn`] that produced it
//! - [`backward`] / [`backward_with_grad`] walk the graph and fill a [`GradStore`]
//! - [`Function`] and [`apply`] let an operation supply its own backward;
//!   the per-sample gradient rules in `expanded_weights` are built on it

mod backward;
mod function;
mod grad_fn;
mod grad_store;
mod var;

pub mod ops;
mod var_ops;

pub use backward::{backward, backward_with_grad};
pub use function::{apply, Function, FunctionInput, FunctionNode};
pub use grad_fn::GradFn;
pub use grad_store::GradStore;
pub use var::Var;
pub use var_ops::{var_add, var_group_norm, var_sum};
