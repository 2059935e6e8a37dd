//! Per-sample ("expanded") gradients
//!
//! Wrapping a parameter in an [`ExpandedWeight`] asks for one gradient per
//! example instead of one summed over the batch. Operators are called
//! through [`call_operator`] (or a convenience entry point like
//! [`group_norm`]); when an argument is expanded the call is routed to the
//! operator's registered per-sample rule, a custom autograd
//! [`Function`](crate::autograd::Function) whose backward writes
//! `grad_sample` on each expanded weight.
//!
//! ```text
//! group_norm(client, x, G, weight, bias, eps)
//!   └── call_operator(Operator::GroupNorm, ...)
//!         ├── no ExpandedWeight   -> var_group_norm         (aggregated grads)
//!         └── some ExpandedWeight -> registry lookup
//!                                     └── GroupNormPerSampleGrad
//!                                           ├── grad for input  (aggregated)
//!                                           └── grad_sample on weight / bias
//! ```

mod arg;
mod dispatch;
mod expanded_weight;
mod group_norm;
mod kwargs;
mod registry;
mod utils;

pub use arg::ExpandedArg;
pub use dispatch::{call_operator, group_norm};
pub use expanded_weight::ExpandedWeight;
pub use group_norm::{GroupNormCtx, GroupNormPerSampleGrad, DEFAULT_EPS};
pub use kwargs::{standard_kwargs, Kwargs};
pub use registry::{implements_per_sample_grads, per_sample_grad_rule, Operator, PerSampleGradRule};
pub use utils::{forward_helper, set_grad_sample_if_exists, unpack_expanded_weight_or_tensor};
