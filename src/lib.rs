//! # samplegrad
//!
//! **Per-sample gradients for group normalization on a small CPU tensor and
//! autograd core.**
//!
//! Ordinary backpropagation sums parameter gradients over the batch. Some
//! algorithms (differentially private training, gradient-noise studies,
//! per-example clipping) need one gradient per example instead. samplegrad
//! computes them without a batch loop: a parameter wrapped in an
//! [`ExpandedWeight`](expanded_weights::ExpandedWeight) receives a
//! `grad_sample` of shape `[batch_size, *weight.shape]` during the normal
//! backward pass, while the input still gets its aggregated gradient.
//!
//! ## Features
//!
//! - **Tensors**: immutable n-dimensional arrays with zero-copy views and broadcasting
//! - **Operations**: add, sub, mul, sum, einsum, group normalization and its backward
//! - **Autograd**: reverse-mode differentiation with custom [`Function`](autograd::Function)s
//! - **Expanded weights**: per-sample gradient rules dispatched through an operator registry
//!
//! ## Quick Start
//!
//! ```
//! use samplegrad::prelude::*;
//!
//! let client = CpuClient::default();
//! let data: Vec<f32> = (0..24).map(|i| i as f32 * 0.25).collect();
//! let x = Var::new(Tensor::from_slice(&data, &[2, 4, 3]), true);
//!
//! let weight = ExpandedWeight::new(Var::new(Tensor::ones(&[4], DType::F32), true), 2)?;
//! let bias = ExpandedWeight::new(Var::new(Tensor::zeros(&[4], DType::F32), true), 2)?;
//!
//! let y = group_norm(&client, &x, 2, &weight, &bias, DEFAULT_EPS)?;
//! let loss = var_sum(&y, &[0, 1, 2], false, &client)?;
//! backward(&loss, &client)?;
//!
//! assert_eq!(weight.grad_sample().unwrap().shape(), &[2, 4]);
//! assert_eq!(bias.grad_sample().unwrap().to_vec::<f32>(), vec![3.0; 8]);
//! # Ok::<(), samplegrad::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded CPU kernels for large workloads
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: dispatch decisions at `debug`,
//! per-node backward steps at `trace`. Install any logger (for example
//! `env_logger`) to see them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod autograd;
pub mod dtype;
pub mod error;
pub mod expanded_weights;
pub mod ops;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::autograd::{backward, backward_with_grad, var_add, var_group_norm, var_sum, Var};
    pub use crate::dtype::DType;
    pub use crate::error::{Error, Result};
    pub use crate::expanded_weights::{
        call_operator, group_norm, ExpandedArg, ExpandedWeight, Kwargs, Operator, DEFAULT_EPS,
    };
    pub use crate::ops::{BinaryOps, EinsumOps, NormalizationOps, ReduceOps, TensorOps};
    pub use crate::runtime::{CpuClient, CpuConfig};
    pub use crate::tensor::{Layout, Tensor};
}
