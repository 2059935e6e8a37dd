//! Operations on Var that build the computation graph
//!
//! These functions perform forward computation and create the appropriate
//! backward functions for gradient tracking.
//!
//! # Example
//!
//! ```
//! # use samplegrad::prelude::*;
//! # use samplegrad::autograd::{backward, var_group_norm, var_sum, Var};
//! # let client = CpuClient::default();
//! let x = Var::new(Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 2, 2]), true);
//! let w = Var::new(Tensor::from_slice(&[1.0f32, 1.0], &[2]), true);
//!
//! // Build computation graph: loss = sum(group_norm(x, weight = w))
//! let y = var_group_norm(&x, 1, Some(&w), None, 1e-5, &client)?;
//! let loss = var_sum(&y, &[0, 1, 2], false, &client)?;
//!
//! // Compute gradients
//! let grads = backward(&loss, &client)?;
//! assert!(grads.get(w.id()).is_some());
//! # Ok::<(), samplegrad::error::Error>(())
//! ```

mod arithmetic;
mod normalization;
mod reduce;

pub use arithmetic::var_add;
pub use normalization::var_group_norm;
pub use reduce::var_sum;
