//! Tensor operations
//!
//! Operations are defined as traits implemented by the runtime client, so
//! callers (autograd nodes, per-sample-gradient rules) only name the
//! capabilities they need.
//!
//! ```text
//! CpuClient
//!   └── implements TensorOps
//!         ├── add, sub, mul                 (BinaryOps, broadcasting)
//!         ├── sum                           (ReduceOps)
//!         ├── einsum                        (EinsumOps, with `...`)
//!         └── group_norm, group_norm_all_outputs,
//!             group_norm_backward           (NormalizationOps)
//! ```

mod arithmetic;
pub(crate) mod cpu;
pub(crate) mod impl_generic;
mod reduce;
mod traits;

pub use arithmetic::{broadcast_shape, BinaryOp};
pub use reduce::{normalize_reduce_dims, reduce_output_shape};
pub use traits::{
    BinaryOps, EinsumOps, GroupNormGrads, GroupNormStats, NormalizationOps, ReduceOps, TensorOps,
};
