//! Operation traits for tensor operations.
//!
//! Implementations live in `ops::cpu`.

mod binary;
mod einsum;
mod normalization;
mod reduce;

pub use binary::BinaryOps;
pub use einsum::EinsumOps;
pub use normalization::{GroupNormGrads, GroupNormStats, NormalizationOps};
pub use reduce::ReduceOps;

/// Every operation family the autograd engine and the per-sample rules use
pub trait TensorOps: BinaryOps + ReduceOps + EinsumOps + NormalizationOps {}

impl<C> TensorOps for C where C: BinaryOps + ReduceOps + EinsumOps + NormalizationOps {}
