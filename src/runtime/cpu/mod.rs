//! CPU runtime implementation
//!
//! The CPU runtime provides the reference implementation for every tensor
//! operation used by the autograd engine and the per-sample-gradient rules.
//!
//! # Broadcasting
//!
//! NumPy-style broadcasting is supported for binary arithmetic operations
//! (add, sub, mul). Dimensions are right-aligned and expanded where one
//! operand has size 1.
//!
//! # Non-contiguous Tensors
//!
//! Elementwise operations and reductions walk strided layouts directly.
//! Normalization kernels require contiguous data and copy their inputs first
//! when needed.

mod client;
pub(crate) mod helpers;
pub(crate) mod kernels;

pub use client::{CpuClient, CpuConfig, PARALLEL_THRESHOLD_ENV};
