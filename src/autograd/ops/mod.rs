//! Backward implementations for operations
//!
//! Each operation has a corresponding backward struct that implements
//! `GradFn` to compute gradients during the backward pass.
//!
//! # Structure
//!
//! - `arithmetic`: Broadcasting addition
//! - `reduce`: Sum reduction
//! - `normalization`: Group normalization (aggregated gradients)

mod arithmetic;
mod normalization;
mod reduce;

pub use arithmetic::*;
pub use normalization::*;
pub use reduce::*;
