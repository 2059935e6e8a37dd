//! CPU implementation of tensor operations.
//!
//! This module contains the operation trait implementations for the CPU runtime.
//! Each operation type has its own module.

pub mod binary;
pub mod einsum;
pub mod normalization;
pub mod reduce;
