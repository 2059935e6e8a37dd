//! Tensor types and operations
//!
//! This module provides the core `Tensor` type, an immutable n-dimensional
//! array in host memory with zero-copy strided views.

mod core;
mod id;
mod layout;
mod storage;

pub use core::Tensor;
pub use id::TensorId;
pub use layout::{broadcast_shapes, Layout, Shape, Strides};
pub use storage::{Buffer, Storage};
