//! CPU kernel implementations
//!
//! Kernels operate on typed slices and are generic over `T: Element`.
//! Accumulations are carried out in `f64` regardless of `T`.

mod binary;
mod memory;
mod norm;
mod reduce;

pub use binary::binary_strided_kernel;
pub use memory::{copy_strided, StridedIter};
pub use norm::{group_norm_backward_kernel, group_norm_forward_kernel, GroupNormDims};
pub use reduce::sum_strided_kernel;
