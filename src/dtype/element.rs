//! Element trait for mapping Rust types to DType

use super::DType;
use crate::tensor::Buffer;
use num_traits::{One, Zero};
use std::ops::{Add, Mul, Sub};

/// Trait for types that can be elements of a tensor
///
/// This trait connects Rust's type system to the runtime dtype system and
/// to the typed buffers behind [`crate::tensor::Storage`].
///
/// # Bounds
/// - `Copy + Send + Sync` - Plain values shared freely across rayon workers
/// - `Zero + One` - Additive/multiplicative identities (num-traits)
/// - `Add + Sub + Mul` - Elementwise arithmetic kernels (Output = Self)
///
/// Kernels that need transcendental functions (`sqrt`) go through
/// `to_f64`/`from_f64` and compute in double precision.
pub trait Element:
    Copy
    + Send
    + Sync
    + PartialOrd
    + std::fmt::Debug
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64 for accumulation
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Wrap an owned vector into a typed buffer
    fn into_buffer(data: Vec<Self>) -> Buffer;

    /// View a buffer as a slice of this type, if the dtypes agree
    fn view(buffer: &Buffer) -> Option<&[Self]>;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    fn into_buffer(data: Vec<Self>) -> Buffer {
        Buffer::F64(data)
    }

    fn view(buffer: &Buffer) -> Option<&[Self]> {
        match buffer {
            Buffer::F64(data) => Some(data),
            _ => None,
        }
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn into_buffer(data: Vec<Self>) -> Buffer {
        Buffer::F32(data)
    }

    fn view(buffer: &Buffer) -> Option<&[Self]> {
        match buffer {
            Buffer::F32(data) => Some(data),
            _ => None,
        }
    }
}
