//! Helper functions shared by the CPU operation implementations

use super::kernels;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::ops::{broadcast_shape, normalize_reduce_dims, reduce_output_shape, BinaryOp};
use crate::tensor::Tensor;

// ============================================================================
// DType Dispatch Macro
// ============================================================================

/// Macro for dtype dispatch to typed kernel calls
///
/// Matches on a runtime [`DType`] and executes the block with `$T` bound to
/// the corresponding Rust element type.
/// Usage: `dispatch_dtype!(dtype, T => { code using T })`
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:block) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
        }
    };
}

pub(crate) use dispatch_dtype;

/// Return a contiguous tensor, copying only when the layout requires it
#[inline]
pub fn ensure_contiguous(tensor: &Tensor) -> Tensor {
    tensor.contiguous()
}

/// Validate that two operands share a dtype and return it
pub fn validate_binary_dtypes(a: &Tensor, b: &Tensor) -> Result<DType> {
    if a.dtype() != b.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: a.dtype(),
            rhs: b.dtype(),
        });
    }
    Ok(a.dtype())
}

// ============================================================================
// Shared Operation Bodies
// ============================================================================

/// Broadcasting elementwise binary operation
pub fn binary_op_impl(op: BinaryOp, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let dtype = validate_binary_dtypes(a, b)?;
    let out_shape = broadcast_shape(a.shape(), b.shape())?;

    let a_view = a.broadcast_to(&out_shape)?;
    let b_view = b.broadcast_to(&out_shape)?;

    dispatch_dtype!(dtype, T => {
        let out = kernels::binary_strided_kernel::<T>(
            op,
            storage_slice::<T>(&a_view)?,
            a_view.layout(),
            storage_slice::<T>(&b_view)?,
            b_view.layout(),
        );
        Tensor::try_from_vec(out, &out_shape)
    })
}

/// Sum over `dims`, dropping them unless `keepdim`
pub fn sum_impl(a: &Tensor, dims: &[usize], keepdim: bool) -> Result<Tensor> {
    let mask = normalize_reduce_dims(dims, a.ndim())?;
    let out_shape = reduce_output_shape(a.shape(), &mask, keepdim);

    dispatch_dtype!(a.dtype(), T => {
        let out = kernels::sum_strided_kernel::<T>(storage_slice::<T>(a)?, a.layout(), &mask);
        Tensor::try_from_vec(out, &out_shape)
    })
}

/// The whole backing buffer of a tensor, for kernels that walk its layout
pub fn storage_slice<T: Element>(tensor: &Tensor) -> Result<&[T]> {
    tensor.storage().as_slice::<T>().ok_or(Error::DTypeMismatch {
        lhs: T::DTYPE,
        rhs: tensor.dtype(),
    })
}
