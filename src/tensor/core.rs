//! Core Tensor type

use super::{Buffer, Layout, Storage, TensorId};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::cpu::kernels;
use std::fmt;

/// N-dimensional array in host memory
///
/// `Tensor` consists of:
/// - **Storage**: Reference-counted, immutable element buffer
/// - **Layout**: Shape, strides, and offset defining the view into storage
/// - **DType**: Element type (determined at runtime from the storage)
///
/// # Zero-Copy Views
///
/// `transpose`, `permute`, `reshape` and `broadcast_to` return tensors that
/// share the same storage with a different layout. `contiguous()` is the only
/// view-related operation that may allocate.
///
/// # Example
///
/// ```
/// use samplegrad::tensor::Tensor;
///
/// let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
/// let b = a.transpose(0, 1)?; // Zero-copy, shares storage with a
/// assert!(!b.is_contiguous());
/// assert_eq!(b.to_vec::<f32>(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
/// # Ok::<(), samplegrad::error::Error>(())
/// ```
pub struct Tensor {
    /// Unique ID for autograd tracking
    id: TensorId,
    /// Host memory
    storage: Storage,
    /// Shape, strides, offset
    layout: Layout,
}

impl Tensor {
    /// Create a tensor from storage and layout
    pub fn from_parts(storage: Storage, layout: Layout) -> Self {
        Self {
            id: TensorId::new(),
            storage,
            layout,
        }
    }

    /// Create a tensor from a slice of data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of the `shape` dimensions.
    /// For a fallible alternative, use [`Self::try_from_slice`].
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Self {
        Self::try_from_slice(data, shape).expect("Tensor::from_slice failed")
    }

    /// Create a tensor from a slice of data (fallible version)
    pub fn try_from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::try_from_vec(data.to_vec(), shape)
    }

    /// Create a tensor taking ownership of a row-major vector
    pub fn try_from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }

        Ok(Self::from_parts(
            Storage::from_vec(data),
            Layout::contiguous(shape),
        ))
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        Self::full_scalar(shape, dtype, 0.0)
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: &[usize], dtype: DType) -> Self {
        Self::full_scalar(shape, dtype, 1.0)
    }

    /// Create a tensor filled with a scalar value
    ///
    /// The scalar is converted to the target dtype.
    pub fn full_scalar(shape: &[usize], dtype: DType, value: f64) -> Self {
        let len: usize = shape.iter().product();
        let storage = match dtype {
            DType::F64 => Storage::from_vec(vec![value; len]),
            DType::F32 => Storage::from_vec(vec![value as f32; len]),
        };
        Self::from_parts(storage, Layout::contiguous(shape))
    }

    // ===== Accessors =====

    /// Get the tensor ID
    #[inline]
    pub fn id(&self) -> TensorId {
        self.id
    }

    /// Get the storage
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Get the layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    /// Get the number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Get the total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.elem_count()
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Check if the tensor is contiguous in memory
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Get size along a dimension (supports negative indexing)
    pub fn size(&self, dim: isize) -> Option<usize> {
        self.layout.dim(dim)
    }

    // ===== View Operations (Zero-Copy) =====

    fn with_layout(&self, layout: Layout) -> Self {
        Self {
            id: TensorId::new(),
            storage: self.storage.clone(),
            layout,
        }
    }

    /// Transpose two dimensions (zero-copy)
    pub fn transpose(&self, dim0: isize, dim1: isize) -> Result<Self> {
        let new_layout =
            self.layout
                .transpose(dim0, dim1)
                .ok_or_else(|| Error::InvalidDimension {
                    dim: dim0,
                    ndim: self.ndim(),
                })?;
        Ok(self.with_layout(new_layout))
    }

    /// Permute dimensions (zero-copy)
    ///
    /// `dims` must be a permutation of `0..ndim`.
    pub fn permute(&self, dims: &[usize]) -> Result<Self> {
        let new_layout = self.layout.permute(dims).ok_or_else(|| {
            Error::invalid_argument(
                "dims",
                format!("{dims:?} is not a permutation of 0..{}", self.ndim()),
            )
        })?;
        Ok(self.with_layout(new_layout))
    }

    /// Reshape to a new shape
    ///
    /// Zero-copy when the tensor is contiguous; otherwise the data is first
    /// made contiguous.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        let new_count: usize = shape.iter().product();
        if new_count != self.numel() {
            return Err(Error::shape_mismatch(shape, self.shape()));
        }
        match self.layout.reshape(shape) {
            Some(layout) => Ok(self.with_layout(layout)),
            None => self.contiguous().reshape(shape),
        }
    }

    /// Broadcast to a target shape (zero-copy)
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        let new_layout = self
            .layout
            .broadcast_to(shape)
            .ok_or_else(|| Error::broadcast(self.shape(), shape))?;
        Ok(self.with_layout(new_layout))
    }

    // ===== Materialization =====

    /// Return a contiguous tensor with the same values
    ///
    /// Returns a view of the same storage if already contiguous; otherwise
    /// copies the elements in logical row-major order into new storage.
    pub fn contiguous(&self) -> Self {
        if self.is_contiguous() && self.storage.len() == self.numel() {
            return self.clone();
        }

        let storage = match self.storage.buffer() {
            Buffer::F32(src) => Storage::from_vec(kernels::copy_strided(src, &self.layout)),
            Buffer::F64(src) => Storage::from_vec(kernels::copy_strided(src, &self.layout)),
        };
        Self::from_parts(storage, Layout::contiguous(self.shape()))
    }

    /// Borrow the elements as a row-major slice
    ///
    /// Fails with `DTypeMismatch` if `T` is not the tensor's element type.
    /// The tensor must be contiguous; call [`Self::contiguous`] first otherwise.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        let data = self
            .storage
            .as_slice::<T>()
            .ok_or(Error::DTypeMismatch {
                lhs: T::DTYPE,
                rhs: self.dtype(),
            })?;
        if !self.is_contiguous() {
            return Err(Error::invalid_argument(
                "tensor",
                "as_slice requires a contiguous tensor",
            ));
        }
        Ok(&data[..self.numel()])
    }

    /// Copy tensor data to a Vec in logical row-major order (fallible version)
    pub fn try_to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let data = self
            .storage
            .as_slice::<T>()
            .ok_or(Error::DTypeMismatch {
                lhs: T::DTYPE,
                rhs: self.dtype(),
            })?;
        if self.is_contiguous() {
            Ok(data[..self.numel()].to_vec())
        } else {
            Ok(kernels::copy_strided(data, &self.layout))
        }
    }

    /// Copy tensor data to a Vec in logical row-major order
    ///
    /// # Panics
    ///
    /// Panics if `T` does not match the tensor's dtype.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.try_to_vec().expect("Tensor::to_vec dtype mismatch")
    }

    /// Extract the value of a single-element tensor
    pub fn item<T: Element>(&self) -> Result<T> {
        if self.numel() != 1 {
            return Err(Error::ShapeMismatch {
                expected: vec![1],
                got: self.shape().to_vec(),
            });
        }
        Ok(self.try_to_vec::<T>()?[0])
    }
}

impl Clone for Tensor {
    /// Clone creates a new tensor sharing the same storage (zero-copy)
    fn clone(&self) -> Self {
        self.with_layout(self.layout.clone())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.id)
            .field("shape", &self.shape())
            .field("dtype", &self.dtype())
            .field("contiguous", &self.is_contiguous())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_shape_check() {
        let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]);
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.dtype(), DType::F32);
        assert!(Tensor::try_from_slice(&[1.0f32, 2.0, 3.0], &[2, 2]).is_err());
    }

    #[test]
    fn test_full_scalar() {
        let t = Tensor::full_scalar(&[2, 3], DType::F64, 2.5);
        assert_eq!(t.to_vec::<f64>(), vec![2.5; 6]);
        assert_eq!(Tensor::ones(&[3], DType::F32).to_vec::<f32>(), vec![1.0; 3]);
    }

    #[test]
    fn test_contiguous_copies_only_when_needed() {
        let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let same = t.contiguous();
        assert!(same.storage().ptr_eq(t.storage()));

        let tt = t.transpose(0, 1).unwrap();
        let c = tt.contiguous();
        assert!(c.is_contiguous());
        assert!(!c.storage().ptr_eq(t.storage()));
        assert_eq!(c.to_vec::<f32>(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_reshape_non_contiguous() {
        let t = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2]);
        let r = t.transpose(0, 1).unwrap().reshape(&[4]).unwrap();
        assert_eq!(r.to_vec::<f64>(), vec![1.0, 3.0, 2.0, 4.0]);
        assert!(t.reshape(&[3]).is_err());
    }

    #[test]
    fn test_dtype_mismatch_on_read() {
        let t = Tensor::from_slice(&[1.0f32], &[1]);
        assert!(matches!(
            t.try_to_vec::<f64>(),
            Err(Error::DTypeMismatch { .. })
        ));
        assert_eq!(t.item::<f32>().unwrap(), 1.0);
    }

    #[test]
    fn test_clone_gets_new_id() {
        let t = Tensor::zeros(&[2], DType::F32);
        let c = t.clone();
        assert_ne!(t.id(), c.id());
        assert!(c.storage().ptr_eq(t.storage()));
    }
}
