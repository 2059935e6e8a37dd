//! Storage: host memory shared between tensor views

use crate::dtype::{DType, Element};
use std::sync::Arc;

/// Typed element buffer behind a [`Storage`]
#[derive(Debug, Clone)]
pub enum Buffer {
    /// 32-bit float elements
    F32(Vec<f32>),
    /// 64-bit float elements
    F64(Vec<f64>),
}

/// Reference-counted storage for tensor data
///
/// Views created by `transpose`, `permute`, `reshape` and `broadcast_to`
/// clone the `Arc` and never copy elements. Storage is immutable once built.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<Buffer>,
}

impl Storage {
    /// Take ownership of a vector of elements
    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        Self {
            inner: Arc::new(T::into_buffer(data)),
        }
    }

    /// Copy a slice of elements into new storage
    pub fn from_slice<T: Element>(data: &[T]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Element type of the buffer
    pub fn dtype(&self) -> DType {
        match &*self.inner {
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
        }
    }

    /// Number of elements in the buffer
    pub fn len(&self) -> usize {
        match &*self.inner {
            Buffer::F32(v) => v.len(),
            Buffer::F64(v) => v.len(),
        }
    }

    /// Check if the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The underlying typed buffer
    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.inner
    }

    /// View the buffer as `&[T]`; `None` if `T` does not match the dtype
    #[inline]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.inner)
    }

    /// Whether two storages share the same allocation
    pub fn ptr_eq(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.len())
            .field("dtype", &self.dtype())
            .finish()
    }
}
