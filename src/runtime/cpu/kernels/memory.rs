//! Strided memory traversal

use crate::tensor::Layout;
use smallvec::SmallVec;

/// Iterator over the storage offsets of a layout in logical row-major order
///
/// Broadcast dimensions (stride 0) yield the same offset repeatedly.
pub struct StridedIter<'a> {
    shape: &'a [usize],
    strides: &'a [isize],
    index: SmallVec<[usize; 4]>,
    offset: isize,
    remaining: usize,
}

impl<'a> StridedIter<'a> {
    /// Walk `shape` with the given `strides`, starting at `offset`
    pub fn new(shape: &'a [usize], strides: &'a [isize], offset: usize) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape,
            strides,
            index: SmallVec::from_elem(0, shape.len()),
            offset: offset as isize,
            remaining: shape.iter().product(),
        }
    }

    /// Walk a tensor layout
    pub fn from_layout(layout: &'a Layout) -> Self {
        Self::new(layout.shape(), layout.strides(), layout.offset())
    }
}

impl Iterator for StridedIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.offset as usize;
        self.remaining -= 1;

        // Odometer increment, innermost dimension first
        for d in (0..self.shape.len()).rev() {
            self.index[d] += 1;
            self.offset += self.strides[d];
            if self.index[d] < self.shape[d] {
                break;
            }
            self.offset -= self.strides[d] * self.shape[d] as isize;
            self.index[d] = 0;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedIter<'_> {}

/// Gather the elements addressed by `layout` into a new row-major vector
pub fn copy_strided<T: Copy>(src: &[T], layout: &Layout) -> Vec<T> {
    StridedIter::from_layout(layout).map(|i| src[i]).collect()
}
