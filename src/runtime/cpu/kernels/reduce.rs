//! Sum reduction kernel

use super::StridedIter;
use crate::dtype::Element;
use crate::tensor::Layout;
use smallvec::SmallVec;

/// Sum `src` (addressed through `layout`) over every dimension flagged in `reduce`
///
/// The result is row-major with the keepdim shape: reduced dimensions have
/// size 1. Accumulation is done in `f64`.
pub fn sum_strided_kernel<T: Element>(src: &[T], layout: &Layout, reduce: &[bool]) -> Vec<T> {
    debug_assert_eq!(reduce.len(), layout.ndim());

    let out_shape: SmallVec<[usize; 4]> = layout
        .shape()
        .iter()
        .zip(reduce)
        .map(|(&d, &r)| if r { 1 } else { d })
        .collect();
    let out_len: usize = out_shape.iter().product();

    // Contiguous output strides with reduced dims pinned to stride 0, so walking
    // the input shape yields the destination slot of every element.
    let mut out_strides: SmallVec<[isize; 4]> = SmallVec::from_elem(0, out_shape.len());
    let mut stride = 1isize;
    for d in (0..out_shape.len()).rev() {
        out_strides[d] = if reduce[d] { 0 } else { stride };
        stride *= out_shape[d] as isize;
    }

    let mut acc = vec![0.0f64; out_len];
    for (src_idx, dst_idx) in StridedIter::from_layout(layout)
        .zip(StridedIter::new(layout.shape(), &out_strides, 0))
    {
        acc[dst_idx] += src[src_idx].to_f64();
    }

    acc.into_iter().map(T::from_f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_inner_dims() {
        let layout = Layout::contiguous(&[2, 2, 2]);
        let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let out = sum_strided_kernel(&data, &layout, &[false, true, true]);
        assert_eq!(out, vec![10.0, 26.0]);
    }

    #[test]
    fn test_sum_leading_dim() {
        let layout = Layout::contiguous(&[2, 3]);
        let data = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = sum_strided_kernel(&data, &layout, &[true, false]);
        assert_eq!(out, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_sum_everything() {
        let layout = Layout::contiguous(&[2, 3]);
        let data = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(sum_strided_kernel(&data, &layout, &[true, true]), vec![21.0]);
    }
}
