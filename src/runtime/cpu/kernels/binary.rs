//! Elementwise binary kernels

use super::StridedIter;
use crate::dtype::Element;
use crate::ops::BinaryOp;
use crate::tensor::Layout;

#[inline]
fn apply<T: Element>(op: BinaryOp, a: T, b: T) -> T {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
    }
}

/// Apply `op` elementwise over two layouts of identical shape
///
/// Both layouts must already be broadcast to the output shape. Returns the
/// result in row-major order.
pub fn binary_strided_kernel<T: Element>(
    op: BinaryOp,
    a: &[T],
    a_layout: &Layout,
    b: &[T],
    b_layout: &Layout,
) -> Vec<T> {
    debug_assert_eq!(a_layout.shape(), b_layout.shape());

    if a_layout.is_contiguous() && b_layout.is_contiguous() {
        let len = a_layout.elem_count();
        return a[..len]
            .iter()
            .zip(&b[..len])
            .map(|(&x, &y)| apply(op, x, y))
            .collect();
    }

    StridedIter::from_layout(a_layout)
        .zip(StridedIter::from_layout(b_layout))
        .map(|(i, j)| apply(op, a[i], b[j]))
        .collect()
}
