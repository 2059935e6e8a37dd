//! Reduction helpers

use crate::error::{Error, Result};

/// Validate reduction dims against a rank and return a per-dimension mask
///
/// Duplicate dims are accepted and reduce once.
pub fn normalize_reduce_dims(dims: &[usize], ndim: usize) -> Result<Vec<bool>> {
    let mut mask = vec![false; ndim];
    for &d in dims {
        if d >= ndim {
            return Err(Error::InvalidDimension {
                dim: d as isize,
                ndim,
            });
        }
        mask[d] = true;
    }
    Ok(mask)
}

/// Output shape of a reduction given the input shape and reduce mask
pub fn reduce_output_shape(shape: &[usize], mask: &[bool], keepdim: bool) -> Vec<usize> {
    shape
        .iter()
        .zip(mask)
        .filter_map(|(&d, &reduced)| match (reduced, keepdim) {
            (false, _) => Some(d),
            (true, true) => Some(1),
            (true, false) => None,
        })
        .collect()
}
