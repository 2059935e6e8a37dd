//! Einsum operations trait.

use crate::error::Result;
use crate::tensor::Tensor;

/// Einstein summation convention operations.
///
/// # Notation
///
/// The notation string has the form `"subscripts_input1,subscripts_input2,...->subscripts_output"`.
/// Each subscript is a single lowercase letter representing a dimension.
///
/// - Repeated subscripts across inputs indicate contraction over that dimension
/// - A subscript repeated within one input takes the diagonal
/// - `...` stands for the dimensions not named by letters; ellipsis dimensions
///   of different inputs broadcast against each other (right-aligned)
/// - When the output omits `...`, the ellipsis dimensions are summed out
/// - If `->` is omitted, the output is `...` followed by the sorted list of
///   letters appearing exactly once
///
/// # Examples
///
/// ```ignore
/// // Per-example, per-channel sum over every trailing dimension
/// let per_sample = client.einsum("ni...->ni", &[&x])?;
///
/// // Matrix multiplication
/// let c = client.einsum("ij,jk->ik", &[&a, &b])?;
///
/// // Trace
/// let trace = client.einsum("ii->", &[&a])?;
/// ```
pub trait EinsumOps {
    /// Evaluate an einsum expression.
    fn einsum(&self, notation: &str, inputs: &[&Tensor]) -> Result<Tensor>;
}
