//! Error types for samplegrad

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using samplegrad's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tensor, autograd and per-sample-gradient operations
#[derive(Error, Debug)]
pub enum Error {
    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Shapes cannot be broadcast together
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}")]
    BroadcastError {
        /// Left-hand side shape
        lhs: Vec<usize>,
        /// Right-hand side shape
        rhs: Vec<usize>,
    },

    /// Invalid dimension index
    #[error("Invalid dimension {dim} for tensor with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension
        dim: isize,
        /// Number of dimensions
        ndim: usize,
    },

    /// DType mismatch between operands
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// An expanded weight was built for a different batch size than the input carries
    #[error(
        "Expected ExpandedWeight to have batch size matching input but got input batch size \
         of {input} with ExpandedWeight of batch size {expanded} in '{op}'"
    )]
    BatchSizeMismatch {
        /// Batch size of the input tensor
        input: usize,
        /// Batch size recorded on the expanded weight
        expanded: usize,
        /// The operation being dispatched
        op: &'static str,
    },

    /// An expanded weight reached an operator with no per-sample gradient rule
    #[error("Expanded Weights encountered but cannot handle function {op}")]
    UnsupportedOperator {
        /// Name of the operator
        op: &'static str,
    },

    /// A backward function returned the wrong number of gradients
    #[error("Function {function} returned {got} gradients but {expected} were expected")]
    GradientCountMismatch {
        /// Name of the custom function
        function: &'static str,
        /// Number of forward arguments plus the control slot
        expected: usize,
        /// Number of gradients actually returned
        got: usize,
    },

    /// A backward function returned a gradient for a non-differentiable argument
    #[error(
        "Function {function} returned a gradient at position {position}, \
         but the corresponding forward argument is not differentiable"
    )]
    InvalidGradient {
        /// Name of the custom function
        function: &'static str,
        /// Slot in the backward result
        position: usize,
    },

    /// Missing gradient in backward pass
    #[error("Missing gradient for tensor")]
    MissingGradient,

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Feature not yet implemented
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::BroadcastError {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
