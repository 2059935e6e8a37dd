//! Tagged operator arguments

use super::ExpandedWeight;
use crate::autograd::{FunctionInput, Var};
use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// One operator argument, positional or keyword
///
/// Tensor-valued arguments are either a plain [`Var`] (shared across the
/// batch, ordinary gradients) or an [`ExpandedWeight`] (per-sample
/// gradients). Only the expanded case carries a `grad_sample` side channel.
#[derive(Clone, Debug)]
pub enum ExpandedArg {
    /// Plain tensor
    Tensor(Var),
    /// Parameter requesting per-sample gradients
    Expanded(ExpandedWeight),
    /// Integer scalar
    Int(i64),
    /// Floating-point scalar
    Float(f64),
    /// Absent optional argument
    None,
}

impl ExpandedArg {
    /// Whether this is an expanded-weight marker
    #[inline]
    pub fn is_expanded(&self) -> bool {
        matches!(self, ExpandedArg::Expanded(_))
    }

    /// Whether this is an absent optional
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, ExpandedArg::None)
    }

    /// The plain variable, if this is `Tensor`
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            ExpandedArg::Tensor(var) => Some(var),
            _ => None,
        }
    }

    /// The marker, if this is `Expanded`
    pub fn as_expanded(&self) -> Option<&ExpandedWeight> {
        match self {
            ExpandedArg::Expanded(ew) => Some(ew),
            _ => None,
        }
    }

    /// The underlying tensor of either tensor case
    pub fn tensor(&self) -> Option<&Tensor> {
        match self {
            ExpandedArg::Tensor(var) => Some(var.tensor()),
            ExpandedArg::Expanded(ew) => Some(ew.weight().tensor()),
            _ => None,
        }
    }

    /// Read a non-negative integer argument
    pub fn as_usize(&self, name: &'static str) -> Result<usize> {
        match self {
            ExpandedArg::Int(v) => usize::try_from(*v)
                .map_err(|_| Error::invalid_argument(name, format!("expected a non-negative integer, got {v}"))),
            other => Err(Error::invalid_argument(
                name,
                format!("expected an integer, got {}", other.kind()),
            )),
        }
    }

    /// Read a float argument, accepting integers
    pub fn as_f64(&self, name: &'static str) -> Result<f64> {
        match self {
            ExpandedArg::Float(v) => Ok(*v),
            ExpandedArg::Int(v) => Ok(*v as f64),
            other => Err(Error::invalid_argument(
                name,
                format!("expected a float, got {}", other.kind()),
            )),
        }
    }

    /// Short description of the variant for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ExpandedArg::Tensor(_) => "Tensor",
            ExpandedArg::Expanded(_) => "ExpandedWeight",
            ExpandedArg::Int(_) => "int",
            ExpandedArg::Float(_) => "float",
            ExpandedArg::None => "None",
        }
    }
}

impl FunctionInput for ExpandedArg {
    fn differentiable(&self) -> Option<&Var> {
        match self {
            ExpandedArg::Tensor(var) => var.differentiable(),
            // always requires grad, see ExpandedWeight::new
            ExpandedArg::Expanded(ew) => Some(ew.weight()),
            _ => None,
        }
    }
}

impl From<Var> for ExpandedArg {
    fn from(var: Var) -> Self {
        ExpandedArg::Tensor(var)
    }
}

impl From<&Var> for ExpandedArg {
    fn from(var: &Var) -> Self {
        ExpandedArg::Tensor(var.clone())
    }
}

impl From<ExpandedWeight> for ExpandedArg {
    fn from(ew: ExpandedWeight) -> Self {
        ExpandedArg::Expanded(ew)
    }
}

impl From<&ExpandedWeight> for ExpandedArg {
    fn from(ew: &ExpandedWeight) -> Self {
        ExpandedArg::Expanded(ew.clone())
    }
}

impl From<i64> for ExpandedArg {
    fn from(v: i64) -> Self {
        ExpandedArg::Int(v)
    }
}

impl From<usize> for ExpandedArg {
    fn from(v: usize) -> Self {
        ExpandedArg::Int(v as i64)
    }
}

impl From<f64> for ExpandedArg {
    fn from(v: f64) -> Self {
        ExpandedArg::Float(v)
    }
}

impl<T: Into<ExpandedArg>> From<Option<T>> for ExpandedArg {
    fn from(v: Option<T>) -> Self {
        v.map_or(ExpandedArg::None, Into::into)
    }
}
