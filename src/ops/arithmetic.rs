//! Elementwise arithmetic helper types

use crate::error::{Error, Result};
use crate::tensor::{broadcast_shapes, Shape};

/// Binary elementwise operation kinds
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// a + b
    Add,
    /// a - b
    Sub,
    /// a * b
    Mul,
}

impl BinaryOp {
    /// Operation name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
        }
    }
}

/// Compute the broadcast output shape of two operands
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Shape> {
    broadcast_shapes(a, b).ok_or_else(|| Error::broadcast(a, b))
}
