//! Tensor ID generation for autograd graph tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter; 0 is never handed out
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a tensor or autograd variable
///
/// The autograd graph and the gradient store are keyed by these IDs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(u64);

impl TensorId {
    /// Allocate a fresh ID
    #[inline]
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Default for TensorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor({})", self.0)
    }
}
