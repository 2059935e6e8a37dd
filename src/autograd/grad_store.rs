//! Gradient storage and accumulation

use crate::error::Result;
use crate::tensor::{Tensor, TensorId};
use std::collections::HashMap;

/// Storage for gradients computed during backward pass
///
/// Gradients are stored by tensor ID and accumulated when a tensor
/// is used multiple times in the computation graph.
#[derive(Debug, Default)]
pub struct GradStore {
    grads: HashMap<TensorId, Tensor>,
}

impl GradStore {
    /// Create a new empty gradient store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the gradient for a tensor
    pub fn get(&self, id: TensorId) -> Option<&Tensor> {
        self.grads.get(&id)
    }

    /// Insert a gradient (overwrites if exists)
    pub fn insert(&mut self, id: TensorId, grad: Tensor) {
        self.grads.insert(id, grad);
    }

    /// Check if a gradient exists
    pub fn contains(&self, id: TensorId) -> bool {
        self.grads.contains_key(&id)
    }

    /// Remove and return a gradient
    pub fn remove(&mut self, id: TensorId) -> Option<Tensor> {
        self.grads.remove(&id)
    }

    /// Number of stored gradients
    pub fn len(&self) -> usize {
        self.grads.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    /// Accumulate a gradient for a tensor
    ///
    /// If no gradient exists for this tensor, stores the gradient.
    /// If a gradient already exists, stores `add_fn(existing, grad)`.
    /// On error the store is left without an entry for `id`.
    pub fn try_accumulate<F>(&mut self, id: TensorId, grad: Tensor, add_fn: F) -> Result<()>
    where
        F: FnOnce(Tensor, Tensor) -> Result<Tensor>,
    {
        let value = match self.grads.remove(&id) {
            Some(existing) => add_fn(existing, grad)?,
            None => grad,
        };
        self.grads.insert(id, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_try_accumulate() {
        let mut store = GradStore::new();
        let id = TensorId::new();

        store
            .try_accumulate(id, Tensor::ones(&[2], DType::F32), |_, _| unreachable!())
            .unwrap();
        store
            .try_accumulate(id, Tensor::ones(&[2], DType::F32), |a, b| {
                let sum: Vec<f32> = a
                    .to_vec::<f32>()
                    .iter()
                    .zip(b.to_vec::<f32>())
                    .map(|(x, y)| x + y)
                    .collect();
                Tensor::try_from_vec(sum, &[2])
            })
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().to_vec::<f32>(), vec![2.0, 2.0]);
    }
}
