//! The expanded-weight marker

use crate::autograd::Var;
use crate::error::{Error, Result};
use crate::ops::BinaryOps;
use crate::tensor::Tensor;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

struct Inner {
    weight: Var,
    batch_size: usize,
    grad_sample: RwLock<Option<Tensor>>,
}

/// A parameter that opts into per-sample gradients
///
/// Passing an `ExpandedWeight` where an operator expects a parameter routes
/// the call through that operator's per-sample rule. During backward the rule
/// stores a `[batch_size, *weight.shape]` gradient in [`Self::grad_sample`]
/// instead of producing an aggregated gradient for the weight.
///
/// Clones share the same `grad_sample`, so the handle kept by the caller sees
/// what backward wrote.
///
/// # Example
///
/// ```
/// use samplegrad::autograd::Var;
/// use samplegrad::expanded_weights::ExpandedWeight;
/// use samplegrad::tensor::Tensor;
///
/// let weight = Var::new(Tensor::from_slice(&[1.0f32, 1.0, 1.0], &[3]), true);
/// let expanded = ExpandedWeight::new(weight, 8)?;
/// assert_eq!(expanded.batch_size(), 8);
/// assert!(expanded.grad_sample().is_none());
/// # Ok::<(), samplegrad::error::Error>(())
/// ```
#[derive(Clone)]
pub struct ExpandedWeight {
    inner: Arc<Inner>,
}

impl ExpandedWeight {
    /// Wrap `weight` for a batch of `batch_size` examples
    ///
    /// The weight must require gradients and the batch must be non-empty.
    pub fn new(weight: Var, batch_size: usize) -> Result<Self> {
        if !weight.requires_grad() {
            return Err(Error::invalid_argument(
                "weight",
                "Can only build ExpandedWeights objects of tensors that require_grad",
            ));
        }
        if batch_size == 0 {
            return Err(Error::invalid_argument(
                "batch_size",
                "0 is not a valid batch size for Expanded Weights",
            ));
        }
        Ok(Self {
            inner: Arc::new(Inner {
                weight,
                batch_size,
                grad_sample: RwLock::new(None),
            }),
        })
    }

    /// The wrapped (original) weight
    #[inline]
    pub fn weight(&self) -> &Var {
        &self.inner.weight
    }

    /// Batch size the per-sample gradient is computed for
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.inner.batch_size
    }

    /// The per-sample gradient, if a backward pass has produced one
    pub fn grad_sample(&self) -> Option<Tensor> {
        self.inner.grad_sample.read().clone()
    }

    /// Remove and return the per-sample gradient
    pub fn take_grad_sample(&self) -> Option<Tensor> {
        self.inner.grad_sample.write().take()
    }

    /// Whether two handles wrap the same expanded weight
    pub fn ptr_eq(&self, other: &ExpandedWeight) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Store `sample`, adding it to any per-sample gradient already present
    pub(crate) fn accumulate_grad_sample<C: BinaryOps>(
        &self,
        client: &C,
        sample: Tensor,
    ) -> Result<()> {
        let expected: Vec<usize> = std::iter::once(self.batch_size())
            .chain(self.weight().shape().iter().copied())
            .collect();
        if sample.shape() != expected.as_slice() {
            return Err(Error::shape_mismatch(&expected, sample.shape()));
        }

        let mut slot = self.inner.grad_sample.write();
        let updated = match slot.as_ref() {
            Some(existing) => client.add(existing, &sample)?,
            None => sample,
        };
        *slot = Some(updated);
        Ok(())
    }
}

impl fmt::Debug for ExpandedWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpandedWeight")
            .field("weight", self.weight())
            .field("batch_size", &self.batch_size())
            .field("has_grad_sample", &self.inner.grad_sample.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::runtime::CpuClient;

    fn weight(requires_grad: bool) -> Var {
        Var::new(Tensor::ones(&[3], DType::F32), requires_grad)
    }

    #[test]
    fn test_new_validates() {
        assert!(ExpandedWeight::new(weight(false), 4).is_err());
        assert!(ExpandedWeight::new(weight(true), 0).is_err());
        assert!(ExpandedWeight::new(weight(true), 4).is_ok());
    }

    #[test]
    fn test_grad_sample_accumulates_and_is_shared() {
        let client = CpuClient::default();
        let ew = ExpandedWeight::new(weight(true), 2).unwrap();
        let handle = ew.clone();

        ew.accumulate_grad_sample(&client, Tensor::ones(&[2, 3], DType::F32))
            .unwrap();
        ew.accumulate_grad_sample(&client, Tensor::ones(&[2, 3], DType::F32))
            .unwrap();

        assert_eq!(handle.grad_sample().unwrap().to_vec::<f32>(), vec![2.0; 6]);
        assert!(handle.take_grad_sample().is_some());
        assert!(ew.grad_sample().is_none());
    }

    #[test]
    fn test_grad_sample_shape_checked() {
        let client = CpuClient::default();
        let ew = ExpandedWeight::new(weight(true), 2).unwrap();
        let wrong = Tensor::ones(&[3, 3], DType::F32);
        assert!(ew.accumulate_grad_sample(&client, wrong).is_err());
        assert!(ew.grad_sample().is_none());
    }
}
