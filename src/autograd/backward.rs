//! Backward pass implementation
//!
//! Implements reverse-mode automatic differentiation using topological sort
//! to traverse the computation graph and accumulate gradients.

use super::{GradFn, GradStore, Var};
use crate::error::{Error, Result};
use crate::ops::BinaryOps;
use crate::tensor::{Tensor, TensorId};
use std::collections::HashSet;
use std::sync::Arc;

/// Compute gradients via reverse-mode automatic differentiation
///
/// Starting from a scalar loss, traverses the computation graph in
/// reverse topological order, computing gradients for all tensors
/// that require them.
///
/// # Arguments
///
/// * `loss` - The scalar loss tensor to differentiate
/// * `client` - The runtime client used to accumulate gradients
///
/// # Returns
///
/// A `GradStore` containing gradients for all tensors in the graph.
///
/// # Example
///
/// ```
/// use samplegrad::autograd::{backward, var_sum, Var};
/// use samplegrad::runtime::CpuClient;
/// use samplegrad::tensor::Tensor;
///
/// let client = CpuClient::default();
/// let x = Var::new(Tensor::from_slice(&[2.0f32, 3.0], &[2]), true);
///
/// let loss = var_sum(&x, &[0], false, &client)?;
/// let grads = backward(&loss, &client)?;
///
/// assert_eq!(grads.get(x.id()).unwrap().to_vec::<f32>(), vec![1.0, 1.0]);
/// # Ok::<(), samplegrad::error::Error>(())
/// ```
pub fn backward<C>(loss: &Var, client: &C) -> Result<GradStore>
where
    C: BinaryOps,
{
    // Ensure loss is a scalar
    if loss.numel() != 1 {
        return Err(Error::ShapeMismatch {
            expected: vec![1],
            got: loss.shape().to_vec(),
        });
    }

    // Initialize gradient of loss with respect to itself: dL/dL = 1
    let one = Tensor::ones(loss.shape(), loss.tensor().dtype());
    backward_with_grad(loss, one, client)
}

/// Backpropagate an explicit upstream gradient from a non-scalar root
///
/// `grad` plays the role of dL/d`root` and must have the root's shape and dtype.
pub fn backward_with_grad<C>(root: &Var, grad: Tensor, client: &C) -> Result<GradStore>
where
    C: BinaryOps,
{
    if grad.shape() != root.shape() {
        return Err(Error::shape_mismatch(root.shape(), grad.shape()));
    }
    if grad.dtype() != root.tensor().dtype() {
        return Err(Error::DTypeMismatch {
            lhs: root.tensor().dtype(),
            rhs: grad.dtype(),
        });
    }

    // Ensure root requires gradients
    if !root.requires_grad() {
        return Err(Error::Internal(
            "backward() called on tensor that doesn't require grad".into(),
        ));
    }

    let mut grad_store = GradStore::new();
    grad_store.insert(root.id(), grad);

    // Build the computation graph and get topological order
    let topo_order = topological_sort(root);

    // Traverse in reverse topological order (from output to inputs)
    for (var_id, grad_fn_opt, input_ids) in topo_order.into_iter().rev() {
        let Some(grad_fn) = grad_fn_opt else {
            continue;
        };

        // Get gradient for this node
        let grad_output = match grad_store.get(var_id) {
            Some(g) => g.clone(),
            None => continue, // No gradient flowing to this node
        };

        log::trace!("backward through {} ({var_id})", grad_fn.name());
        let input_grads = grad_fn.backward(&grad_output)?;

        // Accumulate gradients for each input
        for (input_id, input_grad_opt) in input_ids.iter().zip(input_grads) {
            if let Some(input_grad) = input_grad_opt {
                grad_store.try_accumulate(*input_id, input_grad, |existing, new| {
                    client.add(&existing, &new)
                })?;
            }
        }
    }

    Ok(grad_store)
}

/// Entry for topological sort: (tensor_id, grad_fn, input_ids)
type TopoEntry = (TensorId, Option<Arc<dyn GradFn>>, Vec<TensorId>);

/// Build topological sort of computation graph using DFS post-order traversal
///
/// Returns nodes in topological order (inputs before outputs).
fn topological_sort(root: &Var) -> Vec<TopoEntry> {
    let mut result = Vec::new();
    let mut visited = HashSet::new();

    fn dfs(
        id: TensorId,
        grad_fn: Option<Arc<dyn GradFn>>,
        visited: &mut HashSet<TensorId>,
        result: &mut Vec<TopoEntry>,
    ) {
        if !visited.insert(id) {
            return;
        }

        let input_ids: Vec<TensorId> = grad_fn
            .as_ref()
            .map(|gf| gf.inputs().to_vec())
            .unwrap_or_default();

        // Visit inputs first (dependencies)
        if let Some(gf) = &grad_fn {
            for (input_id, input_grad_fn) in input_ids.iter().zip(gf.input_grad_fns()) {
                dfs(*input_id, input_grad_fn, visited, result);
            }
        }

        // Add this node after its inputs (post-order)
        result.push((id, grad_fn, input_ids));
    }

    dfs(root.id(), root.grad_fn().cloned(), &mut visited, &mut result);
    result
}
