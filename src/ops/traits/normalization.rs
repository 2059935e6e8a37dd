//! Normalization operations trait.

use crate::error::Result;
use crate::tensor::Tensor;

/// `(output, mean, rstd)` from [`NormalizationOps::group_norm_all_outputs`]
pub type GroupNormStats = (Tensor, Tensor, Tensor);

/// `(grad_input, grad_weight, grad_bias)`; a slot is `None` when it was not requested
pub type GroupNormGrads = (Option<Tensor>, Option<Tensor>, Option<Tensor>);

/// Normalization operations
pub trait NormalizationOps {
    /// Group Normalization: output = (input - mean) / sqrt(var + eps) * weight + bias
    ///
    /// Channels (dimension 1) are split into `num_groups` groups; statistics
    /// are computed per example over each group's channels and all spatial
    /// positions.
    ///
    /// # Arguments
    ///
    /// * `input` - Input tensor of shape [N, C, *]
    /// * `num_groups` - Number of groups, must divide C
    /// * `weight` - Optional per-channel scale of shape [C]
    /// * `bias` - Optional per-channel shift of shape [C]
    /// * `eps` - Small constant for numerical stability (typically 1e-5)
    fn group_norm(
        &self,
        input: &Tensor,
        num_groups: usize,
        weight: Option<&Tensor>,
        bias: Option<&Tensor>,
        eps: f64,
    ) -> Result<Tensor> {
        let (output, _, _) = self.group_norm_all_outputs(input, num_groups, weight, bias, eps)?;
        Ok(output)
    }

    /// Group normalization that also returns the saved statistics
    ///
    /// Returns `(output, mean, rstd)`; `mean` and `rstd` have shape
    /// [N, num_groups] and are what [`Self::group_norm_backward`] expects.
    fn group_norm_all_outputs(
        &self,
        input: &Tensor,
        num_groups: usize,
        weight: Option<&Tensor>,
        bias: Option<&Tensor>,
        eps: f64,
    ) -> Result<GroupNormStats>;

    /// Native group normalization backward
    ///
    /// # Arguments
    ///
    /// * `grad_output` - Upstream gradient, same shape as `input`
    /// * `input` - Forward input of shape [N, C, *]
    /// * `mean`, `rstd` - Statistics from the forward, shape [N, num_groups]
    /// * `weight` - The forward's scale, if any
    /// * `n`, `c`, `hxw` - Batch size, channels, product of spatial dims
    /// * `output_mask` - Which of `[grad_input, grad_weight, grad_bias]` to compute
    #[allow(clippy::too_many_arguments)]
    fn group_norm_backward(
        &self,
        grad_output: &Tensor,
        input: &Tensor,
        mean: &Tensor,
        rstd: &Tensor,
        weight: Option<&Tensor>,
        n: usize,
        c: usize,
        hxw: usize,
        num_groups: usize,
        output_mask: [bool; 3],
    ) -> Result<GroupNormGrads>;
}
