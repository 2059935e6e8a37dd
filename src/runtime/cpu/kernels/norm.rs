//! Group normalization kernels
//!
//! Data is `(N, C, HxW)` row-major. Channels are split into `G` groups of
//! `C / G` consecutive channels, so the elements of group `(n, g)` form one
//! contiguous run of `C / G * HxW` values and statistics are indexed `n * G + g`.

use crate::dtype::Element;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Problem sizes shared by the forward and backward kernels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupNormDims {
    /// Batch size
    pub n: usize,
    /// Channel count
    pub c: usize,
    /// Product of all spatial dimensions
    pub hxw: usize,
    /// Number of groups (divides `c`)
    pub groups: usize,
}

impl GroupNormDims {
    /// Channels in each group
    #[inline]
    pub fn channels_per_group(&self) -> usize {
        self.c / self.groups
    }

    /// Elements reduced into one mean/rstd pair
    #[inline]
    pub fn group_len(&self) -> usize {
        self.channels_per_group() * self.hxw
    }

    /// Total element count of the input
    #[inline]
    pub fn numel(&self) -> usize {
        self.n * self.c * self.hxw
    }
}

/// Run `f(index, item)` over every item, on the rayon pool when `parallel`
macro_rules! for_each_indexed {
    ($parallel:expr, $serial:expr, $par:expr, $f:expr) => {{
        #[cfg(feature = "rayon")]
        {
            if $parallel {
                $par.enumerate().for_each($f);
            } else {
                $serial.enumerate().for_each($f);
            }
        }
        #[cfg(not(feature = "rayon"))]
        {
            let _ = $parallel;
            $serial.enumerate().for_each($f);
        }
    }};
}

// ============================================================================
// Forward
// ============================================================================

/// Group normalization forward
///
/// `y = (x - mean) * rstd * weight[c] + bias[c]` with biased variance.
///
/// # Returns
///
/// `(output, mean, rstd)` where `output` has `N * C * HxW` elements and
/// `mean`/`rstd` have `N * G` elements.
pub fn group_norm_forward_kernel<T: Element>(
    input: &[T],
    weight: Option<&[T]>,
    bias: Option<&[T]>,
    dims: GroupNormDims,
    eps: f64,
    parallel: bool,
) -> (Vec<T>, Vec<T>, Vec<T>) {
    let stats_len = dims.n * dims.groups;
    let group_len = dims.group_len();
    let mut out = vec![T::zero(); dims.numel()];
    let mut stats = vec![(0.0f64, 0.0f64); stats_len];

    if group_len > 0 {
        let input = &input[..dims.numel()];
        let body = |(ng, ((y, x), stat)): (usize, ((&mut [T], &[T]), &mut (f64, f64)))| {
            *stat = normalize_group(ng % dims.groups, x, y, weight, bias, dims, eps);
        };

        for_each_indexed!(
            parallel,
            out.chunks_mut(group_len)
                .zip(input.chunks(group_len))
                .zip(stats.iter_mut()),
            out.par_chunks_mut(group_len)
                .zip(input.par_chunks(group_len))
                .zip(stats.par_iter_mut()),
            body
        );
    } else {
        let rstd = 1.0 / eps.sqrt();
        stats.iter_mut().for_each(|s| *s = (0.0, rstd));
    }

    let mean = stats.iter().map(|&(m, _)| T::from_f64(m)).collect();
    let rstd = stats.iter().map(|&(_, r)| T::from_f64(r)).collect();
    (out, mean, rstd)
}

/// Normalize one `(n, g)` run in place, returning its `(mean, rstd)`
fn normalize_group<T: Element>(
    group: usize,
    x: &[T],
    y: &mut [T],
    weight: Option<&[T]>,
    bias: Option<&[T]>,
    dims: GroupNormDims,
    eps: f64,
) -> (f64, f64) {
    let count = x.len() as f64;
    let mean = x.iter().map(|v| v.to_f64()).sum::<f64>() / count;
    let var = x
        .iter()
        .map(|v| {
            let centered = v.to_f64() - mean;
            centered * centered
        })
        .sum::<f64>()
        / count;
    let rstd = 1.0 / (var + eps).sqrt();

    let first_channel = group * dims.channels_per_group();
    for (offset, (xc, yc)) in x.chunks(dims.hxw).zip(y.chunks_mut(dims.hxw)).enumerate() {
        let channel = first_channel + offset;
        let gamma = weight.map_or(1.0, |w| w[channel].to_f64());
        let beta = bias.map_or(0.0, |b| b[channel].to_f64());
        let scale = rstd * gamma;
        let shift = beta - mean * scale;
        for (xv, yv) in xc.iter().zip(yc.iter_mut()) {
            *yv = T::from_f64(xv.to_f64() * scale + shift);
        }
    }

    (mean, rstd)
}

// ============================================================================
// Backward
// ============================================================================

/// Group normalization backward
///
/// Computes only the outputs selected by `output_mask`
/// (`[input, weight, bias]`); unselected slots are `None`.
///
/// With `ds[n,c] = Σ dy·x` and `db[n,c] = Σ dy` over spatial positions and
/// `D = C / G * HxW`, for each group:
///
/// ```text
/// c2 = (Σ_c db·γ · mean − Σ_c ds·γ) · rstd³ / D
/// c3 = −c2 · mean − Σ_c db·γ · rstd / D
/// dx = rstd · γ[c] · dy + c2 · x + c3
/// dγ[c] = Σ_n (ds[n,c] − db[n,c] · mean[n,g]) · rstd[n,g]
/// dβ[c] = Σ_n db[n,c]
/// ```
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn group_norm_backward_kernel<T: Element>(
    grad_output: &[T],
    input: &[T],
    mean: &[T],
    rstd: &[T],
    weight: Option<&[T]>,
    dims: GroupNormDims,
    output_mask: [bool; 3],
    parallel: bool,
) -> (Option<Vec<T>>, Option<Vec<T>>, Option<Vec<T>>) {
    if !output_mask.iter().any(|&m| m) {
        return (None, None, None);
    }

    let sums = channel_sums(grad_output, input, dims, parallel);
    let cpg = dims.channels_per_group();
    let gamma = |channel: usize| weight.map_or(1.0, |w| w[channel].to_f64());

    let grad_input = output_mask[0].then(|| {
        let group_len = dims.group_len();
        let mut dx = vec![T::zero(); dims.numel()];
        if group_len == 0 {
            return dx;
        }
        let scale = 1.0 / group_len as f64;

        let body = |(ng, ((dxg, dyg), xg)): (usize, ((&mut [T], &[T]), &[T]))| {
            let (n, g) = (ng / dims.groups, ng % dims.groups);
            let mu = mean[ng].to_f64();
            let rs = rstd[ng].to_f64();

            let mut ds_g = 0.0;
            let mut db_g = 0.0;
            for channel in g * cpg..(g + 1) * cpg {
                let (ds, db) = sums[n * dims.c + channel];
                ds_g += ds * gamma(channel);
                db_g += db * gamma(channel);
            }
            let c2 = (db_g * mu - ds_g) * rs * rs * rs * scale;
            let c3 = -c2 * mu - db_g * rs * scale;

            for (offset, ((dxc, dyc), xc)) in dxg
                .chunks_mut(dims.hxw)
                .zip(dyg.chunks(dims.hxw))
                .zip(xg.chunks(dims.hxw))
                .enumerate()
            {
                let c1 = rs * gamma(g * cpg + offset);
                for ((d, &dy), &x) in dxc.iter_mut().zip(dyc).zip(xc) {
                    *d = T::from_f64(c1 * dy.to_f64() + c2 * x.to_f64() + c3);
                }
            }
        };

        for_each_indexed!(
            parallel,
            dx.chunks_mut(group_len)
                .zip(grad_output.chunks(group_len))
                .zip(input.chunks(group_len)),
            dx.par_chunks_mut(group_len)
                .zip(grad_output.par_chunks(group_len))
                .zip(input.par_chunks(group_len)),
            body
        );
        dx
    });

    let grad_weight = output_mask[1].then(|| {
        (0..dims.c)
            .map(|channel| {
                let g = channel / cpg;
                let total: f64 = (0..dims.n)
                    .map(|n| {
                        let (ds, db) = sums[n * dims.c + channel];
                        let ng = n * dims.groups + g;
                        (ds - db * mean[ng].to_f64()) * rstd[ng].to_f64()
                    })
                    .sum();
                T::from_f64(total)
            })
            .collect()
    });

    let grad_bias = output_mask[2].then(|| {
        (0..dims.c)
            .map(|channel| T::from_f64((0..dims.n).map(|n| sums[n * dims.c + channel].1).sum()))
            .collect()
    });

    (grad_input, grad_weight, grad_bias)
}

/// Per `(n, c)` pair: `(Σ dy·x, Σ dy)` over spatial positions
fn channel_sums<T: Element>(
    grad_output: &[T],
    input: &[T],
    dims: GroupNormDims,
    parallel: bool,
) -> Vec<(f64, f64)> {
    let mut sums = vec![(0.0f64, 0.0f64); dims.n * dims.c];
    if dims.hxw == 0 {
        return sums;
    }

    let body = |(_, ((slot, dy), x)): (usize, ((&mut (f64, f64), &[T]), &[T]))| {
        *slot = dy.iter().zip(x).fold((0.0, 0.0), |(ds, db), (&dy, &x)| {
            let dy = dy.to_f64();
            (ds + dy * x.to_f64(), db + dy)
        });
    };

    for_each_indexed!(
        parallel,
        sums.iter_mut()
            .zip(grad_output.chunks(dims.hxw))
            .zip(input.chunks(dims.hxw)),
        sums.par_iter_mut()
            .zip(grad_output.par_chunks(dims.hxw))
            .zip(input.par_chunks(dims.hxw)),
        body
    );
    sums
}
