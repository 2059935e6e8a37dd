//! CPU client and its configuration

/// Environment variable overriding [`CpuConfig::parallel_threshold`]
pub const PARALLEL_THRESHOLD_ENV: &str = "SAMPLEGRAD_PARALLEL_THRESHOLD";

/// Element count above which kernels split work across the rayon pool
const DEFAULT_PARALLEL_THRESHOLD: usize = 32 * 1024;

/// Tuning knobs for CPU kernels
///
/// # Example
///
/// ```
/// use samplegrad::runtime::{CpuClient, CpuConfig};
///
/// let config = CpuConfig::new().with_parallel_threshold(1 << 20);
/// let client = CpuClient::with_config(config);
/// assert_eq!(client.config().parallel_threshold, 1 << 20);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuConfig {
    /// Minimum number of elements before a kernel runs in parallel.
    /// Ignored when the `rayon` feature is disabled.
    pub parallel_threshold: usize,
}

impl CpuConfig {
    /// Built-in defaults, ignoring the environment
    pub fn new() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Defaults overridden by `SAMPLEGRAD_PARALLEL_THRESHOLD` when it is set
    ///
    /// An unparsable value is logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(raw) = std::env::var(PARALLEL_THRESHOLD_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(threshold) => config.parallel_threshold = threshold,
                Err(err) => log::warn!(
                    "ignoring {PARALLEL_THRESHOLD_ENV}={raw:?}: {err}; using {}",
                    config.parallel_threshold
                ),
            }
        }
        config
    }

    /// Set the parallel threshold
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// CPU client for operation dispatch
///
/// The client is the receiver of every operation trait (`BinaryOps`,
/// `ReduceOps`, `EinsumOps`, `NormalizationOps`). It is cheap to clone and
/// autograd nodes keep their own copy for the backward pass.
#[derive(Clone, Debug)]
pub struct CpuClient {
    config: CpuConfig,
}

impl CpuClient {
    /// Create a client from an explicit configuration
    pub fn with_config(config: CpuConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    #[inline]
    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    /// Whether a kernel over `work` elements should run on the rayon pool
    #[inline]
    pub(crate) fn use_parallel(&self, work: usize) -> bool {
        cfg!(feature = "rayon") && work >= self.config.parallel_threshold
    }
}

impl Default for CpuClient {
    /// Client configured from the environment ([`CpuConfig::from_env`])
    fn default() -> Self {
        Self::with_config(CpuConfig::from_env())
    }
}
