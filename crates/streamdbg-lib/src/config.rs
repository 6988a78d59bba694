//! Compactor configuration
//!
//! Parameters for the k-mer size, strand handling, store selection and the
//! resources given to read-only analyses.

use crate::constants::{DEFAULT_COMPONENT_SAMPLE, DEFAULT_K, DEFAULT_REPORT_INTERVAL, DEFAULT_SEED, MAX_K, MIN_K};
use crate::store::StoreKind;

/// Configuration parameters for a streaming compactor
#[derive(Debug, Clone)]
pub struct CompactorConfig {
    /// K-mer length (between 3 and 32)
    pub k: usize,

    /// Canonical mode (a k-mer and its reverse complement are the same node)
    pub canonical: bool,

    /// K-mer store implementation
    pub store: StoreKind,

    /// Seed for root sampling and signatures
    pub seed: u64,

    /// Number of threads for read-only analyses (0 = all available cores)
    pub num_threads: usize,

    /// Roots sampled by component analysis (0 = exhaustive)
    pub component_sample_size: usize,

    /// Sequences between periodic reports (0 = never)
    pub report_interval: u64,

    /// Verbose output
    pub verbose: bool,
}

impl Default for CompactorConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            canonical: true,
            store: StoreKind::Exact,
            seed: DEFAULT_SEED,
            num_threads: 0,
            component_sample_size: DEFAULT_COMPONENT_SAMPLE,
            report_interval: DEFAULT_REPORT_INTERVAL,
            verbose: false,
        }
    }
}

impl CompactorConfig {
    /// Create a new configuration with the specified k-mer length
    pub fn new(k: usize) -> Result<Self, String> {
        let config = Self {
            k,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.k < MIN_K || self.k > MAX_K {
            return Err(format!("k must be in range [{}, {}], got k={}", MIN_K, MAX_K, self.k));
        }
        Ok(())
    }

    /// Sample size for component analysis, `None` when exhaustive
    pub fn component_sample(&self) -> Option<usize> {
        (self.component_sample_size > 0).then_some(self.component_sample_size)
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Compactor Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  canonical = {}", self.canonical);
        tracing::info!("  store = {}", self.store);
        tracing::debug!("  seed = {}", self.seed);
        if self.num_threads == 0 {
            tracing::info!("  num_threads = all available cores");
        } else {
            tracing::info!("  num_threads = {}", self.num_threads);
        }
        tracing::debug!("  component_sample_size = {}", self.component_sample_size);
        tracing::debug!("  report_interval = {}", self.report_interval);
        tracing::debug!("  verbose = {}", self.verbose);
    }
}
