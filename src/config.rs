//! Configuration for asymmetry analysis.
//!
//! This module provides the [`AnalysisConfig`] struct which centralizes the
//! tunable parameters of the pipeline, along with presets.
//!
//! The configuration is immutable once handed to [`crate::analyze`]; no stage
//! writes derived values back into it.
//!
//! # Example
//!
//! ```
//! use motion_asymmetry::{AnalysisConfig, MatchingStrategy};
//!
//! let config = AnalysisConfig::default();
//! assert_eq!(config.matching, MatchingStrategy::Optimal);
//!
//! let baseline = AnalysisConfig::baseline().with_components(2);
//! assert_eq!(baseline.components, 2);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AsymmetryError, Result};

/// Strategy used to pair each landmark with its mirror image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchingStrategy {
    /// Walk ids in order and take the nearest unmatched mirror candidate.
    /// Myopic; kept as a baseline for comparison.
    Greedy,
    /// Minimum-cost assignment over all pairs, repaired into an involution.
    #[default]
    Optimal,
}

/// Configuration for an asymmetry analysis run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisConfig {
    /// Number of principal components compared per side.
    pub components: usize,

    /// Landmark correspondence strategy.
    pub matching: MatchingStrategy,

    /// Number of eigenvalues assumed to stand out from the bulk spectrum.
    pub spike_order: usize,

    /// Whether to run the spiked-covariance test on the left/right vectors.
    pub run_spiked_test: bool,

    /// Whether to run the naive projected F-test as a cross-check.
    pub run_f_test: bool,

    /// Level below which a p-value rejects the null hypothesis.
    pub significance_level: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            components: 1,
            matching: MatchingStrategy::Optimal,
            spike_order: 3,
            run_spiked_test: true,
            run_f_test: false,
            significance_level: 0.05,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.components < 1 {
            return Err(AsymmetryError::invalid_config(
                "components must be at least 1",
            ));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(AsymmetryError::invalid_config(
                "significance_level must lie in (0, 1)",
            ));
        }
        Ok(())
    }

    /// Greedy matching, one component, F-test cross-check enabled.
    ///
    /// Mirrors the first-generation analysis for side-by-side comparison.
    #[must_use]
    pub fn baseline() -> Self {
        Self {
            components: 1,
            matching: MatchingStrategy::Greedy,
            run_f_test: true,
            ..Self::default()
        }
    }

    /// Optimal matching, three components, both hypothesis tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            components: 3,
            matching: MatchingStrategy::Optimal,
            run_spiked_test: true,
            run_f_test: true,
            ..Self::default()
        }
    }

    /// Set the number of compared components.
    #[must_use]
    pub const fn with_components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }

    /// Set the matching strategy.
    #[must_use]
    pub const fn with_matching(mut self, matching: MatchingStrategy) -> Self {
        self.matching = matching;
        self
    }

    /// Set the spike-model order.
    #[must_use]
    pub const fn with_spike_order(mut self, spike_order: usize) -> Self {
        self.spike_order = spike_order;
        self
    }

    /// Enable or disable the spiked-covariance test.
    #[must_use]
    pub const fn with_spiked_test(mut self, enabled: bool) -> Self {
        self.run_spiked_test = enabled;
        self
    }

    /// Enable or disable the naive F-test.
    #[must_use]
    pub const fn with_f_test(mut self, enabled: bool) -> Self {
        self.run_f_test = enabled;
        self
    }

    /// Set the significance level.
    #[must_use]
    pub const fn with_significance_level(mut self, level: f64) -> Self {
        self.significance_level = level;
        self
    }
}
