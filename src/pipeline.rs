//! End-to-end analysis of one landmark dataset.

use tracing::info;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembler::{assemble, DisplacementSet};
use crate::config::AnalysisConfig;
use crate::correspondence::{correspondence_from_source, Correspondence};
use crate::error::Result;
use crate::ftest::{naive_f_test, FTestResult};
use crate::registry::LandmarkSource;
use crate::scorer::{asymmetry_index, AsymmetryReport};
use crate::spiked::{spiked_covariance_test, SpikedTestResult};
use crate::warning::ComputationWarning;

/// Everything derived from one dataset under one configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisReport {
    pub correspondence: Correspondence,
    pub vectors: DisplacementSet,
    pub asymmetry: AsymmetryReport,
    pub spiked_test: Option<SpikedTestResult>,
    pub f_test: Option<FTestResult>,
    pub significance_level: f64,

    /// Warnings from every stage, in the order they were raised.
    pub warnings: Vec<ComputationWarning>,
}

impl AnalysisReport {
    /// Whether the spiked test rejected symmetry at the configured level.
    ///
    /// `false` when the spiked test was not run.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.spiked_test
            .as_ref()
            .is_some_and(|t| t.rejects_null(self.significance_level))
    }
}

/// Run correspondence, assembly, scoring and the configured tests.
///
/// # Errors
///
/// Returns the first error raised by any stage, or
/// [`crate::AsymmetryError::InvalidConfig`] for an invalid configuration.
pub fn analyze<S: LandmarkSource + ?Sized>(
    source: &S,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    config.validate()?;

    let correspondence = correspondence_from_source(source, config.matching)?;
    let vectors = assemble(&correspondence, source)?;
    let asymmetry = asymmetry_index(&vectors.left, &vectors.right, config.components)?;

    let spiked_test = if config.run_spiked_test {
        Some(spiked_covariance_test(
            &vectors.left,
            &vectors.right,
            config.spike_order,
        )?)
    } else {
        None
    };

    let f_test = if config.run_f_test {
        Some(naive_f_test(&vectors.left, &vectors.right)?)
    } else {
        None
    };

    let mut warnings = source.warnings().to_vec();
    warnings.extend(correspondence.warnings.iter().cloned());
    warnings.extend(asymmetry.warnings.iter().cloned());
    if let Some(t) = &spiked_test {
        warnings.extend(t.warnings.iter().cloned());
    }
    if let Some(t) = &f_test {
        warnings.extend(t.warnings.iter().cloned());
    }

    info!(
        pairs = correspondence.len(),
        frames = vectors.len(),
        index = asymmetry.index,
        p_value = spiked_test.as_ref().map(|t| t.p_value),
        warnings = warnings.len(),
        "asymmetry analysis complete"
    );

    Ok(AnalysisReport {
        correspondence,
        vectors,
        asymmetry,
        spiked_test,
        f_test,
        significance_level: config.significance_level,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingStrategy;
    use crate::error::AsymmetryError;
    use crate::registry::{FrameObservation, LandmarkId, LandmarkRegistry};

    /// Six landmarks in three mirrored pairs, moving symmetrically.
    fn symmetric_registry(frames: u32) -> LandmarkRegistry {
        let refs = [
            [-3.0, 0.0],
            [3.0, 0.0],
            [-2.0, 2.0],
            [2.0, 2.0],
            [-1.0, 4.0],
            [1.0, 4.0],
        ];
        let mut builder = LandmarkRegistry::builder((0..6).map(LandmarkId));
        for f in 0..frames {
            let t = f64::from(f);
            let observations = refs
                .iter()
                .enumerate()
                .map(|(i, &r)| {
                    let side = if r[0] < 0.0 { 1.0 } else { -1.0 };
                    let amp = 1.0 + (i / 2) as f64;
                    FrameObservation {
                        id: LandmarkId(i as u32),
                        reference: r,
                        displacement: [side * amp * (0.3 * t).sin(), amp * (0.7 * t).cos()],
                    }
                })
                .collect();
            builder = builder.frame(f, observations);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_symmetric_motion_scores_zero() {
        let source = symmetric_registry(12);
        let config = AnalysisConfig::default()
            .with_spiked_test(false)
            .with_matching(MatchingStrategy::Optimal);
        let report = analyze(&source, &config).unwrap();

        assert_eq!(report.correspondence.len(), 3);
        assert_eq!(report.vectors.len(), 12);
        assert_eq!(report.vectors.dimension(), 6);
        assert_eq!(report.asymmetry.index, 0.0);
        assert!(report.spiked_test.is_none());
        assert!(report.f_test.is_none());
        assert!(!report.is_significant());
    }

    #[test]
    fn test_optional_tests_run() {
        let source = symmetric_registry(20);
        let config = AnalysisConfig::thorough().with_spike_order(1);
        let report = analyze(&source, &config).unwrap();

        assert_eq!(report.asymmetry.components.len(), 3);
        assert!(report.spiked_test.is_some());
        assert!(report.f_test.is_some());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let source = symmetric_registry(4);
        let config = AnalysisConfig::default().with_components(0);
        assert!(matches!(
            analyze(&source, &config),
            Err(AsymmetryError::InvalidConfig(_))
        ));
    }
}
