//! Motion Asymmetry Library
//!
//! Bilateral asymmetry of facial landmark motion.
//!
//! Given tracked landmark displacements over a sequence of frames, this
//! library pairs every landmark with its mirror image across the vertical
//! symmetry axis, assembles per-frame left and right displacement vectors,
//! and compares the two sides' principal components.
//!
//! # Features
//!
//! - **Optimal correspondence**: minimum-cost mirror pairing, always self-inverse
//! - **Scale-invariant index**: variance-weighted distance between paired components
//! - **Spiked-covariance test**: p-value for equal leading eigenvalues
//! - **Naive F-test**: projected variance comparison, kept as a cross-check
//!
//! # Quick Start
//!
//! ```
//! use motion_asymmetry::{analyze, AnalysisConfig, FrameObservation, LandmarkId, LandmarkRegistry};
//!
//! let refs = [[-1.0, 0.0], [1.0, 0.0], [-0.5, 1.0], [0.5, 1.0]];
//! let mut builder = LandmarkRegistry::builder((0..4).map(LandmarkId));
//! for frame in 0..6u32 {
//!     let t = f64::from(frame);
//!     let observations = refs
//!         .iter()
//!         .enumerate()
//!         .map(|(i, &r)| FrameObservation {
//!             id: LandmarkId(i as u32),
//!             reference: r,
//!             displacement: [-r[0] * 0.1 * t, 0.05 * t * t],
//!         })
//!         .collect();
//!     builder = builder.frame(frame, observations);
//! }
//! let registry = builder.build()?;
//!
//! let config = AnalysisConfig::default().with_spiked_test(false);
//! let report = analyze(&registry, &config)?;
//!
//! assert_eq!(report.correspondence.len(), 2);
//! assert!(report.asymmetry.index.abs() < 1e-9);
//! # Ok::<(), motion_asymmetry::AsymmetryError>(())
//! ```
//!
//! # Stages
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Correspondence | [`compute_correspondence`] | [`Correspondence`] |
//! | Assembly | [`assemble`] | [`DisplacementSet`] |
//! | Scoring | [`asymmetry_index`] | [`AsymmetryReport`] |
//! | Hypothesis test | [`spiked_covariance_test`] | [`SpikedTestResult`] |
//! | Cross-check | [`naive_f_test`] | [`FTestResult`] |
//!
//! The library installs no `tracing` subscriber; stage summaries are emitted
//! at `debug`, every [`ComputationWarning`] at `warn`.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod assembler;
pub mod config;
pub mod correspondence;
pub mod error;
pub mod ftest;
pub mod math;
pub mod pipeline;
pub mod registry;
pub mod scorer;
pub mod spiked;
pub mod warning;

// Re-exports for convenient access
pub use assembler::{assemble, assemble_frame, DisplacementSet};
pub use config::{AnalysisConfig, MatchingStrategy};
pub use correspondence::{
    compute_correspondence, correspondence_from_source, correspondence_with_axis, mirror_point,
    mirror_stability, nearest_mirror, Correspondence, CorrespondenceMap,
};
pub use error::{AsymmetryError, Result};
pub use ftest::{f_test_1d, naive_f_test, project_onto_leading_component, FTestResult};
pub use math::PrincipalComponents;
pub use pipeline::{analyze, AnalysisReport};
pub use registry::{
    Displacement, FrameIndex, FrameObservation, LandmarkId, LandmarkRegistry, LandmarkSource,
    Point, ReferencePosition, RegistryBuilder,
};
pub use scorer::{asymmetry_index, AsymmetryReport, ComponentComparison};
pub use spiked::{estimate_spikes, spiked_covariance_test, SpikedEstimate, SpikedTestResult};
pub use warning::ComputationWarning;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten landmarks in five mirrored pairs plus a midline point.
    fn face(frames: u32, right_gain: f64) -> LandmarkRegistry {
        let mut refs = Vec::new();
        for k in 0..5 {
            let y = f64::from(k);
            let x = 1.0 + 0.5 * f64::from(k % 2);
            refs.push([-x, y]);
            refs.push([x, y]);
        }
        refs.push([0.0, 6.0]);

        let mut builder = LandmarkRegistry::builder((0..refs.len() as u32).map(LandmarkId));
        for f in 0..frames {
            let t = f64::from(f);
            let observations = refs
                .iter()
                .enumerate()
                .map(|(i, &r)| {
                    let gain = if r[0] > 0.0 { right_gain } else { 1.0 };
                    let phase = (i / 2) as f64;
                    let dx = if r[0] == 0.0 {
                        0.0
                    } else {
                        -r[0].signum() * gain * (0.4 * t + phase).sin()
                    };
                    FrameObservation {
                        id: LandmarkId(i as u32),
                        reference: r,
                        displacement: [dx, gain * (0.25 * t).cos() * (1.0 + phase)],
                    }
                })
                .collect();
            builder = builder.frame(f, observations);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_full_pipeline() {
        let source = face(30, 1.0);
        let config = AnalysisConfig::thorough().with_spike_order(2);
        let report = analyze(&source, &config).unwrap();

        // Five pairs plus the self-mirrored midline point
        assert_eq!(report.correspondence.len(), 6);
        assert_eq!(report.correspondence.map.self_mirrored(), vec![LandmarkId(10)]);
        assert!(report.correspondence.map.is_involution());
        assert_eq!(report.vectors.dimension(), 12);

        assert!(report.asymmetry.index.abs() < 1e-9);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, ComputationWarning::SelfMirrored { .. })));
        assert!(!report.is_significant());
    }

    #[test]
    fn test_gain_raises_index() {
        let config = AnalysisConfig::default().with_spiked_test(false);
        let even = analyze(&face(30, 1.0), &config).unwrap();
        let uneven = analyze(&face(30, 3.0), &config).unwrap();
        assert!(uneven.asymmetry.index > even.asymmetry.index + 0.1);
    }

    #[test]
    fn test_baseline_preset_uses_greedy() {
        let report = analyze(&face(12, 1.0), &AnalysisConfig::baseline()).unwrap();
        assert_eq!(report.correspondence.strategy, MatchingStrategy::Greedy);
        assert!(report.f_test.is_some());
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
