//! End-to-end tests over synthetic faces.
//!
//! These tests build landmark registries from generated expressions and
//! check correspondence, assembly and scoring across configurations.

use motion_asymmetry::{
    analyze, compute_correspondence, AnalysisConfig, ComputationWarning, FrameObservation,
    LandmarkId, LandmarkRegistry, LandmarkSource, MatchingStrategy, Point,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// FACE GENERATORS
// =============================================================================

/// Mirrored reference layout: `pairs` left/right pairs plus `midline` points on x = 0.
fn face_layout(pairs: usize, midline: usize) -> Vec<Point> {
    let mut refs = Vec::with_capacity(2 * pairs + midline);
    for k in 0..pairs {
        let angle = std::f64::consts::PI * (k as f64 + 0.5) / pairs as f64;
        let x = 2.0 + 1.5 * angle.sin();
        let y = 3.0 * angle.cos();
        refs.push([-x, y]);
        refs.push([x, y]);
    }
    for k in 0..midline {
        refs.push([0.0, -4.0 + k as f64]);
    }
    refs
}

/// Smile-like expression: mouth corners pull outward and up, ramping over time.
///
/// `right_gain` scales every right-side displacement (1.0 = symmetric).
fn generate_expression(
    refs: &[Point],
    frames: u32,
    right_gain: f64,
    noise: f64,
    seed: u64,
) -> LandmarkRegistry {
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = Normal::new(0.0, noise.max(f64::MIN_POSITIVE)).unwrap();

    let ids: Vec<LandmarkId> = (0..refs.len() as u32).map(LandmarkId).collect();
    let mut builder = LandmarkRegistry::builder(ids.iter().copied());

    for f in 0..frames {
        let t = f64::from(f) / f64::from(frames.max(2) - 1);
        let ramp = (std::f64::consts::PI * t).sin();

        let mut observations = Vec::with_capacity(refs.len());
        for (i, &r) in refs.iter().enumerate() {
            let outward = r[0].signum() * (1.0 - r[1].abs() / 4.0).max(0.0);
            let (dx, dy) = if r[0] == 0.0 {
                (0.0, 0.3 * ramp)
            } else {
                let gain = if r[0] > 0.0 { right_gain } else { 1.0 };
                (gain * outward * ramp, gain * 0.5 * ramp * (1.0 - t))
            };
            let noise_dx = if noise > 0.0 { jitter.sample(&mut rng) } else { 0.0 };
            let noise_dy = if noise > 0.0 { jitter.sample(&mut rng) } else { 0.0 };
            observations.push(FrameObservation {
                id: ids[i],
                reference: r,
                displacement: [dx + noise_dx, dy + noise_dy],
            });
        }
        builder = builder.frame(f, observations);
    }

    builder.build().unwrap()
}

/// Same layout with every displacement multiplied by `scale`.
fn scaled_registry(source: &LandmarkRegistry, refs: &[Point], scale: f64) -> LandmarkRegistry {
    let mut builder = LandmarkRegistry::builder(source.landmark_ids().iter().copied());
    for &frame in source.frames() {
        let observations = source
            .landmark_ids()
            .iter()
            .enumerate()
            .filter_map(|(i, &id)| {
                source.displacement(frame, id).map(|d| FrameObservation {
                    id,
                    reference: refs[i],
                    displacement: [d[0] * scale, d[1] * scale],
                })
            })
            .collect();
        builder = builder.frame(frame, observations);
    }
    builder.build().unwrap()
}

// =============================================================================
// CORRESPONDENCE
// =============================================================================

#[test]
fn test_layout_pairs_are_recovered() {
    let refs = face_layout(8, 3);
    let ids: Vec<LandmarkId> = (0..refs.len() as u32).map(LandmarkId).collect();

    for strategy in [MatchingStrategy::Greedy, MatchingStrategy::Optimal] {
        let c = compute_correspondence(&ids, &refs, strategy).unwrap();
        assert!(c.map.is_involution());
        assert!(c.map.is_bijection());
        for k in 0..8u32 {
            assert_eq!(c.map.mirror(LandmarkId(2 * k)), Some(LandmarkId(2 * k + 1)));
        }
        // Eight pairs, one midline pair, one self-mirrored midline point
        assert_eq!(c.len(), 10);
    }
}

#[test]
fn test_jittered_layouts_stay_involutive() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let refs: Vec<Point> = face_layout(12, 1 + (seed as usize % 2))
            .into_iter()
            .map(|p| [p[0] + rng.gen_range(-0.4..0.4), p[1] + rng.gen_range(-0.4..0.4)])
            .collect();
        let ids: Vec<LandmarkId> = (0..refs.len() as u32).map(LandmarkId).collect();

        for strategy in [MatchingStrategy::Greedy, MatchingStrategy::Optimal] {
            let c = compute_correspondence(&ids, &refs, strategy).unwrap();
            assert!(c.map.is_involution(), "seed {seed} {strategy:?}");
            assert!(c.map.is_bijection(), "seed {seed} {strategy:?}");
            assert_eq!(c.map.len(), refs.len());
            assert_eq!(c.map.self_mirrored().len(), refs.len() % 2);

            for (l, r) in c.left_ids.iter().zip(&c.right_ids) {
                assert_eq!(c.map.mirror(*l), Some(*r));
                let (pl, pr) = (refs[l.0 as usize], refs[r.0 as usize]);
                assert!(pl[0] <= pr[0]);
            }
        }
    }
}

// =============================================================================
// SCORING
// =============================================================================

#[test]
fn test_symmetric_expression_scores_zero() {
    init_tracing();
    let refs = face_layout(6, 2);
    let source = generate_expression(&refs, 25, 1.0, 0.0, 1);
    let config = AnalysisConfig::default().with_components(2).with_spiked_test(false);

    let report = analyze(&source, &config).unwrap();
    assert!(report.asymmetry.index.abs() < 1e-9, "index {}", report.asymmetry.index);
    assert_eq!(report.vectors.dimension(), 2 * (6 + 1));
}

#[test]
fn test_weaker_side_raises_index() {
    init_tracing();
    let refs = face_layout(6, 1);
    let config = AnalysisConfig::default().with_spiked_test(false);

    let symmetric = analyze(&generate_expression(&refs, 30, 1.0, 0.0, 7), &config).unwrap();
    assert!(symmetric.asymmetry.index.abs() < 1e-9);

    for gain in [0.8, 0.5, 0.2] {
        let source = generate_expression(&refs, 30, gain, 0.0, 7);
        let report = analyze(&source, &config).unwrap();
        assert!(
            report.asymmetry.index > 0.1,
            "gain {gain}: index {}",
            report.asymmetry.index
        );
        assert!(report.asymmetry.components[0].magnitude_ratio > 1.0);
    }
}

#[test]
fn test_index_is_scale_invariant_end_to_end() {
    let refs = face_layout(5, 1);
    let source = generate_expression(&refs, 20, 0.6, 0.01, 3);
    let config = AnalysisConfig::default().with_spiked_test(false);

    let base = analyze(&source, &config).unwrap().asymmetry.index;
    for scale in [0.5, 8.0] {
        let scaled = scaled_registry(&source, &refs, scale);
        let index = analyze(&scaled, &config).unwrap().asymmetry.index;
        assert!((index - base).abs() <= 1e-9 * base.abs().max(1.0));
    }
}

// =============================================================================
// DATA QUALITY
// =============================================================================

#[test]
fn test_null_landmarks_are_excluded() {
    let refs = face_layout(4, 0);
    let ids: Vec<LandmarkId> = (0..10).map(LandmarkId).collect();

    // Landmarks 8 and 9 exist in the enumeration; 8 is never observed and
    // 9 moves its reference between frames.
    let mut builder = LandmarkRegistry::builder(ids);
    for f in 0..6u32 {
        let t = f64::from(f);
        let mut observations: Vec<FrameObservation> = refs
            .iter()
            .enumerate()
            .map(|(i, &r)| FrameObservation {
                id: LandmarkId(i as u32),
                reference: r,
                displacement: [-r[0] * 0.1 * t, 0.2 * t],
            })
            .collect();
        observations.push(FrameObservation {
            id: LandmarkId(9),
            reference: [0.0, t],
            displacement: [0.0, 0.0],
        });
        builder = builder.frame(f, observations);
    }
    let source = builder.build().unwrap();

    assert_eq!(source.non_null_ids().len(), 8);

    let config = AnalysisConfig::default().with_spiked_test(false);
    let report = analyze(&source, &config).unwrap();
    assert_eq!(report.correspondence.map.len(), 8);
    assert!(report.correspondence.map.mirror(LandmarkId(8)).is_none());
    assert!(report.correspondence.map.mirror(LandmarkId(9)).is_none());
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        ComputationWarning::AmbiguousReferencePosition { id: LandmarkId(9), .. }
    )));
}

#[test]
fn test_too_few_landmarks() {
    let source = LandmarkRegistry::builder([LandmarkId(0)])
        .frame(
            0,
            vec![FrameObservation::from_endpoints(LandmarkId(0), [0.0, 0.0], [1.0, 1.0])],
        )
        .build()
        .unwrap();
    assert!(analyze(&source, &AnalysisConfig::default()).is_err());
}

// =============================================================================
// SERIALIZATION
// =============================================================================

#[cfg(feature = "serde")]
#[test]
fn test_report_serializes_to_json() {
    let refs = face_layout(4, 1);
    let source = generate_expression(&refs, 12, 0.7, 0.0, 5);
    let config = AnalysisConfig::thorough().with_spike_order(1);
    let report = analyze(&source, &config).unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"index\""));

    let config_json = serde_json::to_string(&config).unwrap();
    let restored: AnalysisConfig = serde_json::from_str(&config_json).unwrap();
    assert_eq!(restored, config);
}
