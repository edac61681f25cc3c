//! Immutable view over per-frame landmark observations.
//!
//! The loader hands over one list of [`FrameObservation`]s per frame; the
//! registry derives each landmark's reference position once and answers
//! typed lookups afterwards. Absence is always an `Option`, never a NaN.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AsymmetryError, Result};
use crate::warning::{self, ComputationWarning};

/// A 2D image position.
pub type Point = [f64; 2];

/// A per-frame `(dx, dy)` displacement.
pub type Displacement = [f64; 2];

/// Ordinal index into the frame sequence.
pub type FrameIndex = u32;

/// Identifier of a tracked landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LandmarkId(pub u32);

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only access to landmark data, as supplied by a loader.
pub trait LandmarkSource {
    /// All landmark ids, in a stable order.
    fn landmark_ids(&self) -> &[LandmarkId];

    /// All frames, in time order.
    fn frames(&self) -> &[FrameIndex];

    /// Displacement of `id` in `frame`, if it was observed there.
    fn displacement(&self, frame: FrameIndex, id: LandmarkId) -> Option<Displacement>;

    /// Unique reference position of `id`, if it has one.
    fn reference_position(&self, id: LandmarkId) -> Option<Point>;

    /// Data-quality warnings raised while loading.
    fn warnings(&self) -> &[ComputationWarning] {
        &[]
    }

    /// Ids with a unique reference position, in enumeration order.
    fn non_null_ids(&self) -> Vec<LandmarkId> {
        self.landmark_ids()
            .iter()
            .copied()
            .filter(|&id| self.reference_position(id).is_some())
            .collect()
    }
}

/// One tracked point in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameObservation {
    pub id: LandmarkId,
    /// Reference (initial) position.
    pub reference: Point,
    pub displacement: Displacement,
}

impl FrameObservation {
    /// Build an observation from the initial and final positions of a point.
    #[must_use]
    pub fn from_endpoints(id: LandmarkId, initial: Point, last: Point) -> Self {
        Self {
            id,
            reference: initial,
            displacement: [last[0] - initial[0], last[1] - initial[1]],
        }
    }
}

/// How a landmark's reference position resolved across all frames.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferencePosition {
    Unique(Point),
    /// Never observed.
    Unobserved,
    /// Observed at several distinct positions.
    Ambiguous(Vec<Point>),
}

impl ReferencePosition {
    #[must_use]
    pub fn point(&self) -> Option<Point> {
        match self {
            Self::Unique(p) => Some(*p),
            _ => None,
        }
    }
}

/// Collects frames before freezing them into a [`LandmarkRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    ids: Vec<LandmarkId>,
    frames: Vec<(FrameIndex, Vec<FrameObservation>)>,
}

impl RegistryBuilder {
    /// Start a registry over the given landmark enumeration.
    pub fn new(ids: impl IntoIterator<Item = LandmarkId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            frames: Vec::new(),
        }
    }

    /// Add the observations of one frame.
    #[must_use]
    pub fn frame(mut self, frame: FrameIndex, observations: Vec<FrameObservation>) -> Self {
        self.frames.push((frame, observations));
        self
    }

    /// Freeze the collected frames.
    ///
    /// Observations of ids outside the enumeration are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AsymmetryError::InvalidInput`] for duplicate landmark ids,
    /// a frame added twice, a landmark observed twice in one frame, or a
    /// NaN or infinite coordinate.
    pub fn build(self) -> Result<LandmarkRegistry> {
        let mut seen_ids = HashSet::with_capacity(self.ids.len());
        for &id in &self.ids {
            if !seen_ids.insert(id) {
                return Err(AsymmetryError::invalid_input(format!(
                    "landmark {id} enumerated twice"
                )));
            }
        }

        let mut frames = Vec::with_capacity(self.frames.len());
        let mut displacements = HashMap::new();
        let mut positions: BTreeMap<LandmarkId, Vec<Point>> = BTreeMap::new();
        let mut ignored = 0usize;

        for (frame, observations) in self.frames {
            if frames.contains(&frame) {
                return Err(AsymmetryError::invalid_input(format!(
                    "frame {frame} added twice"
                )));
            }
            frames.push(frame);

            for obs in observations {
                if !seen_ids.contains(&obs.id) {
                    ignored += 1;
                    continue;
                }
                if obs
                    .displacement
                    .iter()
                    .chain(&obs.reference)
                    .any(|c| !c.is_finite())
                {
                    return Err(AsymmetryError::invalid_input(format!(
                        "landmark {} has a non-finite coordinate in frame {frame}",
                        obs.id
                    )));
                }
                if displacements.insert((frame, obs.id), obs.displacement).is_some() {
                    return Err(AsymmetryError::invalid_input(format!(
                        "landmark {} observed twice in frame {frame}",
                        obs.id
                    )));
                }
                let seen = positions.entry(obs.id).or_default();
                if !seen.iter().any(|p| same_point(p, &obs.reference)) {
                    seen.push(obs.reference);
                }
            }
        }

        if ignored > 0 {
            debug!(ignored, "observations of unenumerated landmarks ignored");
        }

        let mut warnings = Vec::new();
        let references: BTreeMap<LandmarkId, ReferencePosition> = self
            .ids
            .iter()
            .map(|&id| {
                let resolved = match positions.remove(&id) {
                    None => ReferencePosition::Unobserved,
                    Some(mut found) if found.len() == 1 => {
                        ReferencePosition::Unique(found.remove(0))
                    }
                    Some(found) => {
                        warning::record(
                            &mut warnings,
                            ComputationWarning::AmbiguousReferencePosition {
                                id,
                                positions: found.len(),
                            },
                        );
                        ReferencePosition::Ambiguous(found)
                    }
                };
                (id, resolved)
            })
            .collect();

        debug!(
            landmarks = self.ids.len(),
            frames = frames.len(),
            observations = displacements.len(),
            "landmark registry built"
        );

        Ok(LandmarkRegistry {
            ids: self.ids,
            frames,
            displacements,
            references,
            warnings,
        })
    }
}

/// Immutable per-frame landmark data with derived reference positions.
#[derive(Debug, Clone)]
pub struct LandmarkRegistry {
    ids: Vec<LandmarkId>,
    frames: Vec<FrameIndex>,
    displacements: HashMap<(FrameIndex, LandmarkId), Displacement>,
    references: BTreeMap<LandmarkId, ReferencePosition>,
    warnings: Vec<ComputationWarning>,
}

impl LandmarkRegistry {
    /// Start building a registry over the given landmark enumeration.
    pub fn builder(ids: impl IntoIterator<Item = LandmarkId>) -> RegistryBuilder {
        RegistryBuilder::new(ids)
    }

    /// Full resolution status of a landmark's reference position.
    #[must_use]
    pub fn reference_status(&self, id: LandmarkId) -> Option<&ReferencePosition> {
        self.references.get(&id)
    }

    /// Ids without a unique reference position, in enumeration order.
    #[must_use]
    pub fn null_ids(&self) -> Vec<LandmarkId> {
        self.ids
            .iter()
            .copied()
            .filter(|&id| self.reference_position(id).is_none())
            .collect()
    }

    /// Mean reference position over non-null landmarks.
    #[must_use]
    pub fn centroid(&self) -> Option<Point> {
        let points: Vec<Point> = self
            .references
            .values()
            .filter_map(ReferencePosition::point)
            .collect();
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let sum = points
            .iter()
            .fold([0.0, 0.0], |acc, p| [acc[0] + p[0], acc[1] + p[1]]);
        Some([sum[0] / n, sum[1] / n])
    }
}

impl LandmarkSource for LandmarkRegistry {
    fn landmark_ids(&self) -> &[LandmarkId] {
        &self.ids
    }

    fn frames(&self) -> &[FrameIndex] {
        &self.frames
    }

    fn displacement(&self, frame: FrameIndex, id: LandmarkId) -> Option<Displacement> {
        self.displacements.get(&(frame, id)).copied()
    }

    fn reference_position(&self, id: LandmarkId) -> Option<Point> {
        self.references.get(&id).and_then(ReferencePosition::point)
    }

    fn warnings(&self) -> &[ComputationWarning] {
        &self.warnings
    }
}

/// Exact positional equality; reference positions are copied verbatim by trackers.
fn same_point(a: &Point, b: &Point) -> bool {
    a[0].total_cmp(&b[0]).is_eq() && a[1].total_cmp(&b[1]).is_eq()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn obs(id: u32, reference: Point, displacement: Displacement) -> FrameObservation {
        FrameObservation {
            id: LandmarkId(id),
            reference,
            displacement,
        }
    }

    fn sample_registry() -> LandmarkRegistry {
        LandmarkRegistry::builder((0..4).map(LandmarkId))
            .frame(
                0,
                vec![
                    obs(0, [-1.0, 0.0], [0.5, 0.0]),
                    obs(1, [1.0, 0.0], [-0.5, 0.0]),
                    obs(2, [0.0, 2.0], [0.0, 1.0]),
                ],
            )
            .frame(
                1,
                vec![
                    obs(0, [-1.0, 0.0], [0.25, 0.1]),
                    obs(2, [0.5, 2.0], [0.0, 1.0]),
                    obs(9, [5.0, 5.0], [0.0, 0.0]),
                ],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_reference_resolution() {
        let reg = sample_registry();
        assert_eq!(reg.reference_position(LandmarkId(0)), Some([-1.0, 0.0]));
        assert_eq!(reg.reference_position(LandmarkId(1)), Some([1.0, 0.0]));
        // Two distinct positions
        assert_eq!(reg.reference_position(LandmarkId(2)), None);
        assert!(matches!(
            reg.reference_status(LandmarkId(2)),
            Some(ReferencePosition::Ambiguous(p)) if p.len() == 2
        ));
        // Never observed
        assert_eq!(
            reg.reference_status(LandmarkId(3)),
            Some(&ReferencePosition::Unobserved)
        );
        assert_eq!(reg.null_ids(), vec![LandmarkId(2), LandmarkId(3)]);
        assert_eq!(reg.non_null_ids(), vec![LandmarkId(0), LandmarkId(1)]);
        assert_eq!(reg.warnings().len(), 1);
    }

    #[test]
    fn test_displacement_lookup() {
        let reg = sample_registry();
        assert_eq!(reg.displacement(1, LandmarkId(0)), Some([0.25, 0.1]));
        assert_eq!(reg.displacement(1, LandmarkId(1)), None);
        assert_eq!(reg.displacement(7, LandmarkId(0)), None);
        // Unenumerated ids are dropped
        assert_eq!(reg.displacement(1, LandmarkId(9)), None);
        assert_eq!(reg.frames(), &[0, 1]);
    }

    #[test]
    fn test_centroid() {
        let reg = sample_registry();
        let c = reg.centroid().unwrap();
        assert_relative_eq!(c[0], 0.0);
        assert_relative_eq!(c[1], 0.0);
    }

    #[test]
    fn test_from_endpoints() {
        let o = FrameObservation::from_endpoints(LandmarkId(1), [2.0, 3.0], [2.5, 2.0]);
        assert_eq!(o.reference, [2.0, 3.0]);
        assert_relative_eq!(o.displacement[0], 0.5);
        assert_relative_eq!(o.displacement[1], -1.0);
    }

    #[test]
    fn test_duplicates_rejected() {
        let dup_frame = LandmarkRegistry::builder([LandmarkId(0)])
            .frame(0, vec![])
            .frame(0, vec![])
            .build();
        assert!(matches!(dup_frame, Err(AsymmetryError::InvalidInput(_))));

        let dup_obs = LandmarkRegistry::builder([LandmarkId(0)])
            .frame(
                0,
                vec![obs(0, [0.0, 0.0], [1.0, 0.0]), obs(0, [0.0, 0.0], [2.0, 0.0])],
            )
            .build();
        assert!(matches!(dup_obs, Err(AsymmetryError::InvalidInput(_))));

        let dup_id = LandmarkRegistry::builder([LandmarkId(0), LandmarkId(0)]).build();
        assert!(dup_id.is_err());
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        let nan_displacement = LandmarkRegistry::builder([LandmarkId(0)])
            .frame(0, vec![obs(0, [0.0, 0.0], [f64::NAN, 0.0])])
            .build();
        assert!(matches!(nan_displacement, Err(AsymmetryError::InvalidInput(_))));

        let inf_displacement = LandmarkRegistry::builder([LandmarkId(0)])
            .frame(0, vec![obs(0, [0.0, 0.0], [0.0, f64::NEG_INFINITY])])
            .build();
        assert!(matches!(inf_displacement, Err(AsymmetryError::InvalidInput(_))));

        let inf_reference = LandmarkRegistry::builder([LandmarkId(0)])
            .frame(0, vec![obs(0, [f64::INFINITY, 0.0], [1.0, 0.0])])
            .build();
        assert!(matches!(inf_reference, Err(AsymmetryError::InvalidInput(_))));

        // Unenumerated landmarks are skipped before any check
        let ignored = LandmarkRegistry::builder([LandmarkId(0)])
            .frame(0, vec![obs(0, [0.0, 0.0], [1.0, 0.0]), obs(5, [0.0, 0.0], [f64::NAN, 0.0])])
            .build();
        assert!(ignored.is_ok());
    }
}
