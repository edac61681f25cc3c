//! Per-frame left/right displacement vectors.
//!
//! The right side is reflected into the left side's frame of reference by
//! negating `dx`, so a perfectly symmetric motion produces identical vectors.

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::correspondence::Correspondence;
use crate::error::{AsymmetryError, Result};
use crate::registry::{FrameIndex, LandmarkId, LandmarkSource};

/// Left and right displacement vectors for every frame, in frame order.
///
/// `left[f]` and `right[f]` both have length `2 * pairs`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplacementSet {
    pub frames: Vec<FrameIndex>,
    pub left: Vec<Vec<f64>>,
    pub right: Vec<Vec<f64>>,
}

impl DisplacementSet {
    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Length of each vector (twice the number of pairs).
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.left.first().map_or(0, Vec::len)
    }
}

/// Build the left and right vectors of one frame.
///
/// Left appends `(dx, dy)`, right appends `(-dx, dy)`. A landmark missing
/// from the frame contributes `(0, 0)`.
///
/// # Errors
///
/// Returns [`AsymmetryError::DimensionMismatch`] if the id lists differ in
/// length.
pub fn assemble_frame<S: LandmarkSource + ?Sized>(
    left_ids: &[LandmarkId],
    right_ids: &[LandmarkId],
    frame: FrameIndex,
    source: &S,
) -> Result<(Vec<f64>, Vec<f64>)> {
    if left_ids.len() != right_ids.len() {
        return Err(AsymmetryError::dimension_mismatch(
            "right landmark ids",
            left_ids.len(),
            right_ids.len(),
        ));
    }

    let mut left = Vec::with_capacity(2 * left_ids.len());
    let mut right = Vec::with_capacity(2 * right_ids.len());

    for (&l, &r) in left_ids.iter().zip(right_ids) {
        let [ldx, ldy] = source.displacement(frame, l).unwrap_or([0.0, 0.0]);
        let [rdx, rdy] = source.displacement(frame, r).unwrap_or([0.0, 0.0]);
        left.extend([ldx, ldy]);
        // `0.0 - dx` keeps zero displacements at +0.0.
        right.extend([0.0 - rdx, rdy]);
    }

    Ok((left, right))
}

/// Assemble vectors for every frame of `source`, in frame order.
///
/// # Errors
///
/// Returns [`AsymmetryError::InsufficientData`] if the source has no frames
/// or the correspondence has no pairs.
pub fn assemble<S: LandmarkSource + ?Sized>(
    correspondence: &Correspondence,
    source: &S,
) -> Result<DisplacementSet> {
    let frames = source.frames().to_vec();
    if frames.is_empty() {
        return Err(AsymmetryError::insufficient_data("frames", 1, 0));
    }
    if correspondence.is_empty() {
        return Err(AsymmetryError::insufficient_data("landmark pairs", 1, 0));
    }

    let mut left = Vec::with_capacity(frames.len());
    let mut right = Vec::with_capacity(frames.len());
    for &frame in &frames {
        let (l, r) = assemble_frame(
            &correspondence.left_ids,
            &correspondence.right_ids,
            frame,
            source,
        )?;
        left.push(l);
        right.push(r);
    }

    debug!(
        frames = frames.len(),
        dimension = 2 * correspondence.len(),
        "displacement vectors assembled"
    );

    Ok(DisplacementSet {
        frames,
        left,
        right,
    })
}
