//! Non-fatal numerical and data-quality warnings.
//!
//! Real tracking data is noisy, so the pipeline keeps producing a
//! best-effort answer and attaches these to the result that raised them.

use std::fmt;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::registry::LandmarkId;

/// A recoverable anomaly observed while computing a result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ComputationWarning {
    /// Landmark observed at more than one reference position; treated as null.
    AmbiguousReferencePosition { id: LandmarkId, positions: usize },

    /// Landmark paired with itself because no distinct partner was left.
    SelfMirrored { id: LandmarkId },

    /// Eigenvalue below zero from floating-point noise; clamped to zero.
    NegativeEigenvalue {
        context: String,
        index: usize,
        value: f64,
    },

    /// A term with a vanishing denominator was skipped.
    NearZeroDenominator { context: String, index: usize },

    /// Every bulk eigenvalue is numerically zero.
    CollapsedBulk {
        context: String,
        spike_order: usize,
        bulk_len: usize,
    },

    /// Dominant component carries no variance; index reported as zero.
    DegenerateNormalization { context: String },
}

impl fmt::Display for ComputationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousReferencePosition { id, positions } => {
                write!(f, "landmark {id} has {positions} distinct reference positions")
            }
            Self::SelfMirrored { id } => write!(f, "landmark {id} is mirrored to itself"),
            Self::NegativeEigenvalue {
                context,
                index,
                value,
            } => write!(f, "{context}: eigenvalue {index} is negative ({value:e})"),
            Self::NearZeroDenominator { context, index } => {
                write!(f, "{context}: skipped term {index} with vanishing denominator")
            }
            Self::CollapsedBulk {
                context,
                spike_order,
                bulk_len,
            } => write!(
                f,
                "{context}: all {bulk_len} bulk eigenvalues beyond spike order {spike_order} vanish"
            ),
            Self::DegenerateNormalization { context } => {
                write!(f, "{context}: dominant component has zero variance")
            }
        }
    }
}

/// Log a warning and attach it to `sink`.
pub(crate) fn record(sink: &mut Vec<ComputationWarning>, warning: ComputationWarning) {
    warn!(%warning, "computation warning");
    sink.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_context() {
        let w = ComputationWarning::NegativeEigenvalue {
            context: "left pca".to_string(),
            index: 2,
            value: -1e-15,
        };
        let msg = w.to_string();
        assert!(msg.contains("left pca"));
        assert!(msg.contains("eigenvalue 2"));
    }

    #[test]
    fn test_record_appends() {
        let mut sink = Vec::new();
        record(&mut sink, ComputationWarning::SelfMirrored { id: LandmarkId(7) });
        assert_eq!(sink.len(), 1);
        assert!(sink[0].to_string().contains('7'));
    }
}
