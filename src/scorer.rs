//! PCA-based asymmetry index.
//!
//! Each side's displacement vectors are decomposed into principal components
//! `c_k = sqrt(λ_k) * u_k`, and paired components are compared. The index is
//! the variance-weighted mean component distance, normalized by the dominant
//! variance and magnitude:
//!
//! ```text
//! w_k   = (λ_left_k + λ_right_k) / 2
//! index = Σ_k w_k * |c_left_k - c_right_k| / (n * w_0 * sqrt(w_0))
//! ```
//!
//! Multiplying every displacement by the same positive constant leaves the
//! index unchanged. The literal `n * avg(λ_0)` normalization is not scale
//! invariant, so the `w_0 * sqrt(w_0)` divisor above replaces it.
//!
//! Direction signs are not canonicalized: a decomposition that flips one
//! side's direction inflates that component's distance.

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AsymmetryError, Result};
use crate::math::linalg::{
    angle_between, difference_norm, principal_components, samples_to_matrix,
    PrincipalComponents,
};
use crate::warning::{self, ComputationWarning};

/// Comparison of the k-th left and right principal components.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentComparison {
    pub index: usize,
    pub left_variance: f64,
    pub right_variance: f64,

    /// Angle between the unit directions, in radians.
    pub angle: f64,

    /// `|c_left - c_right|` between the rescaled components.
    pub distance: f64,

    /// `sqrt(λ_left) / sqrt(λ_right)`; 1 when both vanish, `+∞` when only the right does.
    pub magnitude_ratio: f64,

    /// `|u_left - u_right|` between the unit directions.
    pub direction_distance: f64,
}

/// Outcome of [`asymmetry_index`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AsymmetryReport {
    /// Scale-invariant asymmetry index; 0 for identical sides.
    pub index: f64,

    /// Mean distance between unit directions, ignoring variances.
    pub unweighted_index: f64,

    pub components: Vec<ComponentComparison>,
    pub left: PrincipalComponents,
    pub right: PrincipalComponents,
    pub warnings: Vec<ComputationWarning>,
}

/// Score the asymmetry between left and right displacement vectors.
///
/// `left[f]` and `right[f]` are the vectors of frame `f`; `n` is the number
/// of principal components compared.
///
/// # Errors
///
/// - [`AsymmetryError::DimensionMismatch`] for empty sets, zero-length
///   vectors, differing frame counts or differing vector lengths
/// - [`AsymmetryError::InvalidInput`] for NaN or infinite entries
/// - [`AsymmetryError::InvalidComponentCount`] unless `1 <= n <= min(frames, length)`
///
/// # Example
///
/// ```
/// use motion_asymmetry::asymmetry_index;
///
/// let frames = vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![-1.0, 0.5]];
/// let report = asymmetry_index(&frames, &frames, 1)?;
/// assert_eq!(report.index, 0.0);
/// # Ok::<(), motion_asymmetry::AsymmetryError>(())
/// ```
pub fn asymmetry_index(left: &[Vec<f64>], right: &[Vec<f64>], n: usize) -> Result<AsymmetryReport> {
    if left.len() != right.len() {
        return Err(AsymmetryError::dimension_mismatch(
            "right frame count",
            left.len(),
            right.len(),
        ));
    }
    if left.is_empty() {
        return Err(AsymmetryError::dimension_mismatch("frame count", 1, 0));
    }
    if left[0].is_empty() || right[0].is_empty() {
        return Err(AsymmetryError::dimension_mismatch(
            "vector length",
            left[0].len().max(right[0].len()).max(1),
            0,
        ));
    }
    let left_matrix = samples_to_matrix(left, "left displacement vectors")?;
    let right_matrix = samples_to_matrix(right, "right displacement vectors")?;
    if left_matrix.ncols() != right_matrix.ncols() {
        return Err(AsymmetryError::dimension_mismatch(
            "right vector length",
            left_matrix.ncols(),
            right_matrix.ncols(),
        ));
    }

    let mut warnings = Vec::new();
    let left_pcs = principal_components(&left_matrix, n, "left components", &mut warnings)?;
    let right_pcs = principal_components(&right_matrix, n, "right components", &mut warnings)?;

    let components: Vec<ComponentComparison> = (0..n)
        .map(|k| compare_component(&left_pcs, &right_pcs, k))
        .collect();

    let weights: Vec<f64> = components
        .iter()
        .map(|c| (c.left_variance + c.right_variance) / 2.0)
        .collect();
    let w0 = weights[0];

    let index = if w0 > 0.0 {
        let weighted: f64 = weights
            .iter()
            .zip(&components)
            .map(|(w, c)| w * c.distance)
            .sum();
        weighted / (n as f64 * w0 * w0.sqrt())
    } else {
        warning::record(
            &mut warnings,
            ComputationWarning::DegenerateNormalization {
                context: "asymmetry index".to_string(),
            },
        );
        0.0
    };

    let unweighted_index =
        components.iter().map(|c| c.direction_distance).sum::<f64>() / n as f64;

    debug!(
        frames = left.len(),
        dimension = left_matrix.ncols(),
        components = n,
        index,
        unweighted_index,
        "asymmetry index computed"
    );

    Ok(AsymmetryReport {
        index,
        unweighted_index,
        components,
        left: left_pcs,
        right: right_pcs,
        warnings,
    })
}

fn compare_component(
    left: &PrincipalComponents,
    right: &PrincipalComponents,
    k: usize,
) -> ComponentComparison {
    let (lv, rv) = (left.variances[k], right.variances[k]);
    let (lu, ru) = (&left.directions[k], &right.directions[k]);

    let magnitude_ratio = match (lv > 0.0, rv > 0.0) {
        (false, false) => 1.0,
        (_, false) => f64::INFINITY,
        _ => lv.sqrt() / rv.sqrt(),
    };

    ComponentComparison {
        index: k,
        left_variance: lv,
        right_variance: rv,
        angle: angle_between(lu, ru).unwrap_or(0.0),
        distance: difference_norm(&left.component(k), &right.component(k)),
        magnitude_ratio,
        direction_distance: difference_norm(lu, ru),
    }
}
