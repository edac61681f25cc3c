//! Naive projected F-test, kept as a cross-check for the spiked test.
//!
//! Each sample set is projected onto its own leading principal direction and
//! the two resulting 1D samples are compared with a two-sided F-test on the
//! ratio of their variances. It only detects large variance differences and
//! ignores everything beyond the first component.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AsymmetryError, Result};
use crate::math::linalg::{principal_components, samples_to_matrix};
use crate::warning::ComputationWarning;

/// Outcome of an F-test on two 1D samples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FTestResult {
    /// Ratio of unbiased sample variances, `var(x) / var(y)`.
    pub ratio: f64,
    /// `|ln ratio|`.
    pub statistic: f64,
    pub p_value: f64,
    /// Numerator and denominator degrees of freedom.
    pub degrees_of_freedom: (usize, usize),
    pub warnings: Vec<ComputationWarning>,
}

impl FTestResult {
    /// Whether equal variances are rejected at `alpha`.
    #[must_use]
    pub fn rejects_null(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

fn unbiased_variance(xs: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0)
}

/// Two-sided F-test for equal variances of `xs` and `ys`.
///
/// The p-value is `P(F <= e^-t) + P(F >= e^t)` with `t = |ln ratio|` and
/// `F ~ F(len(xs) - 1, len(ys) - 1)`.
///
/// # Errors
///
/// - [`AsymmetryError::InsufficientData`] if either sample has fewer than 2 values
/// - [`AsymmetryError::NumericalInstability`] if either variance is zero or undefined
pub fn f_test_1d(xs: &[f64], ys: &[f64]) -> Result<FTestResult> {
    if xs.len() < 2 {
        return Err(AsymmetryError::insufficient_data("f-test x samples", 2, xs.len()));
    }
    if ys.len() < 2 {
        return Err(AsymmetryError::insufficient_data("f-test y samples", 2, ys.len()));
    }

    let (vx, vy) = (unbiased_variance(xs), unbiased_variance(ys));
    if !(vx > 0.0 && vy > 0.0) || !vx.is_finite() || !vy.is_finite() {
        return Err(AsymmetryError::numerical_instability(format!(
            "f-test variances {vx} and {vy}"
        )));
    }

    let ratio = vx / vy;
    let statistic = ratio.ln().abs();
    let (d1, d2) = (xs.len() - 1, ys.len() - 1);

    let f = FisherSnedecor::new(d1 as f64, d2 as f64).map_err(|e| {
        AsymmetryError::numerical_instability(format!("F distribution: {e}"))
    })?;
    let p_value = (f.cdf((-statistic).exp()) + f.sf(statistic.exp())).clamp(0.0, 1.0);

    debug!(ratio, p_value, d1, d2, "f-test");

    Ok(FTestResult {
        ratio,
        statistic,
        p_value,
        degrees_of_freedom: (d1, d2),
        warnings: Vec::new(),
    })
}

/// Scalar projections of each sample onto the set's first principal direction.
///
/// # Errors
///
/// Returns the errors of [`samples_to_matrix`] for empty, ragged or non-finite input.
pub fn project_onto_leading_component(samples: &[Vec<f64>]) -> Result<Vec<f64>> {
    let mut warnings = Vec::new();
    project_leading(samples, "projected samples", &mut warnings)
}

fn project_leading(
    samples: &[Vec<f64>],
    context: &str,
    warnings: &mut Vec<ComputationWarning>,
) -> Result<Vec<f64>> {
    let data = samples_to_matrix(samples, context)?;
    let pcs = principal_components(&data, 1, context, warnings)?;
    Ok(samples.iter().map(|s| pcs.project(s, 0)).collect())
}

/// Project both sets onto their own leading direction and F-test the projections.
///
/// # Errors
///
/// - [`AsymmetryError::DimensionMismatch`] unless both sets have the same shape
/// - [`AsymmetryError::InvalidInput`] for NaN or infinite entries
/// - any error of [`f_test_1d`]
pub fn naive_f_test(x: &[Vec<f64>], y: &[Vec<f64>]) -> Result<FTestResult> {
    if x.len() != y.len() {
        return Err(AsymmetryError::dimension_mismatch("y sample count", x.len(), y.len()));
    }
    let (px, py) = (x.first().map_or(0, Vec::len), y.first().map_or(0, Vec::len));
    if px != py {
        return Err(AsymmetryError::dimension_mismatch("y feature count", px, py));
    }

    let mut warnings = Vec::new();
    let xs = project_leading(x, "x projection", &mut warnings)?;
    let ys = project_leading(y, "y projection", &mut warnings)?;

    let mut result = f_test_1d(&xs, &ys)?;
    result.warnings = warnings;
    Ok(result)
}
