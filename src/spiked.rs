//! Spiked-covariance two-sample test.
//!
//! Tests whether two sample sets share the same leading ("spiked")
//! eigenvalues, assuming a spiked model of order `k` in which only the top
//! `k` population eigenvalues stand out from a flat bulk.
//!
//! For each set the sample Gram matrix `X Xᵀ / m` of the centered rows is
//! decomposed and its top `k` eigenvalues are bias-corrected against the
//! bulk `b_i` (`i >= k`):
//!
//! ```text
//! θ_s  = 1 + (m - k) / Σ_i b_i / (λ_s - b_i)
//! σ²_s = 2 (M(2,2) - M(1,1)²) / M(1,1)⁴,   M(a,b) = mean_i b_i^a / (λ_s - b_i)^b
//! T    = n Σ_s (θ_X_s - θ_Y_s)² / (σ²_X_s + σ²_Y_s),   n = min(m_X, m_Y)
//! ```
//!
//! Under the null hypothesis `T` is referred to `χ²_k`.
//!
//! # Calibration
//!
//! The `χ²_k` reference is only asymptotic and the test is not size-exact.
//! With many more samples than features (200 × 50, `k = 3`) the statistic
//! averages well below `k` and almost never rejects a true null. With fewer
//! samples than features it is liberal: repeated seeded draws sharing a
//! ×10 spike rejected at `α = 0.05` about 15% of the time for 60 × 300,
//! `k = 3`, about 30% for 60 × 300, `k = 1`, and about 45% for 30 × 600,
//! `k = 3`. Treat small p-values in that regime as a screening signal.

use nalgebra::DMatrix;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AsymmetryError, Result};
use crate::math::linalg::{
    center_columns, clamp_negative, samples_to_matrix, sorted_symmetric_eigen,
};
use crate::warning::{self, ComputationWarning};

/// Eigenvalues and gaps below this fraction of the leading eigenvalue count as zero.
const NUMERICAL_ZERO: f64 = 1e-12;

/// Bias-corrected spike estimate for one sample set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpikedEstimate {
    /// Full Gram spectrum, non-increasing, negatives clamped to zero.
    pub eigenvalues: Vec<f64>,
    pub spike_order: usize,
    /// Corrected spike eigenvalues `θ_s`, `s < spike_order`.
    pub corrected: Vec<f64>,
    /// Asymptotic variances `σ²_s` of the corrected spikes.
    pub variances: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    spike_vectors: Vec<Vec<f64>>,
}

impl SpikedEstimate {
    /// Number of samples (size of the Gram matrix).
    #[must_use]
    pub fn samples(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Filtered estimate `I + Σ_s θ_s v_s v_sᵀ` over the spike eigenvectors.
    #[must_use]
    pub fn filtered_covariance(&self) -> DMatrix<f64> {
        let m = self.samples();
        let mut result = DMatrix::identity(m, m);
        for (theta, v) in self.corrected.iter().zip(&self.spike_vectors) {
            if v.len() != m {
                continue;
            }
            for i in 0..m {
                for j in 0..m {
                    result[(i, j)] += theta * v[i] * v[j];
                }
            }
        }
        result
    }
}

/// Outcome of [`spiked_covariance_test`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpikedTestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
    pub x: SpikedEstimate,
    pub y: SpikedEstimate,
    pub warnings: Vec<ComputationWarning>,
}

impl SpikedTestResult {
    /// Whether the null hypothesis of equal spikes is rejected at `alpha`.
    #[must_use]
    pub fn rejects_null(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Estimate the corrected top-`k` spikes of row samples.
///
/// # Errors
///
/// - [`AsymmetryError::InsufficientData`] / [`AsymmetryError::DimensionMismatch`]
///   for empty or ragged samples
/// - [`AsymmetryError::InvalidInput`] for NaN or infinite entries
/// - [`AsymmetryError::SpikeOrderTooLarge`] unless there are more than `k` samples
pub fn estimate_spikes(
    samples: &[Vec<f64>],
    k: usize,
    context: &str,
    warnings: &mut Vec<ComputationWarning>,
) -> Result<SpikedEstimate> {
    let data = samples_to_matrix(samples, context)?;
    estimate_from_matrix(&data, k, context, warnings)
}

fn estimate_from_matrix(
    data: &DMatrix<f64>,
    k: usize,
    context: &str,
    warnings: &mut Vec<ComputationWarning>,
) -> Result<SpikedEstimate> {
    let m = data.nrows();
    if m <= k {
        return Err(AsymmetryError::spike_order_too_large(k, m));
    }

    let (centered, _) = center_columns(data);
    let gram = &centered * centered.transpose() / m as f64;
    let (mut eigenvalues, vectors) = sorted_symmetric_eigen(gram);
    clamp_negative(&mut eigenvalues, context, warnings);

    let scale = eigenvalues[0].max(f64::MIN_POSITIVE);
    let tolerance = NUMERICAL_ZERO * scale;
    let bulk = &eigenvalues[k..];
    let bulk_len = bulk.len() as f64;
    let collapsed = bulk.iter().all(|&b| b <= tolerance);

    if collapsed && k > 0 {
        warning::record(
            warnings,
            ComputationWarning::CollapsedBulk {
                context: context.to_string(),
                spike_order: k,
                bulk_len: bulk.len(),
            },
        );
    }

    let mut corrected = Vec::with_capacity(k);
    let mut variances = Vec::with_capacity(k);

    for s in 0..k {
        let rho = eigenvalues[s];
        if collapsed {
            corrected.push(rho);
            variances.push(0.0);
            continue;
        }

        let mut m11 = 0.0;
        let mut m22 = 0.0;
        for (offset, &b) in bulk.iter().enumerate() {
            let gap = rho - b;
            if gap.abs() <= tolerance {
                warning::record(
                    warnings,
                    ComputationWarning::NearZeroDenominator {
                        context: format!("{context} spike {s}"),
                        index: k + offset,
                    },
                );
                continue;
            }
            m11 += b / gap;
            m22 += (b * b) / (gap * gap);
        }

        if m11 <= 0.0 || !m11.is_finite() {
            warning::record(
                warnings,
                ComputationWarning::NearZeroDenominator {
                    context: format!("{context} correction"),
                    index: s,
                },
            );
            corrected.push(rho);
            variances.push(0.0);
            continue;
        }

        corrected.push(1.0 + bulk_len / m11);
        let (m11, m22) = (m11 / bulk_len, m22 / bulk_len);
        variances.push(2.0 * (m22 - m11 * m11) / m11.powi(4));
    }

    let spike_vectors = (0..k)
        .map(|s| vectors.column(s).iter().copied().collect())
        .collect();

    debug!(
        context,
        samples = m,
        features = data.ncols(),
        spike_order = k,
        leading = eigenvalues[0],
        "spikes estimated"
    );

    Ok(SpikedEstimate {
        eigenvalues,
        spike_order: k,
        corrected,
        variances,
        spike_vectors,
    })
}

/// Test whether `x` and `y` share the same top-`k` spiked eigenvalues.
///
/// Rows are samples, columns are features.
///
/// # Errors
///
/// - [`AsymmetryError::InsufficientData`] for an empty set
/// - [`AsymmetryError::DimensionMismatch`] for ragged rows or differing feature counts
/// - [`AsymmetryError::InvalidInput`] for NaN or infinite entries
/// - [`AsymmetryError::SpikeOrderTooLarge`] unless each side has more than `k` samples
/// - [`AsymmetryError::NumericalInstability`] if the statistic is undefined
///
/// # Example
///
/// ```
/// use motion_asymmetry::spiked_covariance_test;
///
/// let x = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.5]];
/// let result = spiked_covariance_test(&x, &x, 0)?;
/// assert_eq!(result.p_value, 1.0);
/// # Ok::<(), motion_asymmetry::AsymmetryError>(())
/// ```
pub fn spiked_covariance_test(
    x: &[Vec<f64>],
    y: &[Vec<f64>],
    k: usize,
) -> Result<SpikedTestResult> {
    let xm = samples_to_matrix(x, "x samples")?;
    let ym = samples_to_matrix(y, "y samples")?;
    if xm.ncols() != ym.ncols() {
        return Err(AsymmetryError::dimension_mismatch(
            "y feature count",
            xm.ncols(),
            ym.ncols(),
        ));
    }

    let mut warnings = Vec::new();
    let x_est = estimate_from_matrix(&xm, k, "x spikes", &mut warnings)?;
    let y_est = estimate_from_matrix(&ym, k, "y spikes", &mut warnings)?;

    if k == 0 {
        return Ok(SpikedTestResult {
            statistic: 0.0,
            p_value: 1.0,
            degrees_of_freedom: 0,
            x: x_est,
            y: y_est,
            warnings,
        });
    }

    let n = xm.nrows().min(ym.nrows()) as f64;
    let mut sum = 0.0;
    for s in 0..k {
        let denom = x_est.variances[s] + y_est.variances[s];
        if denom <= 0.0 || !denom.is_finite() {
            warning::record(
                &mut warnings,
                ComputationWarning::NearZeroDenominator {
                    context: "spiked statistic".to_string(),
                    index: s,
                },
            );
            continue;
        }
        sum += (x_est.corrected[s] - y_est.corrected[s]).powi(2) / denom;
    }
    let statistic = n * sum;

    if statistic.is_nan() {
        return Err(AsymmetryError::numerical_instability(
            "spiked statistic is undefined",
        ));
    }

    let p_value = if statistic.is_infinite() {
        0.0
    } else {
        let chi = ChiSquared::new(k as f64).map_err(|e| {
            AsymmetryError::numerical_instability(format!("chi-squared distribution: {e}"))
        })?;
        chi.sf(statistic).clamp(0.0, 1.0)
    };

    debug!(statistic, p_value, spike_order = k, "spiked covariance test");

    Ok(SpikedTestResult {
        statistic,
        p_value,
        degrees_of_freedom: k,
        x: x_est,
        y: y_est,
        warnings,
    })
}
