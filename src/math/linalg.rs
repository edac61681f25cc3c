//! Linear algebra utilities for asymmetry analysis.
//!
//! This module provides centering, sorted symmetric eigendecomposition and
//! PCA over sample sets, using nalgebra for the decompositions.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AsymmetryError, Result};
use crate::warning::{self, ComputationWarning};

/// Eigenvalues below this fraction of the leading one count as zero.
const RELATIVE_RANK_EPS: f64 = 1e-12;

/// Result of PCA over a sample set.
///
/// Directions are unit vectors; their signs are whatever the decomposition
/// produced and are not comparable across independent runs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrincipalComponents {
    /// Sample mean that was subtracted before decomposition.
    pub mean: Vec<f64>,

    /// Explained variances, non-increasing and non-negative.
    pub variances: Vec<f64>,

    /// Orthonormal principal directions, `directions[k]` pairs with `variances[k]`.
    pub directions: Vec<Vec<f64>>,
}

impl PrincipalComponents {
    /// Number of retained components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variances.is_empty()
    }

    /// Dimension of the sample space.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// The k-th direction rescaled by its standard deviation.
    #[must_use]
    pub fn component(&self, k: usize) -> Vec<f64> {
        let scale = self.variances[k].sqrt();
        self.directions[k].iter().map(|x| x * scale).collect()
    }

    /// Scalar projection of a sample onto the k-th direction, after centering.
    #[must_use]
    pub fn project(&self, sample: &[f64], k: usize) -> f64 {
        sample
            .iter()
            .zip(&self.mean)
            .zip(&self.directions[k])
            .map(|((x, m), u)| (x - m) * u)
            .sum()
    }
}

/// Euclidean norm.
///
/// # Example
///
/// ```
/// use motion_asymmetry::math::distance;
///
/// assert_eq!(distance(&[3.0, 4.0]), 5.0);
/// ```
#[must_use]
pub fn distance(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Euclidean distance between two vectors of equal length.
#[must_use]
pub fn difference_norm(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Angle in radians between two vectors, `None` if either has zero length.
///
/// Computed from the chord between the normalized vectors,
/// `acos(1 - |a/|a| - b/|b||² / 2)`.
#[must_use]
pub fn angle_between(a: &[f64], b: &[f64]) -> Option<f64> {
    let na = distance(a);
    let nb = distance(b);
    if na == 0.0 || nb == 0.0 {
        return None;
    }
    let chord_sq: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x / na - y / nb;
            d * d
        })
        .sum();
    Some((1.0 - chord_sq / 2.0).clamp(-1.0, 1.0).acos())
}

/// Stack row samples into a matrix.
///
/// # Errors
///
/// - [`AsymmetryError::InsufficientData`] for an empty set or zero-length rows
/// - [`AsymmetryError::DimensionMismatch`] for ragged rows
/// - [`AsymmetryError::InvalidInput`] for NaN or infinite entries
pub fn samples_to_matrix(samples: &[Vec<f64>], context: &str) -> Result<DMatrix<f64>> {
    let first = samples
        .first()
        .ok_or_else(|| AsymmetryError::insufficient_data(context, 1, 0))?;
    let dim = first.len();
    if dim == 0 {
        return Err(AsymmetryError::insufficient_data(
            format!("{context} (vector length)"),
            1,
            0,
        ));
    }
    if let Some(bad) = samples.iter().find(|s| s.len() != dim) {
        return Err(AsymmetryError::dimension_mismatch(
            format!("{context} (vector length)"),
            dim,
            bad.len(),
        ));
    }
    if let Some(row) = samples.iter().position(|s| s.iter().any(|x| !x.is_finite())) {
        return Err(AsymmetryError::invalid_input(format!(
            "{context}: non-finite value in row {row}"
        )));
    }
    Ok(DMatrix::from_fn(samples.len(), dim, |i, j| samples[i][j]))
}

/// Subtract the column means. Returns the centered matrix and the means.
#[must_use]
pub fn center_columns(data: &DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let rows = data.nrows().max(1) as f64;
    let mean = DVector::from_iterator(
        data.ncols(),
        data.column_iter().map(|c| c.sum() / rows),
    );
    let mut centered = data.clone();
    for (j, mut col) in centered.column_iter_mut().enumerate() {
        for x in col.iter_mut() {
            *x -= mean[j];
        }
    }
    (centered, mean)
}

/// Symmetric eigendecomposition with eigenpairs sorted by descending eigenvalue.
///
/// Eigenvectors are the columns of the returned matrix. The decomposition is
/// real by construction, so no imaginary residue can leak out.
#[must_use]
pub fn sorted_symmetric_eigen(matrix: DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let eigen = SymmetricEigen::new(matrix);

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = eigen.eigenvectors.select_columns(order.iter());
    (values, vectors)
}

/// Clamp negative eigenvalues to zero, recording a warning for each.
pub(crate) fn clamp_negative(
    values: &mut [f64],
    context: &str,
    warnings: &mut Vec<ComputationWarning>,
) {
    for (index, v) in values.iter_mut().enumerate() {
        if *v < 0.0 {
            warning::record(
                warnings,
                ComputationWarning::NegativeEigenvalue {
                    context: context.to_string(),
                    index,
                    value: *v,
                },
            );
            *v = 0.0;
        }
    }
}

/// Compute the leading `n` principal components of row samples.
///
/// Decomposes whichever of the covariance (`d x d`) and Gram (`f x f`)
/// matrices is smaller. The variance divisor is `max(f - 1, 1)`. Directions
/// that carry no variance are completed to an orthonormal set.
///
/// # Errors
///
/// Returns [`AsymmetryError::InvalidComponentCount`] unless
/// `1 <= n <= min(f, d)`.
pub fn principal_components(
    data: &DMatrix<f64>,
    n: usize,
    context: &str,
    warnings: &mut Vec<ComputationWarning>,
) -> Result<PrincipalComponents> {
    let (f, d) = data.shape();
    let available = f.min(d);
    if n == 0 || n > available {
        return Err(AsymmetryError::invalid_component_count(n, available));
    }

    let (centered, mean) = center_columns(data);
    let divisor = f.saturating_sub(1).max(1) as f64;

    let (mut variances, directions) = if d <= f {
        let cov = centered.transpose() * &centered / divisor;
        let (values, vectors) = sorted_symmetric_eigen(cov);
        let directions = (0..n)
            .map(|k| vectors.column(k).iter().copied().collect())
            .collect();
        (values[..n].to_vec(), directions)
    } else {
        // Gram trick: for G = X Xᵀ, Xᵀu is an eigenvector of Xᵀ X.
        let gram = &centered * centered.transpose() / divisor;
        let (values, vectors) = sorted_symmetric_eigen(gram);
        let floor = RELATIVE_RANK_EPS * values[0].abs().max(f64::MIN_POSITIVE);
        let lifted: Vec<Option<Vec<f64>>> = (0..n)
            .map(|k| {
                if values[k] <= floor {
                    return None;
                }
                let v = centered.transpose() * vectors.column(k);
                let norm = v.norm();
                (norm > 0.0).then(|| v.iter().map(|x| x / norm).collect())
            })
            .collect();
        (values[..n].to_vec(), complete_orthonormal(lifted, d))
    };

    clamp_negative(&mut variances, context, warnings);

    debug!(
        context,
        samples = f,
        dimension = d,
        components = n,
        leading_variance = variances[0],
        "principal components computed"
    );

    Ok(PrincipalComponents {
        mean: mean.iter().copied().collect(),
        variances,
        directions,
    })
}

/// Fill missing directions with unit vectors orthogonal to all others.
///
/// Candidates are standard basis vectors, orthogonalized by Gram–Schmidt.
fn complete_orthonormal(slots: Vec<Option<Vec<f64>>>, dim: usize) -> Vec<Vec<f64>> {
    let mut basis: Vec<Vec<f64>> = slots.iter().flatten().cloned().collect();
    let mut next_axis = 0;

    slots
        .into_iter()
        .map(|slot| {
            if let Some(dir) = slot {
                return dir;
            }
            while next_axis < dim {
                let mut v = vec![0.0; dim];
                v[next_axis] = 1.0;
                next_axis += 1;
                for b in &basis {
                    let proj: f64 = v.iter().zip(b).map(|(x, y)| x * y).sum();
                    for (x, y) in v.iter_mut().zip(b) {
                        *x -= proj * y;
                    }
                }
                let norm = distance(&v);
                if norm > 1e-6 {
                    let unit: Vec<f64> = v.iter().map(|x| x / norm).collect();
                    basis.push(unit.clone());
                    return unit;
                }
            }
            // Unreachable for n <= dim; keep the set well-formed regardless.
            vec![0.0; dim]
        })
        .collect()
}
