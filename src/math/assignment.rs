//! Minimum-cost assignment (Kuhn–Munkres with potentials).
//!
//! O(n³) shortest-augmenting-path formulation over a dense square cost
//! matrix. Used by the optimal landmark correspondence.

use nalgebra::DMatrix;

use crate::error::{AsymmetryError, Result};

/// Solve the square assignment problem.
///
/// Returns `assignment` with `assignment[row] = column`, minimizing the sum
/// of `cost[(row, column)]`.
///
/// # Errors
///
/// Returns [`AsymmetryError::DimensionMismatch`] for a non-square matrix and
/// [`AsymmetryError::AssignmentFailed`] if a cost is not finite.
pub fn solve_assignment(cost: &DMatrix<f64>) -> Result<Vec<usize>> {
    let n = cost.nrows();
    if cost.ncols() != n {
        return Err(AsymmetryError::dimension_mismatch(
            "assignment cost matrix columns",
            n,
            cost.ncols(),
        ));
    }
    if let Some(bad) = cost.iter().find(|c| !c.is_finite()) {
        return Err(AsymmetryError::assignment(format!(
            "cost matrix contains non-finite entry {bad}"
        )));
    }

    // 1-based potentials; column 0 is the virtual source.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut row_of = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        row_of[0] = row;
        let mut j0 = 0usize;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = row_of[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                if reduced < min_slack[j] {
                    min_slack[j] = reduced;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }

            if j1 == 0 {
                return Err(AsymmetryError::assignment(format!(
                    "no augmenting path for row {}",
                    row - 1
                )));
            }

            for j in 0..=n {
                if used[j] {
                    u[row_of[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            j0 = j1;
            if row_of[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path
        loop {
            let j1 = way[j0];
            row_of[j0] = row_of[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for j in 1..=n {
        assignment[row_of[j] - 1] = j - 1;
    }
    Ok(assignment)
}

/// Total cost of an assignment.
#[must_use]
pub fn assignment_cost(cost: &DMatrix<f64>, assignment: &[usize]) -> f64 {
    assignment
        .iter()
        .enumerate()
        .map(|(row, &col)| cost[(row, col)])
        .sum()
}
