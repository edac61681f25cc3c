//! Mathematical utilities for asymmetry analysis.
//!
//! This module provides:
//! - [`assignment`]: minimum-cost assignment (Kuhn–Munkres)
//! - [`linalg`]: centering, sorted eigendecomposition and PCA

pub mod assignment;
pub mod linalg;

pub use assignment::solve_assignment;
pub use linalg::{
    angle_between, center_columns, difference_norm, distance, principal_components,
    samples_to_matrix, sorted_symmetric_eigen, PrincipalComponents,
};
