//! Bilateral landmark correspondence.
//!
//! Pairs every non-null landmark with its mirror image across the vertical
//! axis `x = x_mean`. The mirror point of `(x, y)` is `(2 * x_mean - x, y)`.
//!
//! Two strategies are available (see [`MatchingStrategy`]):
//!
//! 1. **Greedy**: walk ids in order and take the nearest still-unmatched
//!    candidate. Cheap and myopic.
//! 2. **Optimal**: solve the minimum-cost assignment over all pairs, then
//!    repair the permutation into an involution.
//!
//! Both always return a total, self-inverse map. A landmark is mirrored to
//! itself only when no distinct partner is left (odd landmark count).

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::MatchingStrategy;
use crate::error::{AsymmetryError, Result};
use crate::math::assignment::solve_assignment;
use crate::registry::{LandmarkId, LandmarkSource, Point};
use crate::warning::{self, ComputationWarning};

/// Self-inverse bijection over non-null landmark ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrespondenceMap {
    pairs: BTreeMap<LandmarkId, LandmarkId>,
}

impl CorrespondenceMap {
    /// Mirror image of `id`, if `id` is covered.
    #[must_use]
    pub fn mirror(&self, id: LandmarkId) -> Option<LandmarkId> {
        self.pairs.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `(id, mirror(id))` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (LandmarkId, LandmarkId)> + '_ {
        self.pairs.iter().map(|(&a, &b)| (a, b))
    }

    /// Whether `mirror(mirror(id)) == id` for every covered id.
    #[must_use]
    pub fn is_involution(&self) -> bool {
        self.pairs
            .iter()
            .all(|(id, m)| self.pairs.get(m) == Some(id))
    }

    /// Whether every target is covered and no two ids share a target.
    #[must_use]
    pub fn is_bijection(&self) -> bool {
        let mut targets: Vec<LandmarkId> = self.pairs.values().copied().collect();
        targets.sort_unstable();
        targets.dedup();
        targets.len() == self.pairs.len() && targets.iter().all(|t| self.pairs.contains_key(t))
    }

    /// Ids mapped to themselves.
    #[must_use]
    pub fn self_mirrored(&self) -> Vec<LandmarkId> {
        self.pairs
            .iter()
            .filter(|(a, b)| a == b)
            .map(|(&a, _)| a)
            .collect()
    }
}

/// Correspondence map plus the ordered left/right partition it induces.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Correspondence {
    pub map: CorrespondenceMap,

    /// Left member of every pair; defines the coordinate order of the vectors.
    pub left_ids: Vec<LandmarkId>,

    /// `right_ids[k] == map.mirror(left_ids[k])`.
    pub right_ids: Vec<LandmarkId>,

    /// x coordinate of the symmetry axis.
    pub axis_x: f64,

    pub strategy: MatchingStrategy,

    /// Sum of mirror distances over all pairs.
    pub total_cost: f64,

    pub warnings: Vec<ComputationWarning>,
}

impl Correspondence {
    /// Number of left/right pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.left_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left_ids.is_empty()
    }
}

/// Mirror image of `p` across `x = axis_x`.
#[inline]
#[must_use]
pub fn mirror_point(p: Point, axis_x: f64) -> Point {
    [2.0 * axis_x - p[0], p[1]]
}

/// Distance from the mirror image of `a` to `b`. Symmetric in `a` and `b`.
#[inline]
fn mirror_cost(a: Point, b: Point, axis_x: f64) -> f64 {
    let m = mirror_point(a, axis_x);
    ((m[0] - b[0]).powi(2) + (m[1] - b[1]).powi(2)).sqrt()
}

/// Compute the correspondence using the mean x of `positions` as the axis.
///
/// # Errors
///
/// See [`correspondence_with_axis`].
///
/// # Example
///
/// ```
/// use motion_asymmetry::{compute_correspondence, LandmarkId, MatchingStrategy};
///
/// let ids: Vec<LandmarkId> = (0..4).map(LandmarkId).collect();
/// let positions = [[-2.0, 0.0], [-1.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
///
/// let c = compute_correspondence(&ids, &positions, MatchingStrategy::Optimal)?;
/// assert_eq!(c.map.mirror(LandmarkId(0)), Some(LandmarkId(3)));
/// assert_eq!(c.left_ids, vec![LandmarkId(0), LandmarkId(1)]);
/// # Ok::<(), motion_asymmetry::AsymmetryError>(())
/// ```
pub fn compute_correspondence(
    ids: &[LandmarkId],
    positions: &[Point],
    strategy: MatchingStrategy,
) -> Result<Correspondence> {
    validate_inputs(ids, positions)?;
    let axis_x = positions.iter().map(|p| p[0]).sum::<f64>() / positions.len() as f64;
    correspondence_with_axis(ids, positions, axis_x, strategy)
}

/// Compute the correspondence over the non-null landmarks of a source.
///
/// # Errors
///
/// See [`correspondence_with_axis`].
pub fn correspondence_from_source<S: LandmarkSource + ?Sized>(
    source: &S,
    strategy: MatchingStrategy,
) -> Result<Correspondence> {
    let (ids, positions): (Vec<LandmarkId>, Vec<Point>) = source
        .landmark_ids()
        .iter()
        .filter_map(|&id| source.reference_position(id).map(|p| (id, p)))
        .unzip();
    compute_correspondence(&ids, &positions, strategy)
}

/// Compute the correspondence about an explicit symmetry axis.
///
/// `positions[i]` is the reference position of `ids[i]`.
///
/// # Errors
///
/// - [`AsymmetryError::InsufficientData`] for fewer than two landmarks
/// - [`AsymmetryError::DimensionMismatch`] if `ids` and `positions` differ in length
/// - [`AsymmetryError::InvalidInput`] for duplicate ids or non-finite positions
/// - [`AsymmetryError::AssignmentFailed`] if the assignment solver fails
pub fn correspondence_with_axis(
    ids: &[LandmarkId],
    positions: &[Point],
    axis_x: f64,
    strategy: MatchingStrategy,
) -> Result<Correspondence> {
    validate_inputs(ids, positions)?;
    if !axis_x.is_finite() {
        return Err(AsymmetryError::invalid_input("symmetry axis is not finite"));
    }

    let partner = match strategy {
        MatchingStrategy::Greedy => greedy_partners(positions, axis_x),
        MatchingStrategy::Optimal => optimal_partners(positions, axis_x)?,
    };

    let mut warnings = Vec::new();
    let mut left_ids = Vec::with_capacity(ids.len() / 2 + 1);
    let mut right_ids = Vec::with_capacity(ids.len() / 2 + 1);
    let mut total_cost = 0.0;

    for (i, &j) in partner.iter().enumerate() {
        let emit = if i == j {
            warning::record(&mut warnings, ComputationWarning::SelfMirrored { id: ids[i] });
            true
        } else {
            let (xi, xj) = (positions[i][0], positions[j][0]);
            xi < xj || (xi == xj && i < j)
        };
        if emit {
            left_ids.push(ids[i]);
            right_ids.push(ids[j]);
            total_cost += mirror_cost(positions[i], positions[j], axis_x);
        }
    }

    let map = CorrespondenceMap {
        pairs: partner
            .iter()
            .enumerate()
            .map(|(i, &j)| (ids[i], ids[j]))
            .collect(),
    };

    debug!(
        ?strategy,
        landmarks = ids.len(),
        pairs = left_ids.len(),
        axis_x,
        total_cost,
        "correspondence computed"
    );

    Ok(Correspondence {
        map,
        left_ids,
        right_ids,
        axis_x,
        strategy,
        total_cost,
        warnings,
    })
}

fn validate_inputs(ids: &[LandmarkId], positions: &[Point]) -> Result<()> {
    if ids.len() != positions.len() {
        return Err(AsymmetryError::dimension_mismatch(
            "landmark positions",
            ids.len(),
            positions.len(),
        ));
    }
    if ids.len() < 2 {
        return Err(AsymmetryError::insufficient_data(
            "landmark correspondence",
            2,
            ids.len(),
        ));
    }
    if positions.iter().flatten().any(|c| !c.is_finite()) {
        return Err(AsymmetryError::invalid_input("non-finite landmark position"));
    }
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(AsymmetryError::invalid_input("duplicate landmark id"));
    }
    Ok(())
}

/// All indices ranked by squared distance to the mirror point of `index`.
///
/// The sort is stable, so ties keep id order.
fn candidate_ranking(positions: &[Point], axis_x: f64, index: usize) -> Vec<usize> {
    let m = mirror_point(positions[index], axis_x);
    let sq = |j: usize| (positions[j][0] - m[0]).powi(2) + (positions[j][1] - m[1]).powi(2);
    let mut ranking: Vec<usize> = (0..positions.len()).collect();
    ranking.sort_by(|&a, &b| sq(a).total_cmp(&sq(b)));
    ranking
}

fn greedy_partners(positions: &[Point], axis_x: f64) -> Vec<usize> {
    let n = positions.len();
    let mut partner: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        if partner[i].is_some() {
            continue;
        }
        let found = candidate_ranking(positions, axis_x, i)
            .into_iter()
            .find(|&j| j != i && partner[j].is_none());
        match found {
            Some(j) => {
                partner[i] = Some(j);
                partner[j] = Some(i);
            }
            None => partner[i] = Some(i),
        }
    }

    partner
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.unwrap_or(i))
        .collect()
}

fn optimal_partners(positions: &[Point], axis_x: f64) -> Result<Vec<usize>> {
    let n = positions.len();
    let raw = DMatrix::from_fn(n, n, |i, j| mirror_cost(positions[i], positions[j], axis_x));

    // Self-pairs are allowed only when forced, so price them out.
    let penalty = 1.0 + raw.sum();
    let mut solver_cost = raw.clone();
    solver_cost.fill_diagonal(penalty);

    let assignment = solve_assignment(&solver_cost)?;

    let mut partner = vec![usize::MAX; n];
    let mut visited = vec![false; n];
    let mut leftovers = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut cycle = Vec::new();
        let mut k = start;
        while !visited[k] {
            visited[k] = true;
            cycle.push(k);
            k = assignment[k];
        }

        let (pairs, single) = split_cycle(&cycle, &raw);
        for (a, b) in pairs {
            partner[a] = b;
            partner[b] = a;
        }
        leftovers.extend(single);
    }

    // Singles left by odd cycles are paired among themselves, cheapest first.
    while leftovers.len() >= 2 {
        let a = leftovers.remove(0);
        let pos = (0..leftovers.len())
            .min_by(|&x, &y| raw[(a, leftovers[x])].total_cmp(&raw[(a, leftovers[y])]))
            .unwrap_or(0);
        let b = leftovers.remove(pos);
        partner[a] = b;
        partner[b] = a;
    }
    if let Some(a) = leftovers.pop() {
        partner[a] = a;
    }

    Ok(partner)
}

/// Split a permutation cycle into disjoint pairs of consecutive members.
///
/// Tries every rotation and keeps the cheapest; an odd cycle leaves one
/// member unpaired.
fn split_cycle(cycle: &[usize], raw: &DMatrix<f64>) -> (Vec<(usize, usize)>, Option<usize>) {
    let len = cycle.len();
    match len {
        0 => return (Vec::new(), None),
        1 => return (Vec::new(), Some(cycle[0])),
        2 => return (vec![(cycle[0], cycle[1])], None),
        _ => {}
    }

    let rotations = if len % 2 == 0 { 2 } else { len };
    let mut best: Option<(f64, Vec<(usize, usize)>, Option<usize>)> = None;

    for s in 0..rotations {
        let pairs: Vec<(usize, usize)> = (0..len / 2)
            .map(|t| (cycle[(s + 2 * t) % len], cycle[(s + 2 * t + 1) % len]))
            .collect();
        let single = (len % 2 == 1).then(|| cycle[(s + len - 1) % len]);
        let cost = pairs.iter().map(|&(a, b)| raw[(a, b)]).sum::<f64>()
            + single.map_or(0.0, |a| raw[(a, a)]);
        if best.as_ref().map_or(true, |(c, _, _)| cost < *c) {
            best = Some((cost, pairs, single));
        }
    }

    best.map_or((Vec::new(), None), |(_, pairs, single)| (pairs, single))
}

/// First-choice mirror candidate of `id` (possibly itself), ignoring all others.
///
/// This naive map is generally not an involution; see [`mirror_stability`].
#[must_use]
pub fn nearest_mirror(
    ids: &[LandmarkId],
    positions: &[Point],
    axis_x: f64,
    id: LandmarkId,
) -> Option<LandmarkId> {
    let index = ids.iter().position(|&x| x == id)?;
    if positions.len() != ids.len() {
        return None;
    }
    candidate_ranking(positions, axis_x, index)
        .first()
        .map(|&j| ids[j])
}

/// Least `n` with `m^n(id) == m^(n+2)(id)` for the naive [`nearest_mirror`] map `m`.
///
/// `Some(0)` means `id` already sits on a 2-cycle (or fixed point). `None` if
/// `id` is unknown or the orbit does not settle within `ids.len()` steps.
#[must_use]
pub fn mirror_stability(
    ids: &[LandmarkId],
    positions: &[Point],
    axis_x: f64,
    id: LandmarkId,
) -> Option<usize> {
    let m = |x| nearest_mirror(ids, positions, axis_x, x);
    let mut point = id;
    for steps in 0..=ids.len() {
        let once = m(point)?;
        if m(once)? == point {
            return Some(steps);
        }
        point = once;
    }
    None
}
