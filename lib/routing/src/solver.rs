//! Exact shortest Hamiltonian path over a distance matrix.
//!
//! Bitmask dynamic programming: state `(mask, last)` where `mask` is the set
//! of visited indices (always containing the start) and `last` the current
//! position. `O(N^2 * 2^N)` time and `O(N * 2^N)` states, which bounds the
//! usable N by design - see [`MAX_STOPS`]. Intended for a handful to roughly
//! twenty stops, the number of venues fetched per query.

use crate::matrix::DistanceMatrix;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Caller-facing cap on solvable instances. The DP state space is
/// `N * 2^N`; beyond this the solver reports no route instead of attempting
/// an exponential blow-up.
pub const MAX_STOPS: usize = 24;

/// Solved visiting order plus consecutive leg distances, in meters.
///
/// `path` is a permutation of all matrix indices starting at the requested
/// start; `leg_distances[i]` is the distance from `path[i]` to `path[i + 1]`.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub path: Vec<usize>,
    pub leg_distances: Vec<f64>,
}

impl RoutePlan {
    #[must_use]
    pub fn total_distance(&self) -> f64 {
        self.leg_distances.iter().sum()
    }
}

/// Shortest Hamiltonian path visiting every matrix index exactly once,
/// starting at `start` with a free end.
///
/// Returns `None` when there is nothing to route (`N == 0`, `start` out of
/// range, `N > MAX_STOPS`) or when no feasible path exists because every
/// completion runs through an infinite entry. The caller must treat `None`
/// as "no route available", not as an error to retry.
///
/// Deterministic: transitions iterate masks in ascending numeric order (a
/// valid topological order, since adding a node strictly increases the
/// mask), then `last` and `next` by ascending index, and relaxation is
/// strict, so the first-encountered minimum wins on ties.
pub fn solve(matrix: &DistanceMatrix, start: usize) -> Option<RoutePlan> {
    let n = matrix.len();
    if n == 0 || start >= n {
        debug!("route solve requested with no candidates");
        return None;
    }
    if n > MAX_STOPS {
        warn!("route solve refused: {} stops exceeds the limit of {}", n, MAX_STOPS);
        return None;
    }
    if n == 1 {
        return Some(RoutePlan {
            path: vec![start],
            leg_distances: Vec::new(),
        });
    }

    let full: u32 = (1u32 << n) - 1;
    let start_bit = 1u32 << start;

    // (mask, last) -> (cost, predecessor). Infinite-cost states are never
    // inserted, so infeasibility falls out as an absent full-mask state.
    let mut dp: AHashMap<(u32, usize), (f64, Option<usize>)> = AHashMap::new();
    dp.insert((start_bit, start), (0.0, None));

    for mask in start_bit..=full {
        if mask & start_bit == 0 {
            continue;
        }
        for last in 0..n {
            if mask & (1 << last) == 0 {
                continue;
            }
            let Some(&(cost, _)) = dp.get(&(mask, last)) else {
                continue;
            };
            for next in 0..n {
                if mask & (1 << next) != 0 {
                    continue;
                }
                let leg = matrix.get(last, next);
                if !leg.is_finite() {
                    continue;
                }
                let candidate = cost + leg;
                let key = (mask | (1 << next), next);
                match dp.get(&key) {
                    Some(&(best, _)) if best <= candidate => {}
                    _ => {
                        dp.insert(key, (candidate, Some(last)));
                    }
                }
            }
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for end in 0..n {
        if let Some(&(cost, _)) = dp.get(&(full, end)) {
            if best.map_or(true, |(b, _)| cost < b) {
                best = Some((cost, end));
            }
        }
    }

    let Some((total, mut last)) = best else {
        warn!("no feasible route over {} candidates", n);
        return None;
    };

    let mut path = vec![last];
    let mut mask = full;
    while let Some(&(_, Some(prev))) = dp.get(&(mask, last)) {
        path.push(prev);
        mask &= !(1 << last);
        last = prev;
    }
    path.reverse();

    let leg_distances = path
        .windows(2)
        .map(|leg| matrix.get(leg[0], leg[1]))
        .collect();

    debug!("solved route over {} stops, total {:.0} m", n, total);
    Some(RoutePlan {
        path,
        leg_distances,
    })
}
