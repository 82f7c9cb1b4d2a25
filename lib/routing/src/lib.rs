//! # hopwise Routing
//!
//! Exact route solving over a pairwise walking-distance matrix:
//!
//! - [`DistanceMatrix`] - Symmetric N x N distances, infinity for failed pairs
//! - [`solve`] - Shortest Hamiltonian path with a fixed start, free end
//! - [`RoutePlan`] - Solved visiting order plus consecutive leg distances

pub mod matrix;
pub mod solver;

pub use matrix::DistanceMatrix;
pub use solver::{solve, RoutePlan, MAX_STOPS};
