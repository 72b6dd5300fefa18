//! The solving seam between the orchestration layer and solver backends.

use std::time::Duration;

use crate::matrix::SquareMatrix;
use crate::solution::Solution;
use crate::types::{Delivery, Location, Vehicle};

/// Everything a solver needs for one dispatch problem.
///
/// `locations` fixes the matrix ordering: row and column `i` of both
/// matrices belong to `locations[i]`.
#[derive(Debug, Clone, Copy)]
pub struct SolverInput<'a> {
    /// Pairwise distances in kilometres.
    pub distance: &'a SquareMatrix,
    /// Pairwise travel times in minutes, when available.
    pub time: Option<&'a SquareMatrix>,
    /// Locations in matrix order.
    pub locations: &'a [Location],
    /// Fleet to dispatch.
    pub vehicles: &'a [Vehicle],
    /// Work to assign.
    pub deliveries: &'a [Delivery],
    /// Matrix index of the depot.
    pub depot_index: usize,
    /// Budget for the solver's search.
    pub time_limit: Duration,
}

/// Solve vehicle routing problems over a prepared [`SolverInput`].
///
/// Implementations report failure through [`Solution::status`] rather than
/// an error type: an infeasible model yields `no_solution` with every
/// delivery unassigned, and malformed input yields `error` with a
/// diagnostic in the statistics. Solvers must be `Send + Sync` so solves
/// can run on independent workers.
pub trait VrpSolve: Send + Sync {
    /// Capacitated VRP over the distance matrix.
    fn solve(&self, input: &SolverInput<'_>) -> Solution;

    /// VRP with time windows; requires `input.time`.
    fn solve_with_time_windows(&self, input: &SolverInput<'_>) -> Solution;
}
