//! Guided-local-search improvement over a constructed assignment.
//!
//! The search walks relocate, swap, and intra-route reversal moves, plus
//! reinsertion of dropped nodes, under an augmented objective. When no
//! move improves, the longest-utility arc of the current solution is
//! penalised, deforming the landscape so the search escapes the local
//! optimum. The true-objective best seen is returned when the deadline
//! expires.

use std::collections::HashMap;
use std::time::Instant;

use crate::construction::{best_insertion, Assignment};
use crate::model::RoutingModel;

pub(crate) struct GuidedLocalSearch<'a> {
    model: &'a RoutingModel,
    deadline: Instant,
    penalties: HashMap<(usize, usize), i64>,
    lambda: i64,
}

impl<'a> GuidedLocalSearch<'a> {
    pub fn new(model: &'a RoutingModel, deadline: Instant) -> Self {
        Self {
            model,
            deadline,
            penalties: HashMap::new(),
            lambda: 1,
        }
    }

    /// Improves `assignment` until the deadline, returning the best
    /// true-cost solution encountered.
    pub fn improve(&mut self, assignment: Assignment) -> Assignment {
        let mut current = assignment;
        let mut best = current.clone();
        let mut best_cost = self.model.objective(&best.routes, &best.dropped);
        self.lambda = self.derive_lambda(&current);

        while Instant::now() < self.deadline {
            match self.best_move(&current) {
                Some(next) => {
                    let cost = self.model.objective(&next.routes, &next.dropped);
                    if cost < best_cost {
                        best = next.clone();
                        best_cost = cost;
                    }
                    current = next;
                }
                None => {
                    if !self.penalise_worst_arc(&current) {
                        break;
                    }
                }
            }
        }
        best
    }

    /// Scale for arc penalties: a fraction of the mean arc length, so
    /// penalties nudge rather than dominate.
    fn derive_lambda(&self, assignment: &Assignment) -> i64 {
        let mut total = 0_i64;
        let mut arcs = 0_i64;
        for (vehicle, nodes) in self.model.vehicles.iter().zip(&assignment.routes) {
            if nodes.is_empty() {
                continue;
            }
            total += self.model.route_distance(vehicle, nodes);
            arcs += nodes.len() as i64 + 1;
        }
        if arcs == 0 { 1 } else { (total / (arcs * 10)).max(1) }
    }

    fn augmented_cost(&self, assignment: &Assignment) -> i64 {
        let mut cost = self.model.objective(&assignment.routes, &assignment.dropped);
        if self.penalties.is_empty() {
            return cost;
        }
        for (vehicle, nodes) in self.model.vehicles.iter().zip(&assignment.routes) {
            let mut previous = vehicle.start;
            for &node in nodes {
                let location = self.model.stops[node].location;
                cost += self.lambda * self.penalty_of(previous, location);
                previous = location;
            }
            if !nodes.is_empty() {
                cost += self.lambda * self.penalty_of(previous, vehicle.end);
            }
        }
        cost
    }

    fn penalty_of(&self, from: usize, to: usize) -> i64 {
        self.penalties.get(&(from, to)).copied().unwrap_or(0)
    }

    /// The best augmented-cost-improving neighbour, if any.
    fn best_move(&self, current: &Assignment) -> Option<Assignment> {
        let current_cost = self.augmented_cost(current);
        let mut best: Option<(i64, Assignment)> = None;

        let consider = |candidate: Assignment, best: &mut Option<(i64, Assignment)>| {
            let cost = self.augmented_cost(&candidate);
            if cost >= current_cost {
                return;
            }
            let improves = match best {
                Some((best_cost, _)) => cost < *best_cost,
                None => true,
            };
            if improves {
                *best = Some((cost, candidate));
            }
        };

        // Reinsert dropped nodes first; the drop penalty makes any
        // feasible reinsertion a large improvement.
        for &node in &current.dropped {
            if let Some((vehicle, position)) = best_insertion(self.model, current, node) {
                let mut candidate = current.clone();
                candidate.routes[vehicle].insert(position, node);
                candidate.dropped.remove(&node);
                consider(candidate, &mut best);
            }
        }

        for source in 0..current.routes.len() {
            for position in 0..current.routes[source].len() {
                self.relocations(current, source, position, &mut |candidate| {
                    consider(candidate, &mut best)
                });
            }
        }

        self.swaps(current, &mut |candidate| consider(candidate, &mut best));
        self.reversals(current, &mut |candidate| consider(candidate, &mut best));

        best.map(|(_, assignment)| assignment)
    }

    /// Moves the node at `(source, position)` to every feasible slot in
    /// every route.
    fn relocations(
        &self,
        current: &Assignment,
        source: usize,
        position: usize,
        consider: &mut dyn FnMut(Assignment),
    ) {
        let node = current.routes[source][position];
        for target in 0..current.routes.len() {
            let slots = if target == source {
                current.routes[target].len() - 1
            } else {
                current.routes[target].len()
            };
            for slot in 0..=slots {
                if target == source && slot == position {
                    continue;
                }
                let mut candidate = current.clone();
                candidate.routes[source].remove(position);
                candidate.routes[target].insert(slot, node);
                if self.is_feasible_pair(&candidate, source, target) {
                    consider(candidate);
                }
            }
        }
    }

    /// Exchanges one node between every pair of distinct routes.
    fn swaps(&self, current: &Assignment, consider: &mut dyn FnMut(Assignment)) {
        for left in 0..current.routes.len() {
            for right in (left + 1)..current.routes.len() {
                for left_pos in 0..current.routes[left].len() {
                    for right_pos in 0..current.routes[right].len() {
                        let mut candidate = current.clone();
                        let left_node = candidate.routes[left][left_pos];
                        candidate.routes[left][left_pos] = candidate.routes[right][right_pos];
                        candidate.routes[right][right_pos] = left_node;
                        if self.is_feasible_pair(&candidate, left, right) {
                            consider(candidate);
                        }
                    }
                }
            }
        }
    }

    /// Reverses every sub-sequence of every route (2-opt).
    fn reversals(&self, current: &Assignment, consider: &mut dyn FnMut(Assignment)) {
        for route in 0..current.routes.len() {
            let len = current.routes[route].len();
            for from in 0..len {
                for to in (from + 1)..len {
                    let mut candidate = current.clone();
                    candidate.routes[route][from..=to].reverse();
                    if self.is_feasible_pair(&candidate, route, route) {
                        consider(candidate);
                    }
                }
            }
        }
    }

    fn is_feasible_pair(&self, candidate: &Assignment, first: usize, second: usize) -> bool {
        let feasible = |index: usize| {
            self.model
                .is_route_feasible(&self.model.vehicles[index], &candidate.routes[index])
        };
        feasible(first) && (first == second || feasible(second))
    }

    /// Increments the penalty of the highest-utility arc in the current
    /// solution, where utility favours long, rarely punished arcs.
    /// Returns false when the solution has no arcs to penalise.
    fn penalise_worst_arc(&mut self, current: &Assignment) -> bool {
        let mut worst: Option<(f64, (usize, usize))> = None;
        for (vehicle, nodes) in self.model.vehicles.iter().zip(&current.routes) {
            if nodes.is_empty() {
                continue;
            }
            let mut previous = vehicle.start;
            let mut arcs = Vec::with_capacity(nodes.len() + 1);
            for &node in nodes {
                let location = self.model.stops[node].location;
                arcs.push((previous, location));
                previous = location;
            }
            arcs.push((previous, vehicle.end));
            for (from, to) in arcs {
                let length = self.model.distance_between(from, to) as f64;
                let utility = length / (1.0 + self.penalty_of(from, to) as f64);
                let replaces = match worst {
                    Some((worst_utility, _)) => utility > worst_utility,
                    None => true,
                };
                if replaces {
                    worst = Some((utility, (from, to)));
                }
            }
        }
        match worst {
            Some((_, arc)) => {
                *self.penalties.entry(arc).or_insert(0) += 1;
                true
            }
            None => false,
        }
    }
}
