//! First-solution construction by cheapest-arc insertion.

use std::collections::BTreeSet;

use crate::model::RoutingModel;

/// A working assignment: one node list per model vehicle, plus the nodes
/// no route serves.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    /// Stop-node indices per vehicle, in visit order.
    pub routes: Vec<Vec<usize>>,
    /// Stop-node indices left unserved.
    pub dropped: BTreeSet<usize>,
}

impl Assignment {
    /// An assignment with every node dropped.
    pub fn all_dropped(model: &RoutingModel) -> Self {
        Self {
            routes: vec![Vec::new(); model.vehicles.len()],
            dropped: (0..model.stops.len()).collect(),
        }
    }
}

/// Builds a first solution by inserting each node at the cheapest
/// feasible position, highest drop penalty first, so important work is
/// placed while the routes are still empty. Nodes with no feasible
/// position stay dropped and carry their penalty.
pub(crate) fn cheapest_insertion(model: &RoutingModel) -> Assignment {
    let mut assignment = Assignment::all_dropped(model);

    let mut order: Vec<usize> = (0..model.stops.len()).collect();
    order.sort_by_key(|&node| (std::cmp::Reverse(model.stops[node].penalty), node));

    for node in order {
        if let Some((vehicle, position)) = best_insertion(model, &assignment, node) {
            assignment.routes[vehicle].insert(position, node);
            assignment.dropped.remove(&node);
        }
    }
    assignment
}

/// The cheapest feasible `(vehicle, position)` for `node`, judged by the
/// growth in route distance.
pub(crate) fn best_insertion(
    model: &RoutingModel,
    assignment: &Assignment,
    node: usize,
) -> Option<(usize, usize)> {
    let mut best: Option<(i64, usize, usize)> = None;
    for (vehicle_index, vehicle) in model.vehicles.iter().enumerate() {
        let nodes = &assignment.routes[vehicle_index];
        let base = model.route_distance(vehicle, nodes);
        for position in 0..=nodes.len() {
            let mut candidate = nodes.clone();
            candidate.insert(position, node);
            if !model.is_route_feasible(vehicle, &candidate) {
                continue;
            }
            let delta = model.route_distance(vehicle, &candidate) - base;
            let improves = match best {
                Some((best_delta, _, _)) => delta < best_delta,
                None => true,
            };
            if improves {
                best = Some((delta, vehicle_index, position));
            }
        }
    }
    best.map(|(_, vehicle, position)| (vehicle, position))
}
