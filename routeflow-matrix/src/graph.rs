//! Conversion from matrices to the adjacency form used by path search.

use routeflow_core::constants::MAX_SAFE_DISTANCE;
use routeflow_core::{Graph, SquareMatrix};

/// Builds the node -> neighbour -> weight mapping consumed by shortest
/// path. Entries at or above [`MAX_SAFE_DISTANCE`] are treated as "no
/// edge" and omitted; every location still appears as a node so searches
/// report it unreachable rather than unknown.
#[must_use]
pub fn matrix_to_graph(matrix: &SquareMatrix, location_ids: &[String]) -> Graph {
    let mut graph = Graph::new();
    for id in location_ids {
        graph.add_node(id.clone());
    }
    for (row, col, weight) in matrix.entries() {
        if row == col || weight >= MAX_SAFE_DISTANCE {
            continue;
        }
        if let (Some(from), Some(to)) = (location_ids.get(row), location_ids.get(col)) {
            graph.insert_edge(from.clone(), to.clone(), weight);
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|&name| name.to_owned()).collect()
    }

    #[rstest]
    fn sentinel_entries_are_omitted() {
        let matrix = SquareMatrix::from_rows(vec![
            vec![0.0, 5.0, MAX_SAFE_DISTANCE],
            vec![5.0, 0.0, 2.0],
            vec![MAX_SAFE_DISTANCE, 2.0, 0.0],
        ])
        .unwrap();
        let graph = matrix_to_graph(&matrix, &ids(&["a", "b", "c"]));

        assert_eq!(graph.neighbours("a").map(std::collections::HashMap::len), Some(1));
        assert!(graph.neighbours("a").is_some_and(|n| n.contains_key("b")));
        assert!(graph.contains("c"));
    }

    #[rstest]
    fn every_location_becomes_a_node() {
        let matrix = SquareMatrix::zeros(2);
        let graph = matrix_to_graph(&matrix, &ids(&["a", "b"]));
        assert!(graph.contains("a"));
        assert!(graph.contains("b"));
    }
}
