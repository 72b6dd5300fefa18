//! Non-negative-weight graphs and label-setting shortest path.
//!
//! The [`PathFind`] trait is the seam through which the optimization
//! pipeline requests segment expansion; [`DijkstraPathFinder`] is the
//! default implementation. Unreachable destinations are reported as an
//! empty path with infinite distance rather than an error, so callers can
//! substitute a sentinel segment.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use thiserror::Error;

/// Adjacency mapping: node -> neighbour -> edge weight.
///
/// Missing pairs mean "no direct edge".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    adjacency: HashMap<String, HashMap<String, f64>>,
}

impl Graph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node with no edges (a no-op if already present).
    pub fn add_node(&mut self, node: impl Into<String>) {
        self.adjacency.entry(node.into()).or_default();
    }

    /// Inserts a directed edge, replacing any existing weight.
    pub fn insert_edge(&mut self, from: impl Into<String>, to: impl Into<String>, weight: f64) {
        self.adjacency
            .entry(from.into())
            .or_default()
            .insert(to.into(), weight);
    }

    /// Whether `node` is known to the graph.
    #[must_use]
    pub fn contains(&self, node: &str) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Outgoing edges of `node`, if it exists.
    #[must_use]
    pub fn neighbours(&self, node: &str) -> Option<&HashMap<String, f64>> {
        self.adjacency.get(node)
    }

    /// Iterates every directed edge as `(from, to, weight)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.adjacency.iter().flat_map(|(from, neighbours)| {
            neighbours
                .iter()
                .map(move |(to, &weight)| (from.as_str(), to.as_str(), weight))
        })
    }

    /// Nodes with neither outgoing nor incoming edges.
    #[must_use]
    pub fn isolated_nodes(&self) -> Vec<String> {
        let mut isolated: Vec<String> = self
            .adjacency
            .iter()
            .filter(|(node, neighbours)| {
                neighbours.is_empty()
                    && !self
                        .adjacency
                        .values()
                        .any(|edges| edges.contains_key(node.as_str()))
            })
            .map(|(node, _)| node.clone())
            .collect();
        isolated.sort();
        isolated
    }
}

/// Errors raised by shortest-path search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// The graph carried a negative edge weight, which the label-setting
    /// search cannot handle.
    #[error("negative edge weight {weight} on {from} -> {to}")]
    NegativeWeight {
        from: String,
        to: String,
        weight: f64,
    },
}

/// A shortest path and its total weight.
///
/// `path` is empty and `distance` is `f64::INFINITY` when the destination
/// is unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Ordered node list from source to destination, inclusive.
    pub path: Vec<String>,
    /// Total weight along `path`.
    pub distance: f64,
}

impl PathResult {
    /// The "no path known" result.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            path: Vec::new(),
            distance: f64::INFINITY,
        }
    }

    /// Whether a path was found.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.distance.is_finite()
    }
}

/// Find a minimum-weight path between two nodes of a [`Graph`].
///
/// Implementations must reject negative weights and must report an
/// unreachable destination as [`PathResult::unreachable`] rather than an
/// error. Path finders must be `Send + Sync` so solves can proceed on
/// independent workers.
pub trait PathFind: Send + Sync {
    /// Shortest path from `start` to `end`.
    fn shortest_path(&self, graph: &Graph, start: &str, end: &str)
        -> Result<PathResult, GraphError>;

    /// Shortest paths for every ordered pair of `nodes`.
    fn all_pairs(
        &self,
        graph: &Graph,
        nodes: &[String],
    ) -> Result<BTreeMap<(String, String), PathResult>, GraphError> {
        let mut results = BTreeMap::new();
        for start in nodes {
            for end in nodes {
                let result = if start == end {
                    PathResult {
                        path: vec![start.clone()],
                        distance: 0.0,
                    }
                } else {
                    self.shortest_path(graph, start, end)?
                };
                results.insert((start.clone(), end.clone()), result);
            }
        }
        Ok(results)
    }
}

/// Label-setting shortest path with a binary heap keyed by tentative
/// distance; ties resolve in enqueue order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraPathFinder;

/// Heap entry ordered by distance, then enqueue sequence.
///
/// `BinaryHeap` is a max-heap, so `Ord` is reversed to pop the smallest
/// tentative distance first.
struct QueueEntry {
    distance: f64,
    sequence: u64,
    node: String,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PathFind for DijkstraPathFinder {
    fn shortest_path(
        &self,
        graph: &Graph,
        start: &str,
        end: &str,
    ) -> Result<PathResult, GraphError> {
        for (from, to, weight) in graph.edges() {
            if weight < 0.0 {
                return Err(GraphError::NegativeWeight {
                    from: from.to_owned(),
                    to: to.to_owned(),
                    weight,
                });
            }
        }

        if !graph.contains(start) || !graph.contains(end) {
            log::warn!("start {start:?} or end {end:?} not in graph");
            return Ok(PathResult::unreachable());
        }

        let mut heap = BinaryHeap::new();
        let mut sequence = 0_u64;
        let mut best: HashMap<&str, f64> = HashMap::new();
        let mut previous: HashMap<&str, &str> = HashMap::new();

        best.insert(start, 0.0);
        heap.push(QueueEntry {
            distance: 0.0,
            sequence,
            node: start.to_owned(),
        });

        while let Some(QueueEntry { distance, node, .. }) = heap.pop() {
            let Some((settled, _)) = graph.adjacency.get_key_value(node.as_str()) else {
                continue;
            };
            if distance > best.get(settled.as_str()).copied().unwrap_or(f64::INFINITY) {
                continue;
            }
            if settled.as_str() == end {
                return Ok(PathResult {
                    path: rebuild_path(&previous, start, end),
                    distance,
                });
            }
            if let Some(neighbours) = graph.neighbours(settled) {
                for (neighbour, weight) in neighbours {
                    let tentative = distance + weight;
                    if tentative < best.get(neighbour.as_str()).copied().unwrap_or(f64::INFINITY)
                    {
                        best.insert(neighbour.as_str(), tentative);
                        previous.insert(neighbour.as_str(), settled.as_str());
                        sequence += 1;
                        heap.push(QueueEntry {
                            distance: tentative,
                            sequence,
                            node: neighbour.clone(),
                        });
                    }
                }
            }
        }

        log::warn!("no path found from {start:?} to {end:?}");
        Ok(PathResult::unreachable())
    }
}

fn rebuild_path(previous: &HashMap<&str, &str>, start: &str, end: &str) -> Vec<String> {
    let mut path = vec![end.to_owned()];
    let mut current = end;
    while current != start {
        match previous.get(current) {
            Some(&parent) => {
                path.push(parent.to_owned());
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
