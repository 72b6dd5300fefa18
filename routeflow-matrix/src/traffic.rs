//! Traffic factors and their application to matrices.
//!
//! Requests carry traffic in one of two wire forms; both normalize to a
//! map from ordered matrix-index pairs to multiplicative factors. A
//! non-finite factor marks the segment as blocked, pinning its entry at
//! the distance sentinel so graph conversion drops the edge.

use std::collections::{BTreeMap, HashMap};

use routeflow_core::constants::{MAX_SAFE_DISTANCE, MAX_TRAFFIC_FACTOR, MIN_TRAFFIC_FACTOR};
use routeflow_core::SquareMatrix;
use serde::{Deserialize, Serialize};

/// Normalized traffic data: ordered index pair to factor.
pub type TrafficFactors = HashMap<(usize, usize), f64>;

/// One entry of the `location_pairs` wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPairFactor {
    /// Origin location ID.
    pub from: String,
    /// Destination location ID.
    pub to: String,
    /// Multiplicative slowdown; 1.0 is nominal.
    pub factor: f64,
}

/// Traffic data as accepted on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrafficData {
    /// `{ "location_pairs": [{"from", "to", "factor"}, ...] }`
    LocationPairs {
        /// Affected pairs with their factors.
        location_pairs: Vec<LocationPairFactor>,
    },
    /// `{ "segments": { "id_a:id_b": factor, ... } }`
    Segments {
        /// Affected `from:to` keys with their factors.
        segments: BTreeMap<String, f64>,
    },
}

impl TrafficData {
    /// Traffic data with no affected segments.
    #[must_use]
    pub fn empty() -> Self {
        Self::LocationPairs {
            location_pairs: Vec::new(),
        }
    }

    /// Builds the `segments` form from `(from, to) -> factor` pairs.
    pub fn from_segments<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = ((String, String), f64)>,
    {
        Self::Segments {
            segments: pairs
                .into_iter()
                .map(|((from, to), factor)| (format!("{from}:{to}"), factor))
                .collect(),
        }
    }

    /// Number of affected segments.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::LocationPairs { location_pairs } => location_pairs.len(),
            Self::Segments { segments } => segments.len(),
        }
    }

    /// Whether no segments are affected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves location IDs against the matrix ordering, dropping (and
    /// logging) entries that reference unknown IDs.
    #[must_use]
    pub fn normalize(&self, location_ids: &[String]) -> TrafficFactors {
        let index: HashMap<&str, usize> = location_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut factors = TrafficFactors::new();
        let mut insert = |from: &str, to: &str, factor: f64| {
            match (index.get(from), index.get(to)) {
                (Some(&i), Some(&j)) => {
                    factors.insert((i, j), factor);
                }
                _ => log::warn!("traffic entry references unknown location {from:?} or {to:?}"),
            }
        };

        match self {
            Self::LocationPairs { location_pairs } => {
                for pair in location_pairs {
                    insert(&pair.from, &pair.to, pair.factor);
                }
            }
            Self::Segments { segments } => {
                for (key, &factor) in segments {
                    match key.split_once(':') {
                        Some((from, to)) => insert(from, to, factor),
                        None => log::warn!("malformed traffic segment key {key:?}"),
                    }
                }
            }
        }
        factors
    }
}

/// Returns a copy of `matrix` with `factors` applied.
///
/// Finite factors are clamped to `[MIN_TRAFFIC_FACTOR,
/// MAX_TRAFFIC_FACTOR]` before multiplying, so traffic never makes travel
/// faster than nominal and no single segment dominates. Non-finite
/// factors pin the entry at [`MAX_SAFE_DISTANCE`], the roadblock
/// encoding. Products above the sentinel are capped at it. Out-of-range
/// index pairs are logged and skipped. The input matrix is not mutated.
#[must_use]
pub fn apply_traffic(matrix: &SquareMatrix, factors: &TrafficFactors) -> SquareMatrix {
    let mut adjusted = matrix.clone();
    for (&(row, col), &factor) in factors {
        if row >= matrix.size() || col >= matrix.size() {
            log::warn!("traffic factor for ({row}, {col}) is outside the matrix");
            continue;
        }
        let value = if factor.is_finite() {
            let clamped = factor.clamp(MIN_TRAFFIC_FACTOR, MAX_TRAFFIC_FACTOR);
            (matrix.get(row, col) * clamped).min(MAX_SAFE_DISTANCE)
        } else {
            MAX_SAFE_DISTANCE
        };
        adjusted.set(row, col, value);
    }
    adjusted
}
