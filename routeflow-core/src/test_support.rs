//! Reusable fixtures for tests across the workspace.

use std::time::Duration;

use crate::matrix::SquareMatrix;
use crate::types::{Delivery, Location, Vehicle};

/// Default search budget for test solves.
#[must_use]
pub fn test_time_limit() -> Duration {
    Duration::from_millis(200)
}

/// A depot at the given coordinates.
///
/// # Panics
///
/// Panics on out-of-range coordinates; fixtures use literals.
#[must_use]
pub fn depot(id: &str, latitude: f64, longitude: f64) -> Location {
    Location::new(id, latitude, longitude)
        .expect("fixture coordinates are valid")
        .as_depot()
}

/// A customer location at the given coordinates.
///
/// # Panics
///
/// Panics on out-of-range coordinates; fixtures use literals.
#[must_use]
pub fn customer(id: &str, latitude: f64, longitude: f64) -> Location {
    Location::new(id, latitude, longitude).expect("fixture coordinates are valid")
}

/// A vehicle starting and ending at `start`.
#[must_use]
pub fn vehicle(id: &str, capacity: u32, start: &str) -> Vehicle {
    Vehicle::new(id, capacity, start)
}

/// A delivery of `demand` units at `location`.
#[must_use]
pub fn delivery(id: &str, location: &str, demand: u32) -> Delivery {
    Delivery::new(id, location, demand)
}

/// A matrix with `value` everywhere off the diagonal.
#[must_use]
pub fn uniform_matrix(size: usize, value: f64) -> SquareMatrix {
    let mut matrix = SquareMatrix::zeros(size);
    for row in 0..size {
        for col in 0..size {
            if row != col {
                matrix.set(row, col, value);
            }
        }
    }
    matrix
}
