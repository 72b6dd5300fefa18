//! Replacement of numerically invalid matrix entries.

use routeflow_core::constants::MAX_SAFE_DISTANCE;
use routeflow_core::SquareMatrix;

/// Returns a copy of `matrix` with every entry made safe for the solver:
///
/// 1. non-finite entries become [`MAX_SAFE_DISTANCE`];
/// 2. negative entries become 0 on the diagonal, the sentinel elsewhere;
/// 3. entries above the sentinel are capped at it;
/// 4. the diagonal is forced to 0.
///
/// Applying the function twice yields the same matrix.
#[must_use]
pub fn sanitize_matrix(matrix: &SquareMatrix) -> SquareMatrix {
    let size = matrix.size();
    let mut sanitized = SquareMatrix::zeros(size);
    for (row, col, value) in matrix.entries() {
        let safe = if row == col {
            0.0
        } else if !value.is_finite() || value < 0.0 || value > MAX_SAFE_DISTANCE {
            MAX_SAFE_DISTANCE
        } else {
            value
        };
        sanitized.set(row, col, safe);
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn replaces_invalid_entries() {
        let matrix = SquareMatrix::from_rows(vec![
            vec![0.0, 1.0, f64::INFINITY, -3.0],
            vec![1.0, -0.5, f64::NAN, 5.0],
            vec![f64::NEG_INFINITY, 2.0, 0.0, MAX_SAFE_DISTANCE * 2.0],
            vec![4.0, 5.0, 6.0, 7.0],
        ])
        .unwrap();

        let sanitized = sanitize_matrix(&matrix);

        assert_eq!(sanitized.get(0, 2), MAX_SAFE_DISTANCE);
        assert_eq!(sanitized.get(0, 3), MAX_SAFE_DISTANCE);
        assert_eq!(sanitized.get(1, 2), MAX_SAFE_DISTANCE);
        assert_eq!(sanitized.get(2, 0), MAX_SAFE_DISTANCE);
        assert_eq!(sanitized.get(2, 3), MAX_SAFE_DISTANCE);
        // Negative diagonal entries become zero, as do non-zero ones.
        assert_eq!(sanitized.get(1, 1), 0.0);
        assert_eq!(sanitized.get(3, 3), 0.0);
        // Valid entries pass through.
        assert_eq!(sanitized.get(0, 1), 1.0);
        assert_eq!(sanitized.get(1, 3), 5.0);
    }

    proptest! {
        #[test]
        fn output_is_always_safe(rows in proptest::collection::vec(
            proptest::collection::vec(proptest::num::f64::ANY, 4), 4,
        )) {
            let matrix = SquareMatrix::from_rows(rows).unwrap();
            let sanitized = sanitize_matrix(&matrix);
            for (row, col, value) in sanitized.entries() {
                prop_assert!(value.is_finite());
                prop_assert!(value >= 0.0);
                prop_assert!(value <= MAX_SAFE_DISTANCE);
                if row == col {
                    prop_assert_eq!(value, 0.0);
                }
            }
        }

        #[test]
        fn sanitize_is_idempotent(rows in proptest::collection::vec(
            proptest::collection::vec(proptest::num::f64::ANY, 3), 3,
        )) {
            let matrix = SquareMatrix::from_rows(rows).unwrap();
            let once = sanitize_matrix(&matrix);
            let twice = sanitize_matrix(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
