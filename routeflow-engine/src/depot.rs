//! Depot selection.

use routeflow_core::Location;

/// Returns the first location flagged as a depot together with its
/// matrix index, falling back to the first location when none is
/// flagged. `None` only for an empty slice.
#[must_use]
pub fn resolve_depot(locations: &[Location]) -> Option<(&Location, usize)> {
    locations
        .iter()
        .enumerate()
        .find(|(_, location)| location.is_depot)
        .map(|(index, location)| (location, index))
        .or_else(|| locations.first().map(|location| (location, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeflow_core::test_support::{customer, depot};
    use rstest::rstest;

    #[rstest]
    fn picks_first_flagged_depot() {
        let locations = vec![
            customer("a", 0.0, 0.0),
            depot("hub1", 1.0, 1.0),
            depot("hub2", 2.0, 2.0),
        ];
        let (location, index) = resolve_depot(&locations).unwrap();
        assert_eq!(location.id, "hub1");
        assert_eq!(index, 1);
    }

    #[rstest]
    fn falls_back_to_first_location() {
        let locations = vec![customer("a", 0.0, 0.0), customer("b", 1.0, 1.0)];
        let (location, index) = resolve_depot(&locations).unwrap();
        assert_eq!(location.id, "a");
        assert_eq!(index, 0);
    }

    #[rstest]
    fn empty_input_has_no_depot() {
        assert!(resolve_depot(&[]).is_none());
    }
}
