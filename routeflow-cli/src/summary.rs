//! Human-readable rendering of a solution.

use std::fmt::Write;

use routeflow_core::Solution;

/// Renders minutes from the epoch as `HH:MM`, wrapping at midnight.
#[must_use]
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.round().max(0.0) as u64;
    let hours = (total / 60) % 24;
    let minutes = total % 60;
    format!("{hours:02}:{minutes:02}")
}

/// Renders a stop sequence as `a -> b -> c`.
#[must_use]
pub fn format_route(stops: &[String]) -> String {
    stops.join(" -> ")
}

/// A compact multi-line summary of routes, arrivals, and totals.
#[must_use]
pub fn render_summary(solution: &Solution) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "status: {:?}", solution.status);
    for route in &solution.detailed_routes {
        let _ = write!(out, "{}: {}", route.vehicle_id, format_route(&route.stops));
        if !route.estimated_arrival_times.is_empty() {
            let arrivals: Vec<String> = route
                .estimated_arrival_times
                .iter()
                .map(|&minutes| format_minutes(minutes))
                .collect();
            let _ = write!(out, " (arrivals {})", arrivals.join(", "));
        }
        let _ = writeln!(out, " [{:.2} km]", route.total_distance);
    }
    if !solution.unassigned_deliveries.is_empty() {
        let _ = writeln!(
            out,
            "unassigned: {}",
            solution.unassigned_deliveries.join(", ")
        );
    }
    let _ = writeln!(
        out,
        "total: {:.2} km, cost {:.2}",
        solution.total_distance, solution.total_cost
    );
    out
}
