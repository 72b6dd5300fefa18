//! Rerouting policies exercised end to end.

use routeflow_core::test_support::{customer, delivery, depot, vehicle};
use routeflow_core::{EngineConfig, RerouteReason, Solution, SolutionStatus};
use routeflow_engine::{OptimizeRequest, Optimizer, RerouteContext, Rerouter};
use routeflow_matrix::{LocationPairFactor, TrafficData};
use rstest::{fixture, rstest};

fn testing_optimizer() -> Optimizer {
    Optimizer::new(EngineConfig::default().for_testing())
}

fn solve_initial(optimizer: &Optimizer) -> (OptimizeRequest, Solution) {
    let mut request = OptimizeRequest::new(
        vec![
            depot("depot", 0.0, 0.0),
            customer("a", 0.0, 1.0),
            customer("b", 0.0, 2.0),
        ],
        vec![vehicle("v1", 10, "depot"), vehicle("v2", 10, "depot")],
        vec![delivery("p1", "a", 2), delivery("p2", "b", 2)],
    );
    request.time_limit_seconds = 0;
    let solution = optimizer.optimize(&request).unwrap();
    assert_eq!(solution.status, SolutionStatus::Success);
    (request, solution)
}

#[fixture]
fn context() -> (Optimizer, RerouteContext) {
    let optimizer = testing_optimizer();
    let (request, solution) = solve_initial(&optimizer);
    let context = RerouteContext {
        current_solution: solution,
        locations: request.locations,
        vehicles: request.vehicles,
        original_deliveries: request.deliveries,
        completed_delivery_ids: Vec::new(),
        use_api: None,
        time_limit_seconds: 0,
    };
    (optimizer, context)
}

#[rstest]
fn traffic_reroute_attaches_rerouting_info(context: (Optimizer, RerouteContext)) {
    let (optimizer, mut context) = context;
    context.completed_delivery_ids = vec!["p1".to_owned()];
    let traffic = TrafficData::LocationPairs {
        location_pairs: vec![LocationPairFactor {
            from: "depot".into(),
            to: "b".into(),
            factor: 2.0,
        }],
    };

    let rerouter = Rerouter::new(&optimizer);
    let solution = rerouter.reroute_for_traffic(&context, &traffic).unwrap();

    assert_eq!(solution.status, SolutionStatus::Success);
    let info = solution.statistics.rerouting_info.as_ref().unwrap();
    assert_eq!(info.reason, RerouteReason::Traffic);
    assert_eq!(info.completed_delivery_count, 1);
    assert_eq!(info.rerouted_delivery_count, 1);
    assert_eq!(info.traffic_factor_count, Some(1));
    assert_eq!(
        info.original_total_distance,
        context.current_solution.total_distance
    );

    // Only the remaining delivery is planned, and the vehicle resumes
    // from its last completed stop.
    assert!(solution.unassigned_deliveries.is_empty());
    let route = &solution.routes[solution.assigned_vehicles["v1"]];
    assert_eq!(route.first().map(String::as_str), Some("a"));
    assert!(route.iter().any(|stop| stop == "b"));
}

#[rstest]
fn delay_reroute_forces_time_windows(context: (Optimizer, RerouteContext)) {
    let (optimizer, context) = context;

    let rerouter = Rerouter::new(&optimizer);
    let solution = rerouter
        .reroute_for_delay(&context, &["a".to_owned()], 30.0)
        .unwrap();

    assert_eq!(solution.status, SolutionStatus::Success);
    let info = solution.statistics.rerouting_info.as_ref().unwrap();
    assert_eq!(info.reason, RerouteReason::ServiceDelay);
    assert_eq!(info.delay_minutes, Some(30.0));
    assert_eq!(info.delayed_location_ids, vec!["a"]);

    // A time-window solve reports arrival estimates.
    assert!(solution
        .detailed_routes
        .iter()
        .all(|route| !route.estimated_arrival_times.is_empty()));
}

#[rstest]
fn roadblock_reroute_avoids_the_blocked_edge(context: (Optimizer, RerouteContext)) {
    let (optimizer, context) = context;
    let blocked = vec![
        ("a".to_owned(), "b".to_owned()),
        ("b".to_owned(), "a".to_owned()),
    ];

    let rerouter = Rerouter::new(&optimizer);
    let solution = rerouter.reroute_for_roadblock(&context, &blocked).unwrap();

    assert_eq!(solution.status, SolutionStatus::Success);
    let info = solution.statistics.rerouting_info.as_ref().unwrap();
    assert_eq!(info.reason, RerouteReason::Roadblock);
    assert_eq!(info.blocked_segments.len(), 2);

    // No expanded path may traverse the blocked edge directly, in
    // either direction.
    for route in &solution.detailed_routes {
        for segment in &route.segments {
            for hop in segment.path.windows(2) {
                let direct_block = (hop[0] == "a" && hop[1] == "b")
                    || (hop[0] == "b" && hop[1] == "a");
                assert!(!direct_block, "blocked edge used in {:?}", segment.path);
            }
        }
    }
    // Both deliveries remain served: the vehicles split the customers.
    assert!(solution.unassigned_deliveries.is_empty());
}

#[rstest]
fn completed_deliveries_shrink_the_plan(context: (Optimizer, RerouteContext)) {
    let (optimizer, mut context) = context;
    context.completed_delivery_ids = vec!["p1".to_owned(), "p2".to_owned()];

    let rerouter = Rerouter::new(&optimizer);
    let solution = rerouter
        .reroute_for_traffic(&context, &TrafficData::empty())
        .unwrap();

    // Nothing left to deliver: trivial depot routes.
    assert_eq!(solution.status, SolutionStatus::Success);
    assert_eq!(solution.total_distance, 0.0);
    let info = solution.statistics.rerouting_info.as_ref().unwrap();
    assert_eq!(info.rerouted_delivery_count, 0);
}