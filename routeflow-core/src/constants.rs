//! Shared numeric constants for matrix handling and solver scaling.

/// Large finite sentinel standing in for "no usable edge" (kilometres).
///
/// Sanitization replaces non-finite, negative, or missing matrix entries
/// with this value, and graph conversion drops edges carrying it.
pub const MAX_SAFE_DISTANCE: f64 = 1.0e7;

/// Multiplier converting kilometres to solver distance units (10 m steps).
pub const DISTANCE_SCALING_FACTOR: f64 = 100.0;

/// Multiplier converting minutes to solver time units (0.6 s steps).
pub const TIME_SCALING_FACTOR: f64 = 100.0;

/// Multiplier converting demand to solver capacity units.
pub const CAPACITY_SCALING_FACTOR: f64 = 1.0;

/// Coefficient penalising the spread between the most- and least-loaded
/// vehicle on the cost-driving dimension.
pub const COST_COEFFICIENT_FOR_LOAD_BALANCE: i64 = 100;

/// Upper bound on a single route's length when the vehicle declares none
/// (kilometres, unscaled).
pub const MAX_ROUTE_DISTANCE_UNSCALED: f64 = 10_000.0;

/// Upper bound on a single route's duration (minutes, unscaled).
pub const MAX_ROUTE_DURATION_UNSCALED: f64 = 1_440.0;

/// Base drop penalty per priority point, in scaled distance units.
pub const DISJUNCTION_PENALTY_BASE: i64 = 1_000_000;

/// Traffic factors below this are treated as nominal conditions.
pub const MIN_TRAFFIC_FACTOR: f64 = 1.0;

/// Traffic factors above this are capped so one segment cannot dominate.
pub const MAX_TRAFFIC_FACTOR: f64 = 5.0;

/// Nominal vehicle speed used to derive travel times from distances when
/// no provider time matrix is available (km/h).
pub const DEFAULT_SPEED_KMH: f64 = 50.0;

/// Service time assumed at a stop when the location does not specify one
/// (minutes).
pub const DEFAULT_SERVICE_TIME_MINUTES: f64 = 15.0;
