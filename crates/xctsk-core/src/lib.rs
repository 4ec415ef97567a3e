//! XCTSK Core - Route geometry and distance optimization for XCTrack
//! competition tasks.
//!
//! This crate contains the task model and the geodesic route-optimization
//! engine with NO parsing, networking, or rendering dependencies. Consumers
//! hand it a validated task and get back the center distance, the optimized
//! distance, and the contact polyline.

pub mod cylinder;
pub mod engine;
pub mod error;
pub mod geodesic;
pub mod models;
mod optimizer;
pub mod route;
mod search;

pub use cylinder::{boundary_intersection, goal_line_endpoints, Cylinder, Role};
pub use engine::{optimize_task, OptimizationResult, OptimizerConfig, TurnpointProgress};
pub use error::{Result, TaskError};
pub use geodesic::LatLon;
pub use models::{
    EarthModel, Goal, GoalType, Sss, SssDirection, SssType, Takeoff, Task, TaskType, TimeOfDay,
    Turnpoint, TurnpointType, Waypoint,
};
pub use route::Route;
