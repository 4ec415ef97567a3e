//! Engine façade: validates a task, runs the optimization pipeline, and
//! reports center and optimized distances with the contact polyline.
//!
//! Pipeline: seed contacts, sweep-refine them, then run the two global
//! candidate searches and polish each result the same way; the shortest
//! polished route wins. Every step is deterministic, so a task and a config
//! always reproduce the same output.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cylinder::{Cylinder, BOUNDARY_EPSILON_M};
use crate::error::Result;
use crate::geodesic::{self, LatLon};
use crate::models::Task;
use crate::optimizer::{
    polyline_length_m, refine, seed_contacts, start_is_snapped, Refined,
};
use crate::route::Route;
use crate::search::{beam_route, candidate_count, dp_route};

/// Tuning knobs for the optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Cap on refinement sweeps per polish phase.
    pub max_iter: u32,
    /// Convergence threshold on the total length, meters.
    pub tol_m: f64,
    /// Boundary candidates per cylinder for the global search; `None` picks
    /// automatically (more candidates on short tasks).
    pub candidates: Option<usize>,
    /// Partial routes kept per stage in the beam search.
    pub beam_width: usize,
    /// Takeoff radius at or below which the route starts at the takeoff
    /// center instead of its boundary.
    pub takeoff_snap_m: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol_m: 0.001,
            candidates: None,
            beam_width: 8,
            takeoff_snap_m: 1000.0,
        }
    }
}

/// Per-turnpoint progress along the optimized route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnpointProgress {
    pub index: usize,
    pub name: String,
    pub center: LatLon,
    pub radius_m: f64,
    /// Cumulative distance through the centers up to this turnpoint.
    pub cumulative_center_m: f64,
    /// Cumulative distance along the optimized contacts up to this turnpoint.
    pub cumulative_optimized_m: f64,
}

/// Result of optimizing one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// One contact per turnpoint, on or inside its cylinder.
    pub contacts: Vec<LatLon>,
    pub center_distance_m: f64,
    pub optimized_distance_m: f64,
    /// Refinement sweeps spent on the winning route.
    pub iterations: u32,
    pub converged: bool,
    pub savings_m: f64,
    pub savings_percent: f64,
    pub turnpoints: Vec<TurnpointProgress>,
}

/// Compute center and optimized distances for a validated task.
pub fn optimize_task(task: &Task, config: &OptimizerConfig) -> Result<OptimizationResult> {
    let route = Route::from_task(task)?;
    optimize_route(task, &route, config)
}

fn optimize_route(
    task: &Task,
    route: &Route,
    config: &OptimizerConfig,
) -> Result<OptimizationResult> {
    let cylinders = route.cylinders();
    let n = cylinders.len();
    let center_distance_m = route.center_distance_m()?;

    if route.is_degenerate() {
        debug!("all turnpoints share one center; returning zero-length route");
        let contacts: Vec<LatLon> = cylinders.iter().map(|c| c.center).collect();
        return build_result(task, route, center_distance_m, contacts, 0, true);
    }

    let start_snapped = start_is_snapped(cylinders, config.takeoff_snap_m);
    let per_cylinder = candidate_count(n, config.candidates);

    // Local pass from the seeded contacts.
    let seeded = seed_contacts(cylinders, config.takeoff_snap_m)?;
    let mut best = refine(
        cylinders,
        seeded,
        start_snapped,
        config.max_iter,
        config.tol_m,
    )?;

    // Global passes, each polished by the same sweeps.
    let dp = dp_route(cylinders, per_cylinder, start_snapped)?;
    let dp_polished = refine(cylinders, dp, start_snapped, config.max_iter, config.tol_m)?;
    if dp_polished.length_m < best.length_m {
        best = dp_polished;
    }

    let beam = beam_route(cylinders, config.beam_width, per_cylinder, start_snapped)?;
    let beam_polished = refine(
        cylinders,
        beam,
        start_snapped,
        config.max_iter,
        config.tol_m,
    )?;
    if beam_polished.length_m < best.length_m {
        best = beam_polished;
    }

    // The center polyline is always admissible, so the optimized distance
    // can never exceed the center distance.
    let centers: Vec<LatLon> = cylinders.iter().map(|c| c.center).collect();
    let center_polyline_m = polyline_length_m(&centers)?;
    if center_polyline_m < best.length_m {
        best = Refined {
            contacts: centers,
            length_m: center_polyline_m,
            sweeps: 0,
            converged: true,
        };
    }

    let Refined {
        mut contacts,
        sweeps,
        converged,
        ..
    } = best;
    clamp_to_cylinders(cylinders, &mut contacts)?;

    build_result(task, route, center_distance_m, contacts, sweeps, converged)
}

/// Numerical noise can leave a contact a hair outside its boundary; pull any
/// such point back onto the cylinder.
fn clamp_to_cylinders(cylinders: &[Cylinder], contacts: &mut [LatLon]) -> Result<()> {
    for (cyl, contact) in cylinders.iter().zip(contacts.iter_mut()) {
        if cyl.signed_distance(*contact)? > BOUNDARY_EPSILON_M / 2.0 {
            *contact = cyl.project_on_boundary(*contact)?;
        }
    }
    Ok(())
}

fn build_result(
    task: &Task,
    route: &Route,
    center_distance_m: f64,
    contacts: Vec<LatLon>,
    iterations: u32,
    converged: bool,
) -> Result<OptimizationResult> {
    let optimized_distance_m = polyline_length_m(&contacts)?;
    let savings_m = center_distance_m - optimized_distance_m;
    let savings_percent = if center_distance_m > 0.0 {
        savings_m / center_distance_m * 100.0
    } else {
        0.0
    };

    let cumulative_center = route.cumulative_center_m()?;
    let mut turnpoints = Vec::with_capacity(contacts.len());
    let mut cumulative_optimized = 0.0;
    for (i, (tp, cyl)) in task
        .turnpoints
        .iter()
        .zip(route.cylinders().iter())
        .enumerate()
    {
        if i > 0 {
            cumulative_optimized += geodesic::distance(contacts[i - 1], contacts[i])?;
        }
        turnpoints.push(TurnpointProgress {
            index: i,
            name: tp.waypoint.name.clone(),
            center: cyl.center,
            radius_m: cyl.radius_m,
            cumulative_center_m: cumulative_center[i],
            cumulative_optimized_m: cumulative_optimized,
        });
    }

    Ok(OptimizationResult {
        contacts,
        center_distance_m,
        optimized_distance_m,
        iterations,
        converged,
        savings_m,
        savings_percent,
        turnpoints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskType, Turnpoint, TurnpointType, Waypoint};

    fn turnpoint(lat: f64, lon: f64, radius: f64, kind: Option<TurnpointType>) -> Turnpoint {
        Turnpoint {
            radius,
            waypoint: Waypoint {
                name: String::new(),
                lat,
                lon,
                alt_smoothed: 0,
                description: None,
            },
            kind,
        }
    }

    fn task(turnpoints: Vec<Turnpoint>) -> Task {
        Task {
            task_type: TaskType::Classic,
            version: 1,
            turnpoints,
            earth_model: None,
            takeoff: None,
            sss: None,
            goal: None,
        }
    }

    #[test]
    fn test_snapped_takeoff_starts_at_center() {
        let t = task(vec![
            turnpoint(46.5, 8.0, 1000.0, Some(TurnpointType::Takeoff)),
            turnpoint(46.6, 8.1, 1000.0, None),
        ]);
        let result = optimize_task(&t, &OptimizerConfig::default()).unwrap();
        assert_eq!(result.contacts[0], LatLon::new(46.5, 8.0));
    }

    #[test]
    fn test_lowered_snap_moves_takeoff_contact_to_boundary() {
        let t = task(vec![
            turnpoint(46.5, 8.0, 1000.0, Some(TurnpointType::Takeoff)),
            turnpoint(46.6, 8.1, 1000.0, None),
        ]);
        let config = OptimizerConfig {
            takeoff_snap_m: 500.0,
            ..OptimizerConfig::default()
        };
        let result = optimize_task(&t, &config).unwrap();
        let takeoff_center = LatLon::new(46.5, 8.0);
        let d = geodesic::distance(result.contacts[0], takeoff_center).unwrap();
        assert!((d - 1000.0).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_progress_rows_cover_every_turnpoint() {
        let t = task(vec![
            turnpoint(0.0, 0.0, 0.0, None),
            turnpoint(0.0, 1.0, 500.0, None),
            turnpoint(0.0, 2.0, 100.0, None),
        ]);
        let result = optimize_task(&t, &OptimizerConfig::default()).unwrap();
        assert_eq!(result.turnpoints.len(), 3);
        assert_eq!(result.turnpoints[0].cumulative_optimized_m, 0.0);
        let last = result.turnpoints.last().unwrap();
        assert!((last.cumulative_optimized_m - result.optimized_distance_m).abs() < 1e-6);
        assert!((last.cumulative_center_m - result.center_distance_m).abs() < 1e-6);
    }

    #[test]
    fn test_savings_accounting() {
        let t = task(vec![
            turnpoint(46.5, 8.0, 1000.0, Some(TurnpointType::Takeoff)),
            turnpoint(46.6, 8.1, 1000.0, None),
        ]);
        let result = optimize_task(&t, &OptimizerConfig::default()).unwrap();
        assert!(
            (result.savings_m - (result.center_distance_m - result.optimized_distance_m)).abs()
                < 1e-9
        );
        assert!(result.savings_percent > 0.0);
    }
}
