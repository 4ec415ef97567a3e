//! Global candidate search over discrete boundary points.
//!
//! The sweep refinement is a local method: large, concentric, or revisited
//! cylinders can trap it in the wrong basin. Two global passes provide
//! escape hatches. An exact dynamic program runs over a fixed azimuth grid
//! of boundary candidates per cylinder, and a beam search re-derives its
//! candidate contacts from each surviving partial route the way the sweep
//! does. Both winners are polished afterwards by the caller.

use std::cmp::Ordering;

use tracing::debug;

use crate::cylinder::{Cylinder, Role};
use crate::error::Result;
use crate::geodesic::{self, LatLon};
use crate::optimizer::pcp_contact;
use crate::route::COORD_TOLERANCE_DEG;

/// Cylinders below this radius are represented by their center during the
/// global passes; polishing recovers the boundary afterwards.
pub(crate) const MIN_CANDIDATE_RADIUS_M: f64 = 50.0;

const DEFAULT_CANDIDATES: usize = 36;
const SMALL_TASK_CANDIDATES: usize = 72;
const SMALL_TASK_LEN: usize = 10;

/// Number of boundary candidates per cylinder: the caller's override, or an
/// automatic choice that spends more on short tasks.
pub(crate) fn candidate_count(n_cylinders: usize, requested: Option<usize>) -> usize {
    match requested {
        Some(m) if m >= 2 => m,
        _ => {
            if n_cylinders <= SMALL_TASK_LEN {
                SMALL_TASK_CANDIDATES
            } else {
                DEFAULT_CANDIDATES
            }
        }
    }
}

/// First turnpoint center after `index` that differs from `center`.
fn next_distinct_center(cylinders: &[Cylinder], index: usize, center: LatLon) -> Option<LatLon> {
    cylinders[index + 1..]
        .iter()
        .map(|c| c.center)
        .find(|c| !c.close_to(&center, COORD_TOLERANCE_DEG))
}

/// Candidate contacts for one DP stage.
///
/// Endpoints collapse to a single state (snapped takeoff, goal center);
/// start-exit cylinders only offer the half of the boundary facing the next
/// distinct turnpoint.
fn stage_candidates(
    cylinders: &[Cylinder],
    index: usize,
    per_cylinder: usize,
    start_snapped: bool,
) -> Result<Vec<LatLon>> {
    let cyl = &cylinders[index];
    let n = cylinders.len();

    if index == n - 1 || cyl.radius_m < MIN_CANDIDATE_RADIUS_M {
        return Ok(vec![cyl.center]);
    }
    if index == 0 && start_snapped {
        return Ok(vec![cyl.center]);
    }

    let mut points = Vec::with_capacity(per_cylinder);
    for k in 0..per_cylinder {
        let azimuth = 360.0 * k as f64 / per_cylinder as f64;
        points.push(cyl.boundary_point(azimuth)?);
    }

    if cyl.role == Role::SssExit {
        if let Some(target) = next_distinct_center(cylinders, index, cyl.center) {
            let reference = geodesic::distance(cyl.center, target)?;
            let mut facing = Vec::with_capacity(points.len() / 2 + 1);
            for p in &points {
                if geodesic::distance(*p, target)? <= reference {
                    facing.push(*p);
                }
            }
            if !facing.is_empty() {
                return Ok(facing);
            }
        }
    }

    Ok(points)
}

/// Exact dynamic program over the candidate grid: stages are cylinders,
/// states are candidate contacts, transition cost is the geodesic leg.
pub(crate) fn dp_route(
    cylinders: &[Cylinder],
    per_cylinder: usize,
    start_snapped: bool,
) -> Result<Vec<LatLon>> {
    let n = cylinders.len();
    let mut stages = Vec::with_capacity(n);
    for i in 0..n {
        stages.push(stage_candidates(cylinders, i, per_cylinder, start_snapped)?);
    }

    let mut best: Vec<f64> = vec![0.0; stages[0].len()];
    let mut parents: Vec<Vec<usize>> = Vec::with_capacity(n);
    parents.push(Vec::new());

    for i in 1..n {
        let stage = &stages[i];
        let prev_stage = &stages[i - 1];
        let mut stage_best = vec![f64::INFINITY; stage.len()];
        let mut stage_parent = vec![0usize; stage.len()];
        for (j, q) in stage.iter().enumerate() {
            for (k, p) in prev_stage.iter().enumerate() {
                let total = best[k] + geodesic::distance(*p, *q)?;
                if total < stage_best[j] {
                    stage_best[j] = total;
                    stage_parent[j] = k;
                }
            }
        }
        best = stage_best;
        parents.push(stage_parent);
    }

    let (mut state, total) = best
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(j, d)| (j, *d))
        .unwrap_or((0, 0.0));
    debug!(total_m = total, "dp candidate route");

    let mut contacts = vec![stages[n - 1][state]; n];
    for i in (1..n).rev() {
        state = parents[i][state];
        contacts[i - 1] = stages[i - 1][state];
    }
    Ok(contacts)
}

#[derive(Debug, Clone)]
struct BeamState {
    path: Vec<LatLon>,
    total_m: f64,
}

/// Beam search in the manner of the grid-free optimizer: each surviving
/// partial route extends with the contact that is optimal between its own
/// tip and the center of the following turnpoint, and only the best
/// `beam_width` routes survive a stage.
pub(crate) fn beam_route(
    cylinders: &[Cylinder],
    beam_width: usize,
    per_cylinder: usize,
    start_snapped: bool,
) -> Result<Vec<LatLon>> {
    let n = cylinders.len();
    let beam_width = beam_width.max(1);

    let mut states: Vec<BeamState> = stage_candidates(cylinders, 0, per_cylinder, start_snapped)?
        .into_iter()
        .map(|p| BeamState {
            path: vec![p],
            total_m: 0.0,
        })
        .collect();

    for i in 1..n {
        let cyl = &cylinders[i];
        // Look one turnpoint ahead so the contact does not assume the route
        // ends here; the final stage aims back at its own tip.
        let lookahead = if i + 1 < n {
            cylinders[i + 1].center
        } else {
            cyl.center
        };

        let mut extended: Vec<BeamState> = Vec::with_capacity(states.len());
        for state in &states {
            let tip = *state.path.last().expect("beam paths are never empty");
            let contact = if i == n - 1 {
                cyl.nearest_contact(tip)?
            } else {
                pcp_contact(cyl, tip, lookahead)?
            };
            let mut path = state.path.clone();
            let total_m = state.total_m + geodesic::distance(tip, contact)?;
            path.push(contact);
            extended.push(BeamState { path, total_m });
        }

        // Identical tips are redundant; keep the cheaper prefix.
        extended.sort_by(|a, b| a.total_m.partial_cmp(&b.total_m).unwrap_or(Ordering::Equal));
        let mut pruned: Vec<BeamState> = Vec::with_capacity(beam_width);
        for state in extended {
            let tip = state.path.last().expect("non-empty");
            let duplicate = pruned.iter().any(|kept| {
                let kept_tip = kept.path.last().expect("non-empty");
                kept_tip.lat.to_bits() == tip.lat.to_bits()
                    && kept_tip.lon.to_bits() == tip.lon.to_bits()
            });
            if !duplicate {
                pruned.push(state);
            }
            if pruned.len() >= beam_width {
                break;
            }
        }
        states = pruned;
    }

    let winner = states
        .into_iter()
        .min_by(|a, b| a.total_m.partial_cmp(&b.total_m).unwrap_or(Ordering::Equal))
        .expect("at least one beam state survives");
    debug!(total_m = winner.total_m, "beam candidate route");
    Ok(winner.path)
}
