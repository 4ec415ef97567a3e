//! Turnpoint cylinder geometry: signed distance, boundary projection, and
//! intersection of a geodesic with the cylinder boundary.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geodesic::{self, LatLon};

/// Containment tolerance for contact points, in meters.
pub const BOUNDARY_EPSILON_M: f64 = 0.05;

/// Classification of a cylinder within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Takeoff,
    SssEnter,
    SssExit,
    Regular,
    Ess,
    Goal,
    GoalLine,
}

/// A turnpoint cylinder: a WGS84 center and a geodesic radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub center: LatLon,
    pub radius_m: f64,
    pub role: Role,
}

impl Cylinder {
    pub fn new(center: LatLon, radius_m: f64, role: Role) -> Self {
        Self {
            center,
            radius_m,
            role,
        }
    }

    /// Geodesic distance from `point` to the boundary; negative inside.
    pub fn signed_distance(&self, point: LatLon) -> Result<f64> {
        Ok(geodesic::distance(self.center, point)? - self.radius_m)
    }

    /// Whether `point` lies on or inside the cylinder (within tolerance).
    pub fn contains(&self, point: LatLon) -> Result<bool> {
        Ok(self.signed_distance(point)? <= BOUNDARY_EPSILON_M)
    }

    /// Boundary point at `azimuth_deg` from the center.
    pub fn boundary_point(&self, azimuth_deg: f64) -> Result<LatLon> {
        geodesic::offset(self.center, azimuth_deg, self.radius_m)
    }

    /// Closest point of the closed disk to `point`: the point itself when it
    /// already lies inside, else its boundary projection.
    pub fn nearest_contact(&self, point: LatLon) -> Result<LatLon> {
        if self.signed_distance(point)? <= 0.0 {
            Ok(point)
        } else {
            self.project_on_boundary(point)
        }
    }

    /// Project `point` onto the boundary along the center-to-point azimuth.
    ///
    /// A point at the center has no defined azimuth; the center itself is
    /// returned and the caller disambiguates.
    pub fn project_on_boundary(&self, point: LatLon) -> Result<LatLon> {
        if self.radius_m <= 0.0 {
            return Ok(self.center);
        }
        let solve = geodesic::inverse(self.center, point)?;
        if solve.distance_m <= f64::EPSILON {
            return Ok(self.center);
        }
        self.boundary_point(solve.azimuth_deg)
    }
}

/// Earliest point where the geodesic `a -> b` meets the boundary of `cyl`,
/// or `None` when the whole segment stays on one side.
///
/// The scan marches along the geodesic by the current boundary clearance.
/// The clearance can change by at most the arc length travelled, so a march
/// step can never jump over a crossing, whatever the leg length to radius
/// ratio; the first bracketing interval is then bisected down to
/// [`BOUNDARY_EPSILON_M`]. A start point already on or inside the cylinder
/// is its own earliest contact.
pub fn boundary_intersection(cyl: &Cylinder, a: LatLon, b: LatLon) -> Result<Option<LatLon>> {
    if cyl.radius_m <= 0.0 {
        return Ok(None);
    }
    let mut clearance = cyl.signed_distance(a)?;
    if clearance <= 0.0 {
        return Ok(Some(a));
    }

    let base = geodesic::inverse(a, b)?;
    let length = base.distance_m;
    if length <= f64::EPSILON {
        return Ok(None);
    }
    let point_at = |s: f64| geodesic::offset(a, base.azimuth_deg, s);

    // A floor on the step keeps grazing stretches, where the clearance stays
    // near zero without crossing, from stalling the march.
    let min_step = (cyl.radius_m / 64.0).max(BOUNDARY_EPSILON_M);

    let mut s_out = 0.0;
    let mut entry: Option<f64> = None;
    loop {
        let s_next = (s_out + clearance.max(min_step)).min(length);
        let d = cyl.signed_distance(point_at(s_next)?)?;
        if d <= 0.0 {
            entry = Some(s_next);
            break;
        }
        if s_next >= length {
            break;
        }
        s_out = s_next;
        clearance = d;
    }
    let Some(mut s_in) = entry else {
        return Ok(None);
    };

    // Bisect [s_out, s_in] down to the containment tolerance.
    while s_in - s_out > BOUNDARY_EPSILON_M / 2.0 {
        let mid = (s_out + s_in) / 2.0;
        if cyl.signed_distance(point_at(mid)?)? <= 0.0 {
            s_in = mid;
        } else {
            s_out = mid;
        }
    }
    Ok(Some(point_at(s_in)?))
}

/// Endpoints of a goal line and the inbound azimuth at the goal center.
///
/// The line is centered on the goal cylinder, perpendicular to the bearing
/// from the previous distinct turnpoint, with half-length equal to the
/// cylinder radius.
pub fn goal_line_endpoints(goal: &Cylinder, previous: LatLon) -> Result<(LatLon, LatLon, f64)> {
    let inbound = geodesic::inverse(previous, goal.center)?.azimuth_deg;
    let left = goal.boundary_point(geodesic::normalize_azimuth(inbound - 90.0))?;
    let right = goal.boundary_point(geodesic::normalize_azimuth(inbound + 90.0))?;
    Ok((left, right, inbound))
}
