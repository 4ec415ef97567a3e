//! Contact seeding and odd–even boundary refinement.
//!
//! Each interior contact is repeatedly re-solved as a point–circle–point
//! subproblem with its neighbours held fixed: if the straight geodesic
//! between the neighbours already meets the cylinder the earliest crossing
//! wins, otherwise the contact reflects to the boundary point on the
//! azimuth bisector. Sweeping odd indices, then even, keeps every update
//! independent of the ones in flight.

use tracing::trace;

use crate::cylinder::{boundary_intersection, Cylinder, Role};
use crate::error::Result;
use crate::geodesic::{self, LatLon};
use crate::route::COORD_TOLERANCE_DEG;

/// Outcome of a refinement run.
#[derive(Debug, Clone)]
pub(crate) struct Refined {
    pub contacts: Vec<LatLon>,
    pub length_m: f64,
    pub sweeps: u32,
    pub converged: bool,
}

/// Whether the first contact is pinned to the first center.
///
/// A takeoff cylinder at or below the snap radius starts the route at its
/// center; anything else starts on the boundary facing the next turnpoint.
pub(crate) fn start_is_snapped(cylinders: &[Cylinder], takeoff_snap_m: f64) -> bool {
    let first = &cylinders[0];
    first.radius_m <= 0.0 || (first.role == Role::Takeoff && first.radius_m <= takeoff_snap_m)
}

/// Total geodesic length of a contact polyline.
pub(crate) fn polyline_length_m(contacts: &[LatLon]) -> Result<f64> {
    let mut total = 0.0;
    for pair in contacts.windows(2) {
        total += geodesic::distance(pair[0], pair[1])?;
    }
    Ok(total)
}

/// Seed one contact per cylinder by projecting each center toward the
/// midpoint of its neighbours' centers.
pub(crate) fn seed_contacts(cylinders: &[Cylinder], takeoff_snap_m: f64) -> Result<Vec<LatLon>> {
    let n = cylinders.len();
    let mut contacts = Vec::with_capacity(n);
    for (i, cyl) in cylinders.iter().enumerate() {
        let contact = if i == 0 {
            if start_is_snapped(cylinders, takeoff_snap_m) {
                cyl.center
            } else {
                cyl.project_on_boundary(cylinders[1].center)?
            }
        } else if i == n - 1 || cyl.radius_m <= 0.0 {
            // The goal seed starts at its center; refinement pulls it onto
            // the boundary.
            cyl.center
        } else {
            let prev = cylinders[i - 1].center;
            let next = cylinders[i + 1].center;
            let target = if prev.close_to(&next, COORD_TOLERANCE_DEG) {
                next
            } else {
                geodesic::midpoint(prev, next)?
            };
            cyl.project_on_boundary(target)?
        };
        contacts.push(contact);
    }
    Ok(contacts)
}

/// Best contact on `cyl` for fixed neighbours `prev` and `next`.
pub(crate) fn pcp_contact(cyl: &Cylinder, prev: LatLon, next: LatLon) -> Result<LatLon> {
    if cyl.radius_m <= 0.0 {
        return Ok(cyl.center);
    }
    // A straight geodesic that already meets the cylinder cannot be beaten.
    if let Some(hit) = boundary_intersection(cyl, prev, next)? {
        return Ok(hit);
    }

    let to_prev = geodesic::inverse(cyl.center, prev)?;
    let to_next = geodesic::inverse(cyl.center, next)?;
    if to_prev.distance_m <= f64::EPSILON {
        return cyl.project_on_boundary(next);
    }
    if to_next.distance_m <= f64::EPSILON {
        return cyl.project_on_boundary(prev);
    }

    // The bisector is ill-conditioned when the neighbour azimuths are nearly
    // antipodal; evaluating both half-planes sidesteps that entirely.
    let bisector = geodesic::bisect_azimuths(to_prev.azimuth_deg, to_next.azimuth_deg);
    let head = cyl.boundary_point(bisector)?;
    let tail = cyl.boundary_point(bisector + 180.0)?;
    let head_len = geodesic::distance(prev, head)? + geodesic::distance(head, next)?;
    let tail_len = geodesic::distance(prev, tail)? + geodesic::distance(tail, next)?;
    Ok(if head_len <= tail_len { head } else { tail })
}

fn update_contact(
    cylinders: &[Cylinder],
    contacts: &mut [LatLon],
    i: usize,
) -> Result<()> {
    let prev = contacts[i - 1];
    let next = contacts[i + 1];
    let candidate = pcp_contact(&cylinders[i], prev, next)?;

    // Keep whichever contact yields the shorter local detour, so a sweep can
    // never lengthen the route.
    let old = contacts[i];
    let old_len = geodesic::distance(prev, old)? + geodesic::distance(old, next)?;
    let new_len = geodesic::distance(prev, candidate)? + geodesic::distance(candidate, next)?;
    if new_len < old_len {
        contacts[i] = candidate;
    }
    Ok(())
}

fn update_endpoints(
    cylinders: &[Cylinder],
    contacts: &mut [LatLon],
    start_snapped: bool,
) -> Result<()> {
    let n = cylinders.len();
    if !start_snapped {
        contacts[0] = cylinders[0].nearest_contact(contacts[1])?;
    }
    contacts[n - 1] = cylinders[n - 1].nearest_contact(contacts[n - 2])?;
    Ok(())
}

/// One full sweep: odd interior indices, even interior indices, endpoints.
pub(crate) fn sweep_once(
    cylinders: &[Cylinder],
    contacts: &mut [LatLon],
    start_snapped: bool,
) -> Result<f64> {
    let n = cylinders.len();
    let mut i = 1;
    while i < n - 1 {
        update_contact(cylinders, contacts, i)?;
        i += 2;
    }
    let mut i = 2;
    while i < n - 1 {
        update_contact(cylinders, contacts, i)?;
        i += 2;
    }
    update_endpoints(cylinders, contacts, start_snapped)?;
    polyline_length_m(contacts)
}

/// Run odd–even sweeps until the total length settles within `tol_m` or
/// `max_iter` sweeps have been spent.
pub(crate) fn refine(
    cylinders: &[Cylinder],
    mut contacts: Vec<LatLon>,
    start_snapped: bool,
    max_iter: u32,
    tol_m: f64,
) -> Result<Refined> {
    let mut length = polyline_length_m(&contacts)?;
    let mut sweeps = 0;
    let mut converged = false;

    while sweeps < max_iter {
        let next_length = sweep_once(cylinders, &mut contacts, start_snapped)?;
        sweeps += 1;
        let delta = length - next_length;
        trace!(sweep = sweeps, length_m = next_length, delta_m = delta, "refinement sweep");
        length = next_length;
        if delta.abs() < tol_m {
            converged = true;
            break;
        }
    }

    Ok(Refined {
        contacts,
        length_m: length,
        sweeps,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cylinder::BOUNDARY_EPSILON_M;

    fn cyl(lat: f64, lon: f64, radius_m: f64, role: Role) -> Cylinder {
        Cylinder::new(LatLon::new(lat, lon), radius_m, role)
    }

    fn u_turn() -> Vec<Cylinder> {
        vec![
            cyl(0.0, 0.0, 0.0, Role::Regular),
            cyl(0.0, 1.0, 500.0, Role::Regular),
            cyl(0.0, 2.0, 100.0, Role::Regular),
            cyl(0.0, 1.0, 500.0, Role::Regular),
            cyl(0.0, 0.0, 100.0, Role::Goal),
        ]
    }

    #[test]
    fn test_seed_contacts_stay_inside_cylinders() {
        let cylinders = u_turn();
        let contacts = seed_contacts(&cylinders, 1000.0).unwrap();
        assert_eq!(contacts.len(), cylinders.len());
        for (cyl, contact) in cylinders.iter().zip(&contacts) {
            assert!(cyl.signed_distance(*contact).unwrap() <= BOUNDARY_EPSILON_M);
        }
    }

    #[test]
    fn test_sweeps_never_lengthen_the_route() {
        let cylinders = u_turn();
        let mut contacts = seed_contacts(&cylinders, 1000.0).unwrap();
        let mut previous = polyline_length_m(&contacts).unwrap();
        for _ in 0..20 {
            let length = sweep_once(&cylinders, &mut contacts, true).unwrap();
            assert!(length <= previous + 1e-6, "{length} > {previous}");
            previous = length;
        }
    }

    #[test]
    fn test_refine_converges_on_simple_pair() {
        let cylinders = vec![
            cyl(46.5, 8.0, 0.0, Role::Takeoff),
            cyl(46.6, 8.1, 1000.0, Role::Goal),
        ];
        let contacts = seed_contacts(&cylinders, 1000.0).unwrap();
        let refined = refine(&cylinders, contacts, true, 100, 0.001).unwrap();
        assert!(refined.converged);
        let direct = geodesic::distance(cylinders[0].center, cylinders[1].center).unwrap();
        assert!((refined.length_m - (direct - 1000.0)).abs() < 0.01);
    }

    #[test]
    fn test_pcp_prefers_straight_crossing() {
        let cylinder = cyl(0.0, 1.0, 500.0, Role::Regular);
        let contact =
            pcp_contact(&cylinder, LatLon::new(0.0, 0.0), LatLon::new(0.0, 2.0)).unwrap();
        // Earliest crossing lies on the near boundary of the cylinder.
        assert!(cylinder.signed_distance(contact).unwrap().abs() < BOUNDARY_EPSILON_M);
        assert!(contact.lon < 1.0);
    }

    #[test]
    fn test_pcp_reflects_when_no_crossing() {
        let cylinder = cyl(0.1, 1.0, 1000.0, Role::Regular);
        let contact =
            pcp_contact(&cylinder, LatLon::new(0.0, 0.0), LatLon::new(0.0, 2.0)).unwrap();
        let on_boundary = cylinder.signed_distance(contact).unwrap().abs();
        assert!(on_boundary < 0.01, "got {on_boundary}");
        // The reflected contact faces the neighbours, south of the center.
        assert!(contact.lat < 0.1);
    }

    #[test]
    fn test_pcp_with_equal_neighbours_picks_nearest_boundary_point() {
        let cylinder = cyl(0.0, 1.0, 500.0, Role::Regular);
        let shared = LatLon::new(0.0, 0.0);
        let contact = pcp_contact(&cylinder, shared, shared).unwrap();
        let d = geodesic::distance(shared, contact).unwrap();
        let center_d = geodesic::distance(shared, cylinder.center).unwrap();
        assert!((d - (center_d - 500.0)).abs() < 0.01);
    }
}
