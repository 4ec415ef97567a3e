//! Geodesic math on the WGS84 ellipsoid.
//!
//! Every distance and bearing in this crate goes through the Karney solver;
//! planar or spherical shortcuts are only ever used as initial guesses inside
//! the solver itself, never here.

use std::sync::LazyLock;

use geographiclib_rs::{DirectGeodesic, Geodesic, InverseGeodesic};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

static WGS84: LazyLock<Geodesic> = LazyLock::new(Geodesic::wgs84);

/// A position in decimal degrees on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Coordinate-wise equality within `tol_deg` degrees on both axes.
    pub fn close_to(&self, other: &LatLon, tol_deg: f64) -> bool {
        (self.lat - other.lat).abs() <= tol_deg && (self.lon - other.lon).abs() <= tol_deg
    }
}

/// Solution of the inverse geodesic problem between two points.
#[derive(Debug, Clone, Copy)]
pub struct InverseSolution {
    /// Geodesic length in meters.
    pub distance_m: f64,
    /// Azimuth at the first point, degrees clockwise from north.
    pub azimuth_deg: f64,
    /// Forward azimuth at the second point, degrees clockwise from north.
    pub arrival_azimuth_deg: f64,
}

/// Solve the inverse problem: geodesic length and azimuths from `a` to `b`.
pub fn inverse(a: LatLon, b: LatLon) -> Result<InverseSolution> {
    let (s12, azi1, azi2, _a12): (f64, f64, f64, f64) = WGS84.inverse(a.lat, a.lon, b.lat, b.lon);
    if !s12.is_finite() || !azi1.is_finite() || !azi2.is_finite() {
        return Err(TaskError::GeodesicNonConvergence {
            lat1: a.lat,
            lon1: a.lon,
            lat2: b.lat,
            lon2: b.lon,
        });
    }
    Ok(InverseSolution {
        distance_m: s12,
        azimuth_deg: azi1,
        arrival_azimuth_deg: azi2,
    })
}

/// Geodesic distance between two points in meters.
pub fn distance(a: LatLon, b: LatLon) -> Result<f64> {
    Ok(inverse(a, b)?.distance_m)
}

/// Solve the direct problem: travel `distance_m` meters from `origin` along
/// `azimuth_deg` and return the destination.
pub fn offset(origin: LatLon, azimuth_deg: f64, distance_m: f64) -> Result<LatLon> {
    if distance_m.abs() <= f64::EPSILON {
        return Ok(origin);
    }
    let (lat2, lon2, _azi2): (f64, f64, f64) =
        WGS84.direct(origin.lat, origin.lon, azimuth_deg, distance_m);
    if !lat2.is_finite() || !lon2.is_finite() {
        return Err(TaskError::GeodesicNonConvergence {
            lat1: origin.lat,
            lon1: origin.lon,
            lat2: f64::NAN,
            lon2: f64::NAN,
        });
    }
    Ok(LatLon::new(lat2, lon2))
}

/// Midpoint of the geodesic from `a` to `b`.
pub fn midpoint(a: LatLon, b: LatLon) -> Result<LatLon> {
    let solve = inverse(a, b)?;
    offset(a, solve.azimuth_deg, solve.distance_m / 2.0)
}

/// Normalize an azimuth to `[0, 360)` degrees.
pub fn normalize_azimuth(azimuth_deg: f64) -> f64 {
    azimuth_deg.rem_euclid(360.0)
}

/// Signed smallest rotation from `from_deg` to `to_deg`, in `(-180, 180]`.
pub fn azimuth_difference(from_deg: f64, to_deg: f64) -> f64 {
    let diff = (to_deg - from_deg).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Azimuth halfway between two bearings, on the side of their smaller
/// enclosed angle. Callers that care about the opposite half-plane evaluate
/// `bisect(..) + 180` themselves.
pub fn bisect_azimuths(az1_deg: f64, az2_deg: f64) -> f64 {
    normalize_azimuth(az1_deg + azimuth_difference(az1_deg, az2_deg) / 2.0)
}
