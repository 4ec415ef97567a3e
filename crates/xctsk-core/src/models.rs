//! Task input model mirroring the XCTrack `.xctsk` schema.
//!
//! The engine consumes only coordinates, radii, and the classification
//! derived from turnpoint type, SSS direction, and goal type. Time fields are
//! carried so a validated task round-trips through these types, but the
//! optimizer ignores them.

use chrono::NaiveTime;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TaskError};

/// Wall-clock time in the XCTrack wire format (`"HH:MM:SSZ"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay(pub NaiveTime);

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.format("%H:%M:%SZ").to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%SZ")
            .map(TimeOfDay)
            .map_err(|_| D::Error::custom(format!("invalid time of day: {raw:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarthModel {
    #[serde(rename = "WGS84")]
    Wgs84,
    #[serde(rename = "FAI_SPHERE")]
    FaiSphere,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    #[default]
    #[serde(rename = "CLASSIC")]
    Classic,
    #[serde(rename = "W")]
    Waypoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TurnpointType {
    Takeoff,
    Sss,
    Ess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SssDirection {
    Enter,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SssType {
    #[serde(rename = "RACE")]
    Race,
    #[serde(rename = "ELAPSED-TIME")]
    ElapsedTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GoalType {
    Cylinder,
    Line,
}

/// A named position on the ellipsoid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "altSmoothed", default)]
    pub alt_smoothed: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One turnpoint cylinder of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turnpoint {
    /// Cylinder radius in meters.
    pub radius: f64,
    pub waypoint: Waypoint,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TurnpointType>,
}

/// Takeoff window. Carried, ignored by the optimizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Takeoff {
    #[serde(rename = "timeOpen", default, skip_serializing_if = "Option::is_none")]
    pub time_open: Option<TimeOfDay>,
    #[serde(rename = "timeClose", default, skip_serializing_if = "Option::is_none")]
    pub time_close: Option<TimeOfDay>,
}

/// Start of speed section settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sss {
    #[serde(rename = "type")]
    pub kind: SssType,
    pub direction: SssDirection,
    #[serde(rename = "timeGates", default, skip_serializing_if = "Vec::is_empty")]
    pub time_gates: Vec<TimeOfDay>,
    #[serde(rename = "timeClose", default, skip_serializing_if = "Option::is_none")]
    pub time_close: Option<TimeOfDay>,
}

/// Goal settings. For `Line` goals the last turnpoint's radius is half the
/// line length; `line_length` is recomputed from the radius rather than
/// trusted when a route is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Goal {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GoalType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<TimeOfDay>,
    #[serde(rename = "lineLength", default, skip_serializing_if = "Option::is_none")]
    pub line_length: Option<f64>,
}

/// An XCTrack task: an ordered sequence of turnpoint cylinders plus
/// start and goal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "taskType", default)]
    pub task_type: TaskType,
    #[serde(default = "default_version")]
    pub version: u32,
    pub turnpoints: Vec<Turnpoint>,
    #[serde(rename = "earthModel", default, skip_serializing_if = "Option::is_none")]
    pub earth_model: Option<EarthModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takeoff: Option<Takeoff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sss: Option<Sss>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
}

fn default_version() -> u32 {
    1
}

impl Task {
    /// Validate the structural invariants the engine relies on.
    ///
    /// An absent earth model means WGS84; any other model is refused.
    pub fn validate(&self) -> Result<()> {
        if let Some(model) = self.earth_model {
            if model != EarthModel::Wgs84 {
                return Err(TaskError::UnsupportedEarthModel(format!("{model:?}")));
            }
        }
        if self.turnpoints.len() < 2 {
            return Err(TaskError::invalid_task(format!(
                "need at least 2 turnpoints, got {}",
                self.turnpoints.len()
            )));
        }

        let mut sss_count = 0usize;
        let mut ess_count = 0usize;
        for (i, tp) in self.turnpoints.iter().enumerate() {
            let wp = &tp.waypoint;
            if !wp.lat.is_finite() || !(-90.0..=90.0).contains(&wp.lat) {
                return Err(TaskError::invalid_task(format!(
                    "turnpoint {i} ({}): latitude {} out of range",
                    wp.name, wp.lat
                )));
            }
            if !wp.lon.is_finite() || wp.lon <= -180.0 || wp.lon > 180.0 {
                return Err(TaskError::invalid_task(format!(
                    "turnpoint {i} ({}): longitude {} out of range",
                    wp.name, wp.lon
                )));
            }
            if !tp.radius.is_finite() || tp.radius < 0.0 {
                return Err(TaskError::invalid_task(format!(
                    "turnpoint {i} ({}): negative radius {}",
                    wp.name, tp.radius
                )));
            }
            match tp.kind {
                Some(TurnpointType::Takeoff) if i != 0 => {
                    return Err(TaskError::invalid_task(format!(
                        "takeoff must be the first turnpoint, found at index {i}"
                    )));
                }
                Some(TurnpointType::Sss) => sss_count += 1,
                Some(TurnpointType::Ess) => ess_count += 1,
                _ => {}
            }
        }
        if sss_count > 1 {
            return Err(TaskError::invalid_task(format!(
                "at most one SSS turnpoint allowed, got {sss_count}"
            )));
        }
        if ess_count > 1 {
            return Err(TaskError::invalid_task(format!(
                "at most one ESS turnpoint allowed, got {ess_count}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turnpoint(lat: f64, lon: f64, radius: f64, kind: Option<TurnpointType>) -> Turnpoint {
        Turnpoint {
            radius,
            waypoint: Waypoint {
                name: format!("TP{lat}/{lon}"),
                lat,
                lon,
                alt_smoothed: 0,
                description: None,
            },
            kind,
        }
    }

    fn two_point_task() -> Task {
        Task {
            task_type: TaskType::Classic,
            version: 1,
            turnpoints: vec![
                turnpoint(46.5, 8.0, 1000.0, Some(TurnpointType::Takeoff)),
                turnpoint(46.6, 8.1, 1000.0, None),
            ],
            earth_model: None,
            takeoff: None,
            sss: None,
            goal: None,
        }
    }

    #[test]
    fn test_valid_task_passes() {
        assert!(two_point_task().validate().is_ok());
    }

    #[test]
    fn test_single_turnpoint_rejected() {
        let mut task = two_point_task();
        task.turnpoints.truncate(1);
        assert!(matches!(task.validate(), Err(TaskError::InvalidTask(_))));
    }

    #[test]
    fn test_fai_sphere_rejected() {
        let mut task = two_point_task();
        task.earth_model = Some(EarthModel::FaiSphere);
        assert!(matches!(
            task.validate(),
            Err(TaskError::UnsupportedEarthModel(_))
        ));
    }

    #[test]
    fn test_latitude_out_of_range_rejected() {
        let mut task = two_point_task();
        task.turnpoints[1].waypoint.lat = 91.0;
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_duplicate_sss_rejected() {
        let mut task = two_point_task();
        task.turnpoints.push(turnpoint(46.7, 8.2, 400.0, None));
        task.turnpoints[1].kind = Some(TurnpointType::Sss);
        task.turnpoints[2].kind = Some(TurnpointType::Sss);
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_takeoff_not_first_rejected() {
        let mut task = two_point_task();
        task.turnpoints[0].kind = None;
        task.turnpoints[1].kind = Some(TurnpointType::Takeoff);
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_time_of_day_wire_format() {
        let time: TimeOfDay = serde_json::from_str("\"12:30:05Z\"").unwrap();
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"12:30:05Z\"");
        assert!(serde_json::from_str::<TimeOfDay>("\"25:00:00Z\"").is_err());
    }
}
