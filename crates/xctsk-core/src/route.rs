//! Classified route model derived from a task, plus the center-route
//! distance conventions.

use crate::cylinder::{Cylinder, Role};
use crate::error::Result;
use crate::geodesic::{self, LatLon};
use crate::models::{GoalType, SssDirection, Task, TurnpointType};

/// Coordinate tolerance in degrees when telling turnpoint centers apart.
pub(crate) const COORD_TOLERANCE_DEG: f64 = 1e-9;

/// An ordered sequence of classified turnpoint cylinders.
///
/// The optimizer sees every cylinder, including consecutive ones sharing a
/// center (common SSS/ESS pairs); only the center-distance sum collapses
/// duplicate centers.
#[derive(Debug, Clone)]
pub struct Route {
    cylinders: Vec<Cylinder>,
}

impl Route {
    /// Classify a validated task's turnpoints into route cylinders.
    ///
    /// The last turnpoint is the goal (line goals keep their radius as the
    /// half-length). A first turnpoint without a takeoff marking contributes
    /// its center only, so its radius is dropped.
    pub fn from_task(task: &Task) -> Result<Self> {
        task.validate()?;

        let last = task.turnpoints.len() - 1;
        let goal_is_line = matches!(
            task.goal.as_ref().and_then(|g| g.kind),
            Some(GoalType::Line)
        );
        let sss_direction = task.sss.as_ref().map(|s| s.direction);

        let mut cylinders = Vec::with_capacity(task.turnpoints.len());
        for (i, tp) in task.turnpoints.iter().enumerate() {
            let role = if i == last {
                if goal_is_line {
                    Role::GoalLine
                } else {
                    Role::Goal
                }
            } else {
                match tp.kind {
                    Some(TurnpointType::Takeoff) => Role::Takeoff,
                    Some(TurnpointType::Sss) => match sss_direction {
                        Some(SssDirection::Exit) => Role::SssExit,
                        _ => Role::SssEnter,
                    },
                    Some(TurnpointType::Ess) => Role::Ess,
                    None => Role::Regular,
                }
            };
            let radius_m = if i == 0 && role != Role::Takeoff {
                0.0
            } else {
                tp.radius
            };
            let center = LatLon::new(tp.waypoint.lat, tp.waypoint.lon);
            cylinders.push(Cylinder::new(center, radius_m, role));
        }

        Ok(Self { cylinders })
    }

    /// Build a route directly from cylinders (already classified).
    pub fn from_cylinders(cylinders: Vec<Cylinder>) -> Self {
        Self { cylinders }
    }

    pub fn cylinders(&self) -> &[Cylinder] {
        &self.cylinders
    }

    pub fn len(&self) -> usize {
        self.cylinders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cylinders.is_empty()
    }

    /// Index of the SSS cylinder, if the task has one.
    pub fn sss_index(&self) -> Option<usize> {
        self.cylinders
            .iter()
            .position(|c| matches!(c.role, Role::SssEnter | Role::SssExit))
    }

    /// Turnpoint centers with consecutive duplicates removed.
    pub(crate) fn deduped_centers(&self) -> Vec<LatLon> {
        let mut centers: Vec<LatLon> = Vec::with_capacity(self.cylinders.len());
        for cyl in &self.cylinders {
            if centers
                .last()
                .is_some_and(|prev| prev.close_to(&cyl.center, COORD_TOLERANCE_DEG))
            {
                continue;
            }
            centers.push(cyl.center);
        }
        centers
    }

    /// Sum of the geodesic legs through the turnpoint centers.
    ///
    /// Consecutive identical centers are collapsed first, preserving the
    /// order of the remaining legs.
    pub fn center_distance_m(&self) -> Result<f64> {
        let centers = self.deduped_centers();
        let mut total = 0.0;
        for pair in centers.windows(2) {
            total += geodesic::distance(pair[0], pair[1])?;
        }
        Ok(total)
    }

    /// Cumulative center distance at each turnpoint, in route order.
    ///
    /// Duplicated centers advance by zero, so the vector always has one entry
    /// per cylinder.
    pub fn cumulative_center_m(&self) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.cylinders.len());
        let mut total = 0.0;
        for (i, cyl) in self.cylinders.iter().enumerate() {
            if i > 0 {
                total += geodesic::distance(self.cylinders[i - 1].center, cyl.center)?;
            }
            out.push(total);
        }
        Ok(out)
    }

    /// True when every turnpoint shares one center. All cylinders then
    /// contain that point, so the zero-length route through the centers is
    /// exact.
    pub(crate) fn is_degenerate(&self) -> bool {
        self.deduped_centers().len() < 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Goal, Sss, SssType, TaskType, Turnpoint, Waypoint};

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
    fn test_roles_are_classified_from_task() {
        let mut t = task(vec![
            turnpoint(46.6252, 7.2061, 1000.0, Some(TurnpointType::Takeoff)),
            turnpoint(46.7888, 7.5414, 28000.0, Some(TurnpointType::Sss)),
            turnpoint(46.4827, 6.9102, 6000.0, None),
            turnpoint(46.6835, 7.0405, 11000.0, Some(TurnpointType::Ess)),
            turnpoint(46.6181, 7.1695, 100.0, None),
        ]);
        t.sss = Some(Sss {
            kind: SssType::Race,
            direction: SssDirection::Exit,
            time_gates: Vec::new(),
            time_close: None,
        });
        t.goal = Some(Goal {
            kind: Some(GoalType::Line),
            deadline: None,
            line_length: None,
        });

        let route = Route::from_task(&t).unwrap();
        let roles: Vec<Role> = route.cylinders().iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Takeoff,
                Role::SssExit,
                Role::Regular,
                Role::Ess,
                Role::GoalLine
            ]
        );
        assert_eq!(route.sss_index(), Some(1));
    }

    #[test]
    fn test_unmarked_first_turnpoint_loses_radius() {
        let t = task(vec![
            turnpoint(0.0, 0.0, 400.0, None),
            turnpoint(0.0, 1.0, 400.0, None),
        ]);
        let route = Route::from_task(&t).unwrap();
        assert_eq!(route.cylinders()[0].radius_m, 0.0);
        assert_eq!(route.cylinders()[1].radius_m, 400.0);
    }

    #[test]
    fn test_center_distance_skips_duplicate_centers() {
        // SSS/ESS pair on the same center: the duplicate contributes no leg
        // but stays in the optimizer's cylinder list.
        let t = task(vec![
            turnpoint(46.6252, 7.2061, 1000.0, Some(TurnpointType::Takeoff)),
            turnpoint(46.7888, 7.5414, 28000.0, None),
            turnpoint(46.7888, 7.5414, 12000.0, None),
            turnpoint(46.4827, 6.9102, 6000.0, None),
        ]);
        let route = Route::from_task(&t).unwrap();
        assert_eq!(route.len(), 4);
        assert_eq!(route.deduped_centers().len(), 3);

        let with_dup = route.center_distance_m().unwrap();
        let without = Route::from_task(&task(vec![
            turnpoint(46.6252, 7.2061, 1000.0, Some(TurnpointType::Takeoff)),
            turnpoint(46.7888, 7.5414, 28000.0, None),
            turnpoint(46.4827, 6.9102, 6000.0, None),
        ]))
        .unwrap()
        .center_distance_m()
        .unwrap();
        assert!((with_dup - without).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_when_all_cylinders_identical() {
        let t = task(vec![
            turnpoint(46.5, 8.0, 1000.0, None),
            turnpoint(46.5, 8.0, 1000.0, None),
            turnpoint(46.5, 8.0, 1000.0, None),
        ]);
        let route = Route::from_task(&t).unwrap();
        assert!(route.is_degenerate());
        assert!(route.center_distance_m().unwrap() < 1e-9);
    }

    #[test]
    fn test_not_degenerate_with_distinct_centers() {
        let t = task(vec![
            turnpoint(46.5, 8.0, 1000.0, None),
            turnpoint(46.6, 8.0, 500.0, None),
        ]);
        let route = Route::from_task(&t).unwrap();
        assert!(!route.is_degenerate());
    }
}
