//! Turn-by-turn progress along a route.
//!
//! Decides which step the traveller is on and emits approach, step-complete
//! and arrival events. Each step fires each event kind at most once per
//! route version.

use std::collections::HashSet;

use log::{debug, info};

use crate::config::NavConfig;
use crate::events::{EventSink, NavEvent};
use crate::geo::{haversine_distance, Coordinate};
use crate::route::{Route, RouteVersion};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressThresholds {
    pub step_complete_m: f64,
    pub passed_maneuver_m: f64,
    pub approaching_m: f64,
}

impl From<&NavConfig> for ProgressThresholds {
    fn from(config: &NavConfig) -> Self {
        Self {
            step_complete_m: config.step_complete_m,
            passed_maneuver_m: config.passed_maneuver_m,
            approaching_m: config.approaching_m,
        }
    }
}

impl Default for ProgressThresholds {
    fn default() -> Self {
        Self::from(&NavConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct RouteProgressTracker {
    thresholds: ProgressThresholds,
    version: Option<RouteVersion>,
    step_count: usize,
    current_step_index: usize,
    distance_to_current_maneuver: Option<f64>,
    is_approaching: bool,
    notified_steps: HashSet<usize>,
    approach_notified_steps: HashSet<usize>,
    last_distance: f64,
}

impl Default for RouteProgressTracker {
    fn default() -> Self {
        Self::new(ProgressThresholds::default())
    }
}

impl RouteProgressTracker {
    pub fn new(thresholds: ProgressThresholds) -> Self {
        Self {
            thresholds,
            version: None,
            step_count: 0,
            current_step_index: 0,
            distance_to_current_maneuver: None,
            is_approaching: false,
            notified_steps: HashSet::new(),
            approach_notified_steps: HashSet::new(),
            last_distance: f64::INFINITY,
        }
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn distance_to_current_maneuver(&self) -> Option<f64> {
        self.distance_to_current_maneuver
    }

    pub fn is_approaching(&self) -> bool {
        self.is_approaching
    }

    pub fn is_step_notified(&self, index: usize) -> bool {
        self.notified_steps.contains(&index)
    }

    pub fn is_approach_notified(&self, index: usize) -> bool {
        self.approach_notified_steps.contains(&index)
    }

    /// Forget all progress.
    pub fn reset(&mut self) {
        self.version = None;
        self.step_count = 0;
        self.clear_progress();
    }

    /// Forget all progress and start tracking `route` from its first step.
    pub fn reset_for(&mut self, route: &Route) {
        self.version = Some(route.version());
        self.step_count = route.steps.len();
        self.clear_progress();
    }

    fn clear_progress(&mut self) {
        self.current_step_index = 0;
        self.distance_to_current_maneuver = None;
        self.is_approaching = false;
        self.notified_steps.clear();
        self.approach_notified_steps.clear();
        self.last_distance = f64::INFINITY;
    }

    fn sync_route(&mut self, route: &Route) {
        let version = route.version();
        if self.version != Some(version) {
            debug!("Route changed ({} steps), resetting progress", route.steps.len());
            self.reset_for(route);
        }
    }

    /// Evaluate a new position against the current step.
    pub fn update<S: EventSink + ?Sized>(
        &mut self,
        route: &Route,
        position: Coordinate,
        sink: &mut S,
    ) {
        self.sync_route(route);

        let index = self.current_step_index;
        let Some(step) = route.steps.get(index) else {
            return;
        };
        let Some(maneuver) = step.maneuver_location else {
            self.distance_to_current_maneuver = None;
            return;
        };

        let distance = haversine_distance(position, maneuver);
        self.distance_to_current_maneuver = Some(distance);

        let t = self.thresholds;

        if distance > t.step_complete_m
            && distance < t.approaching_m
            && self.approach_notified_steps.insert(index)
        {
            debug!("Approaching step {index} ({distance:.0} m)");
            self.is_approaching = true;
            sink.emit(NavEvent::Approaching {
                step_index: index,
                distance_m: distance,
                instruction: step.instruction.clone(),
            });
        }

        // Moving away inside the passed radius means the fix never got
        // closer than step_complete_m but the maneuver point was passed.
        let reached = distance < t.step_complete_m;
        let passed = distance < t.passed_maneuver_m && distance > self.last_distance;

        if (reached || passed) && self.notified_steps.insert(index) {
            self.is_approaching = false;

            if index + 1 < self.step_count {
                self.current_step_index = index + 1;
                self.distance_to_current_maneuver = None;
                self.last_distance = f64::INFINITY;
                info!("Step {index} complete, now on step {}", index + 1);
                sink.emit(NavEvent::StepComplete {
                    step_index: index,
                    next_step_index: index + 1,
                    next_instruction: route.steps.get(index + 1).map(|s| s.instruction.clone()),
                });
                return;
            }

            info!("Arrived at final step {index}");
            sink.emit(NavEvent::Arrived { step_index: index });
        }

        self.last_distance = distance;
    }

    /// Skip ahead one step. Returns false at the last step.
    pub fn go_to_next_step(&mut self) -> bool {
        if self.current_step_index + 1 >= self.step_count {
            return false;
        }

        self.notified_steps.insert(self.current_step_index);
        self.current_step_index += 1;
        self.is_approaching = false;
        self.distance_to_current_maneuver = None;
        self.last_distance = f64::INFINITY;
        true
    }

    /// Go back one step. Returns false at the first step.
    ///
    /// The step returned to becomes eligible for automatic detection again.
    pub fn go_to_previous_step(&mut self) -> bool {
        if self.current_step_index == 0 {
            return false;
        }

        self.current_step_index -= 1;
        self.notified_steps.remove(&self.current_step_index);
        self.approach_notified_steps.remove(&self.current_step_index);
        self.is_approaching = false;
        self.distance_to_current_maneuver = None;
        self.last_distance = f64::INFINITY;
        true
    }
}
