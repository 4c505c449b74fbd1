//! Tunable navigation constants.
//!
//! The defaults reproduce the thresholds the app has always shipped with.
//! None of them are derived from first principles; they can be overridden
//! from a partial JSON document.

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavConfig {
    /// A step is complete once the traveller is closer than this to its maneuver.
    pub step_complete_m: f64,
    /// Moving away from a maneuver inside this radius also completes the step.
    pub passed_maneuver_m: f64,
    /// Upper bound of the "approaching" band.
    pub approaching_m: f64,
    /// Distance from the route beyond which a sample counts as off-route.
    pub off_route_m: f64,
    /// Consecutive off-route samples required before a recalculation request.
    pub off_route_samples: u32,
    /// Per-frame position smoothing factor at the reference frame rate.
    pub position_factor: f64,
    /// Per-frame heading smoothing factor at the reference frame rate.
    pub heading_factor: f64,
    /// How far ahead along the route the navigation heading looks.
    pub heading_lookahead_m: f64,
    /// Minimum change in degrees before a new smoothed position is emitted.
    pub emit_epsilon_deg: f64,
    /// Minimum heading change in degrees that also counts as movement.
    pub heading_epsilon_deg: f64,
    pub camera_zoom: f64,
    pub camera_tilt: f64,
    /// Incidents closer than this trigger an alert.
    pub incident_radius_m: f64,
    /// Lower and upper bounds of the "near destination" band.
    pub destination_near_m: f64,
    pub destination_far_m: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            step_complete_m: 35.0,
            passed_maneuver_m: 50.0,
            approaching_m: 100.0,
            off_route_m: 70.0,
            off_route_samples: 3,
            position_factor: 0.12,
            heading_factor: 0.08,
            heading_lookahead_m: 20.0,
            emit_epsilon_deg: 1e-6,
            heading_epsilon_deg: 0.1,
            camera_zoom: 18.0,
            camera_tilt: 45.0,
            incident_radius_m: 500.0,
            destination_near_m: 500.0,
            destination_far_m: 1000.0,
        }
    }
}

impl NavConfig {
    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: NavConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let distances = [
            ("stepCompleteM", self.step_complete_m),
            ("passedManeuverM", self.passed_maneuver_m),
            ("approachingM", self.approaching_m),
            ("offRouteM", self.off_route_m),
            ("headingLookaheadM", self.heading_lookahead_m),
            ("emitEpsilonDeg", self.emit_epsilon_deg),
            ("headingEpsilonDeg", self.heading_epsilon_deg),
            ("incidentRadiusM", self.incident_radius_m),
            ("destinationNearM", self.destination_near_m),
            ("destinationFarM", self.destination_far_m),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        for (name, value) in [
            ("positionFactor", self.position_factor),
            ("headingFactor", self.heading_factor),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(NavError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }

        if self.off_route_samples == 0 {
            return Err(NavError::InvalidConfig("offRouteSamples must be at least 1".into()));
        }
        if self.step_complete_m >= self.approaching_m {
            return Err(NavError::InvalidConfig(
                "stepCompleteM must be below approachingM".into(),
            ));
        }
        if self.destination_near_m >= self.destination_far_m {
            return Err(NavError::InvalidConfig(
                "destinationNearM must be below destinationFarM".into(),
            ));
        }
        if !self.camera_zoom.is_finite() || !self.camera_tilt.is_finite() {
            return Err(NavError::InvalidConfig("camera values must be finite".into()));
        }

        Ok(())
    }
}
