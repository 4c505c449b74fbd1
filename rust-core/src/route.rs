//! Route data model.
//!
//! Routes come from the external routing service and are never mutated
//! in place: a recalculation delivers a whole new `Route`. Consumers detect
//! a logical route change by comparing `RouteVersion`s, which are derived
//! from content rather than identity.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficStatus {
    #[default]
    Normal,
    Moderate,
    Heavy,
    Severe,
}

/// One instruction of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub instruction: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Where the instruction should be executed.
    #[serde(default)]
    pub maneuver_location: Option<Coordinate>,
    #[serde(default)]
    pub detailed_path: Vec<Coordinate>,
    #[serde(default)]
    pub traffic_status: TrafficStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
    #[serde(default)]
    pub duration_in_traffic_seconds: Option<f64>,
    pub polyline: Vec<Coordinate>,
    pub steps: Vec<RouteStep>,
}

/// Content hash of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RouteVersion(pub u64);

fn hash_coordinate<H: Hasher>(c: &Coordinate, state: &mut H) {
    c.latitude.to_bits().hash(state);
    c.longitude.to_bits().hash(state);
}

impl Route {
    /// Decode a route from the routing service's JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let route: Route = serde_json::from_str(json)?;
        if route.polyline.iter().any(|c| !c.is_finite()) {
            return Err(NavError::InvalidRoute("polyline contains non-finite coordinates".into()));
        }
        Ok(route)
    }

    /// Content hash over every step field and every polyline point.
    pub fn version(&self) -> RouteVersion {
        let mut hasher = DefaultHasher::new();

        self.total_distance_meters.to_bits().hash(&mut hasher);
        self.total_duration_seconds.to_bits().hash(&mut hasher);
        self.duration_in_traffic_seconds.map(f64::to_bits).hash(&mut hasher);

        self.polyline.len().hash(&mut hasher);
        for c in &self.polyline {
            hash_coordinate(c, &mut hasher);
        }

        self.steps.len().hash(&mut hasher);
        for step in &self.steps {
            step.instruction.hash(&mut hasher);
            step.distance_meters.to_bits().hash(&mut hasher);
            step.duration_seconds.to_bits().hash(&mut hasher);
            match &step.maneuver_location {
                Some(c) => {
                    1u8.hash(&mut hasher);
                    hash_coordinate(c, &mut hasher);
                }
                None => 0u8.hash(&mut hasher),
            }
            step.detailed_path.len().hash(&mut hasher);
            for c in &step.detailed_path {
                hash_coordinate(c, &mut hasher);
            }
            step.traffic_status.hash(&mut hasher);
        }

        RouteVersion(hasher.finish())
    }

    /// The final point of the route: the last step's maneuver location,
    /// falling back to the end of the polyline.
    pub fn destination(&self) -> Option<Coordinate> {
        self.steps
            .last()
            .and_then(|s| s.maneuver_location)
            .or_else(|| self.polyline.last().copied())
    }

    /// Geometry the traveller is matched against.
    ///
    /// The steps' detailed paths, joined in step order, when any step has
    /// one of at least two points. Otherwise the overview polyline.
    pub fn tracking_path(&self) -> Cow<'_, [Coordinate]> {
        let mut detailed = self
            .steps
            .iter()
            .map(|s| s.detailed_path.as_slice())
            .filter(|p| p.len() >= 2)
            .peekable();
        if detailed.peek().is_none() {
            return Cow::Borrowed(&self.polyline);
        }

        let mut path: Vec<Coordinate> = Vec::new();
        for c in detailed.flatten() {
            // Consecutive steps share their joining vertex
            if path.last() != Some(c) {
                path.push(*c);
            }
        }
        Cow::Owned(path)
    }

    /// True if at least one step has a maneuver location to track.
    pub fn has_trackable_steps(&self) -> bool {
        self.steps.iter().any(|s| s.maneuver_location.is_some())
    }
}

/// One raw fix from the platform position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

impl PositionSample {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            heading_deg: None,
            accuracy_m: None,
        }
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }
}
