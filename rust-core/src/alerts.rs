//! Proximity alerts for reported incidents and the destination.

use std::collections::HashSet;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::NavConfig;
use crate::events::{EventSink, NavEvent};
use crate::geo::{haversine_distance, Coordinate};

/// A road incident reported by another user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    /// Free-form category, e.g. "accident" or "police".
    #[serde(alias = "type")]
    pub kind: String,
    pub location: Coordinate,
}

/// Warns once per incident when the traveller comes within range.
#[derive(Debug, Clone)]
pub struct IncidentWatcher {
    radius_m: f64,
    notified: HashSet<String>,
}

impl IncidentWatcher {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            notified: HashSet::new(),
        }
    }

    pub fn from_config(config: &NavConfig) -> Self {
        Self::new(config.incident_radius_m)
    }

    pub fn reset(&mut self) {
        self.notified.clear();
    }

    pub fn check<S: EventSink + ?Sized>(
        &mut self,
        position: Coordinate,
        incidents: &[Incident],
        sink: &mut S,
    ) {
        for incident in incidents {
            let distance = haversine_distance(position, incident.location);
            if distance >= self.radius_m || self.notified.contains(&incident.id) {
                continue;
            }

            info!("Incident {} ({}) within {distance:.0} m", incident.id, incident.kind);
            self.notified.insert(incident.id.clone());
            sink.emit(NavEvent::IncidentNearby {
                incident_id: incident.id.clone(),
                incident_kind: incident.kind.clone(),
                distance_m: distance,
            });
        }
    }
}

/// Announces once that the destination is getting close.
#[derive(Debug, Clone)]
pub struct DestinationWatcher {
    near_m: f64,
    far_m: f64,
    destination: Option<Coordinate>,
    notified: bool,
}

impl DestinationWatcher {
    pub fn new(near_m: f64, far_m: f64) -> Self {
        Self {
            near_m,
            far_m,
            destination: None,
            notified: false,
        }
    }

    pub fn from_config(config: &NavConfig) -> Self {
        Self::new(config.destination_near_m, config.destination_far_m)
    }

    pub fn reset(&mut self) {
        self.destination = None;
        self.notified = false;
    }

    pub fn check<S: EventSink + ?Sized>(
        &mut self,
        position: Coordinate,
        destination: Option<Coordinate>,
        sink: &mut S,
    ) {
        if destination != self.destination {
            self.destination = destination;
            self.notified = false;
        }
        let Some(target) = self.destination else {
            return;
        };
        if self.notified {
            return;
        }

        let distance = haversine_distance(position, target);
        if distance > self.near_m && distance < self.far_m {
            info!("Destination within {distance:.0} m");
            self.notified = true;
            sink.emit(NavEvent::NearDestination { distance_m: distance });
        }
    }
}
