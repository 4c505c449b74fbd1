//! Navigation events and the sinks that receive them.
//!
//! The trackers never talk to notification, speech, or map APIs. They emit
//! `NavEvent` records into an `EventSink`, which the host wires to whatever
//! delivers them. A `Vec<NavEvent>` is a sink, so tests can count events
//! directly.

use crossbeam::channel::Sender;
use log::{info, warn};
use serde::Serialize;

use crate::camera::CameraCommand;
use crate::format::format_distance;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavEvent {
    /// The traveller entered the approach band of a maneuver.
    Approaching {
        step_index: usize,
        distance_m: f64,
        instruction: String,
    },
    /// A maneuver was reached and tracking moved to the next step.
    StepComplete {
        step_index: usize,
        next_step_index: usize,
        next_instruction: Option<String>,
    },
    /// The final maneuver was reached.
    Arrived { step_index: usize },
    /// The traveller left the route.
    OffRoute { distance_m: f64 },
    /// The host should fetch a new route from the current position.
    RecalculateRequested,
    IncidentNearby {
        incident_id: String,
        incident_kind: String,
        distance_m: f64,
    },
    NearDestination { distance_m: f64 },
    Camera { command: CameraCommand },
}

impl NavEvent {
    /// Text suitable for a notification or speech synthesis, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            NavEvent::Approaching {
                distance_m,
                instruction,
                ..
            } => Some(format!("In {}, {}", format_distance(*distance_m), instruction)),
            NavEvent::StepComplete {
                next_instruction, ..
            } => Some(
                next_instruction
                    .clone()
                    .unwrap_or_else(|| "Continue on the route".to_string()),
            ),
            NavEvent::Arrived { .. } => Some("You have arrived at your destination".to_string()),
            NavEvent::OffRoute { distance_m } => Some(format!(
                "You are off route ({} from the route)",
                format_distance(*distance_m)
            )),
            NavEvent::RecalculateRequested => Some("Recalculating route".to_string()),
            NavEvent::IncidentNearby {
                incident_kind,
                distance_m,
                ..
            } => Some(format!(
                "Caution: {incident_kind} in {}",
                format_distance(*distance_m)
            )),
            NavEvent::NearDestination { distance_m } => Some(format!(
                "{} to your destination",
                format_distance(*distance_m)
            )),
            NavEvent::Camera { .. } => None,
        }
    }
}

/// Receiver of navigation events.
pub trait EventSink {
    fn emit(&mut self, event: NavEvent);
}

impl EventSink for Vec<NavEvent> {
    fn emit(&mut self, event: NavEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: NavEvent) {
        (**self).emit(event);
    }
}

/// Forwards events to another thread.
impl EventSink for Sender<NavEvent> {
    fn emit(&mut self, event: NavEvent) {
        if self.send(event).is_err() {
            warn!("Event receiver dropped, discarding navigation event");
        }
    }
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: NavEvent) {
        match event.message() {
            Some(msg) => info!("{msg}"),
            None => info!("{event:?}"),
        }
    }
}
