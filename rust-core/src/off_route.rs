//! Debounced off-route detection.
//!
//! A single noisy fix must not trigger a reroute: only a streak of
//! consecutive off-route samples raises the flag and requests a
//! recalculation. While that request is in flight, evaluation is paused
//! until a new route version arrives or the host reports the failure.

use log::{debug, info};

use crate::config::NavConfig;
use crate::events::{EventSink, NavEvent};
use crate::geo::{distance_to_polyline, Coordinate};
use crate::route::{Route, RouteVersion};

#[derive(Debug, Clone)]
pub struct OffRouteMonitor {
    threshold_m: f64,
    required_samples: u32,
    active: bool,
    version: Option<RouteVersion>,
    consecutive_off_samples: u32,
    is_off_route: bool,
    recalculation_in_flight: bool,
    last_distance_m: Option<f64>,
}

impl Default for OffRouteMonitor {
    fn default() -> Self {
        Self::from_config(&NavConfig::default())
    }
}

impl OffRouteMonitor {
    pub fn new(threshold_m: f64, required_samples: u32) -> Self {
        Self {
            threshold_m,
            required_samples: required_samples.max(1),
            active: false,
            version: None,
            consecutive_off_samples: 0,
            is_off_route: false,
            recalculation_in_flight: false,
            last_distance_m: None,
        }
    }

    pub fn from_config(config: &NavConfig) -> Self {
        Self::new(config.off_route_m, config.off_route_samples)
    }

    pub fn is_off_route(&self) -> bool {
        self.is_off_route
    }

    pub fn consecutive_off_samples(&self) -> u32 {
        self.consecutive_off_samples
    }

    pub fn is_recalculating(&self) -> bool {
        self.recalculation_in_flight
    }

    /// Distance to the route at the last evaluated sample.
    pub fn last_distance_m(&self) -> Option<f64> {
        self.last_distance_m
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enter or leave navigation mode. Leaving clears all state.
    pub fn set_active(&mut self, active: bool) {
        if !active {
            self.clear();
            self.version = None;
        }
        self.active = active;
    }

    /// Start monitoring `route`, dropping any streak and pending request.
    pub fn reset_for(&mut self, route: &Route) {
        self.version = Some(route.version());
        self.clear();
    }

    /// The host could not deliver a new route; allow another request.
    pub fn recalculation_failed(&mut self) {
        self.recalculation_in_flight = false;
    }

    fn clear(&mut self) {
        self.consecutive_off_samples = 0;
        self.is_off_route = false;
        self.recalculation_in_flight = false;
        self.last_distance_m = None;
    }

    /// Classify one position sample.
    pub fn update<S: EventSink + ?Sized>(
        &mut self,
        route: Option<&Route>,
        position: Option<Coordinate>,
        sink: &mut S,
    ) {
        if !self.active {
            return;
        }
        let (Some(route), Some(position)) = (route, position) else {
            return;
        };

        if self.version != Some(route.version()) {
            debug!("Route changed, resetting off-route state");
            self.reset_for(route);
        }

        if self.recalculation_in_flight {
            return;
        }

        let Some(distance) = distance_to_polyline(position, &route.tracking_path()) else {
            return;
        };
        self.last_distance_m = Some(distance);

        if distance <= self.threshold_m {
            self.consecutive_off_samples = 0;
            self.is_off_route = false;
            return;
        }

        self.consecutive_off_samples += 1;
        debug!(
            "Off-route sample {}/{} ({distance:.0} m)",
            self.consecutive_off_samples, self.required_samples
        );

        if self.consecutive_off_samples >= self.required_samples {
            info!("Off route by {distance:.0} m, requesting recalculation");
            self.is_off_route = true;
            self.consecutive_off_samples = 0;
            self.recalculation_in_flight = true;
            sink.emit(NavEvent::OffRoute { distance_m: distance });
            sink.emit(NavEvent::RecalculateRequested);
        }
    }
}
