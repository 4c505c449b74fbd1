//! Render-rate position and heading smoothing.
//!
//! Raw fixes arrive at whatever rate the platform delivers them. The
//! smoother is ticked once per animation frame and eases its displayed
//! position (and, while navigating, a route-aligned heading) toward the
//! latest fix with exponential smoothing.
//!
//! Factors are defined per frame at 60 Hz. For a frame of `dt` seconds
//! the applied factor is `1 - (1 - f)^(dt * 60)`, which equals `f` at
//! 60 Hz and converges at the same wall-clock speed at any other rate.

use log::warn;
use serde::Serialize;

use crate::config::NavConfig;
use crate::geo::{
    bearing, haversine_distance, heading_delta, interpolate_heading, interpolate_position, normalize_heading,
    project_on_polyline, Coordinate,
};
use crate::route::PositionSample;

/// Frame interval the smoothing factors are tuned for.
pub const REFERENCE_FRAME_S: f64 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothedPosition {
    pub position: Coordinate,
    /// Degrees in [0, 360), or None when no heading is known.
    pub heading: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmootherConfig {
    pub position_factor: f64,
    pub heading_factor: f64,
    pub lookahead_m: f64,
    pub emit_epsilon_deg: f64,
    pub heading_epsilon_deg: f64,
}

impl From<&NavConfig> for SmootherConfig {
    fn from(config: &NavConfig) -> Self {
        Self {
            position_factor: config.position_factor,
            heading_factor: config.heading_factor,
            lookahead_m: config.heading_lookahead_m,
            emit_epsilon_deg: config.emit_epsilon_deg,
            heading_epsilon_deg: config.heading_epsilon_deg,
        }
    }
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self::from(&NavConfig::default())
    }
}

/// Scale a per-reference-frame factor to a frame of `dt_s` seconds.
pub fn frame_factor(factor: f64, dt_s: f64) -> f64 {
    if !dt_s.is_finite() || dt_s <= 0.0 {
        return factor;
    }
    1.0 - (1.0 - factor).powf(dt_s / REFERENCE_FRAME_S)
}

/// Bearing from `position` toward the route a short distance ahead.
///
/// Finds the nearest polyline segment, then walks forward to the first
/// vertex at least `lookahead_m` away (or the last vertex).
pub fn route_heading(position: Coordinate, polyline: &[Coordinate], lookahead_m: f64) -> Option<f64> {
    let projection = project_on_polyline(position, polyline)?;

    let ahead = polyline[projection.segment_index + 1..]
        .iter()
        .copied()
        .find(|p| haversine_distance(position, *p) >= lookahead_m)
        .or_else(|| polyline.last().copied())?;

    // Standing on the final vertex gives no direction
    if haversine_distance(position, ahead) < 0.5 {
        return None;
    }

    Some(bearing(position, ahead))
}

#[derive(Debug, Clone, Default)]
pub struct PositionSmoother {
    config: SmootherConfig,
    latest: Option<PositionSample>,
    smoothed: Option<Coordinate>,
    heading: Option<f64>,
    last_emitted: Option<SmoothedPosition>,
}

impl PositionSmoother {
    pub fn new(config: SmootherConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record the latest raw fix. Non-finite coordinates are dropped.
    pub fn push_sample(&mut self, mut sample: PositionSample) -> bool {
        if !sample.coordinate.is_finite() {
            warn!("Ignoring non-finite position sample");
            return false;
        }
        if sample.heading_deg.is_some_and(|h| !h.is_finite()) {
            sample.heading_deg = None;
        }
        self.latest = Some(sample);
        true
    }

    pub fn latest_sample(&self) -> Option<&PositionSample> {
        self.latest.as_ref()
    }

    pub fn current(&self) -> Option<SmoothedPosition> {
        self.smoothed.map(|position| SmoothedPosition {
            position,
            heading: self.heading,
        })
    }

    /// Forget the navigation heading so the next route heading starts fresh.
    pub fn reset_heading(&mut self) {
        self.heading = None;
    }

    /// Forget everything, including the last fix.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Advance one frame.
    ///
    /// `route_polyline` is the active route while navigating, None otherwise.
    /// Returns the new smoothed state when the position or the heading
    /// changed by more than its epsilon since the last emission.
    pub fn tick(&mut self, dt_s: f64, route_polyline: Option<&[Coordinate]>) -> Option<SmoothedPosition> {
        let raw = self.latest?;

        let position = match self.smoothed {
            None => raw.coordinate,
            Some(current) => interpolate_position(
                current,
                raw.coordinate,
                frame_factor(self.config.position_factor, dt_s),
            ),
        };
        self.smoothed = Some(position);

        self.heading = match route_polyline {
            Some(polyline) => {
                match route_heading(raw.coordinate, polyline, self.config.lookahead_m) {
                    Some(target) => Some(match self.heading {
                        None => target,
                        Some(current) => interpolate_heading(
                            current,
                            target,
                            frame_factor(self.config.heading_factor, dt_s),
                        ),
                    }),
                    None => self.heading,
                }
            }
            None => raw.heading_deg.map(normalize_heading),
        };

        let current = SmoothedPosition {
            position,
            heading: self.heading,
        };
        let changed = match self.last_emitted {
            None => true,
            Some(prev) => {
                self.position_moved(prev.position, position)
                    || self.heading_turned(prev.heading, current.heading)
            }
        };

        if !changed {
            return None;
        }

        self.last_emitted = Some(current);
        Some(current)
    }

    fn position_moved(&self, prev: Coordinate, next: Coordinate) -> bool {
        (next.latitude - prev.latitude).abs() > self.config.emit_epsilon_deg
            || (next.longitude - prev.longitude).abs() > self.config.emit_epsilon_deg
    }

    fn heading_turned(&self, prev: Option<f64>, next: Option<f64>) -> bool {
        match (prev, next) {
            (Some(a), Some(b)) => heading_delta(a, b).abs() > self.config.heading_epsilon_deg,
            (None, None) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pt(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn waits_for_first_sample() {
        let mut s = PositionSmoother::default();
        assert!(s.tick(REFERENCE_FRAME_S, None).is_none());
        assert!(s.current().is_none());
    }

    #[test]
    fn first_sample_is_taken_as_is() {
        let mut s = PositionSmoother::default();
        s.push_sample(PositionSample::new(pt(40.0, -3.0)));
        let out = s.tick(REFERENCE_FRAME_S, None).unwrap();
        assert_eq!(out.position, pt(40.0, -3.0));
    }

    #[test]
    fn eases_toward_new_sample() {
        let mut s = PositionSmoother::default();
        s.push_sample(PositionSample::new(pt(0.0, 0.0)));
        s.tick(REFERENCE_FRAME_S, None);

        s.push_sample(PositionSample::new(pt(1.0, 1.0)));
        let out = s.tick(REFERENCE_FRAME_S, None).unwrap();
        assert_abs_diff_eq!(out.position.latitude, 0.12, epsilon = 1e-9);
        assert_abs_diff_eq!(out.position.longitude, 0.12, epsilon = 1e-9);
    }

    #[test]
    fn frame_rate_independent() {
        // Two 60 Hz frames equal one 30 Hz frame
        let f60 = frame_factor(0.12, REFERENCE_FRAME_S);
        let two = 1.0 - (1.0 - f60) * (1.0 - f60);
        assert_abs_diff_eq!(frame_factor(0.12, 2.0 * REFERENCE_FRAME_S), two, epsilon = 1e-12);
        assert_abs_diff_eq!(frame_factor(0.12, 0.0), 0.12, epsilon = 1e-12);
        assert_abs_diff_eq!(frame_factor(0.12, f64::NAN), 0.12, epsilon = 1e-12);
    }

    #[test]
    fn suppresses_sub_epsilon_emissions() {
        let mut s = PositionSmoother::default();
        s.push_sample(PositionSample::new(pt(10.0, 10.0)));
        assert!(s.tick(REFERENCE_FRAME_S, None).is_some());
        assert!(s.tick(REFERENCE_FRAME_S, None).is_none());

        s.push_sample(PositionSample::new(pt(10.0, 10.0000001)));
        assert!(s.tick(REFERENCE_FRAME_S, None).is_none());
    }

    #[test]
    fn passes_device_heading_through_when_not_navigating() {
        let mut s = PositionSmoother::default();
        s.push_sample(PositionSample::new(pt(0.0, 0.0)).with_heading(-30.0));
        let out = s.tick(REFERENCE_FRAME_S, None).unwrap();
        assert_eq!(out.heading, Some(330.0));

        s.push_sample(PositionSample::new(pt(0.0, 0.0)));
        s.tick(REFERENCE_FRAME_S, None);
        assert_eq!(s.current().unwrap().heading, None);
    }

    #[test]
    fn navigation_heading_follows_route() {
        // Route heads due east
        let route = vec![pt(0.0, 0.0), pt(0.0, 0.001), pt(0.0, 0.002)];
        let mut s = PositionSmoother::default();
        s.push_sample(PositionSample::new(pt(0.0, 0.0001)).with_heading(200.0));

        let out = s.tick(REFERENCE_FRAME_S, Some(route.as_slice())).unwrap();
        assert_abs_diff_eq!(out.heading.unwrap(), 90.0, epsilon = 0.1);
    }

    #[test]
    fn navigation_heading_is_smoothed() {
        let east = vec![pt(0.0, 0.0), pt(0.0, 0.001)];
        let north = vec![pt(0.0, 0.0), pt(0.001, 0.0)];
        let mut s = PositionSmoother::default();
        s.push_sample(PositionSample::new(pt(0.0, 0.0)));
        s.tick(REFERENCE_FRAME_S, Some(east.as_slice()));

        s.tick(REFERENCE_FRAME_S, Some(north.as_slice()));
        let heading = s.current().unwrap().heading.unwrap();
        // 90 -> 0 by 8%
        assert_abs_diff_eq!(heading, 82.8, epsilon = 0.1);
    }

    #[test]
    fn turning_in_place_still_emits() {
        let east = vec![pt(0.0, 0.0), pt(0.0, 0.001)];
        let north = vec![pt(0.0, 0.0), pt(0.001, 0.0)];
        let mut s = PositionSmoother::default();
        s.push_sample(PositionSample::new(pt(0.0, 0.0)));
        assert!(s.tick(REFERENCE_FRAME_S, Some(east.as_slice())).is_some());

        // Stationary, but the route now leads north
        let out = s.tick(REFERENCE_FRAME_S, Some(north.as_slice())).unwrap();
        assert!(out.heading.unwrap() < 90.0);

        // Converged heading goes quiet again
        for _ in 0..600 {
            s.tick(REFERENCE_FRAME_S, Some(north.as_slice()));
        }
        assert!(s.tick(REFERENCE_FRAME_S, Some(north.as_slice())).is_none());
    }

    #[test]
    fn route_heading_looks_ahead() {
        // East for ~11 m, then north for ~111 m
        let route = vec![pt(0.0, 0.0), pt(0.0, 0.0001), pt(0.001, 0.0001)];
        let h = route_heading(pt(0.0, 0.00005), &route, 20.0).unwrap();
        // The first vertex 20 m away is the northern end
        assert!(h < 10.0, "got {h}");
    }

    #[test]
    fn route_heading_at_end_is_none() {
        let route = vec![pt(0.0, 0.0), pt(0.0, 0.001)];
        assert!(route_heading(pt(0.0, 0.001), &route, 20.0).is_none());
        assert!(route_heading(pt(0.0, 0.0), &route[..1], 20.0).is_none());
    }

    #[test]
    fn rejects_non_finite_samples() {
        let mut s = PositionSmoother::default();
        assert!(!s.push_sample(PositionSample::new(pt(f64::NAN, 0.0))));
        assert!(s.latest_sample().is_none());

        assert!(s.push_sample(PositionSample::new(pt(0.0, 0.0)).with_heading(f64::NAN)));
        assert_eq!(s.latest_sample().unwrap().heading_deg, None);
    }
}
