//! Geometric primitives.
//!
//! Stateless helpers for distances, bearings, and the interpolation steps
//! used by the position smoother. All coordinates use WGS84 (lat/lon in
//! degrees). Every function here is total over finite input.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Result of projecting a position onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Nearest point on the polyline.
    pub point: Coordinate,
    /// Index of the segment start point (0-based).
    pub segment_index: usize,
    /// Distance from the position to the nearest point, in meters.
    pub distance_m: f64,
}

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// Distance in meters from `point` to the segment `[start, end]`.
///
/// The projection is done in a local equirectangular frame (longitude
/// scaled by the cosine of the mean latitude); the final distance is the
/// haversine distance to the clamped projected point. Off-route thresholds
/// are calibrated against this approximation.
pub fn distance_to_segment(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    haversine_distance(point, project_on_segment(point, start, end))
}

/// Nearest point on the segment `[start, end]` to `point`.
fn project_on_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> Coordinate {
    let cos_lat = ((a.latitude + b.latitude) / 2.0).to_radians().cos();

    let dx = (b.longitude - a.longitude) * cos_lat;
    let dy = b.latitude - a.latitude;
    let px = (p.longitude - a.longitude) * cos_lat;
    let py = p.latitude - a.latitude;

    let seg_len_sq = dx * dx + dy * dy;

    if seg_len_sq < 1e-20 {
        // Degenerate segment
        return a;
    }

    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);

    Coordinate {
        latitude: a.latitude + t * (b.latitude - a.latitude),
        longitude: a.longitude + t * (b.longitude - a.longitude),
    }
}

/// Project a position onto the nearest segment of a polyline.
///
/// Returns None if the polyline has fewer than 2 points.
pub fn project_on_polyline(position: Coordinate, polyline: &[Coordinate]) -> Option<Projection> {
    let mut best: Option<Projection> = None;

    for (i, segment) in polyline.windows(2).enumerate() {
        let projected = project_on_segment(position, segment[0], segment[1]);
        let dist = haversine_distance(position, projected);

        let is_better = match &best {
            Some(prev) => dist < prev.distance_m,
            None => true,
        };

        if is_better {
            best = Some(Projection {
                point: projected,
                segment_index: i,
                distance_m: dist,
            });
        }
    }

    best
}

/// Minimum distance in meters from `position` to any segment of `polyline`.
///
/// Returns None if the polyline has fewer than 2 points.
pub fn distance_to_polyline(position: Coordinate, polyline: &[Coordinate]) -> Option<f64> {
    polyline
        .windows(2)
        .map(|w| distance_to_segment(position, w[0], w[1]))
        .min_by(f64::total_cmp)
}

/// Initial compass bearing from `from` to `to` in degrees [0, 360).
pub fn bearing(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_heading(y.atan2(x).to_degrees())
}

/// Wrap any angle in degrees into [0, 360).
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// One exponential-smoothing step from `current` toward `target`.
///
/// Latitude and longitude are interpolated independently; this is not a
/// geodesic interpolation.
pub fn interpolate_position(current: Coordinate, target: Coordinate, factor: f64) -> Coordinate {
    Coordinate {
        latitude: current.latitude + (target.latitude - current.latitude) * factor,
        longitude: current.longitude + (target.longitude - current.longitude) * factor,
    }
}

/// Signed shortest turn from `current` to `target`, in (-180, 180].
pub fn heading_delta(current: f64, target: f64) -> f64 {
    let mut delta = target - current;

    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }

    delta
}

/// Shortest-path angular interpolation from `current` toward `target`.
pub fn interpolate_heading(current: f64, target: f64, factor: f64) -> f64 {
    normalize_heading(current + heading_delta(current, target) * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pt(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn haversine_same_point() {
        let p = pt(48.2082, 16.3738);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = pt(40.4168, -3.7038);
        let b = pt(41.3874, 2.1686);
        assert_abs_diff_eq!(haversine_distance(a, b), haversine_distance(b, a), epsilon = 1e-9);
    }

    #[test]
    fn haversine_known_distance() {
        // Vienna to Bratislava ~55 km
        let vienna = pt(48.2082, 16.3738);
        let bratislava = pt(48.1486, 17.1077);
        let dist = haversine_distance(vienna, bratislava);
        assert!(dist > 50_000.0 && dist < 60_000.0,
            "Expected ~55 km, got {:.0} m", dist);
    }

    #[test]
    fn haversine_one_millidegree_at_equator() {
        let dist = haversine_distance(pt(0.0, 0.0), pt(0.0, 0.001));
        assert_abs_diff_eq!(dist, 111.19, epsilon = 0.01);
    }

    #[test]
    fn degenerate_segment_matches_haversine() {
        let p = pt(40.0, -3.0);
        let a = pt(40.001, -3.002);
        assert_eq!(distance_to_segment(p, a, a), haversine_distance(p, a));
    }

    #[test]
    fn segment_distance_perpendicular() {
        // Segment runs west-east along the equator, point 0.001° north of it
        let d = distance_to_segment(pt(0.001, 0.0005), pt(0.0, 0.0), pt(0.0, 0.001));
        assert_abs_diff_eq!(d, 111.19, epsilon = 0.01);
    }

    #[test]
    fn segment_distance_clamps_to_endpoint() {
        let a = pt(0.0, 0.0);
        let b = pt(0.0, 0.001);
        let p = pt(0.0, -0.001);
        assert_abs_diff_eq!(distance_to_segment(p, a, b), haversine_distance(p, a), epsilon = 1e-9);
    }

    #[test]
    fn polyline_distance_picks_nearest_segment() {
        // L-shaped line: east then north
        let line = vec![pt(48.0, 16.0), pt(48.0, 17.0), pt(49.0, 17.0)];
        let pos = pt(48.5, 17.001);

        let d = distance_to_polyline(pos, &line).unwrap();
        assert!(d < 100.0, "got {d}");

        let proj = project_on_polyline(pos, &line).unwrap();
        assert_eq!(proj.segment_index, 1);
        assert!((proj.point.longitude - 17.0).abs() < 1e-6);
    }

    #[test]
    fn polyline_needs_two_points() {
        assert!(distance_to_polyline(pt(0.0, 0.0), &[pt(0.0, 0.0)]).is_none());
        assert!(project_on_polyline(pt(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = pt(0.0, 0.0);
        assert_abs_diff_eq!(bearing(origin, pt(1.0, 0.0)), 0.0, epsilon = 0.1);
        assert_abs_diff_eq!(bearing(origin, pt(0.0, 1.0)), 90.0, epsilon = 0.1);
        assert_abs_diff_eq!(bearing(origin, pt(-1.0, 0.0)), 180.0, epsilon = 0.1);
        assert_abs_diff_eq!(bearing(origin, pt(0.0, -1.0)), 270.0, epsilon = 0.1);
    }

    #[test]
    fn normalize_wraps_into_range() {
        assert_eq!(normalize_heading(360.0), 0.0);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(725.0), 5.0);
        let tiny = normalize_heading(-1e-15);
        assert!((0.0..360.0).contains(&tiny));
    }

    #[test]
    fn heading_takes_short_path_across_north() {
        assert_abs_diff_eq!(interpolate_heading(350.0, 10.0, 1.0), 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(interpolate_heading(350.0, 10.0, 0.5), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(interpolate_heading(10.0, 350.0, 0.5), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn heading_delta_is_signed_and_short() {
        assert_abs_diff_eq!(heading_delta(350.0, 10.0), 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(heading_delta(10.0, 350.0), -20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(heading_delta(0.0, 180.0), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn heading_interpolates_without_wrap() {
        assert_abs_diff_eq!(interpolate_heading(90.0, 180.0, 0.5), 135.0, epsilon = 1e-9);
    }

    #[test]
    fn position_interpolation_is_linear_per_axis() {
        let next = interpolate_position(pt(0.0, 0.0), pt(1.0, 2.0), 0.25);
        assert_abs_diff_eq!(next.latitude, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(next.longitude, 0.5, epsilon = 1e-12);
    }
}
