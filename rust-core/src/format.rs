//! Human-readable distances and durations for spoken and displayed text.

pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

pub fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "N/A".to_string();
    }

    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;

    if hours > 0 {
        format!("{hours}h {minutes}min")
    } else {
        format!("{minutes} min")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_distance_meters() {
        assert_eq!(format_distance(150.4), "150 m");
        assert_eq!(format_distance(5.6), "6 m");
        assert_eq!(format_distance(999.0), "999 m");
    }

    #[test]
    fn format_distance_km() {
        assert_eq!(format_distance(2500.0), "2.5 km");
        assert_eq!(format_distance(1000.0), "1.0 km");
    }

    #[test]
    fn format_duration_minutes() {
        assert_eq!(format_duration(59.0), "0 min");
        assert_eq!(format_duration(600.0), "10 min");
    }

    #[test]
    fn format_duration_hours() {
        assert_eq!(format_duration(3900.0), "1h 5min");
    }

    #[test]
    fn format_duration_zero() {
        assert_eq!(format_duration(0.0), "N/A");
    }
}
