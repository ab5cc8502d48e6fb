//! Raw and display-ready activity statistics.

/// One GPS fix of a route, in decimal degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
}

impl RoutePoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the WGS84 coordinate ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Numeric statistics produced by the activity decoders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawStats {
    /// Total distance in meters.
    pub distance_m: f64,
    /// Moving time in seconds.
    pub moving_time_s: f64,
    /// Average moving speed in meters per second.
    pub avg_speed_mps: f64,
    /// Maximum plausible speed in meters per second.
    pub max_speed_mps: f64,
    /// Accumulated elevation gain in meters.
    pub ascent_m: f64,
    /// Accumulated elevation loss in meters, as a positive number.
    pub descent_m: f64,
    pub max_elevation_m: Option<f64>,
    pub min_elevation_m: Option<f64>,
    pub avg_elevation_m: Option<f64>,
    /// Positioned track points in recording order.
    pub route_points: Vec<RoutePoint>,
    pub track_name: Option<String>,
    pub track_description: Option<String>,
}

impl RawStats {
    /// Whether the source carried any elevation samples.
    pub fn has_elevation_data(&self) -> bool {
        self.max_elevation_m.is_some() || self.ascent_m > 0.0 || self.descent_m > 0.0
    }
}

/// Pre-formatted display strings consumed by the overlay renderer.
///
/// Optional fields are absent when the source had no usable data for them;
/// absent fields are never rendered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatValues {
    pub distance: String,
    pub moving_time: String,
    pub avg_speed: String,
    pub max_speed: String,
    pub avg_pace: Option<String>,
    pub max_pace: Option<String>,
    pub ascent: String,
    pub descent: String,
    pub max_elevation: Option<String>,
    pub min_elevation: Option<String>,
    pub avg_elevation: Option<String>,
    /// Route polyline; empty when the activity has no positions.
    pub route_points: Vec<RoutePoint>,
    pub track_name: Option<String>,
    pub track_description: Option<String>,
}

impl StatValues {
    pub fn has_route(&self) -> bool {
        !self.route_points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_point_validity_checks_ranges_and_finiteness() {
        assert!(RoutePoint::new(45.0, 7.5).is_valid());
        assert!(RoutePoint::new(-90.0, 180.0).is_valid());
        assert!(!RoutePoint::new(90.5, 0.0).is_valid());
        assert!(!RoutePoint::new(0.0, -180.1).is_valid());
        assert!(!RoutePoint::new(f64::NAN, 0.0).is_valid());
        assert!(!RoutePoint::new(0.0, f64::INFINITY).is_valid());
    }
}
