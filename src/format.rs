//! Unit conversion and display formatting of raw statistics.

use core::fmt;
use core::str::FromStr;

use crate::stats::{RawStats, StatValues};

const METERS_PER_MILE: f64 = 1609.344;
const FEET_PER_METER: f64 = 3.280_839_895;

/// Measurement system used for display strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    fn distance_unit(self) -> &'static str {
        match self {
            Self::Metric => "km",
            Self::Imperial => "mi",
        }
    }

    fn meters_per_distance_unit(self) -> f64 {
        match self {
            Self::Metric => 1000.0,
            Self::Imperial => METERS_PER_MILE,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized unit system name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownUnitSystem(pub Box<str>);

impl fmt::Display for UnknownUnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown unit system {:?} (expected metric or imperial)", self.0)
    }
}

impl std::error::Error for UnknownUnitSystem {}

impl FromStr for UnitSystem {
    type Err = UnknownUnitSystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            other => Err(UnknownUnitSystem(other.into())),
        }
    }
}

/// `H:MM:SS`, or `MM:SS` below one hour.
pub fn format_duration(total_seconds: f64) -> String {
    let total = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

pub fn format_distance(meters: f64, units: UnitSystem) -> String {
    format!(
        "{:.2} {}",
        meters / units.meters_per_distance_unit(),
        units.distance_unit()
    )
}

pub fn format_speed(meters_per_second: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{:.1} km/h", meters_per_second * 3.6),
        UnitSystem::Imperial => format!("{:.1} mph", meters_per_second * 3600.0 / METERS_PER_MILE),
    }
}

/// Pace as `M:SS /km` or `M:SS /mi`; `None` when not moving.
pub fn format_pace(meters_per_second: f64, units: UnitSystem) -> Option<String> {
    if !meters_per_second.is_finite() || meters_per_second <= 0.0 {
        return None;
    }
    let seconds_per_unit = units.meters_per_distance_unit() / meters_per_second;
    let total = seconds_per_unit.round() as u64;
    Some(format!(
        "{}:{:02} /{}",
        total / 60,
        total % 60,
        units.distance_unit()
    ))
}

pub fn format_elevation(meters: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{:.0} m", meters),
        UnitSystem::Imperial => format!("{:.0} ft", meters * FEET_PER_METER),
    }
}

/// Convert raw statistics into overlay display strings.
pub fn format_stats(raw: &RawStats, units: UnitSystem) -> StatValues {
    let max_pace = if raw.max_speed_mps > 0.0 {
        format_pace(raw.max_speed_mps, units)
    } else {
        None
    };
    StatValues {
        distance: format_distance(raw.distance_m, units),
        moving_time: format_duration(raw.moving_time_s),
        avg_speed: format_speed(raw.avg_speed_mps, units),
        max_speed: format_speed(raw.max_speed_mps, units),
        avg_pace: format_pace(raw.avg_speed_mps, units),
        max_pace,
        ascent: format_elevation(raw.ascent_m, units),
        descent: format_elevation(raw.descent_m, units),
        max_elevation: raw.max_elevation_m.map(|m| format_elevation(m, units)),
        min_elevation: raw.min_elevation_m.map(|m| format_elevation(m, units)),
        avg_elevation: raw.avg_elevation_m.map(|m| format_elevation(m, units)),
        route_points: raw.route_points.clone(),
        track_name: raw.track_name.clone(),
        track_description: raw.track_description.clone(),
    }
}

/// Build an export file name such as `evening-loop_10.00km_45-00.png`.
///
/// The track name wins over `base_name` when present. The first number in
/// the distance string and the digits of the duration are appended.
pub fn download_filename(base_name: &str, values: &StatValues, ext: &str) -> String {
    let mut base = if base_name.is_empty() {
        "overlay".to_string()
    } else {
        base_name.to_string()
    };
    if let Some(name) = values.track_name.as_deref().filter(|n| !n.trim().is_empty()) {
        base = slugify(name);
    }

    let mut parts: Vec<String> = Vec::with_capacity(3);
    if !base.is_empty() {
        parts.push(base);
    }
    if let Some(number) = first_number(&values.distance) {
        parts.push(format!("{}km", number));
    }
    let time_part = slugify_digits(&values.moving_time);
    if !time_part.is_empty() {
        parts.push(time_part);
    }
    format!("{}.{}", parts.join("_"), ext)
}

fn slugify(name: &str) -> String {
    join_runs(&name.to_lowercase(), |ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
}

fn slugify_digits(text: &str) -> String {
    join_runs(text, |ch| ch.is_ascii_digit())
}

/// Keep runs of accepted characters joined by single dashes.
fn join_runs(text: &str, keep: impl Fn(char) -> bool) -> String {
    text.split(|ch: char| !keep(ch))
        .filter(|run| !run.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn first_number(text: &str) -> Option<&str> {
    let start = text.find(|ch: char| ch.is_ascii_digit())?;
    let rest = &text[start..];
    let mut end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());
    if rest[end..].starts_with('.') {
        let fraction = &rest[end + 1..];
        let digits = fraction
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(fraction.len());
        if digits > 0 {
            end += 1 + digits;
        }
    }
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::RoutePoint;

    #[test]
    fn duration_drops_hours_below_one_hour() {
        assert_eq!(format_duration(2700.0), "45:00");
        assert_eq!(format_duration(59.9), "00:59");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_duration(-3.0), "00:00");
        assert_eq!(format_duration(f64::NAN), "00:00");
    }

    #[test]
    fn metric_and_imperial_strings() {
        assert_eq!(format_distance(10_000.0, UnitSystem::Metric), "10.00 km");
        assert_eq!(format_distance(1609.344, UnitSystem::Imperial), "1.00 mi");
        assert_eq!(format_speed(3.7, UnitSystem::Metric), "13.3 km/h");
        assert_eq!(format_speed(4.4704, UnitSystem::Imperial), "10.0 mph");
        assert_eq!(format_elevation(120.4, UnitSystem::Metric), "120 m");
        assert_eq!(format_elevation(100.0, UnitSystem::Imperial), "328 ft");
    }

    #[test]
    fn pace_rounds_whole_seconds_and_never_shows_sixty() {
        // 1000 m / 3.0 m/s = 333.33 s.
        assert_eq!(format_pace(3.0, UnitSystem::Metric).as_deref(), Some("5:33 /km"));
        // 1000 / 2.7778 = 359.99 s, which must carry into the minutes.
        assert_eq!(format_pace(2.7778, UnitSystem::Metric).as_deref(), Some("6:00 /km"));
        assert_eq!(format_pace(0.0, UnitSystem::Metric), None);
        assert!(format_pace(3.0, UnitSystem::Imperial)
            .is_some_and(|pace| pace.ends_with(" /mi")));
    }

    #[test]
    fn format_stats_omits_missing_optionals() {
        let raw = RawStats {
            distance_m: 10_000.0,
            moving_time_s: 2700.0,
            avg_speed_mps: 3.7,
            max_speed_mps: 0.0,
            ascent_m: 120.0,
            descent_m: 80.0,
            route_points: vec![RoutePoint::new(1.0, 2.0)],
            ..RawStats::default()
        };
        let values = format_stats(&raw, UnitSystem::Metric);
        assert_eq!(values.distance, "10.00 km");
        assert_eq!(values.moving_time, "45:00");
        assert_eq!(values.avg_speed, "13.3 km/h");
        assert_eq!(values.ascent, "120 m");
        assert_eq!(values.descent, "80 m");
        assert!(values.avg_pace.is_some());
        assert_eq!(values.max_pace, None);
        assert_eq!(values.max_elevation, None);
        assert!(values.has_route());
    }

    #[test]
    fn unit_system_parses_case_insensitively() {
        assert_eq!("Imperial".parse::<UnitSystem>(), Ok(UnitSystem::Imperial));
        assert!("furlongs".parse::<UnitSystem>().is_err());
    }

    #[test]
    fn download_filename_prefers_track_name() {
        let mut values = StatValues {
            distance: "10.00 km".to_string(),
            moving_time: "1:02:05".to_string(),
            ..StatValues::default()
        };
        assert_eq!(
            download_filename("IMG_0042", &values, "png"),
            "IMG_0042_10.00km_1-02-05.png"
        );
        values.track_name = Some("  Évening Loop #3 ".to_string());
        assert_eq!(
            download_filename("IMG_0042", &values, "jpg"),
            "vening-loop-3_10.00km_1-02-05.jpg"
        );
        assert_eq!(
            download_filename("", &StatValues::default(), "webp"),
            "overlay.webp"
        );
    }
}
