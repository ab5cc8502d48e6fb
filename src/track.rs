//! Statistics over decoded track points shared by the GPX and TCX decoders.

use chrono::{DateTime, NaiveDateTime};

use crate::stats::{RawStats, RoutePoint};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Segments slower than this do not count towards moving time.
pub const MOVING_SPEED_THRESHOLD_MPS: f64 = 0.5;
/// Upper bound for plausible speeds (150 km/h); faster samples are GPS noise.
pub const MAX_REALISTIC_SPEED_MPS: f64 = 41.67;
/// Max-speed samples are only taken across gaps shorter than this.
const MAX_SPEED_GAP_S: f64 = 5.0;
/// Tracks longer than this are sampled when scanning for max speed.
const MAX_SPEED_SAMPLE_TARGET: usize = 1000;

/// Great-circle distance in meters between two fixes.
pub fn haversine_m(a: RoutePoint, b: RoutePoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();
    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Parse an activity timestamp into Unix milliseconds.
///
/// Accepts RFC 3339 and, for files that omit the offset, a naive timestamp
/// interpreted as UTC.
pub(crate) fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp_millis());
    }
    match NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc().timestamp_millis()),
        Err(_) => {
            log::warn!("activity: ignoring unparsable timestamp {:?}", trimmed);
            None
        }
    }
}

/// One decoded sample. Fields are optional because both formats allow
/// points without position, elevation, or time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct TrackPoint {
    pub position: Option<RoutePoint>,
    pub elevation_m: Option<f64>,
    /// Unix time in milliseconds.
    pub time_ms: Option<i64>,
}

/// Format-neutral track representation built by the decoders.
#[derive(Clone, Debug, Default)]
pub(crate) struct ParsedTrack {
    pub name: Option<String>,
    pub description: Option<String>,
    pub segments: Vec<Vec<TrackPoint>>,
}

impl ParsedTrack {
    pub fn positioned_points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.segments
            .iter()
            .flatten()
            .filter(|point| point.position.is_some())
    }

    pub fn positioned_count(&self) -> usize {
        self.positioned_points().count()
    }
}

/// Compute raw stats from the parsed points.
pub(crate) fn summarize(track: &ParsedTrack) -> RawStats {
    let mut distance_m = 0.0;
    let mut moving_time_s = 0.0;
    let mut ascent_m = 0.0;
    let mut descent_m = 0.0;

    for segment in &track.segments {
        let mut prev: Option<&TrackPoint> = None;
        for point in segment.iter().filter(|p| p.position.is_some()) {
            if let Some(last) = prev {
                let step = step_distance(last, point);
                distance_m += step;
                if let Some(dt) = elapsed_s(last, point) {
                    if dt > 0.0 && step / dt >= MOVING_SPEED_THRESHOLD_MPS {
                        moving_time_s += dt;
                    }
                }
            }
            prev = Some(point);
        }

        let mut prev_ele: Option<f64> = None;
        for ele in segment.iter().filter_map(|p| p.elevation_m) {
            if let Some(last) = prev_ele {
                let delta = ele - last;
                if delta > 0.0 {
                    ascent_m += delta;
                } else {
                    descent_m -= delta;
                }
            }
            prev_ele = Some(ele);
        }
    }

    let (max_elevation_m, min_elevation_m, avg_elevation_m) = elevation_extremes(track);
    let avg_speed_mps = if moving_time_s > 0.0 {
        distance_m / moving_time_s
    } else {
        0.0
    };
    let route_points: Vec<RoutePoint> = track
        .positioned_points()
        .filter_map(|point| point.position)
        .collect();

    RawStats {
        distance_m,
        moving_time_s,
        avg_speed_mps,
        max_speed_mps: max_speed_mps(track),
        ascent_m,
        descent_m,
        max_elevation_m,
        min_elevation_m,
        avg_elevation_m,
        route_points,
        track_name: track.name.clone(),
        track_description: track.description.clone(),
    }
}

fn step_distance(a: &TrackPoint, b: &TrackPoint) -> f64 {
    match (a.position, b.position) {
        (Some(pa), Some(pb)) => haversine_m(pa, pb),
        _ => 0.0,
    }
}

fn elapsed_s(a: &TrackPoint, b: &TrackPoint) -> Option<f64> {
    let (ta, tb) = (a.time_ms?, b.time_ms?);
    Some(tb.saturating_sub(ta) as f64 / 1000.0)
}

fn max_speed_mps(track: &ParsedTrack) -> f64 {
    let points: Vec<&TrackPoint> = track.positioned_points().collect();
    let interval = if points.len() > MAX_SPEED_SAMPLE_TARGET {
        points.len() / MAX_SPEED_SAMPLE_TARGET
    } else {
        1
    };

    let mut max_speed = 0.0f64;
    let mut i = interval;
    while i < points.len() {
        let (p1, p2) = (points[i - 1], points[i]);
        if let Some(dt) = elapsed_s(p1, p2) {
            if dt > 0.0 && dt < MAX_SPEED_GAP_S {
                let speed = step_distance(p1, p2) / dt;
                if speed > max_speed && speed < MAX_REALISTIC_SPEED_MPS {
                    max_speed = speed;
                }
            }
        }
        i += interval;
    }
    max_speed
}

fn elevation_extremes(track: &ParsedTrack) -> (Option<f64>, Option<f64>, Option<f64>) {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    for ele in track.segments.iter().flatten().filter_map(|p| p.elevation_m) {
        count += 1;
        sum += ele;
        max = max.max(ele);
        min = min.min(ele);
    }
    if count == 0 {
        return (None, None, None);
    }
    (Some(max), Some(min), Some(sum / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64, ele: Option<f64>, t_s: Option<i64>) -> TrackPoint {
        TrackPoint {
            position: Some(RoutePoint::new(lat, lon)),
            elevation_m: ele,
            time_ms: t_s.map(|s| s * 1000),
        }
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive_utc() {
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_timestamp_ms("1970-01-01T01:00:01+01:00"), Some(1000));
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01.250"), Some(1250));
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:02"), Some(2000));
        assert_eq!(parse_timestamp_ms("yesterday"), None);
    }

    #[test]
    fn haversine_matches_one_degree_of_latitude() {
        let d = haversine_m(RoutePoint::new(0.0, 0.0), RoutePoint::new(1.0, 0.0));
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn summarize_accumulates_distance_elevation_and_moving_time() {
        // ~111 m steps, 20 s apart: moving at ~5.5 m/s.
        let track = ParsedTrack {
            name: Some("Morning Ride".to_string()),
            description: None,
            segments: vec![vec![
                point(0.0, 0.0, Some(100.0), Some(0)),
                point(0.001, 0.0, Some(110.0), Some(20)),
                point(0.002, 0.0, Some(105.0), Some(40)),
            ]],
        };
        let stats = summarize(&track);
        assert!((stats.distance_m - 222.39).abs() < 0.1);
        assert_eq!(stats.moving_time_s, 40.0);
        assert!((stats.avg_speed_mps - stats.distance_m / 40.0).abs() < 1e-9);
        assert_eq!(stats.ascent_m, 10.0);
        assert_eq!(stats.descent_m, 5.0);
        assert_eq!(stats.max_elevation_m, Some(110.0));
        assert_eq!(stats.min_elevation_m, Some(100.0));
        assert_eq!(stats.route_points.len(), 3);
        assert_eq!(stats.track_name.as_deref(), Some("Morning Ride"));
        // 20 s gaps are too long for a max-speed sample.
        assert_eq!(stats.max_speed_mps, 0.0);
    }

    #[test]
    fn stationary_intervals_do_not_count_as_moving() {
        let track = ParsedTrack {
            segments: vec![vec![
                point(0.0, 0.0, None, Some(0)),
                point(0.0, 0.0, None, Some(600)),
                point(0.0001, 0.0, None, Some(602)),
            ]],
            ..ParsedTrack::default()
        };
        let stats = summarize(&track);
        assert_eq!(stats.moving_time_s, 2.0);
        assert!(stats.max_speed_mps > 5.0 && stats.max_speed_mps < 6.0);
        assert_eq!(stats.max_elevation_m, None);
    }

    #[test]
    fn implausible_speed_is_ignored() {
        // ~1.1 km in one second.
        let track = ParsedTrack {
            segments: vec![vec![
                point(0.0, 0.0, None, Some(0)),
                point(0.01, 0.0, None, Some(1)),
            ]],
            ..ParsedTrack::default()
        };
        assert_eq!(summarize(&track).max_speed_mps, 0.0);
    }

    #[test]
    fn distance_is_not_bridged_between_segments() {
        let track = ParsedTrack {
            segments: vec![
                vec![point(0.0, 0.0, None, None), point(0.001, 0.0, None, None)],
                vec![point(1.0, 0.0, None, None), point(1.001, 0.0, None, None)],
            ],
            ..ParsedTrack::default()
        };
        let stats = summarize(&track);
        assert!((stats.distance_m - 222.39).abs() < 0.1);
        assert_eq!(stats.route_points.len(), 4);
    }
}
