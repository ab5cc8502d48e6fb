//! Garmin Training Center (TCX v2) activity decoder.

use std::ops::ControlFlow;

use crate::activity::ActivityFormat;
use crate::error::DecodeError;
use crate::stats::{RawStats, RoutePoint};
use crate::track::{parse_timestamp_ms, ParsedTrack, TrackPoint, MAX_REALISTIC_SPEED_MPS};
use crate::xml::{parse_number, walk, XmlEvent};

/// Device-computed totals summed over the laps of one activity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct LapTotals {
    pub total_time_s: Option<f64>,
    pub distance_m: Option<f64>,
    pub max_speed_mps: Option<f64>,
}

impl LapTotals {
    fn add_time(&mut self, value: f64) {
        *self.total_time_s.get_or_insert(0.0) += value;
    }

    fn add_distance(&mut self, value: f64) {
        *self.distance_m.get_or_insert(0.0) += value;
    }

    fn note_max_speed(&mut self, value: f64) {
        let current = self.max_speed_mps.get_or_insert(value);
        *current = current.max(value);
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ParsedTcx {
    pub track: ParsedTrack,
    pub laps: LapTotals,
    /// Last cumulative `DistanceMeters` reported by a trackpoint.
    pub last_cumulative_distance_m: Option<f64>,
    pub saw_track: bool,
}

impl ParsedTcx {
    /// Prefer device totals over values recomputed from the points.
    pub fn apply_device_totals(&self, stats: &mut RawStats) {
        if let Some(distance) = self.laps.distance_m.filter(|d| *d > 0.0) {
            stats.distance_m = distance;
        } else if let Some(distance) = self.last_cumulative_distance_m.filter(|d| *d > 0.0) {
            stats.distance_m = distance;
        }
        if let Some(total) = self.laps.total_time_s.filter(|t| *t > 0.0) {
            stats.moving_time_s = total;
        }
        stats.avg_speed_mps = if stats.moving_time_s > 0.0 {
            stats.distance_m / stats.moving_time_s
        } else {
            0.0
        };
        if let Some(lap_max) = self
            .laps
            .max_speed_mps
            .filter(|speed| *speed < MAX_REALISTIC_SPEED_MPS)
        {
            stats.max_speed_mps = stats.max_speed_mps.max(lap_max);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextField {
    Time,
    Latitude,
    Longitude,
    Altitude,
    PointDistance,
    LapTime,
    LapDistance,
    LapMaxSpeed,
    Notes,
}

#[derive(Default)]
struct TcxState {
    saw_root: bool,
    stack: Vec<String>,
    in_activity: bool,
    saw_activity: bool,
    parsed: ParsedTcx,
    point: Option<TrackPoint>,
    lat: Option<f64>,
    lon: Option<f64>,
    field: Option<TextField>,
    text: String,
}

impl TcxState {
    fn parent(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    fn open(&mut self, name: &str) -> Result<ControlFlow<()>, DecodeError> {
        if !self.saw_root {
            self.saw_root = true;
            if name != "TrainingCenterDatabase" {
                return Err(DecodeError::malformed(
                    "NOT_TCX",
                    format!("expected <TrainingCenterDatabase> root element, found <{}>", name),
                )
                .with_format(ActivityFormat::Tcx));
            }
        }

        if name == "Activity" && !self.saw_activity {
            self.in_activity = true;
            self.saw_activity = true;
        } else if self.in_activity {
            let parent = self.parent().unwrap_or_default().to_string();
            match (name, parent.as_str()) {
                ("Track", _) => {
                    self.parsed.saw_track = true;
                    self.parsed.track.segments.push(Vec::new());
                }
                ("Trackpoint", _) => {
                    self.point = Some(TrackPoint::default());
                    self.lat = None;
                    self.lon = None;
                }
                ("Time", "Trackpoint") => self.begin_text(TextField::Time),
                ("LatitudeDegrees", "Position") => self.begin_text(TextField::Latitude),
                ("LongitudeDegrees", "Position") => self.begin_text(TextField::Longitude),
                ("AltitudeMeters", "Trackpoint") => self.begin_text(TextField::Altitude),
                ("DistanceMeters", "Trackpoint") => self.begin_text(TextField::PointDistance),
                ("TotalTimeSeconds", "Lap") => self.begin_text(TextField::LapTime),
                ("DistanceMeters", "Lap") => self.begin_text(TextField::LapDistance),
                ("MaximumSpeed", "Lap") => self.begin_text(TextField::LapMaxSpeed),
                ("Notes", "Activity") => self.begin_text(TextField::Notes),
                _ => {}
            }
        }
        self.stack.push(name.to_string());
        Ok(ControlFlow::Continue(()))
    }

    fn begin_text(&mut self, field: TextField) {
        self.field = Some(field);
        self.text.clear();
    }

    fn close(&mut self, name: &str) -> ControlFlow<()> {
        self.stack.pop();
        if !self.in_activity {
            return ControlFlow::Continue(());
        }
        if let Some(field) = self.field.take() {
            self.finish_text(field);
        }
        match name {
            "Trackpoint" => {
                if let Some(mut point) = self.point.take() {
                    point.position = self
                        .lat
                        .zip(self.lon)
                        .map(|(lat, lon)| RoutePoint::new(lat, lon));
                    let segments = &mut self.parsed.track.segments;
                    if segments.is_empty() {
                        segments.push(Vec::new());
                    }
                    if let Some(segment) = segments.last_mut() {
                        segment.push(point);
                    }
                }
            }
            "Activity" => {
                self.in_activity = false;
                return ControlFlow::Break(());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn finish_text(&mut self, field: TextField) {
        let value = self.text.trim();
        match field {
            TextField::Time => {
                if let Some(point) = self.point.as_mut() {
                    point.time_ms = parse_timestamp_ms(value);
                }
            }
            TextField::Latitude => self.lat = parse_number(value, "LatitudeDegrees"),
            TextField::Longitude => self.lon = parse_number(value, "LongitudeDegrees"),
            TextField::Altitude => {
                if let Some(point) = self.point.as_mut() {
                    point.elevation_m = parse_number(value, "AltitudeMeters");
                }
            }
            TextField::PointDistance => {
                if let Some(distance) = parse_number(value, "DistanceMeters") {
                    self.parsed.last_cumulative_distance_m = Some(distance);
                }
            }
            TextField::LapTime => {
                if let Some(seconds) = parse_number(value, "TotalTimeSeconds") {
                    self.parsed.laps.add_time(seconds);
                }
            }
            TextField::LapDistance => {
                if let Some(distance) = parse_number(value, "DistanceMeters") {
                    self.parsed.laps.add_distance(distance);
                }
            }
            TextField::LapMaxSpeed => {
                if let Some(speed) = parse_number(value, "MaximumSpeed") {
                    self.parsed.laps.note_max_speed(speed);
                }
            }
            TextField::Notes => {
                if !value.is_empty() {
                    self.parsed.track.description = Some(value.to_string());
                }
            }
        }
    }
}

/// Decode the first activity of a TCX document.
pub(crate) fn parse_tcx(bytes: &[u8]) -> Result<ParsedTcx, DecodeError> {
    let mut state = TcxState::default();
    walk(bytes, Some(ActivityFormat::Tcx), |event| match event {
        XmlEvent::Open { name, .. } => state.open(name),
        XmlEvent::Text(text) => {
            if state.field.is_some() {
                state.text.push_str(text);
            }
            Ok(ControlFlow::Continue(()))
        }
        XmlEvent::Close { name } => Ok(state.close(name)),
    })?;

    if !state.saw_root {
        return Err(
            DecodeError::malformed("EMPTY_DOCUMENT", "document has no root element")
                .with_format(ActivityFormat::Tcx),
        );
    }
    if !state.saw_activity || !state.parsed.saw_track {
        return Err(DecodeError::no_track_data(ActivityFormat::Tcx));
    }
    log::debug!(
        "tcx: {} track segment(s), {} positioned point(s), laps {:?}",
        state.parsed.track.segments.len(),
        state.parsed.track.positioned_count(),
        state.parsed.laps
    );
    Ok(state.parsed)
}
