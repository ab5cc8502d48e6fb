//! GPX 1.0/1.1 track decoder.

use std::ops::ControlFlow;

use crate::activity::ActivityFormat;
use crate::error::DecodeError;
use crate::stats::RoutePoint;
use crate::track::{parse_timestamp_ms, ParsedTrack, TrackPoint};
use crate::xml::{attribute, parse_number, walk, XmlEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextField {
    Name,
    Description,
    Comment,
    Elevation,
    Time,
}

#[derive(Default)]
struct GpxState {
    saw_root: bool,
    stack: Vec<String>,
    in_track: bool,
    track: Option<ParsedTrack>,
    comment: Option<String>,
    point: Option<TrackPoint>,
    field: Option<TextField>,
    text: String,
}

impl GpxState {
    fn parent(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    fn open(
        &mut self,
        name: &str,
        attributes: &[(String, String)],
    ) -> Result<ControlFlow<()>, DecodeError> {
        if !self.saw_root {
            self.saw_root = true;
            if name != "gpx" {
                return Err(DecodeError::malformed(
                    "NOT_GPX",
                    format!("expected <gpx> root element, found <{}>", name),
                )
                .with_format(ActivityFormat::Gpx));
            }
        }

        if name == "trk" && self.track.is_none() && self.parent() == Some("gpx") {
            self.in_track = true;
            self.track = Some(ParsedTrack::default());
        } else if self.in_track {
            self.open_in_track(name, attributes);
        }
        self.stack.push(name.to_string());
        Ok(ControlFlow::Continue(()))
    }

    fn open_in_track(&mut self, name: &str, attributes: &[(String, String)]) {
        let parent_is_track = self.parent() == Some("trk");
        match name {
            "trkseg" => {
                if let Some(track) = self.track.as_mut() {
                    track.segments.push(Vec::new());
                }
            }
            "trkpt" => {
                let lat = attribute(attributes, "lat").and_then(|v| parse_number(v, "lat"));
                let lon = attribute(attributes, "lon").and_then(|v| parse_number(v, "lon"));
                self.point = Some(TrackPoint {
                    position: lat.zip(lon).map(|(lat, lon)| RoutePoint::new(lat, lon)),
                    ..TrackPoint::default()
                });
            }
            "ele" if self.point.is_some() => self.begin_text(TextField::Elevation),
            "time" if self.point.is_some() => self.begin_text(TextField::Time),
            "name" if parent_is_track => self.begin_text(TextField::Name),
            "desc" if parent_is_track => self.begin_text(TextField::Description),
            "cmt" if parent_is_track => self.begin_text(TextField::Comment),
            _ => {}
        }
    }

    fn begin_text(&mut self, field: TextField) {
        self.field = Some(field);
        self.text.clear();
    }

    fn close(&mut self, name: &str) -> ControlFlow<()> {
        self.stack.pop();
        if !self.in_track {
            return ControlFlow::Continue(());
        }
        if let Some(field) = self.field.take() {
            self.finish_text(field);
        }
        match name {
            "trkpt" => {
                if let (Some(point), Some(track)) = (self.point.take(), self.track.as_mut()) {
                    if track.segments.is_empty() {
                        track.segments.push(Vec::new());
                    }
                    if let Some(segment) = track.segments.last_mut() {
                        segment.push(point);
                    }
                }
            }
            "trk" if self.parent() == Some("gpx") => {
                self.in_track = false;
                return ControlFlow::Break(());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn finish_text(&mut self, field: TextField) {
        let value = self.text.trim();
        match field {
            TextField::Elevation => {
                if let Some(point) = self.point.as_mut() {
                    point.elevation_m = parse_number(value, "ele");
                }
            }
            TextField::Time => {
                if let Some(point) = self.point.as_mut() {
                    point.time_ms = parse_timestamp_ms(value);
                }
            }
            TextField::Name | TextField::Description | TextField::Comment => {
                let value = (!value.is_empty()).then(|| value.to_string());
                match field {
                    TextField::Name => {
                        if let Some(track) = self.track.as_mut() {
                            track.name = value;
                        }
                    }
                    TextField::Description => {
                        if let Some(track) = self.track.as_mut() {
                            track.description = value;
                        }
                    }
                    _ => self.comment = value,
                }
            }
        }
    }
}

/// Decode the first track of a GPX document.
pub(crate) fn parse_gpx(bytes: &[u8]) -> Result<ParsedTrack, DecodeError> {
    let mut state = GpxState::default();
    walk(bytes, Some(ActivityFormat::Gpx), |event| match event {
        XmlEvent::Open { name, attributes } => state.open(name, attributes),
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
                .with_format(ActivityFormat::Gpx),
        );
    }
    let comment = state.comment.take();
    let mut track = state
        .track
        .take()
        .ok_or_else(|| DecodeError::no_track_data(ActivityFormat::Gpx))?;
    if track.description.is_none() {
        track.description = comment;
    }
    log::debug!(
        "gpx: track {:?} with {} segment(s), {} positioned point(s)",
        track.name,
        track.segments.len(),
        track.positioned_count()
    );
    Ok(track)
}
