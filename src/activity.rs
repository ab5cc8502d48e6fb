//! Activity file detection and decoding entry points.

use core::fmt;
use std::ops::ControlFlow;
use std::path::Path;

use crate::error::DecodeError;
use crate::gpx::parse_gpx;
use crate::stats::RawStats;
use crate::tcx::parse_tcx;
use crate::track::summarize;
use crate::xml::{walk, XmlEvent};

/// Supported activity file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivityFormat {
    Gpx,
    Tcx,
}

impl ActivityFormat {
    /// Stable lowercase name, also the usual file extension.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpx => "gpx",
            Self::Tcx => "tcx",
        }
    }

    /// Guess the format from a file name extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("gpx") {
            Some(Self::Gpx)
        } else if ext.eq_ignore_ascii_case("tcx") {
            Some(Self::Tcx)
        } else {
            None
        }
    }

    /// Guess the format from a MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/gpx+xml" => Some(Self::Gpx),
            "application/vnd.garmin.tcx+xml" => Some(Self::Tcx),
            _ => None,
        }
    }

    /// Sniff the format from the document's root element.
    pub fn detect(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut root: Option<String> = None;
        walk(bytes, None, |event| {
            if let XmlEvent::Open { name, .. } = event {
                root = Some(name.to_string());
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;
        match root.as_deref() {
            Some("gpx") => Ok(Self::Gpx),
            Some("TrainingCenterDatabase") => Ok(Self::Tcx),
            Some(other) => Err(DecodeError::malformed(
                "UNKNOWN_FORMAT",
                format!("unsupported root element <{}>", other),
            )),
            None => Err(DecodeError::malformed(
                "EMPTY_DOCUMENT",
                "document has no root element",
            )),
        }
    }
}

impl fmt::Display for ActivityFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a GPX or TCX document into raw statistics.
///
/// The format is detected from the root element.
pub fn decode_activity(bytes: &[u8]) -> Result<RawStats, DecodeError> {
    let format = ActivityFormat::detect(bytes)?;
    decode_activity_as(format, bytes)
}

/// Decode a document whose format is already known.
pub fn decode_activity_as(format: ActivityFormat, bytes: &[u8]) -> Result<RawStats, DecodeError> {
    let stats = match format {
        ActivityFormat::Gpx => {
            let track = parse_gpx(bytes)?;
            summarize(&track)
        }
        ActivityFormat::Tcx => {
            let parsed = parse_tcx(bytes)?;
            let mut stats = summarize(&parsed.track);
            parsed.apply_device_totals(&mut stats);
            stats
        }
    };

    if stats.route_points.is_empty() && stats.distance_m <= 0.0 {
        return Err(DecodeError::no_position_data(format));
    }
    log::debug!(
        "{}: decoded {:.1} m over {:.0} s, {} route point(s)",
        format,
        stats.distance_m,
        stats.moving_time_s,
        stats.route_points.len()
    );
    Ok(stats)
}

/// Read and decode an activity file.
pub fn decode_activity_file(path: impl AsRef<Path>) -> Result<RawStats, DecodeError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| DecodeError::io(path.display().to_string(), &err))?;
    decode_activity(&bytes).map_err(|err| err.with_path(path.display().to_string()))
}

/// Read and decode an activity file using tokio's filesystem API.
#[cfg(feature = "async")]
pub async fn decode_activity_file_async(
    path: impl AsRef<Path>,
) -> Result<RawStats, DecodeError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| DecodeError::io(path.display().to_string(), &err))?;
    decode_activity(&bytes).map_err(|err| err.with_path(path.display().to_string()))
}
