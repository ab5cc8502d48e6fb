//! Structured errors for activity decoding.

use core::fmt;

use crate::activity::ActivityFormat;

/// Broad failure class of a decode attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    /// The document is not well-formed XML or is not a known activity format.
    Malformed,
    /// The document parsed, but it contains no track or activity.
    NoTrackData,
    /// A track exists but carries neither positions nor distance.
    NoPositionData,
    /// Reading the activity file failed.
    Io,
}

impl DecodeErrorKind {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::NoTrackData => "no_track_data",
            Self::NoPositionData => "no_position_data",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`crate::decode_activity`] and the file helpers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    /// Failure class.
    pub kind: DecodeErrorKind,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Format detected before the failure, when known.
    pub format: Option<ActivityFormat>,
    /// Byte offset reported by the XML reader.
    pub offset: Option<usize>,
    /// File path for errors raised by the file helpers.
    pub path: Option<Box<str>>,
}

impl DecodeError {
    fn new(kind: DecodeErrorKind, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into().into_boxed_str(),
            format: None,
            offset: None,
            path: None,
        }
    }

    pub(crate) fn malformed(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::Malformed, code, message)
    }

    pub(crate) fn no_track_data(format: ActivityFormat) -> Self {
        let message = match format {
            ActivityFormat::Gpx => "no tracks found; the file may contain only waypoints",
            ActivityFormat::Tcx => "no activity with a track found",
        };
        Self::new(DecodeErrorKind::NoTrackData, "NO_TRACK_DATA", message).with_format(format)
    }

    pub(crate) fn no_position_data(format: ActivityFormat) -> Self {
        Self::new(
            DecodeErrorKind::NoPositionData,
            "NO_POSITION_DATA",
            "track contains no distance or position data",
        )
        .with_format(format)
    }

    pub(crate) fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::new(DecodeErrorKind::Io, "ACTIVITY_IO", err.to_string()).with_path(path)
    }

    pub(crate) fn with_format(mut self, format: ActivityFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub(crate) fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into().into_boxed_str());
        self
    }

    /// Returns true for malformed-document failures.
    pub fn is_malformed(&self) -> bool {
        self.kind == DecodeErrorKind::Malformed
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.kind, self.code, self.message)?;
        if let Some(format) = self.format {
            write!(f, " [format={}]", format)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " [offset={}]", offset)?;
        }
        if let Some(path) = self.path.as_deref() {
            write!(f, " [path={}]", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_context() {
        let err = DecodeError::malformed("XML_SYNTAX", "unexpected end of input")
            .with_format(ActivityFormat::Gpx)
            .with_offset(42);
        assert_eq!(
            err.to_string(),
            "malformed:XML_SYNTAX: unexpected end of input [format=gpx] [offset=42]"
        );
    }

    #[test]
    fn constructors_map_to_distinct_kinds() {
        assert_eq!(
            DecodeError::no_track_data(ActivityFormat::Tcx).kind,
            DecodeErrorKind::NoTrackData
        );
        assert_eq!(
            DecodeError::no_position_data(ActivityFormat::Gpx).kind,
            DecodeErrorKind::NoPositionData
        );
        assert!(DecodeError::malformed("X", "y").is_malformed());
    }
}
