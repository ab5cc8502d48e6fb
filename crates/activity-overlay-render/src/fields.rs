//! Overlay field catalog: canonical order, labels, and value lookup.

use core::fmt;
use core::str::FromStr;

use activity_overlay::StatValues;
use serde::{Deserialize, Serialize};

/// One selectable overlay entry.
///
/// Variant order is the canonical render order; `Ord` follows it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum OverlayField {
    Distance,
    MovingTime,
    AvgSpeed,
    MaxSpeed,
    AvgPace,
    MaxPace,
    Ascent,
    Descent,
    MaxElevation,
    MinElevation,
    AvgElevation,
    RouteMap,
}

/// Every field in canonical order.
pub const OVERLAY_FIELD_ORDER: [OverlayField; 12] = [
    OverlayField::Distance,
    OverlayField::MovingTime,
    OverlayField::AvgSpeed,
    OverlayField::MaxSpeed,
    OverlayField::AvgPace,
    OverlayField::MaxPace,
    OverlayField::Ascent,
    OverlayField::Descent,
    OverlayField::MaxElevation,
    OverlayField::MinElevation,
    OverlayField::AvgElevation,
    OverlayField::RouteMap,
];

impl OverlayField {
    /// Human-readable label drawn above the value.
    pub fn label(self) -> &'static str {
        match self {
            Self::Distance => "Distance",
            Self::MovingTime => "Duration",
            Self::AvgSpeed => "Average Speed",
            Self::MaxSpeed => "Max Speed",
            Self::AvgPace => "Average Pace",
            Self::MaxPace => "Max Pace",
            Self::Ascent => "Uphill",
            Self::Descent => "Downhill",
            Self::MaxElevation => "Max Elevation",
            Self::MinElevation => "Min Elevation",
            Self::AvgElevation => "Average Elevation",
            Self::RouteMap => "Route Map",
        }
    }

    /// Serialized tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::MovingTime => "movingTime",
            Self::AvgSpeed => "avgSpeed",
            Self::MaxSpeed => "maxSpeed",
            Self::AvgPace => "avgPace",
            Self::MaxPace => "maxPace",
            Self::Ascent => "ascent",
            Self::Descent => "descent",
            Self::MaxElevation => "maxElevation",
            Self::MinElevation => "minElevation",
            Self::AvgElevation => "avgElevation",
            Self::RouteMap => "routeMap",
        }
    }

    /// The display string for a text field, or `None` when absent.
    ///
    /// `RouteMap` never has a text value.
    pub fn value(self, values: &StatValues) -> Option<&str> {
        match self {
            Self::Distance => Some(values.distance.as_str()),
            Self::MovingTime => Some(values.moving_time.as_str()),
            Self::AvgSpeed => Some(values.avg_speed.as_str()),
            Self::MaxSpeed => Some(values.max_speed.as_str()),
            Self::AvgPace => values.avg_pace.as_deref(),
            Self::MaxPace => values.max_pace.as_deref(),
            Self::Ascent => Some(values.ascent.as_str()),
            Self::Descent => Some(values.descent.as_str()),
            Self::MaxElevation => values.max_elevation.as_deref(),
            Self::MinElevation => values.min_elevation.as_deref(),
            Self::AvgElevation => values.avg_elevation.as_deref(),
            Self::RouteMap => None,
        }
    }
}

impl fmt::Display for OverlayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown field tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownOverlayField(pub Box<str>);

impl fmt::Display for UnknownOverlayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown overlay field {:?}", self.0)
    }
}

impl std::error::Error for UnknownOverlayField {}

impl FromStr for OverlayField {
    type Err = UnknownOverlayField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        OVERLAY_FIELD_ORDER
            .iter()
            .copied()
            .find(|field| field.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownOverlayField(trimmed.into()))
    }
}

/// Sort a caller selection into canonical order and drop duplicates.
pub fn canonical_fields(selected: &[OverlayField]) -> Vec<OverlayField> {
    let mut fields = selected.to_vec();
    fields.sort_unstable();
    fields.dedup();
    fields
}
