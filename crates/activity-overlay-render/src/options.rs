//! Overlay styling options and their JSON form.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::fields::OverlayField;
use crate::render_ir::TextAlign;

/// Default family list used when the caller does not pick one.
pub const DEFAULT_FONT_FAMILY: &str = "Inter, system-ui, Arial, sans-serif";
/// Distance from the canvas edges used by [`PositionPreset`].
pub const PRESET_MARGIN: f32 = 0.05;

/// Normalized anchor, as a fraction of the slack space on each axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp both axes into `[0, 1]`; NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self {
            x: unit_clamp(self.x),
            y: unit_clamp(self.y),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        PositionPreset::BottomLeft.to_position(PRESET_MARGIN)
    }
}

pub(crate) fn unit_clamp(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Named anchor positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionPreset {
    #[serde(rename = "top")]
    Top,
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "center")]
    Center,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "bottom")]
    Bottom,
    #[serde(rename = "top left")]
    TopLeft,
    #[serde(rename = "top right")]
    TopRight,
    #[serde(rename = "bottom left")]
    BottomLeft,
    #[serde(rename = "bottom right")]
    BottomRight,
}

impl PositionPreset {
    pub const ALL: [PositionPreset; 9] = [
        Self::Top,
        Self::Left,
        Self::Center,
        Self::Right,
        Self::Bottom,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::TopLeft => "top left",
            Self::TopRight => "top right",
            Self::BottomLeft => "bottom left",
            Self::BottomRight => "bottom right",
        }
    }

    /// Anchor `margin` away from the edges the preset names.
    pub fn to_position(self, margin: f32) -> Position {
        let near = margin;
        let far = 1.0 - margin;
        let (x, y) = match self {
            Self::Center => (0.5, 0.5),
            Self::Top => (0.5, near),
            Self::Bottom => (0.5, far),
            Self::Left => (near, 0.5),
            Self::Right => (far, 0.5),
            Self::TopLeft => (near, near),
            Self::TopRight => (far, near),
            Self::BottomLeft => (near, far),
            Self::BottomRight => (far, far),
        };
        Position::new(x, y)
    }
}

impl FromStr for PositionPreset {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str() == normalized)
            .ok_or_else(|| OptionsError::UnknownValue {
                option: "position preset",
                value: s.trim().into(),
            })
    }
}

/// Panel background style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    Transparent,
    #[default]
    Dark,
}

/// Arrangement of overlay items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// One item per row.
    #[default]
    List,
    /// Near-square grid of at most four columns.
    Auto,
    /// Grid with `grid_columns` columns.
    Fixed,
}

/// Where the route mini-map goes when selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapPosition {
    Top,
    Left,
    Right,
    Bottom,
    /// Interleaved with the stats as a regular cell.
    #[default]
    Grid,
}

/// Styling and selection for one overlay render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayOptions {
    /// Selected fields; order and duplicates are ignored.
    pub selected_fields: Vec<OverlayField>,
    pub position: Position,
    /// Size multiplier; 1.0 renders values at 32 px before compensation.
    pub scale: f32,
    pub font_family: String,
    /// Text and mini-map color.
    pub primary_color: Color,
    /// Background panel color.
    pub secondary_color: Color,
    pub background_mode: BackgroundMode,
    pub background_opacity: f32,
    pub text_align: TextAlign,
    #[serde(alias = "gridMode")]
    pub layout_mode: LayoutMode,
    /// Column count for [`LayoutMode::Fixed`]; values below 1 act as 1.
    pub grid_columns: u32,
    /// Horizontal gap multiplier for grid layouts.
    pub grid_gap_x: f32,
    /// Vertical gap multiplier for grid layouts.
    pub grid_gap_y: f32,
    pub map_position: MapPosition,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            selected_fields: vec![
                OverlayField::Distance,
                OverlayField::MovingTime,
                OverlayField::AvgSpeed,
            ],
            position: Position::default(),
            scale: 1.0,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            primary_color: Color::WHITE,
            secondary_color: Color::BLACK,
            background_mode: BackgroundMode::Dark,
            background_opacity: 0.5,
            text_align: TextAlign::Left,
            layout_mode: LayoutMode::List,
            grid_columns: 2,
            grid_gap_x: 1.0,
            grid_gap_y: 1.0,
            map_position: MapPosition::Grid,
        }
    }
}

impl OverlayOptions {
    /// Parse options from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(json).map_err(OptionsError::Json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> Result<String, OptionsError> {
        serde_json::to_string_pretty(self).map_err(OptionsError::Json)
    }

    /// Background opacity limited to `[0, 1]`.
    pub fn effective_background_opacity(&self) -> f32 {
        unit_clamp(self.background_opacity)
    }

    /// Scale with non-finite or negative values treated as 0.
    pub fn effective_scale(&self) -> f32 {
        if self.scale.is_finite() {
            self.scale.max(0.0)
        } else {
            0.0
        }
    }

    pub fn effective_grid_columns(&self) -> usize {
        self.grid_columns.max(1) as usize
    }

    pub fn with_fields(mut self, fields: &[OverlayField]) -> Self {
        self.selected_fields = fields.to_vec();
        self
    }

    pub fn with_preset(mut self, preset: PositionPreset) -> Self {
        self.position = preset.to_position(PRESET_MARGIN);
        self
    }
}

/// Full-frame route styling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteOptions {
    /// Multiplier over the fit-to-image scale.
    pub scale: f32,
    /// Route center as a fraction of the image size.
    pub position: Position,
    pub color: Color,
    /// Base stroke width; grows with the image width.
    pub line_width: f32,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            scale: 0.8,
            position: Position::new(0.5, 0.5),
            color: Color::rgb(0xFC, 0x4C, 0x02),
            line_width: 3.0,
        }
    }
}

impl RouteOptions {
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(json).map_err(OptionsError::Json)
    }
}

/// Error raised while loading options.
#[derive(Debug)]
pub enum OptionsError {
    /// Invalid JSON or a value of the wrong shape.
    Json(serde_json::Error),
    /// A named value that is not recognized.
    UnknownValue {
        option: &'static str,
        value: Box<str>,
    },
}

impl OptionsError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Json(_) => "OPTIONS_JSON",
            Self::UnknownValue { .. } => "OPTIONS_UNKNOWN_VALUE",
        }
    }
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid overlay options: {}", err),
            Self::UnknownValue { option, value } => {
                write!(f, "unknown {} {:?}", option, value)
            }
        }
    }
}

impl std::error::Error for OptionsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::UnknownValue { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let opts = OverlayOptions::from_json_str("{}").expect("parse");
        assert_eq!(opts, OverlayOptions::default());
        assert_eq!(opts.layout_mode, LayoutMode::List);
        assert_eq!(opts.map_position, MapPosition::Grid);
        assert_eq!(opts.grid_gap_x, 1.0);
    }

    #[test]
    fn json_uses_camel_case_and_lowercase_enums() {
        let opts = OverlayOptions::from_json_str(
            r##"{
                "selectedFields": ["maxSpeed", "distance", "routeMap"],
                "position": {"x": 1.0, "y": 0.0},
                "primaryColor": "#ff0000",
                "backgroundMode": "transparent",
                "textAlign": "right",
                "gridMode": "fixed",
                "gridColumns": 3,
                "mapPosition": "left"
            }"##,
        )
        .expect("parse");
        assert_eq!(opts.selected_fields.len(), 3);
        assert_eq!(opts.primary_color, Color::rgb(255, 0, 0));
        assert_eq!(opts.background_mode, BackgroundMode::Transparent);
        assert_eq!(opts.text_align, TextAlign::Right);
        assert_eq!(opts.layout_mode, LayoutMode::Fixed);
        assert_eq!(opts.effective_grid_columns(), 3);
        assert_eq!(opts.map_position, MapPosition::Left);
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = OverlayOptions::from_json_str(r#"{"layoutMode": "spiral"}"#)
            .expect_err("bad enum");
        assert!(matches!(err, OptionsError::Json(_)));
        assert_eq!(err.code(), "OPTIONS_JSON");
        assert!(err.to_string().starts_with("invalid overlay options"));
    }

    #[test]
    fn coercions_clamp_out_of_range_values() {
        let opts = OverlayOptions {
            background_opacity: 3.0,
            grid_columns: 0,
            scale: f32::NAN,
            ..OverlayOptions::default()
        };
        assert_eq!(opts.effective_background_opacity(), 1.0);
        assert_eq!(opts.effective_grid_columns(), 1);
        assert_eq!(opts.effective_scale(), 0.0);
        assert_eq!(
            Position::new(-1.0, f32::NAN).clamped(),
            Position::new(0.0, 0.0)
        );
    }

    #[test]
    fn presets_use_margin_from_named_edges() {
        assert_eq!(
            PositionPreset::Center.to_position(PRESET_MARGIN),
            Position::new(0.5, 0.5)
        );
        assert_eq!(
            PositionPreset::TopRight.to_position(0.25),
            Position::new(0.75, 0.25)
        );
        assert_eq!(
            "Bottom-Left".parse::<PositionPreset>().expect("preset"),
            PositionPreset::BottomLeft
        );
        assert!("middle".parse::<PositionPreset>().is_err());
    }
}
