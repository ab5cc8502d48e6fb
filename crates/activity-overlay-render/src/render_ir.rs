//! Backend-agnostic draw commands emitted by the overlay composer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Horizontal text alignment relative to a command's anchor x.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Resolved font request passed to text measurement and drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTextStyle {
    /// CSS-style family list; the first family is quoted when it contains spaces.
    pub family: Arc<str>,
    /// Numeric weight.
    pub weight: u16,
    /// Nominal size in pixels.
    pub size_px: f32,
}

impl ResolvedTextStyle {
    pub fn new(family: impl Into<Arc<str>>, weight: u16, size_px: f32) -> Self {
        Self {
            family: family.into(),
            weight,
            size_px,
        }
    }
}

/// Single-line text. `y` is the top of the line box.
#[derive(Clone, Debug, PartialEq)]
pub struct TextCommand {
    /// Anchor x; meaning depends on `align`.
    pub x: i32,
    /// Top y.
    pub y: i32,
    pub align: TextAlign,
    pub text: String,
    pub style: ResolvedTextStyle,
    pub color: Color,
    /// Opacity multiplier in `[0, 1]`.
    pub opacity: f32,
}

/// Filled rectangle with equal rounded corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundedRectCommand {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Corner radius, already limited to half the shorter side.
    pub radius: u32,
    pub color: Color,
    pub opacity: f32,
}

/// Sub-pixel point in canvas coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Blurred drop shadow with zero offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    pub color: Color,
    pub blur: f32,
}

/// Stroke end-cap style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
}

/// Open stroked path through `points`.
#[derive(Clone, Debug, PartialEq)]
pub struct PolylineCommand {
    pub points: Vec<PointF>,
    pub color: Color,
    pub width: f32,
    pub cap: LineCap,
    pub opacity: f32,
    pub shadow: Option<Shadow>,
}

impl PolylineCommand {
    /// Number of straight segments in the path.
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}

/// Filled circle with an optional outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleCommand {
    pub center: PointF,
    pub radius: f32,
    pub fill: Color,
    pub stroke: Option<(Color, f32)>,
    pub shadow: Option<Shadow>,
}

/// Decoded straight-alpha RGBA8 image.
#[derive(Clone, PartialEq, Eq)]
pub struct RgbaBitmap {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long.
    pub pixels: Vec<u8>,
}

impl RgbaBitmap {
    /// Returns `None` when `pixels` does not match the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (width > 0 && height > 0 && pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl core::fmt::Debug for RgbaBitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RgbaBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Bitmap blit, scaled by the backend to `width` x `height`.
#[derive(Clone, Debug, PartialEq)]
pub struct BitmapCommand {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub bitmap: Arc<RgbaBitmap>,
    pub opacity: f32,
    pub shadow: Option<Shadow>,
}

/// Layout output commands, executed in order.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Draw text.
    Text(TextCommand),
    /// Fill a rounded rectangle.
    RoundedRect(RoundedRectCommand),
    /// Stroke a polyline.
    Polyline(PolylineCommand),
    /// Draw a marker circle.
    Circle(CircleCommand),
    /// Blit an image.
    Bitmap(BitmapCommand),
}

/// Pixel box actually painted by an overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderResult {
    pub width: u32,
    pub height: u32,
    /// Left edge in canvas pixels.
    pub x: i32,
    /// Top edge in canvas pixels.
    pub y: i32,
}

impl RenderResult {
    /// Whether `(px, py)` falls inside the half-open box.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x
            && py >= self.y
            && i64::from(px) < i64::from(self.x) + i64::from(self.width)
            && i64::from(py) < i64::from(self.y) + i64::from(self.height)
    }

    /// Area of the intersection with another box.
    pub fn intersection_area(&self, other: &RenderResult) -> u64 {
        let left = i64::from(self.x).max(i64::from(other.x));
        let top = i64::from(self.y).max(i64::from(other.y));
        let right = (i64::from(self.x) + i64::from(self.width))
            .min(i64::from(other.x) + i64::from(other.width));
        let bottom = (i64::from(self.y) + i64::from(self.height))
            .min(i64::from(other.y) + i64::from(other.height));
        if right <= left || bottom <= top {
            return 0;
        }
        ((right - left) * (bottom - top)) as u64
    }

    pub fn overlaps(&self, other: &RenderResult) -> bool {
        self.intersection_area(other) > 0
    }
}

/// Commands for one overlay plus the box they occupy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayFrame {
    pub commands: Vec<DrawCommand>,
    pub result: RenderResult,
}

impl OverlayFrame {
    /// Iterate over text commands in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &TextCommand> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text(text) => Some(text),
            _ => None,
        })
    }

    /// Iterate over polylines in paint order.
    pub fn polylines(&self) -> impl Iterator<Item = &PolylineCommand> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Polyline(line) => Some(line),
            _ => None,
        })
    }
}
