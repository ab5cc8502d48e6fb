//! Watermark placement and the caller-owned logo cache.

use std::sync::{Arc, OnceLock};

use crate::color::Color;
use crate::font::TextMeasurer;
use crate::render_ir::{
    BitmapCommand, DrawCommand, RenderResult, ResolvedTextStyle, RgbaBitmap, Shadow, TextAlign,
    TextCommand,
};

/// Text drawn when no logo is available.
pub const WATERMARK_TEXT: &str = "VelociView";
/// Average luma at or above which the dark logo variant is used.
pub const DARK_VARIANT_LUMA: f32 = 0.6;
/// Opacity of the text fallback.
pub const TEXT_WATERMARK_OPACITY: f32 = 0.85;
const TEXT_WATERMARK_WEIGHT: u16 = 600;
const FALLBACK_FAMILY: &str = "Inter";

/// Image corners tried for the watermark, in preference order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatermarkCorner {
    RightBottom,
    LeftBottom,
    LeftTop,
    RightTop,
}

impl WatermarkCorner {
    pub const CANDIDATES: [WatermarkCorner; 4] = [
        WatermarkCorner::RightBottom,
        WatermarkCorner::LeftBottom,
        WatermarkCorner::LeftTop,
        WatermarkCorner::RightTop,
    ];

    /// Box of `width` x `height` inset by `margin` into this corner.
    pub fn rect(
        self,
        image_w: u32,
        image_h: u32,
        width: u32,
        height: u32,
        margin: i32,
    ) -> RenderResult {
        let right = image_w as i32 - margin - width as i32;
        let bottom = image_h as i32 - margin - height as i32;
        let (x, y) = match self {
            Self::RightBottom => (right, bottom),
            Self::LeftBottom => (margin, bottom),
            Self::LeftTop => (margin, margin),
            Self::RightTop => (right, margin),
        };
        RenderResult {
            width,
            height,
            x,
            y,
        }
    }
}

/// Chosen watermark corner and box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatermarkPlacement {
    pub corner: WatermarkCorner,
    pub rect: RenderResult,
}

/// Distance kept between the watermark and the image edges.
pub fn watermark_margin(image_w: u32) -> i32 {
    ((image_w as f32 * 0.02).round() as i32).max(8)
}

/// Logo size for an image width and logo aspect ratio (width / height).
pub fn logo_size(image_w: u32, aspect: f32) -> (u32, u32) {
    let height = ((image_w as f32 * 0.028).round() as u32).clamp(14, 42);
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        4.0
    };
    let width = ((height as f32 * aspect).round() as u32).max(18);
    (width, height)
}

/// Text fallback size for an image width.
pub fn watermark_text_size(image_w: u32) -> f32 {
    (image_w as f32 * 0.016).round().clamp(12.0, 28.0)
}

/// Whether the dark logo reads better over a region of this average luma.
pub fn use_dark_variant(average_luma: f32) -> bool {
    average_luma >= DARK_VARIANT_LUMA
}

/// Rec. 709 luma of an RGB8 pixel in `[0, 1]`.
pub fn rec709_luma(r: u8, g: u8, b: u8) -> f32 {
    (0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b)) / 255.0
}

/// First corner whose box misses `avoid`, else the least overlapping one.
pub fn place_box(
    image_w: u32,
    image_h: u32,
    width: u32,
    height: u32,
    avoid: Option<&RenderResult>,
) -> WatermarkPlacement {
    let margin = watermark_margin(image_w);
    let candidates = WatermarkCorner::CANDIDATES.map(|corner| WatermarkPlacement {
        corner,
        rect: corner.rect(image_w, image_h, width, height, margin),
    });
    let Some(avoid) = avoid else {
        return candidates[0];
    };
    if let Some(free) = candidates.iter().find(|c| !c.rect.overlaps(avoid)) {
        return *free;
    }
    let mut best = candidates[0];
    let mut best_area = best.rect.intersection_area(avoid);
    for candidate in &candidates[1..] {
        let area = candidate.rect.intersection_area(avoid);
        if area < best_area {
            best = *candidate;
            best_area = area;
        }
    }
    log::debug!(
        "watermark overlaps the overlay in every corner; using {:?} ({} px overlap)",
        best.corner,
        best_area
    );
    best
}

/// Placement of a logo with the given aspect ratio.
pub fn place_watermark(
    image_w: u32,
    image_h: u32,
    aspect: f32,
    avoid: Option<&RenderResult>,
) -> WatermarkPlacement {
    let (width, height) = logo_size(image_w, aspect);
    place_box(image_w, image_h, width, height, avoid)
}

/// Light and dark logo variants; either may be missing.
#[derive(Clone, Debug, Default)]
pub struct WatermarkLogos {
    pub light: Option<Arc<RgbaBitmap>>,
    pub dark: Option<Arc<RgbaBitmap>>,
}

impl WatermarkLogos {
    pub fn is_empty(&self) -> bool {
        self.light.is_none() && self.dark.is_none()
    }

    /// Aspect ratio taken from the light logo, then the dark one.
    pub fn aspect(&self) -> Option<f32> {
        self.light
            .as_ref()
            .or(self.dark.as_ref())
            .map(|logo| logo.aspect())
    }

    /// The requested variant, falling back to the other one.
    pub fn select(&self, dark: bool) -> Option<&Arc<RgbaBitmap>> {
        if dark {
            self.dark.as_ref().or(self.light.as_ref())
        } else {
            self.light.as_ref().or(self.dark.as_ref())
        }
    }
}

/// Bitmap command for a logo drawn into a placement.
pub fn compose_logo_watermark(
    logo: Arc<RgbaBitmap>,
    placement: &WatermarkPlacement,
) -> DrawCommand {
    let height = placement.rect.height as f32;
    DrawCommand::Bitmap(BitmapCommand {
        x: placement.rect.x,
        y: placement.rect.y,
        width: placement.rect.width,
        height: placement.rect.height,
        bitmap: logo,
        opacity: 1.0,
        shadow: Some(Shadow {
            color: Color::black_alpha(0.35),
            blur: (height * 0.18).round(),
        }),
    })
}

/// Text watermark used when no logo is loaded.
pub fn compose_text_watermark(
    image_w: u32,
    image_h: u32,
    font_family: &str,
    avoid: Option<&RenderResult>,
    measurer: &dyn TextMeasurer,
) -> (DrawCommand, WatermarkPlacement) {
    let size = watermark_text_size(image_w);
    let style = ResolvedTextStyle::new(primary_family(font_family), TEXT_WATERMARK_WEIGHT, size);
    let measured = measurer.measure_text_px(WATERMARK_TEXT, &style);
    let width = if measured.is_finite() {
        measured.max(0.0).ceil() as u32
    } else {
        0
    };
    let placement = place_box(image_w, image_h, width, size.ceil() as u32, avoid);
    let command = DrawCommand::Text(TextCommand {
        x: placement.rect.x,
        y: placement.rect.y,
        align: TextAlign::Left,
        text: WATERMARK_TEXT.to_owned(),
        style,
        color: Color::WHITE,
        opacity: TEXT_WATERMARK_OPACITY,
    });
    (command, placement)
}

/// First family of a CSS list with quotes removed.
fn primary_family(font_family: &str) -> &str {
    let first = font_family
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    if first.is_empty() {
        FALLBACK_FAMILY
    } else {
        first
    }
}

/// Lazily loaded value shared across renders.
///
/// The first successful or failed load is kept; later loaders are never run.
#[derive(Debug)]
pub struct WatermarkCache<T> {
    cell: OnceLock<Option<T>>,
}

impl<T> Default for WatermarkCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WatermarkCache<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Return the cached value, running `load` only on first use.
    pub fn get_or_load(&self, load: impl FnOnce() -> Option<T>) -> Option<&T> {
        self.cell.get_or_init(load).as_ref()
    }

    /// Cached value without triggering a load.
    pub fn get(&self) -> Option<&T> {
        self.cell.get().and_then(Option::as_ref)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
