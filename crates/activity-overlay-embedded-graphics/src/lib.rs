//! embedded-graphics renderer for `activity-overlay-render` frames.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod canvas;
mod logo;

use activity_overlay_render::{
    compose_route, BitmapCommand, CircleCommand, Color, DrawCommand, LineCap, OverlayComposer,
    OverlayFrame, OverlayOptions, PointF, PolylineCommand, RenderResult, ResolvedTextStyle,
    RoundedRectCommand, RouteOptions, RoutePoint, StatValues, TextAlign, TextCommand,
    TextMeasurer,
};
use embedded_graphics::{
    mono_font::{
        ascii::{
            FONT_10X20, FONT_5X8, FONT_6X10, FONT_6X12, FONT_6X13_BOLD, FONT_7X14,
            FONT_7X14_BOLD, FONT_9X15_BOLD, FONT_9X18, FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{
        Circle, Polyline, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle,
        StrokeAlignment,
    },
    text::{Baseline, Text},
};
use std::borrow::Cow;
use std::sync::Arc;

pub use canvas::{BlendTarget, RgbCanvas};
pub use logo::{
    decode_logo, draw_watermark, load_logo, load_watermark_logos, resize_logo, LogoError,
};

use canvas::CoverageMask;

/// Backend-local font identifier: face index in the high nibble, integer
/// scale in the low one.
pub type FontId = u8;

/// Why style-to-font mapping had to fallback to a default face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFallbackReason {
    UnknownFamily,
    UnsupportedWeight,
    SizeBelowSmallestFace,
}

/// Resolved font selection for a text style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontSelection {
    pub font_id: FontId,
    pub fallback_reason: Option<FontFallbackReason>,
}

/// Backend-provided metrics for a specific font id, scale applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontMetrics {
    pub char_width: i32,
    pub space_width: i32,
    pub line_height: u32,
}

impl FontMetrics {
    /// Advance width of already-normalized text.
    pub fn text_width(&self, text: &str) -> i32 {
        text.chars()
            .map(|ch| {
                if ch == ' ' {
                    self.space_width
                } else {
                    self.char_width
                }
            })
            .sum()
    }
}

/// Font backend abstraction for style resolution, metrics, and drawing.
pub trait FontBackend {
    /// Resolve a style to a backend font id.
    fn resolve_font(&self, style: &ResolvedTextStyle) -> FontSelection;

    /// Return metrics for a resolved font id.
    fn metrics(&self, font_id: FontId) -> FontMetrics;

    /// Draw one text run with its top-left corner at `origin`.
    ///
    /// Returns the advance width in pixels.
    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
        color: Rgb888,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Rgb888>;
}

const MAX_SCALE: u32 = 0x0F;
const REGULAR_FACES: [u8; 6] = [0, 1, 2, 3, 4, 5];
const BOLD_FACES: [u8; 4] = [6, 7, 8, 9];
const BOLD_WEIGHT: u16 = 700;
const GENERIC_FAMILIES: [&str; 6] = [
    "sans-serif",
    "serif",
    "monospace",
    "system-ui",
    "ui-sans-serif",
    "ui-monospace",
];

fn face(index: u8) -> Option<&'static MonoFont<'static>> {
    let font = match index {
        0 => &FONT_5X8,
        1 => &FONT_6X10,
        2 => &FONT_6X12,
        3 => &FONT_7X14,
        4 => &FONT_9X18,
        5 => &FONT_10X20,
        6 => &FONT_6X13_BOLD,
        7 => &FONT_7X14_BOLD,
        8 => &FONT_9X15_BOLD,
        9 => &FONT_9X18_BOLD,
        _ => return None,
    };
    Some(font)
}

fn encode_font_id(face_index: u8, scale: u32) -> FontId {
    (face_index << 4) | scale.clamp(1, MAX_SCALE) as u8
}

fn decode_font_id(font_id: FontId) -> Option<(&'static MonoFont<'static>, u32)> {
    let scale = u32::from(font_id & 0x0F);
    if scale == 0 {
        return None;
    }
    face(font_id >> 4).map(|font| (font, scale))
}

/// Tallest rendering not exceeding `size_px`; on ties the lower scale wins.
fn choose_face(faces: &[u8], size_px: f32) -> Option<(u8, u32)> {
    let mut best: Option<(u8, u32, u32)> = None;
    for &index in faces {
        let Some(font) = face(index) else {
            continue;
        };
        let glyph_h = font.character_size.height.max(1);
        let scale = ((size_px / glyph_h as f32).floor() as u32).min(MAX_SCALE);
        if scale == 0 {
            continue;
        }
        let rendered = glyph_h * scale;
        let better = match best {
            None => true,
            Some((_, best_scale, best_h)) => {
                rendered > best_h || (rendered == best_h && scale < best_scale)
            }
        };
        if better {
            best = Some((index, scale, rendered));
        }
    }
    best.map(|(index, scale, _)| (index, scale))
}

fn family_supported(families: &str) -> bool {
    families.split(',').any(|family| {
        let family = family.trim().trim_matches(|c| c == '"' || c == '\'');
        GENERIC_FAMILIES
            .iter()
            .any(|generic| family.eq_ignore_ascii_case(generic))
    })
}

/// Built-in mono font backend.
///
/// Picks the tallest ASCII face that fits the requested pixel size and scales
/// it by whole pixels, so a glyph never exceeds the line the layout reserved.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFontBackend;

impl FontBackend for MonoFontBackend {
    fn resolve_font(&self, style: &ResolvedTextStyle) -> FontSelection {
        let size = if style.size_px.is_finite() {
            style.size_px.max(0.0)
        } else {
            0.0
        };
        let mut fallback_reason =
            (!family_supported(&style.family)).then_some(FontFallbackReason::UnknownFamily);
        let mut pick = if style.weight >= BOLD_WEIGHT {
            choose_face(&BOLD_FACES, size)
        } else {
            choose_face(&REGULAR_FACES, size)
        };
        if pick.is_none() && style.weight >= BOLD_WEIGHT {
            fallback_reason = fallback_reason.or(Some(FontFallbackReason::UnsupportedWeight));
            pick = choose_face(&REGULAR_FACES, size);
        }
        let (index, scale) = pick.unwrap_or_else(|| {
            fallback_reason = fallback_reason.or(Some(FontFallbackReason::SizeBelowSmallestFace));
            (REGULAR_FACES[0], 1)
        });
        FontSelection {
            font_id: encode_font_id(index, scale),
            fallback_reason,
        }
    }

    fn metrics(&self, font_id: FontId) -> FontMetrics {
        let (font, scale) = decode_font_id(font_id).unwrap_or((&FONT_5X8, 1));
        let advance = ((font.character_size.width + font.character_spacing) * scale) as i32;
        FontMetrics {
            char_width: advance,
            space_width: advance,
            line_height: font.character_size.height * scale,
        }
    }

    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
        color: Rgb888,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let (font, scale) = decode_font_id(font_id).unwrap_or((&FONT_5X8, 1));
        let style = MonoTextStyle::new(font, color);
        let run = Text::with_baseline(text, origin, style, Baseline::Top);
        let end = if scale == 1 {
            run.draw(display)?
        } else {
            let mut scaled = ScaledTarget {
                inner: display,
                origin,
                scale,
            };
            run.draw(&mut scaled)?
        };
        Ok((end.x - origin.x) * scale as i32)
    }
}

/// Upscales every pixel drawn relative to `origin` into a square block.
struct ScaledTarget<'a, D> {
    inner: &'a mut D,
    origin: Point,
    scale: u32,
}

impl<D: DrawTarget> Dimensions for ScaledTarget<'_, D> {
    fn bounding_box(&self) -> Rectangle {
        self.inner.bounding_box()
    }
}

impl<D: DrawTarget> DrawTarget for ScaledTarget<'_, D> {
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let block = Size::new(self.scale, self.scale);
        for Pixel(point, color) in pixels {
            let top_left = self.origin + (point - self.origin) * self.scale as i32;
            self.inner
                .fill_solid(&Rectangle::new(top_left, block), color)?;
        }
        Ok(())
    }
}

/// Text measurer backed by the embedded-graphics font metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct EgTextMeasurer<B = MonoFontBackend> {
    backend: B,
}

impl EgTextMeasurer<MonoFontBackend> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measurer as a shared trait object for [`OverlayComposer`].
    pub fn shared() -> Arc<dyn TextMeasurer> {
        Arc::new(Self::new())
    }
}

impl<B> EgTextMeasurer<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }
}

impl<B> TextMeasurer for EgTextMeasurer<B>
where
    B: FontBackend + Send + Sync,
{
    fn measure_text_px(&self, text: &str, style: &ResolvedTextStyle) -> f32 {
        let selection = self.backend.resolve_font(style);
        let metrics = self.backend.metrics(selection.font_id);
        metrics.text_width(&normalize_text_for_mono(text)) as f32
    }
}

/// Overlay composer measuring with the built-in mono fonts.
///
/// Layout widths then match what [`EgRenderer`] draws.
pub fn embedded_composer() -> OverlayComposer {
    OverlayComposer::new(EgTextMeasurer::shared())
}

/// Backend renderer options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EgRenderConfig {
    /// Draw shadows as wider translucent strokes under lines and markers.
    pub draw_shadows: bool,
}

impl Default for EgRenderConfig {
    fn default() -> Self {
        Self { draw_shadows: true }
    }
}

/// Per-call counters reported by [`EgRenderer::render_commands`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EgRenderDiagnostics {
    pub commands: usize,
    pub text_fallbacks: usize,
    /// Commands with nothing visible on the target.
    pub skipped: usize,
}

/// Draw-command executor for blendable RGB targets.
#[derive(Clone, Debug, Default)]
pub struct EgRenderer<B = MonoFontBackend> {
    cfg: EgRenderConfig,
    backend: B,
}

impl EgRenderer<MonoFontBackend> {
    pub fn new(cfg: EgRenderConfig) -> Self {
        Self::with_backend(cfg, MonoFontBackend)
    }
}

impl<B> EgRenderer<B>
where
    B: FontBackend,
{
    pub fn with_backend(cfg: EgRenderConfig, backend: B) -> Self {
        Self { cfg, backend }
    }

    pub fn config(&self) -> EgRenderConfig {
        self.cfg
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Execute commands in order.
    pub fn render_commands<D>(
        &self,
        commands: &[DrawCommand],
        display: &mut D,
    ) -> Result<EgRenderDiagnostics, D::Error>
    where
        D: BlendTarget,
    {
        let mut diag = EgRenderDiagnostics::default();
        for cmd in commands {
            diag.commands += 1;
            if !self.draw_command(display, cmd, &mut diag)? {
                diag.skipped += 1;
            }
        }
        log::trace!(
            "rendered {} commands ({} skipped, {} text fallbacks)",
            diag.commands,
            diag.skipped,
            diag.text_fallbacks
        );
        Ok(diag)
    }

    /// Execute a composed overlay and return the box it occupies.
    pub fn render_frame<D>(
        &self,
        frame: &OverlayFrame,
        display: &mut D,
    ) -> Result<RenderResult, D::Error>
    where
        D: BlendTarget,
    {
        self.render_commands(&frame.commands, display)?;
        Ok(frame.result)
    }

    fn draw_command<D>(
        &self,
        display: &mut D,
        cmd: &DrawCommand,
        diag: &mut EgRenderDiagnostics,
    ) -> Result<bool, D::Error>
    where
        D: BlendTarget,
    {
        match cmd {
            DrawCommand::Text(text) => self.draw_text(display, text, diag),
            DrawCommand::RoundedRect(rect) => draw_rounded_rect(display, rect),
            DrawCommand::Polyline(line) => self.draw_polyline(display, line),
            DrawCommand::Circle(circle) => self.draw_circle(display, circle),
            DrawCommand::Bitmap(bitmap) => self.draw_bitmap(display, bitmap),
        }
    }

    fn draw_text<D>(
        &self,
        display: &mut D,
        cmd: &TextCommand,
        diag: &mut EgRenderDiagnostics,
    ) -> Result<bool, D::Error>
    where
        D: BlendTarget,
    {
        let selection = self.backend.resolve_font(&cmd.style);
        if let Some(reason) = selection.fallback_reason {
            diag.text_fallbacks += 1;
            log::trace!("text fallback {:?} for {:?}", reason, cmd.style.family);
        }
        let metrics = self.backend.metrics(selection.font_id);
        let text = normalize_text_for_mono(&cmd.text);
        let width = metrics.text_width(&text).max(0);
        let left = match cmd.align {
            TextAlign::Left => cmd.x,
            TextAlign::Center => cmd.x - width / 2,
            TextAlign::Right => cmd.x - width,
        };
        let origin = Point::new(left, cmd.y);
        let shape = Rectangle::new(origin, Size::new(width as u32, metrics.line_height));
        let Some(mut mask) = CoverageMask::clipped(shape, display.bounding_box()) else {
            return Ok(false);
        };
        let (color, alpha) = split_color(cmd.color, cmd.opacity);
        match self
            .backend
            .draw_text_run(&mut mask, selection.font_id, &text, origin, color)
        {
            Ok(_) => {}
            Err(never) => match never {},
        }
        mask.composite(display, color, alpha)?;
        Ok(true)
    }

    fn draw_polyline<D>(&self, display: &mut D, cmd: &PolylineCommand) -> Result<bool, D::Error>
    where
        D: BlendTarget,
    {
        if cmd.points.len() < 2 {
            return Ok(false);
        }
        let points: Vec<Point> = cmd.points.iter().map(|p| to_point(*p)).collect();
        let width = stroke_px(cmd.width);
        let round = cmd.cap == LineCap::Round;
        let clip = display.bounding_box();
        let mut drawn = false;

        if let Some(shadow) = cmd.shadow.filter(|_| self.cfg.draw_shadows) {
            let shadow_w = width + stroke_px(shadow.blur);
            if let Some(mut mask) = CoverageMask::clipped(points_bounds(&points, shadow_w), clip) {
                stroke_points(&mut mask, &points, shadow_w, round);
                let (color, alpha) = split_color(shadow.color, cmd.opacity);
                mask.composite(display, color, alpha)?;
                drawn = true;
            }
        }
        if let Some(mut mask) = CoverageMask::clipped(points_bounds(&points, width), clip) {
            stroke_points(&mut mask, &points, width, round);
            let (color, alpha) = split_color(cmd.color, cmd.opacity);
            mask.composite(display, color, alpha)?;
            drawn = true;
        }
        Ok(drawn)
    }

    fn draw_circle<D>(&self, display: &mut D, cmd: &CircleCommand) -> Result<bool, D::Error>
    where
        D: BlendTarget,
    {
        let center = to_point(cmd.center);
        let diameter = stroke_px(cmd.radius * 2.0);
        let stroke_w = cmd.stroke.map_or(0, |(_, w)| stroke_px(w));
        let clip = display.bounding_box();
        let mut drawn = false;

        if let Some(shadow) = cmd.shadow.filter(|_| self.cfg.draw_shadows) {
            let shadow_d = diameter + 2 * stroke_w + stroke_px(shadow.blur);
            let disc = Circle::with_center(center, shadow_d);
            if let Some(mut mask) = CoverageMask::clipped(disc.bounding_box(), clip) {
                mask.paint(&disc.into_styled(PrimitiveStyle::with_fill(Rgb888::WHITE)));
                let (color, alpha) = split_color(shadow.color, 1.0);
                mask.composite(display, color, alpha)?;
                drawn = true;
            }
        }

        let disc = Circle::with_center(center, diameter);
        if let Some(mut mask) = CoverageMask::clipped(disc.bounding_box(), clip) {
            mask.paint(&disc.into_styled(PrimitiveStyle::with_fill(Rgb888::WHITE)));
            let (color, alpha) = split_color(cmd.fill, 1.0);
            mask.composite(display, color, alpha)?;
            drawn = true;
        }

        if let Some((stroke_color, _)) = cmd.stroke.filter(|_| stroke_w > 0) {
            let ring = Circle::with_center(center, diameter + 2 * stroke_w);
            if let Some(mut mask) = CoverageMask::clipped(ring.bounding_box(), clip) {
                let style = PrimitiveStyleBuilder::new()
                    .stroke_color(Rgb888::WHITE)
                    .stroke_width(stroke_w)
                    .stroke_alignment(StrokeAlignment::Outside)
                    .build();
                mask.paint(&disc.into_styled(style));
                let (color, alpha) = split_color(stroke_color, 1.0);
                mask.composite(display, color, alpha)?;
                drawn = true;
            }
        }
        Ok(drawn)
    }

    fn draw_bitmap<D>(&self, display: &mut D, cmd: &BitmapCommand) -> Result<bool, D::Error>
    where
        D: BlendTarget,
    {
        if cmd.width == 0 || cmd.height == 0 {
            return Ok(false);
        }
        let dest = Rectangle::new(Point::new(cmd.x, cmd.y), Size::new(cmd.width, cmd.height));
        let visible = dest.intersection(&display.bounding_box());
        if visible.size.width == 0 || visible.size.height == 0 {
            return Ok(false);
        }
        let bitmap = cmd.bitmap.as_ref();
        let opacity = cmd.opacity.clamp(0.0, 1.0);
        let shadow = cmd
            .shadow
            .filter(|_| self.cfg.draw_shadows)
            .map(|s| split_color(s.color, 1.0));
        for point in visible.points() {
            let rel = point - dest.top_left;
            let sx = scale_coord(rel.x, bitmap.width, cmd.width);
            let sy = scale_coord(rel.y, bitmap.height, cmd.height);
            let Some([r, g, b, a]) = bitmap.pixel(sx, sy) else {
                continue;
            };
            if a == 0 {
                continue;
            }
            let coverage = f32::from(a) / 255.0 * opacity;
            // Zero-offset shadow: darken under the silhouette first.
            if let Some((shadow_color, shadow_alpha)) = shadow {
                display.blend_pixel(point, shadow_color, shadow_alpha * coverage)?;
            }
            display.blend_pixel(point, Rgb888::new(r, g, b), coverage)?;
        }
        Ok(true)
    }
}

fn draw_rounded_rect<D>(display: &mut D, cmd: &RoundedRectCommand) -> Result<bool, D::Error>
where
    D: BlendTarget,
{
    let rect = Rectangle::new(Point::new(cmd.x, cmd.y), Size::new(cmd.width, cmd.height));
    let Some(mut mask) = CoverageMask::clipped(rect, display.bounding_box()) else {
        return Ok(false);
    };
    let shape = RoundedRectangle::with_equal_corners(rect, Size::new(cmd.radius, cmd.radius));
    mask.paint(&shape.into_styled(PrimitiveStyle::with_fill(Rgb888::WHITE)));
    let (color, alpha) = split_color(cmd.color, cmd.opacity);
    mask.composite(display, color, alpha)?;
    Ok(true)
}

/// Nearest source coordinate for a destination offset.
fn scale_coord(offset: i32, source_len: u32, dest_len: u32) -> u32 {
    let offset = u64::from(offset.max(0) as u32);
    (offset * u64::from(source_len) / u64::from(dest_len.max(1))) as u32
}

fn stroke_points(mask: &mut CoverageMask, points: &[Point], width: u32, round: bool) {
    let style = PrimitiveStyle::with_stroke(Rgb888::WHITE, width);
    mask.paint(&Polyline::new(points).into_styled(style));
    if round && width > 2 {
        let dot = PrimitiveStyle::with_fill(Rgb888::WHITE);
        for &point in points {
            mask.paint(&Circle::with_center(point, width).into_styled(dot));
        }
    }
}

/// Bounds of `points` grown by a stroke of `width`.
fn points_bounds(points: &[Point], width: u32) -> Rectangle {
    let mut min = points.first().copied().unwrap_or_default();
    let mut max = min;
    for p in points {
        min = min.component_min(*p);
        max = max.component_max(*p);
    }
    let pad = (width / 2 + 2) as i32;
    Rectangle::with_corners(min - Point::new(pad, pad), max + Point::new(pad, pad))
}

fn to_point(p: PointF) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

fn stroke_px(width: f32) -> u32 {
    if width.is_finite() {
        width.round().max(1.0) as u32
    } else {
        1
    }
}

/// Opaque RGB plus combined alpha of the color and the command opacity.
fn split_color(color: Color, opacity: f32) -> (Rgb888, f32) {
    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (
        Rgb888::new(color.r, color.g, color.b),
        color.alpha_f32() * opacity,
    )
}

/// Compose and draw an overlay sized to `display`.
pub fn render_overlay<D>(
    display: &mut D,
    values: &StatValues,
    options: &OverlayOptions,
) -> Result<RenderResult, D::Error>
where
    D: BlendTarget,
{
    let size = display.bounding_box().size;
    let frame = embedded_composer().compose(size.width, size.height, values, options);
    EgRenderer::new(EgRenderConfig::default()).render_frame(&frame, display)
}

/// Draw a full-frame route sized to `display`.
///
/// Returns whether anything was drawn; degenerate routes draw nothing.
pub fn render_route<D>(
    display: &mut D,
    points: &[RoutePoint],
    options: &RouteOptions,
) -> Result<bool, D::Error>
where
    D: BlendTarget,
{
    let size = display.bounding_box().size;
    let commands = compose_route(points, size.width, size.height, options);
    if commands.is_empty() {
        return Ok(false);
    }
    EgRenderer::new(EgRenderConfig::default()).render_commands(&commands, display)?;
    Ok(true)
}

fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|ch| {
        matches!(
            ch,
            '\u{00A0}' // nbsp
                | '\u{2009}' // thin space
                | '\u{202F}' // narrow nbsp
                | '\u{2013}' // en dash
                | '\u{2014}' // em dash
                | '\u{2212}' // minus sign
                | '\u{00B7}' // middle dot
                | '\u{2026}' // ellipsis
        )
    }) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{00A0}' | '\u{2009}' | '\u{202F}' => out.push(' '),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{00B7}' => out.push('.'),
            '\u{2026}' => out.push_str("..."),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}
