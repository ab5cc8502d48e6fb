//! Watermark logos: PNG decoding, resizing and drawing onto a canvas.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use activity_overlay_render::{
    compose_logo_watermark, compose_text_watermark, place_watermark, use_dark_variant,
    RenderResult, RgbaBitmap, WatermarkLogos, WatermarkPlacement,
};
use image::{imageops::FilterType, RgbaImage};

use crate::{EgRenderer, EgTextMeasurer, FontBackend, RgbCanvas};

/// Error raised while loading a logo image.
#[derive(Debug)]
pub enum LogoError {
    Io { path: PathBuf, source: std::io::Error },
    Decode(image::ImageError),
    /// The image decoded to zero pixels.
    Empty,
}

impl fmt::Display for LogoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
            Self::Decode(err) => write!(f, "cannot decode logo: {}", err),
            Self::Empty => f.write_str("logo has no pixels"),
        }
    }
}

impl std::error::Error for LogoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Decode(err) => Some(err),
            Self::Empty => None,
        }
    }
}

/// Decode an encoded image (PNG with alpha in practice) to straight RGBA.
pub fn decode_logo(bytes: &[u8]) -> Result<RgbaBitmap, LogoError> {
    let image = image::load_from_memory(bytes)
        .map_err(LogoError::Decode)?
        .to_rgba8();
    let (width, height) = image.dimensions();
    RgbaBitmap::new(width, height, image.into_raw()).ok_or(LogoError::Empty)
}

pub fn load_logo(path: impl AsRef<Path>) -> Result<RgbaBitmap, LogoError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LogoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_logo(&bytes)
}

/// Load both variants; a variant that fails to load is left out.
pub fn load_watermark_logos(light: Option<&Path>, dark: Option<&Path>) -> WatermarkLogos {
    let load = |path: Option<&Path>| {
        let path = path?;
        match load_logo(path) {
            Ok(logo) => Some(Arc::new(logo)),
            Err(err) => {
                log::warn!("watermark logo unavailable: {}", err);
                None
            }
        }
    };
    WatermarkLogos {
        light: load(light),
        dark: load(dark),
    }
}

/// Resample a logo to `width` x `height`.
pub fn resize_logo(logo: &RgbaBitmap, width: u32, height: u32) -> RgbaBitmap {
    if width == 0 || height == 0 || (logo.width, logo.height) == (width, height) {
        return logo.clone();
    }
    let Some(source) = RgbaImage::from_raw(logo.width, logo.height, logo.pixels.clone()) else {
        return logo.clone();
    };
    let resized = image::imageops::resize(&source, width, height, FilterType::Triangle);
    RgbaBitmap::new(width, height, resized.into_raw()).unwrap_or_else(|| logo.clone())
}

/// Draw the watermark into the corner that best avoids `avoid`.
///
/// Uses a logo when one is loaded, picking the dark variant over bright
/// backgrounds; otherwise draws the text mark.
pub fn draw_watermark<B>(
    renderer: &EgRenderer<B>,
    canvas: &mut RgbCanvas,
    logos: &WatermarkLogos,
    font_family: &str,
    avoid: Option<&RenderResult>,
) -> WatermarkPlacement
where
    B: FontBackend + Clone + Send + Sync,
{
    let (width, height) = (canvas.width(), canvas.height());
    let logo_command = logos.aspect().and_then(|aspect| {
        let placement = place_watermark(width, height, aspect, avoid);
        let luma = canvas.average_luma(&placement.rect).unwrap_or(0.0);
        let dark = use_dark_variant(luma);
        let logo = logos.select(dark)?;
        log::debug!(
            "watermark logo ({}) at {:?}, background luma {:.2}",
            if dark { "dark" } else { "light" },
            placement.corner,
            luma
        );
        let scaled = resize_logo(logo, placement.rect.width, placement.rect.height);
        Some((compose_logo_watermark(Arc::new(scaled), &placement), placement))
    });
    let (command, placement) = logo_command.unwrap_or_else(|| {
        let measurer = EgTextMeasurer::with_backend(renderer.backend().clone());
        compose_text_watermark(width, height, font_family, avoid, &measurer)
    });
    match renderer.render_commands(&[command], canvas) {
        Ok(_) => {}
        Err(never) => match never {},
    }
    placement
}
