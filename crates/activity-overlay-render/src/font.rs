//! Text measurement hook and cross-typeface size compensation.

use std::borrow::Cow;

use crate::options::DEFAULT_FONT_FAMILY;
use crate::render_ir::ResolvedTextStyle;

/// Calibration text covering ascenders, descenders, capitals and digits.
pub const CALIBRATION_SAMPLE: &str = "AaGgHhMm0123456789";
/// Weight used for calibration measurements.
pub const CALIBRATION_WEIGHT: u16 = 600;
/// Nominal size used for calibration measurements.
pub const CALIBRATION_SIZE_PX: f32 = 32.0;
/// Family the compensation ratio is relative to.
pub const BASELINE_FAMILY: &str = DEFAULT_FONT_FAMILY;
/// Compensation never scales below this factor.
pub const MIN_COMPENSATION: f32 = 0.85;
/// Compensation never scales above this factor.
pub const MAX_COMPENSATION: f32 = 1.20;

/// Text measurement hook used by layout.
pub trait TextMeasurer: Send + Sync {
    /// Measure rendered text width for the provided style.
    fn measure_text_px(&self, text: &str, style: &ResolvedTextStyle) -> f32;
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for &T {
    fn measure_text_px(&self, text: &str, style: &ResolvedTextStyle) -> f32 {
        (**self).measure_text_px(text, style)
    }
}

/// Width model used when no real font rasterizer is available.
///
/// Per-glyph em widths with small family and weight modifiers, so families
/// still compare differently during compensation.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure_text_px(&self, text: &str, style: &ResolvedTextStyle) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let family = style.family.to_ascii_lowercase();
        let monospace = family.contains("mono") || family.contains("courier");
        let em_sum: f32 = if monospace {
            text.chars().map(|ch| if ch == ' ' { 0.52 } else { 0.6 }).sum()
        } else {
            text.chars().map(glyph_em_width).sum()
        };
        let mut family_scale = if family.contains("sans") {
            0.99
        } else if family.contains("serif") {
            1.03
        } else {
            1.0
        };
        if style.weight >= 600 {
            family_scale += 0.03;
        }
        em_sum * style.size_px * family_scale
    }
}

fn glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' => 0.28,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' => 0.25,
        '/' | '-' => 0.34,
        'f' | 't' | 'j' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' | '%' => 0.76,
        c if c.is_ascii_digit() => 0.56,
        c if c.is_ascii_uppercase() => 0.66,
        c if c.is_ascii_lowercase() => 0.53,
        _ => 0.58,
    }
}

/// Quote the first family of a list when it contains whitespace.
///
/// `Open Sans, Arial` becomes `"Open Sans", Arial`; already quoted names are
/// left alone.
pub fn quote_first_family(families: &str) -> Cow<'_, str> {
    let (first_raw, rest) = match families.split_once(',') {
        Some((first, rest)) => (first, Some(rest)),
        None => (families, None),
    };
    let first = first_raw.trim();
    let already_quoted = first.starts_with('"') || first.starts_with('\'');
    if already_quoted || !first.chars().any(char::is_whitespace) {
        return Cow::Borrowed(families);
    }
    match rest {
        Some(rest) => Cow::Owned(format!("\"{}\",{}", first, rest)),
        None => Cow::Owned(format!("\"{}\"", first)),
    }
}

/// Size correction that makes `font_family` look as large as the baseline
/// family at the same nominal size. Always within
/// `[MIN_COMPENSATION, MAX_COMPENSATION]`.
pub fn font_compensation(font_family: &str, measurer: &dyn TextMeasurer) -> f32 {
    let baseline_style =
        ResolvedTextStyle::new(BASELINE_FAMILY, CALIBRATION_WEIGHT, CALIBRATION_SIZE_PX);
    let target_style = ResolvedTextStyle::new(
        quote_first_family(font_family).as_ref(),
        CALIBRATION_WEIGHT,
        CALIBRATION_SIZE_PX,
    );
    let baseline = measured_width(measurer, &baseline_style);
    let target = measured_width(measurer, &target_style);
    let factor = (baseline / target).clamp(MIN_COMPENSATION, MAX_COMPENSATION);
    log::debug!(
        "font compensation for {:?}: baseline={:.1}px target={:.1}px factor={:.3}",
        font_family,
        baseline,
        target,
        factor
    );
    factor
}

fn measured_width(measurer: &dyn TextMeasurer, style: &ResolvedTextStyle) -> f32 {
    let width = measurer.measure_text_px(CALIBRATION_SAMPLE, style);
    if width.is_finite() {
        width.max(1.0)
    } else {
        1.0
    }
}
