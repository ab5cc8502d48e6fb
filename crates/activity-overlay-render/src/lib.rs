//! Overlay layout engine and draw-command IR for `activity-overlay`.
//!
//! Turns formatted activity statistics into a list of backend-agnostic
//! [`DrawCommand`]s plus the exact [`RenderResult`] box they occupy. Backends
//! such as `activity-overlay-embedded-graphics` execute the commands.

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

mod color;
mod fields;
mod font;
mod layout;
mod options;
mod overlay;
mod render_ir;
mod route;
mod watermark;

pub use activity_overlay::{RoutePoint, StatValues};
pub use color::{Color, ColorParseError};
pub use fields::{canonical_fields, OverlayField, UnknownOverlayField, OVERLAY_FIELD_ORDER};
pub use font::{
    font_compensation, quote_first_family, HeuristicTextMeasurer, TextMeasurer, BASELINE_FAMILY,
    CALIBRATION_SAMPLE, CALIBRATION_SIZE_PX, CALIBRATION_WEIGHT, MAX_COMPENSATION,
    MIN_COMPENSATION,
};
pub use layout::{
    anchor, assign_cells, build_items, column_count, grid_geometry, plan, plan_with_compensation,
    GridCell, GridGeometry, OverlayItem, OverlayLayout, OverlayMetrics, SideMap,
    AUTO_MAX_COLUMNS, BASE_VALUE_FONT_PX, LABEL_OPACITY, LABEL_WEIGHT, MAP_SIZE_FACTOR,
    MIN_LABEL_FONT_PX, MIN_VALUE_FONT_PX, VALUE_WEIGHT,
};
pub use options::{
    BackgroundMode, LayoutMode, MapPosition, OptionsError, OverlayOptions, Position,
    PositionPreset, RouteOptions, DEFAULT_FONT_FAMILY, PRESET_MARGIN,
};
pub use overlay::OverlayComposer;
pub use render_ir::{
    BitmapCommand, CircleCommand, DrawCommand, LineCap, OverlayFrame, PointF, PolylineCommand,
    RenderResult, ResolvedTextStyle, RgbaBitmap, RoundedRectCommand, Shadow, TextAlign,
    TextCommand,
};
pub use route::{compose_route, project_mini_map, valid_points};
pub use watermark::{
    compose_logo_watermark, compose_text_watermark, logo_size, place_box, place_watermark,
    rec709_luma, use_dark_variant, watermark_margin, watermark_text_size, WatermarkCache,
    WatermarkCorner, WatermarkLogos, WatermarkPlacement, DARK_VARIANT_LUMA,
    TEXT_WATERMARK_OPACITY, WATERMARK_TEXT,
};
