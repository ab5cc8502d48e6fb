mod common;

use activity_overlay::{decode_activity, format_stats, UnitSystem};
use activity_overlay_embedded_graphics::{
    draw_watermark, embedded_composer, EgRenderConfig, EgRenderer, RgbCanvas,
};
use activity_overlay_render::{
    LayoutMode, MapPosition, OverlayField, OverlayOptions, PositionPreset, WatermarkLogos,
};
use common::fixtures::{read_fixture, EVENING_LOOP_GPX};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

#[test]
fn decoded_activity_renders_inside_its_box_with_watermark_elsewhere() {
    let raw = decode_activity(&read_fixture(EVENING_LOOP_GPX)).expect("decode");
    let values = format_stats(&raw, UnitSystem::Metric);
    let options = OverlayOptions {
        layout_mode: LayoutMode::Auto,
        map_position: MapPosition::Right,
        ..OverlayOptions::default()
    }
    .with_fields(&[
        OverlayField::Distance,
        OverlayField::MovingTime,
        OverlayField::AvgSpeed,
        OverlayField::Ascent,
        OverlayField::RouteMap,
    ])
    .with_preset(PositionPreset::BottomRight);

    let blank = RgbCanvas::new(1280, 960, Rgb888::new(90, 120, 150));
    let mut canvas = blank.clone();
    let renderer = EgRenderer::new(EgRenderConfig::default());
    let frame = embedded_composer().compose(1280, 960, &values, &options);
    renderer
        .render_frame(&frame, &mut canvas)
        .expect("render overlay");
    let overlay_pixels = canvas.diff_points(&blank);
    assert!(!overlay_pixels.is_empty());
    assert!(overlay_pixels
        .iter()
        .all(|p| frame.result.contains(p.x, p.y)));

    let before_watermark = canvas.clone();
    let placement = draw_watermark(
        &renderer,
        &mut canvas,
        &WatermarkLogos::default(),
        &options.font_family,
        Some(&frame.result),
    );
    assert!(!placement.rect.overlaps(&frame.result));
    let mark_pixels = canvas.diff_points(&before_watermark);
    assert!(!mark_pixels.is_empty());
    assert!(mark_pixels
        .iter()
        .all(|p| placement.rect.contains(p.x, p.y)));
    assert_ne!(canvas.pixel(0, 0), Some(Rgb888::BLACK));
}
