use std::collections::BTreeSet;
use std::convert::Infallible;

use activity_overlay_embedded_graphics::{
    embedded_composer, render_overlay, render_route, BlendTarget, EgRenderConfig, EgRenderer,
    RgbCanvas,
};
use activity_overlay_render::{
    BackgroundMode, LayoutMode, MapPosition, OverlayField, OverlayOptions, Position,
    PositionPreset, OVERLAY_FIELD_ORDER, RouteOptions, RoutePoint, StatValues, TextAlign,
};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;

/// Records every pixel the renderer touches, opaque or blended.
struct PixelCaptureDisplay {
    size: Size,
    touched: BTreeSet<(i32, i32)>,
}

impl PixelCaptureDisplay {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            touched: BTreeSet::new(),
        }
    }
}

impl OriginDimensions for PixelCaptureDisplay {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for PixelCaptureDisplay {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, _) in pixels {
            self.touched.insert((p.x, p.y));
        }
        Ok(())
    }
}

impl BlendTarget for PixelCaptureDisplay {
    fn blend_pixel(&mut self, point: Point, _color: Rgb888, alpha: f32) -> Result<(), Self::Error> {
        if alpha > 0.0 {
            self.touched.insert((point.x, point.y));
        }
        Ok(())
    }
}

fn values() -> StatValues {
    StatValues {
        distance: "42.20 km".into(),
        moving_time: "3:05:12".into(),
        avg_speed: "13.7 km/h".into(),
        max_speed: "48.9 km/h".into(),
        avg_pace: Some("4:23 /km".into()),
        max_pace: Some("2:51 /km".into()),
        ascent: "812 m".into(),
        descent: "798 m".into(),
        max_elevation: Some("1204 m".into()),
        min_elevation: Some("402 m".into()),
        avg_elevation: Some("733 m".into()),
        route_points: (0..40)
            .map(|i| {
                let t = f64::from(i) / 39.0;
                RoutePoint::new(46.0 + 0.05 * t, 7.0 + 0.08 * (t * 6.0).sin())
            })
            .collect(),
        ..StatValues::default()
    }
}

#[test]
fn painted_pixels_stay_inside_the_reported_box() {
    let renderer = EgRenderer::new(EgRenderConfig::default());
    let composer = embedded_composer();
    let all = OVERLAY_FIELD_ORDER;
    for layout_mode in [LayoutMode::List, LayoutMode::Auto, LayoutMode::Fixed] {
        for map_position in [
            MapPosition::Grid,
            MapPosition::Top,
            MapPosition::Bottom,
            MapPosition::Left,
            MapPosition::Right,
        ] {
            for text_align in [TextAlign::Left, TextAlign::Center, TextAlign::Right] {
                let options = OverlayOptions {
                    layout_mode,
                    map_position,
                    text_align,
                    grid_columns: 3,
                    ..OverlayOptions::default()
                }
                .with_fields(&all)
                .with_preset(PositionPreset::Center);
                let frame = composer.compose(1400, 1400, &values(), &options);
                let mut display = PixelCaptureDisplay::new(1400, 1400);
                renderer.render_frame(&frame, &mut display).unwrap();
                assert!(!display.touched.is_empty());
                let outside: Vec<_> = display
                    .touched
                    .iter()
                    .filter(|(x, y)| !frame.result.contains(*x, *y))
                    .take(5)
                    .collect();
                assert!(
                    outside.is_empty(),
                    "{layout_mode:?}/{map_position:?}/{text_align:?}: {outside:?} outside {:?}",
                    frame.result
                );
            }
        }
    }
}

#[test]
fn transparent_overlay_only_touches_glyphs() {
    let options = OverlayOptions {
        background_mode: BackgroundMode::Transparent,
        position: Position::new(0.0, 0.0),
        ..OverlayOptions::default()
    }
    .with_fields(&[OverlayField::Distance]);
    let blank = RgbCanvas::new(600, 400, Rgb888::BLACK);
    let mut canvas = blank.clone();
    let result = render_overlay(&mut canvas, &values(), &options).unwrap();
    let lit = canvas.diff_points(&blank);
    assert!(!lit.is_empty());
    let area = u64::from(result.width) * u64::from(result.height);
    assert!((lit.len() as u64) < area / 2);
    assert!(lit.iter().all(|p| result.contains(p.x, p.y)));
}

#[test]
fn dark_background_darkens_a_bright_photo() {
    let blank = RgbCanvas::new(800, 600, Rgb888::WHITE);
    let mut canvas = blank.clone();
    let options = OverlayOptions::default().with_fields(&[OverlayField::MovingTime]);
    let result = render_overlay(&mut canvas, &values(), &options).unwrap();
    let inside = canvas.pixel(result.x as u32 + 3, (result.y + result.height as i32 / 2) as u32);
    assert_eq!(inside, Some(Rgb888::new(128, 128, 128)));
    assert_eq!(canvas.pixel(799, 0), Some(Rgb888::WHITE));
}

#[test]
fn full_frame_route_draws_markers_at_both_ends() {
    let options = RouteOptions {
        scale: 1.0,
        ..RouteOptions::default()
    };
    let mut canvas = RgbCanvas::new(1000, 800, Rgb888::BLACK);
    let drawn = render_route(&mut canvas, &values().route_points, &options).unwrap();
    assert!(drawn);
    let lit = canvas.diff_points(&RgbCanvas::new(1000, 800, Rgb888::BLACK));
    assert!(lit.len() > 1000);
    let greens = lit
        .iter()
        .filter(|p| canvas.pixel(p.x as u32, p.y as u32) == Some(Rgb888::new(0, 255, 0)))
        .count();
    let reds = lit
        .iter()
        .filter(|p| canvas.pixel(p.x as u32, p.y as u32) == Some(Rgb888::new(255, 0, 0)))
        .count();
    assert!(greens > 0 && reds > 0);
}

#[test]
fn degenerate_route_draws_nothing() {
    let flat = [RoutePoint::new(45.0, 7.0), RoutePoint::new(45.0, 7.1)];
    let mut canvas = RgbCanvas::new(200, 200, Rgb888::BLACK);
    assert!(!render_route(&mut canvas, &flat, &RouteOptions::default()).unwrap());
    assert!(canvas
        .diff_points(&RgbCanvas::new(200, 200, Rgb888::BLACK))
        .is_empty());
}

#[test]
fn empty_selection_paints_only_the_background() {
    let options = OverlayOptions::default().with_fields(&[]);
    let blank = RgbCanvas::new(300, 300, Rgb888::WHITE);
    let mut canvas = blank.clone();
    let result = render_overlay(&mut canvas, &StatValues::default(), &options).unwrap();
    assert_eq!((result.width, result.height), (32, 32));
    assert!(canvas
        .diff_points(&blank)
        .iter()
        .all(|p| result.contains(p.x, p.y)));
}
