//! Route projection for the in-box mini-map and the full-frame overlay.

use activity_overlay::RoutePoint;

use crate::color::Color;
use crate::options::RouteOptions;
use crate::render_ir::{CircleCommand, DrawCommand, LineCap, PointF, PolylineCommand, Shadow};

/// Fraction of the range added on each side of a projected route.
const EDGE_PADDING: f64 = 0.1;
/// Smallest degree range of a mini-map, so a single spot still projects.
const MIN_MINI_MAP_RANGE: f64 = 0.0001;

/// Points that are finite and inside the coordinate ranges, in order.
pub fn valid_points(points: &[RoutePoint]) -> Vec<RoutePoint> {
    let valid: Vec<RoutePoint> = points.iter().copied().filter(RoutePoint::is_valid).collect();
    if valid.len() != points.len() {
        log::warn!(
            "dropped {} invalid route points of {}",
            points.len() - valid.len(),
            points.len()
        );
    }
    valid
}

#[derive(Clone, Copy, Debug)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Bounds {
    fn of(points: &[RoutePoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        for p in &points[1..] {
            bounds.min_lat = bounds.min_lat.min(p.lat);
            bounds.max_lat = bounds.max_lat.max(p.lat);
            bounds.min_lon = bounds.min_lon.min(p.lon);
            bounds.max_lon = bounds.max_lon.max(p.lon);
        }
        Some(bounds)
    }

    fn lat_range(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    fn lon_range(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

/// Project a route into the square `(x, y, width, height)`.
///
/// Both axes share one degree range so the route keeps its shape, with 10%
/// padding on every side. Returns `None` for fewer than two valid points.
pub fn project_mini_map(
    points: &[RoutePoint],
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    color: Color,
) -> Option<PolylineCommand> {
    let valid = valid_points(points);
    if valid.len() < 2 {
        return None;
    }
    let bounds = Bounds::of(&valid)?;
    let range = bounds
        .lat_range()
        .max(bounds.lon_range())
        .max(MIN_MINI_MAP_RANGE);
    let padded = range * (1.0 + 2.0 * EDGE_PADDING);
    let (x, y, w, h) = (
        f64::from(x),
        f64::from(y),
        f64::from(width),
        f64::from(height),
    );
    let projected = valid
        .iter()
        .map(|p| {
            let nx = (p.lon - bounds.min_lon + range * EDGE_PADDING) / padded;
            let ny = (p.lat - bounds.min_lat + range * EDGE_PADDING) / padded;
            PointF::new((x + nx * w) as f32, (y + h - ny * h) as f32)
        })
        .collect();
    Some(PolylineCommand {
        points: projected,
        color,
        width: (width * 0.015).max(1.0),
        cap: LineCap::Round,
        opacity: 1.0,
        shadow: None,
    })
}

/// Draw commands for a route spanning the whole image.
///
/// The route keeps its aspect ratio, fits the padded image at scale 1 and is
/// centered on `options.position`. Routes with fewer than two valid points or
/// without extent on either axis produce nothing.
pub fn compose_route(
    points: &[RoutePoint],
    image_w: u32,
    image_h: u32,
    options: &RouteOptions,
) -> Vec<DrawCommand> {
    let valid = valid_points(points);
    if valid.len() < 2 {
        return Vec::new();
    }
    let Some(bounds) = Bounds::of(&valid) else {
        return Vec::new();
    };
    let (lat_range, lon_range) = (bounds.lat_range(), bounds.lon_range());
    if lat_range == 0.0 || lon_range == 0.0 {
        log::debug!("route has no extent on one axis; nothing to draw");
        return Vec::new();
    }

    let w = f64::from(image_w);
    let h = f64::from(image_h);
    let padding = 1.0 + 2.0 * EDGE_PADDING;
    let base = (w / (lon_range * padding)).min(h / (lat_range * padding));
    let scale = base * f64::from(options.scale);
    let position = options.position.clamped();
    let off_x = f64::from(position.x) * w - lon_range * scale / 2.0 - bounds.min_lon * scale;
    let off_y = f64::from(position.y) * h - lat_range * scale / 2.0 + bounds.max_lat * scale;
    let to_px = |p: &RoutePoint| {
        PointF::new(
            (p.lon * scale + off_x) as f32,
            (-p.lat * scale + off_y) as f32,
        )
    };

    let wf = image_w as f32;
    let line_width = options.line_width.max(0.0);
    let mut commands = Vec::with_capacity(3);
    commands.push(DrawCommand::Polyline(PolylineCommand {
        points: valid.iter().map(to_px).collect(),
        color: options.color,
        width: line_width.max(wf * 0.001 * line_width),
        cap: LineCap::Round,
        opacity: 1.0,
        shadow: Some(Shadow {
            color: Color::black_alpha(0.5),
            blur: (wf * 0.002).max(2.0),
        }),
    }));

    let marker = |point: &RoutePoint, fill: Color| {
        DrawCommand::Circle(CircleCommand {
            center: to_px(point),
            radius: (wf * 0.004).max(5.0),
            fill,
            stroke: Some((Color::WHITE, (wf * 0.0015).max(2.0))),
            shadow: Some(Shadow {
                color: Color::black_alpha(0.6),
                blur: (wf * 0.003).max(3.0),
            }),
        })
    };
    if let (Some(start), Some(end)) = (valid.first(), valid.last()) {
        commands.push(marker(start, Color::START_GREEN));
        commands.push(marker(end, Color::END_RED));
    }
    log::debug!(
        "route: {} points scale={:.3} image={}x{}",
        valid.len(),
        scale,
        image_w,
        image_h
    );
    commands
}
