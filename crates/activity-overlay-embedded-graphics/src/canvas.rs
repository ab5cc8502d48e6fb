//! RGB canvases with alpha blending.

use core::convert::Infallible;

use activity_overlay_render::{rec709_luma, RenderResult};
use embedded_graphics::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    primitives::Rectangle,
};
use image::{Rgb, RgbImage};

/// Draw target that can mix a color into what is already there.
///
/// Plain `DrawTarget` writes are opaque. Overlay commands carry opacity,
/// shadows and anti-aliased logos, so backends need read-modify-write.
pub trait BlendTarget: DrawTarget<Color = Rgb888> {
    /// Mix `color` over the pixel at `point` with coverage `alpha` in `[0, 1]`.
    ///
    /// Points outside the target are ignored.
    fn blend_pixel(&mut self, point: Point, color: Rgb888, alpha: f32) -> Result<(), Self::Error>;
}

/// Source-over mix of two channels.
pub(crate) fn mix_channel(dst: u8, src: u8, alpha: f32) -> u8 {
    let a = alpha.clamp(0.0, 1.0);
    (f32::from(src) * a + f32::from(dst) * (1.0 - a)).round() as u8
}

pub(crate) fn mix(dst: Rgb888, src: Rgb888, alpha: f32) -> Rgb888 {
    Rgb888::new(
        mix_channel(dst.r(), src.r(), alpha),
        mix_channel(dst.g(), src.g(), alpha),
        mix_channel(dst.b(), src.b(), alpha),
    )
}

/// Owned 24-bit canvas, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbCanvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl RgbCanvas {
    /// Canvas filled with `background`.
    pub fn new(width: u32, height: u32, background: Rgb888) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    pub fn from_rgb_image(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image
                .pixels()
                .map(|Rgb([r, g, b])| Rgb888::new(*r, *g, *b))
                .collect(),
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let px = self.pixel(x, y).unwrap_or(Rgb888::BLACK);
            Rgb([px.r(), px.g(), px.b()])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.index(Point::new(x as i32, y as i32))
            .and_then(|idx| self.pixels.get(idx).copied())
    }

    /// Mean Rec. 709 luma in `[0, 1]` over the part of `rect` inside the canvas.
    ///
    /// Returns `None` when the two do not intersect.
    pub fn average_luma(&self, rect: &RenderResult) -> Option<f32> {
        let left = rect.x.max(0) as u32;
        let top = rect.y.max(0) as u32;
        let right =
            (i64::from(rect.x) + i64::from(rect.width)).clamp(0, i64::from(self.width)) as u32;
        let bottom =
            (i64::from(rect.y) + i64::from(rect.height)).clamp(0, i64::from(self.height)) as u32;
        if left >= right || top >= bottom {
            return None;
        }
        let mut sum = 0.0f64;
        for y in top..bottom {
            for x in left..right {
                if let Some(px) = self.pixel(x, y) {
                    sum += f64::from(rec709_luma(px.r(), px.g(), px.b()));
                }
            }
        }
        let count = f64::from(right - left) * f64::from(bottom - top);
        Some((sum / count) as f32)
    }

    /// Positions whose color differs from `other`; both canvases must match in size.
    pub fn diff_points(&self, other: &RgbCanvas) -> Vec<Point> {
        if self.width != other.width || self.height != other.height {
            return Vec::new();
        }
        let width = self.width.max(1) as usize;
        self.pixels
            .iter()
            .zip(&other.pixels)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(idx, _)| Point::new((idx % width) as i32, (idx / width) as i32))
            .collect()
    }

    fn index(&self, point: Point) -> Option<usize> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as u32, point.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

impl OriginDimensions for RgbCanvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for RgbCanvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(idx) = self.index(point) {
                self.pixels[idx] = color;
            }
        }
        Ok(())
    }
}

impl BlendTarget for RgbCanvas {
    fn blend_pixel(&mut self, point: Point, color: Rgb888, alpha: f32) -> Result<(), Self::Error> {
        if alpha <= 0.0 {
            return Ok(());
        }
        if let Some(idx) = self.index(point) {
            let dst = self.pixels[idx];
            self.pixels[idx] = mix(dst, color, alpha);
        }
        Ok(())
    }
}

/// Pixel coverage of one shape, composited once so overlapping strokes do
/// not darken twice.
#[derive(Debug)]
pub(crate) struct CoverageMask {
    area: Rectangle,
    covered: Vec<bool>,
}

impl CoverageMask {
    pub(crate) fn new(area: Rectangle) -> Self {
        let len = area.size.width as usize * area.size.height as usize;
        Self {
            area,
            covered: vec![false; len],
        }
    }

    /// Mask over `shape` clipped to `clip`, or `None` when nothing is visible.
    pub(crate) fn clipped(shape: Rectangle, clip: Rectangle) -> Option<Self> {
        let area = shape.intersection(&clip);
        (area.size.width > 0 && area.size.height > 0).then(|| Self::new(area))
    }

    pub(crate) fn paint<T>(&mut self, drawable: &T)
    where
        T: Drawable<Color = Rgb888>,
    {
        match drawable.draw(self) {
            Ok(_) => {}
            Err(never) => match never {},
        }
    }

    pub(crate) fn covered_points(&self) -> impl Iterator<Item = Point> + '_ {
        let width = self.area.size.width.max(1) as usize;
        let origin = self.area.top_left;
        self.covered
            .iter()
            .enumerate()
            .filter(|&(_, &hit)| hit)
            .map(move |(idx, _)| origin + Point::new((idx % width) as i32, (idx / width) as i32))
    }

    pub(crate) fn composite<D: BlendTarget>(
        &self,
        display: &mut D,
        color: Rgb888,
        alpha: f32,
    ) -> Result<(), D::Error> {
        if alpha <= 0.0 {
            return Ok(());
        }
        for point in self.covered_points() {
            display.blend_pixel(point, color, alpha)?;
        }
        Ok(())
    }

    fn index(&self, point: Point) -> Option<usize> {
        let rel = point - self.area.top_left;
        if rel.x < 0 || rel.y < 0 {
            return None;
        }
        let (x, y) = (rel.x as u32, rel.y as u32);
        if x >= self.area.size.width || y >= self.area.size.height {
            return None;
        }
        Some(y as usize * self.area.size.width as usize + x as usize)
    }
}

impl Dimensions for CoverageMask {
    fn bounding_box(&self) -> Rectangle {
        self.area
    }
}

impl DrawTarget for CoverageMask {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, _) in pixels {
            if let Some(idx) = self.index(point) {
                self.covered[idx] = true;
            }
        }
        Ok(())
    }
}
