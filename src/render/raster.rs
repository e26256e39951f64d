use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::{approximate_text_width, Color, DrawingSurface, Rect};
use crate::media::DecodedImage;

/// Text placed on a `RasterSurface`.
///
/// Glyphs are not rasterized; hosts that composite text read the runs back.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: Color,
    pub font: String,
}

/// Pixel surface backed by an `RgbaImage`.
///
/// Coverage follows canvas rules: a pixel is painted when its center lies
/// inside the shape, and strokes straddle the path by half the line width.
#[derive(Clone, Debug)]
pub struct RasterSurface {
    canvas: RgbaImage,
    text_runs: Vec<TextRun>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
            text_runs: Vec::new(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn text_runs(&self) -> &[TextRun] {
        &self.text_runs
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.canvas
            .save(path)
            .with_context(|| format!("writing surface to {}", path.display()))
    }

    /// Paint pixels whose centers fall inside `outer` but not inside `hole`.
    fn paint(&mut self, outer: Rect, hole: Option<Rect>, color: Rgba<u8>) {
        let (width, height) = self.canvas.dimensions();
        let Some((x0, x1)) = pixel_span(outer.x, outer.x + outer.width, width) else {
            return;
        };
        let Some((y0, y1)) = pixel_span(outer.y, outer.y + outer.height, height) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let (cx, cy) = (x as f64 + 0.5, y as f64 + 0.5);
                if hole.is_some_and(|h| contains(h, cx, cy)) {
                    continue;
                }
                self.canvas.put_pixel(x, y, color);
            }
        }
    }
}

impl Default for RasterSurface {
    fn default() -> Self {
        let (width, height) = super::FALLBACK_SIZE;
        Self::new(width, height)
    }
}

/// Normalize so width and height are non-negative.
fn normalized(rect: Rect) -> Rect {
    let (x, width) = if rect.width < 0.0 {
        (rect.x + rect.width, -rect.width)
    } else {
        (rect.x, rect.width)
    };
    let (y, height) = if rect.height < 0.0 {
        (rect.y + rect.height, -rect.height)
    } else {
        (rect.y, rect.height)
    };
    Rect::new(x, y, width, height)
}

fn contains(rect: Rect, x: f64, y: f64) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Pixel index range `[start, end)` whose centers fall in `[lo, hi)`, clipped to `limit`.
fn pixel_span(lo: f64, hi: f64, limit: u32) -> Option<(u32, u32)> {
    let start = (lo - 0.5).ceil().max(0.0);
    let end = (hi - 0.5).ceil().min(limit as f64);
    if !(start < end) {
        return None;
    }
    Some((start as u32, end as u32))
}

impl DrawingSurface for RasterSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.canvas = RgbaImage::new(width, height);
        self.text_runs.clear();
    }

    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
        self.text_runs.clear();
    }

    fn draw_image(&mut self, image: &DecodedImage, dest: Rect) {
        let dest = normalized(dest);
        let (width, height) = (dest.width.round() as u32, dest.height.round() as u32);
        if width == 0 || height == 0 || image.natural_size().is_none() {
            return;
        }
        let (x, y) = (dest.x.round() as i64, dest.y.round() as i64);
        if image.pixels().dimensions() == (width, height) {
            imageops::overlay(&mut self.canvas, image.pixels(), x, y);
        } else {
            let scaled = imageops::resize(image.pixels(), width, height, FilterType::Triangle);
            imageops::overlay(&mut self.canvas, &scaled, x, y);
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64) {
        let rect = normalized(rect);
        let half = line_width.max(0.0) / 2.0;
        let outer = Rect::new(
            rect.x - half,
            rect.y - half,
            rect.width + line_width,
            rect.height + line_width,
        );
        let hole = (rect.width > line_width && rect.height > line_width).then(|| {
            Rect::new(
                rect.x + half,
                rect.y + half,
                rect.width - line_width,
                rect.height - line_width,
            )
        });
        self.paint(outer, hole, color.to_rgba());
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.paint(normalized(rect), None, color.to_rgba());
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color, font: &str) {
        self.text_runs.push(TextRun {
            text: text.to_string(),
            x,
            y,
            color,
            font: font.to_string(),
        });
    }

    fn measure_text(&self, text: &str, font: &str) -> f64 {
        approximate_text_width(text, font)
    }
}
