//! Multi-view renderer.
//!
//! `render` paints the source image and one annotated box per detection onto
//! a drawing surface. Surfaces are external capabilities; two implementations
//! ship here:
//! - `RasterSurface`: pixels in an `RgbaImage`, saved as PNG by the CLI
//! - `RecordingSurface`: a serializable log of draw commands

pub mod raster;
pub mod recording;

use serde::Serialize;

use crate::detect::result::{BoundingBox, Detection};
use crate::media::DecodedImage;

pub use raster::{RasterSurface, TextRun};
pub use recording::{DrawCommand, RecordingSurface};

/// Surface size used when the source has no natural dimensions (e.g. an unready video frame).
pub const FALLBACK_SIZE: (u32, u32) = (640, 360);
pub const BOX_LINE_WIDTH: f64 = 3.0;
pub const LABEL_HEIGHT: f64 = 20.0;
/// Total horizontal padding around the label text.
pub const LABEL_PADDING: f64 = 10.0;
pub const LABEL_FONT: &str = "14px Arial";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const GREEN: Color = Color::rgb(0x00, 0xff, 0x00);
    pub const RED: Color = Color::rgb(0xff, 0x00, 0x00);
    pub const BLUE: Color = Color::rgb(0x00, 0x00, 0xff);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<BoundingBox> for Rect {
    fn from(bbox: BoundingBox) -> Self {
        Self::new(bbox.x, bbox.y, bbox.width, bbox.height)
    }
}

/// 2D drawing surface capability.
pub trait DrawingSurface {
    /// Resize the backing store. Contents are discarded.
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// Clear the whole surface to transparent.
    fn clear(&mut self);

    fn draw_image(&mut self, image: &DecodedImage, dest: Rect);

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw `text` with its baseline starting at (`x`, `y`).
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color, font: &str);

    fn measure_text(&self, text: &str, font: &str) -> f64;
}

/// Replace everything on `surface` with `image` and the annotated `detections`.
///
/// The surface takes the image's natural size (or `FALLBACK_SIZE`) and is
/// cleared first, so repeated calls never leave stale boxes behind.
pub fn render<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    image: &DecodedImage,
    detections: &[Detection],
    color: Color,
) {
    let (width, height) = image.natural_size().unwrap_or(FALLBACK_SIZE);
    surface.resize(width, height);
    surface.clear();
    surface.draw_image(image, Rect::new(0.0, 0.0, width as f64, height as f64));

    for detection in detections {
        let bbox = detection.bbox;
        surface.stroke_rect(bbox.into(), color, BOX_LINE_WIDTH);

        let caption = detection.caption();
        let label_width = surface.measure_text(&caption, LABEL_FONT) + LABEL_PADDING;
        surface.fill_rect(
            Rect::new(bbox.x, bbox.y - LABEL_HEIGHT, label_width, LABEL_HEIGHT),
            color,
        );
        surface.fill_text(
            &caption,
            bbox.x + LABEL_PADDING / 2.0,
            bbox.y - 5.0,
            Color::WHITE,
            LABEL_FONT,
        );
    }
}

/// Width estimate for surfaces without a font engine: half an em per character.
pub fn approximate_text_width(text: &str, font: &str) -> f64 {
    text.chars().count() as f64 * font_px(font) * 0.5
}

/// Pixel size from a CSS-style font string such as `"14px Arial"`. Defaults to 10.
fn font_px(font: &str) -> f64 {
    font.split_whitespace()
        .find_map(|part| part.strip_suffix("px"))
        .and_then(|px| px.parse::<f64>().ok())
        .filter(|px| *px > 0.0)
        .unwrap_or(10.0)
}
