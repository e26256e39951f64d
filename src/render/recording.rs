use serde::Serialize;

use super::{approximate_text_width, Color, DrawingSurface, Rect};
use crate::media::DecodedImage;

/// One call made against a `RecordingSurface`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Resize {
        width: u32,
        height: u32,
    },
    Clear,
    DrawImage {
        source_width: u32,
        source_height: u32,
        dest: Rect,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        line_width: f64,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        color: Color,
        font: String,
    },
}

/// Surface that keeps the command stream since the last resize.
///
/// Useful for hosts that replay drawing elsewhere and for asserting on what
/// the renderer did.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Commands issued after the most recent full clear.
    pub fn visible_commands(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|cmd| matches!(cmd, DrawCommand::Clear))
            .map_or(0, |idx| idx + 1);
        &self.commands[start..]
    }

    pub fn box_count(&self) -> usize {
        self.visible_commands()
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::StrokeRect { .. }))
            .count()
    }

    pub fn captions(&self) -> Vec<&str> {
        self.visible_commands()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_image(&self) -> bool {
        self.visible_commands()
            .iter()
            .any(|cmd| matches!(cmd, DrawCommand::DrawImage { .. }))
    }
}

impl DrawingSurface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.clear();
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn draw_image(&mut self, image: &DecodedImage, dest: Rect) {
        self.commands.push(DrawCommand::DrawImage {
            source_width: image.width(),
            source_height: image.height(),
            dest,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color, font: &str) {
        self.commands.push(DrawCommand::FillText {
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
