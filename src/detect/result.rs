use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Axis-aligned box in the coordinate space of the source image.
///
/// On the wire this is the model's `[x, y, width, height]` array.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x, bbox.y, bbox.width, bbox.height]
    }
}

/// One recognized object instance, as produced by the model.
///
/// Serializes to the model's wire shape: `{"bbox": [..], "class": "..", "score": ..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    #[serde(rename = "class")]
    pub label: String,
    /// Confidence in [0, 1].
    pub score: f64,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f64, bbox: BoundingBox) -> Self {
        Self {
            bbox,
            label: label.into(),
            score,
        }
    }

    /// Panel caption: `{label} ({score as percent, one decimal}%)`.
    pub fn caption(&self) -> String {
        format!("{} ({:.1}%)", self.label, self.score * 100.0)
    }
}

/// All detections of one pass over one image, in model order.
///
/// Immutable once built; clones share the same backing slice.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSet {
    detections: Arc<[Detection]>,
}

impl DetectionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep detections whose score is strictly above `min_score`, preserving order.
    pub fn above(&self, min_score: f64) -> Self {
        self.iter()
            .filter(|detection| detection.score > min_score)
            .cloned()
            .collect()
    }
}

impl Default for DetectionSet {
    fn default() -> Self {
        Vec::new().into()
    }
}

impl Deref for DetectionSet {
    type Target = [Detection];

    fn deref(&self) -> &[Detection] {
        &self.detections
    }
}

impl From<Vec<Detection>> for DetectionSet {
    fn from(detections: Vec<Detection>) -> Self {
        Self {
            detections: detections.into(),
        }
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}
