//! Result partitioner: one detection pass, three displayed subsets.
//!
//! The three views are not separate detectors. They are fixed score filters
//! over the same model output:
//!
//! - `yolo`: score > 0.3
//! - `rcnn`: score > 0.5
//! - `hybrid`: union of `yolo` and `rcnn`, with `rcnn` entries dropped when a
//!   value-equal entry is already present in `yolo`.
//!
//! Since `rcnn` is always a subset of `yolo`, `hybrid` always equals `yolo`.
//! That follows the behavior of the deployed page, even though the "combine
//! both" caption suggests something else was intended.

use crate::detect::result::{Detection, DetectionSet};
use crate::render::Color;

/// Which of the three result panels a policy feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Yolo,
    Rcnn,
    Hybrid,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::Yolo, ViewKind::Rcnn, ViewKind::Hybrid];

    pub fn policy(self) -> &'static ViewPolicy {
        match self {
            ViewKind::Yolo => &YOLO,
            ViewKind::Rcnn => &RCNN,
            ViewKind::Hybrid => &HYBRID,
        }
    }

    /// Lowercase identifier used for file names and logs.
    pub fn slug(self) -> &'static str {
        match self {
            ViewKind::Yolo => "yolo",
            ViewKind::Rcnn => "rcnn",
            ViewKind::Hybrid => "hybrid",
        }
    }
}

/// How a view selects detections from a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection {
    /// Detections scoring strictly above the threshold.
    Above(f64),
    /// Union of the other views' selections.
    Union,
}

/// Named partition rule over a detection set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewPolicy {
    pub view: ViewKind,
    /// Display name shown in the panel status line.
    pub name: &'static str,
    pub selection: Selection,
    pub dedupe: bool,
    pub color: Color,
}

pub const YOLO_MIN_SCORE: f64 = 0.3;
pub const RCNN_MIN_SCORE: f64 = 0.5;

pub const YOLO: ViewPolicy = ViewPolicy {
    view: ViewKind::Yolo,
    name: "YOLO",
    selection: Selection::Above(YOLO_MIN_SCORE),
    dedupe: false,
    color: Color::GREEN,
};

pub const RCNN: ViewPolicy = ViewPolicy {
    view: ViewKind::Rcnn,
    name: "RCNN",
    selection: Selection::Above(RCNN_MIN_SCORE),
    dedupe: false,
    color: Color::RED,
};

pub const HYBRID: ViewPolicy = ViewPolicy {
    view: ViewKind::Hybrid,
    name: "Hybrid",
    selection: Selection::Union,
    dedupe: true,
    color: Color::BLUE,
};

/// The three derived subsets of one pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partition {
    pub yolo: DetectionSet,
    pub rcnn: DetectionSet,
    pub hybrid: DetectionSet,
}

impl Partition {
    pub fn view(&self, view: ViewKind) -> &DetectionSet {
        match view {
            ViewKind::Yolo => &self.yolo,
            ViewKind::Rcnn => &self.rcnn,
            ViewKind::Hybrid => &self.hybrid,
        }
    }

    fn view_mut(&mut self, view: ViewKind) -> &mut DetectionSet {
        match view {
            ViewKind::Yolo => &mut self.yolo,
            ViewKind::Rcnn => &mut self.rcnn,
            ViewKind::Hybrid => &mut self.hybrid,
        }
    }
}

/// The fixed view table, in panel order.
pub const VIEW_POLICIES: [ViewPolicy; 3] = [YOLO, RCNN, HYBRID];

/// Split one pass into the three views. Pure; an empty input yields three empty sets.
pub fn partition(set: &DetectionSet) -> Partition {
    partition_with(&VIEW_POLICIES, set)
}

/// Derive one view per policy.
///
/// `Above` views filter `set` directly. A `Union` view merges the `Above`
/// views in table order; with `dedupe`, an entry is dropped when a value-equal
/// one came from an earlier view.
pub fn partition_with(policies: &[ViewPolicy], set: &DetectionSet) -> Partition {
    let thresholded: Vec<DetectionSet> = policies
        .iter()
        .filter_map(|policy| match policy.selection {
            Selection::Above(min_score) => Some(set.above(min_score)),
            Selection::Union => None,
        })
        .collect();

    let mut parts = Partition::default();
    for policy in policies {
        let view = match policy.selection {
            Selection::Above(min_score) => set.above(min_score),
            Selection::Union => union(&thresholded, policy.dedupe),
        };
        *parts.view_mut(policy.view) = view;
    }
    parts
}

/// Concatenate `views`. With `dedupe`, entries value-equal to one from an
/// earlier view are skipped; repeats within a single view are kept, they are
/// distinct model outputs.
fn union(views: &[DetectionSet], dedupe: bool) -> DetectionSet {
    let mut merged: Vec<Detection> = Vec::new();
    for view in views {
        let earlier = merged.len();
        for detection in view.iter() {
            if dedupe && merged[..earlier].contains(detection) {
                continue;
            }
            merged.push(detection.clone());
        }
    }
    merged.into()
}
