use crate::detect::partition::{Partition, ViewKind, ViewPolicy};
use crate::media::DecodedImage;
use crate::render::{render, DrawingSurface};

pub const IDLE_STATUS: &str = "No detections yet";
pub const EMPTY_STATUS: &str = "No objects detected";

/// One result view: a drawing surface and its one-line status.
pub struct ResultPanel<S> {
    policy: &'static ViewPolicy,
    surface: S,
    status: String,
}

impl<S: DrawingSurface> ResultPanel<S> {
    fn new(view: ViewKind, surface: S) -> Self {
        Self {
            policy: view.policy(),
            surface,
            status: IDLE_STATUS.to_string(),
        }
    }

    pub fn view(&self) -> ViewKind {
        self.policy.view
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn reset(&mut self, status: &str) {
        self.surface.clear();
        self.status = status.to_string();
    }
}

/// The YOLO, RCNN and Hybrid panels, in that order.
pub struct ResultPanels<S> {
    panels: [ResultPanel<S>; 3],
}

impl<S: DrawingSurface> ResultPanels<S> {
    pub fn new([yolo, rcnn, hybrid]: [S; 3]) -> Self {
        Self {
            panels: [
                ResultPanel::new(ViewKind::Yolo, yolo),
                ResultPanel::new(ViewKind::Rcnn, rcnn),
                ResultPanel::new(ViewKind::Hybrid, hybrid),
            ],
        }
    }

    pub fn get(&self, view: ViewKind) -> &ResultPanel<S> {
        &self.panels[index(view)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultPanel<S>> {
        self.panels.iter()
    }

    /// Clear every surface and show the idle placeholder.
    pub fn reset(&mut self) {
        for panel in &mut self.panels {
            panel.reset(IDLE_STATUS);
        }
    }

    /// A pass that found nothing: clean surfaces, "no objects" status.
    pub fn show_empty(&mut self) {
        for panel in &mut self.panels {
            panel.reset(EMPTY_STATUS);
        }
    }

    pub fn show(&mut self, image: &DecodedImage, partition: &Partition) {
        for panel in &mut self.panels {
            let policy = panel.policy;
            let detections = partition.view(policy.view);
            render(&mut panel.surface, image, detections, policy.color);
            panel.status = format!("Detected {} objects ({})", detections.len(), policy.name);
        }
    }
}

fn index(view: ViewKind) -> usize {
    match view {
        ViewKind::Yolo => 0,
        ViewKind::Rcnn => 1,
        ViewKind::Hybrid => 2,
    }
}
