//! Triview
//!
//! Runs one object-detection pass over a camera snapshot or an uploaded image
//! and renders the result three ways, side by side.
//!
//! # Architecture
//!
//! The three panels ("YOLO", "RCNN", "Hybrid") are not three detectors. A
//! single model call produces one `DetectionSet`; a pure partition function
//! derives three subsets from it by fixed score thresholds, and each subset is
//! drawn onto its own surface in its own color.
//!
//! ```text
//! event -> LifecycleController -> MediaSourceManager (image ready)
//!       -> DetectionInvoker (model call, busy guard)
//!       -> partition -> render x3 -> NotificationCenter
//! ```
//!
//! # Module Structure
//!
//! - `media`: the single active input source (camera stream or decoded upload)
//! - `detect`: model capability, invoker, result types, view partitioning
//! - `render`: drawing surface capability and the box/label renderer
//! - `lifecycle`: the controller, its pure state machine, and the result panels
//! - `notify`: transient notices and the loading indicator
//! - `config`, `ui`, `error`: configuration, terminal status, error taxonomy
//!
//! Everything runs on one thread. Capabilities are `?Send` async traits and
//! shared state lives in `Cell`/`RefCell`.

pub mod config;
pub mod detect;
pub mod error;
pub mod lifecycle;
pub mod media;
pub mod notify;
pub mod render;
pub mod ui;

pub use config::TriviewConfig;
pub use detect::{
    partition, BoundingBox, Detection, DetectionInvoker, DetectionModel, DetectionSet, Partition,
    ReplayModel, ViewKind, ViewPolicy,
};
pub use error::{AcquireError, DetectError, FormatError, ModelLoadError, PipelineError};
pub use lifecycle::{Event, LifecycleController, PipelineState, Tab};
pub use media::{DecodedImage, ImageHandle, InputSource, MediaSourceManager};
pub use notify::{Notice, NoticeLevel, NotificationCenter, StatusObserver};
pub use render::{render, Color, DrawingSurface, RasterSurface, RecordingSurface};
