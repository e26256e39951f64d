//! Lifecycle controller.
//!
//! One `LifecycleController` is built at startup and owns everything the page
//! used to keep in globals: the media source, the model handle and its busy
//! flag, the three result panels, and the notification center. Host events
//! are fed in through `dispatch`.
//!
//! All operations take `&self`. A host may poll several dispatches at once
//! on one thread; they interleave only at `.await` points, and the invoker's
//! busy guard keeps detection passes from overlapping.

pub mod panels;
pub mod state;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use crate::config::TriviewConfig;
use crate::detect::{
    partition, DetectionInvoker, DetectionModel, DetectionSet, DetectionTicket, ViewKind,
};
use crate::error::{DetectError, FormatError, ModelLoadError, PipelineError};
use crate::media::{
    CameraControls, CameraStart, ImageDecoder, ImageHandle, InputSource, MediaDevice,
    MediaSourceManager,
};
use crate::notify::{NotificationCenter, StatusObserver};
use crate::render::DrawingSurface;

pub use panels::{ResultPanel, ResultPanels, EMPTY_STATUS, IDLE_STATUS};
pub use state::{transition, ImageOrigin, PipelineState, Tab};

/// A user or host action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    SelectTab(Tab),
    StartCamera,
    /// Snapshot the camera frame and run detection on it.
    CaptureFrame,
    StopCamera,
    /// A file was picked or dropped on the upload area.
    FileSelected {
        bytes: Vec<u8>,
        mime: String,
    },
    ChangeImage,
    RemoveImage,
    /// Run detection on the current image.
    Detect,
    VisibilityChanged {
        hidden: bool,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SelectTab(_) => "select_tab",
            Event::StartCamera => "start_camera",
            Event::CaptureFrame => "capture_frame",
            Event::StopCamera => "stop_camera",
            Event::FileSelected { .. } => "file_selected",
            Event::ChangeImage => "change_image",
            Event::RemoveImage => "remove_image",
            Event::Detect => "detect",
            Event::VisibilityChanged { .. } => "visibility_changed",
        }
    }

    /// Events whose handling never suspends.
    pub fn is_synchronous(&self) -> bool {
        matches!(
            self,
            Event::SelectTab(_)
                | Event::StopCamera
                | Event::ChangeImage
                | Event::RemoveImage
                | Event::VisibilityChanged { .. }
        )
    }
}

/// Text of the notice shown for a failed operation.
pub fn user_message(err: &PipelineError) -> String {
    match err {
        PipelineError::Acquire(err) => format!("Failed to start camera: {err}"),
        PipelineError::Format(FormatError::NotImage { .. }) => {
            "Please select an image file".to_string()
        }
        PipelineError::Format(FormatError::Decode(cause)) => {
            format!("Failed to load image: {cause}")
        }
        PipelineError::ModelLoad(err) => format!("Failed to load model: {err}"),
        PipelineError::Detect(DetectError::ModelNotReady) => "Model not loaded yet".to_string(),
        PipelineError::Detect(DetectError::Busy) => "Detection already in progress".to_string(),
        PipelineError::Detect(err) => format!("Detection failed: {err}"),
        PipelineError::NoImage => "Please select an image first".to_string(),
    }
}

pub struct LifecycleController<S> {
    media: MediaSourceManager,
    invoker: DetectionInvoker,
    panels: RefCell<ResultPanels<S>>,
    status: NotificationCenter,
    active_tab: Cell<Tab>,
    last_result: RefCell<Option<DetectionSet>>,
}

impl<S: DrawingSurface> LifecycleController<S> {
    /// `surfaces` feed the YOLO, RCNN and Hybrid panels, in that order.
    pub fn new(
        config: &TriviewConfig,
        device: Box<dyn MediaDevice>,
        decoder: Box<dyn ImageDecoder>,
        surfaces: [S; 3],
    ) -> Self {
        Self {
            media: MediaSourceManager::new(device, decoder, config.camera_constraints()),
            invoker: DetectionInvoker::new(config.detect_timeout),
            panels: RefCell::new(ResultPanels::new(surfaces)),
            status: NotificationCenter::new(config.notice_ttl),
            active_tab: Cell::new(Tab::default()),
            last_result: RefCell::new(None),
        }
    }

    pub fn with_status_observer(mut self, observer: Box<dyn StatusObserver>) -> Self {
        self.status = std::mem::take(&mut self.status).with_observer(observer);
        self
    }

    /// Install the detection model once `load` resolves.
    ///
    /// A failed load is a standing condition: every later detection request
    /// fails with `ModelNotReady`.
    pub async fn load_model<F>(&self, load: F) -> Result<(), PipelineError>
    where
        F: Future<Output = anyhow::Result<Rc<dyn DetectionModel>>>,
    {
        self.status.show_loading("Loading AI model...");
        let loaded = load.await;
        self.status.hide_loading();
        match loaded {
            Ok(model) => {
                self.invoker.install(model);
                self.status.success("Model loaded successfully!");
                Ok(())
            }
            Err(err) => {
                let cause = format!("{:#}", err);
                self.invoker.mark_failed(cause.clone());
                let err = PipelineError::ModelLoad(ModelLoadError(cause));
                self.status.error(user_message(&err));
                Err(err)
            }
        }
    }

    /// Handle one event. Failures are surfaced as error notices and returned.
    pub async fn dispatch(&self, event: Event) -> Result<(), PipelineError> {
        let before = self.state();
        let name = event.name();
        let expected = event.is_synchronous().then(|| transition(before, &event));

        let outcome = match event {
            Event::SelectTab(tab) => {
                self.select_tab(tab);
                Ok(())
            }
            Event::StartCamera => self.start_camera().await,
            Event::CaptureFrame => self.capture_and_detect().await,
            Event::StopCamera => {
                self.stop_camera();
                Ok(())
            }
            Event::FileSelected { bytes, mime } => self.select_file(&bytes, &mime).await,
            Event::ChangeImage => {
                self.status.info("Select a new image");
                Ok(())
            }
            Event::RemoveImage => {
                self.remove_image();
                Ok(())
            }
            Event::Detect => self.detect_current().await,
            Event::VisibilityChanged { hidden } => {
                if hidden {
                    self.stop_camera();
                }
                Ok(())
            }
        };

        match &outcome {
            Ok(()) => {
                let after = self.state();
                log::debug!("{:?} --{}--> {:?}", before, name, after);
                if let Some(expected) = expected {
                    debug_assert_eq!(after, expected, "unexpected state after {name}");
                }
            }
            Err(err) => {
                log::debug!("{} failed in {:?}: {:?}", name, before, err);
                self.status.error(user_message(err));
            }
        }
        outcome
    }

    fn select_tab(&self, tab: Tab) {
        self.active_tab.set(tab);
        if tab == Tab::Upload {
            self.stop_camera();
        }
    }

    async fn start_camera(&self) -> Result<(), PipelineError> {
        match self.media.start_camera().await? {
            CameraStart::Started(handle) => {
                log::info!(
                    "camera {} streaming at {}x{}",
                    handle.label,
                    handle.width,
                    handle.height
                );
                self.status.success("Camera started successfully!");
            }
            CameraStart::AlreadyActive => log::debug!("camera already active"),
        }
        Ok(())
    }

    fn stop_camera(&self) {
        if self.media.stop_camera() {
            self.status.info("Camera stopped");
        }
    }

    async fn capture_and_detect(&self) -> Result<(), PipelineError> {
        if !self.media.camera_active() {
            log::debug!("capture ignored: camera is not running");
            return Ok(());
        }
        // Claim the invoker before touching the snapshot or the panels.
        let ticket = self.invoker.try_begin()?;
        let Some(snapshot) = self.media.capture_frame() else {
            return Ok(());
        };
        self.reset_results();
        self.run_detection(ticket, &snapshot).await
    }

    async fn select_file(&self, bytes: &[u8], mime: &str) -> Result<(), PipelineError> {
        let handle = self.media.load_image(bytes, mime).await?;
        if let Some(image) = handle.get() {
            log::info!("loaded {} image {}x{}", mime, image.width(), image.height());
        }
        self.reset_results();
        Ok(())
    }

    fn remove_image(&self) {
        self.media.clear_image();
        self.reset_results();
        self.status.info("Image removed");
    }

    async fn detect_current(&self) -> Result<(), PipelineError> {
        let image = self.media.current_image().ok_or(PipelineError::NoImage)?;
        let ticket = self.invoker.try_begin()?;
        self.run_detection(ticket, &image).await
    }

    async fn run_detection(
        &self,
        ticket: DetectionTicket<'_>,
        image: &ImageHandle,
    ) -> Result<(), PipelineError> {
        self.status.show_loading("Detecting objects...");
        let outcome = ticket.run(image).await;
        self.status.hide_loading();
        let detected = outcome?;

        // The image may have been removed or replaced while the model ran.
        let still_current = self
            .media
            .current_image()
            .is_some_and(|current| current.same_as(image));
        if !still_current {
            log::info!(
                "discarding {} detections: image changed during detection",
                detected.detections.len()
            );
            return Ok(());
        }

        let views = partition(&detected.detections);
        {
            let mut panels = self.panels.borrow_mut();
            if detected.detections.is_empty() {
                panels.show_empty();
            } else {
                panels.show(&detected.image, &views);
            }
        }
        *self.last_result.borrow_mut() = Some(detected.detections);
        self.status.success("Detection completed!");
        Ok(())
    }

    fn reset_results(&self) {
        self.panels.borrow_mut().reset();
        self.last_result.borrow_mut().take();
    }

    /// State derived from the active input source.
    pub fn state(&self) -> PipelineState {
        self.media.with_source(|source| match source {
            InputSource::None => PipelineState::NoInput,
            InputSource::Camera(feed) if feed.snapshot().is_some() => {
                PipelineState::ImageLoaded(ImageOrigin::CameraSnapshot)
            }
            InputSource::Camera(_) => PipelineState::CameraActive,
            InputSource::StaticImage(_) => PipelineState::ImageLoaded(ImageOrigin::Upload),
        })
    }

    pub fn controls(&self) -> CameraControls {
        self.media.controls()
    }

    pub fn upload_preview_visible(&self) -> bool {
        self.media.upload_preview_visible()
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab.get()
    }

    pub fn media(&self) -> &MediaSourceManager {
        &self.media
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.status
    }

    pub fn model_ready(&self) -> bool {
        self.invoker.is_ready()
    }

    pub fn is_detecting(&self) -> bool {
        self.invoker.is_busy()
    }

    /// Unfiltered output of the last completed pass, until the image changes.
    pub fn last_detections(&self) -> Option<DetectionSet> {
        self.last_result.borrow().clone()
    }

    pub fn panel_status(&self, view: ViewKind) -> String {
        self.panels.borrow().get(view).status().to_string()
    }

    pub fn with_surface<R>(&self, view: ViewKind, f: impl FnOnce(&S) -> R) -> R {
        f(self.panels.borrow().get(view).surface())
    }
}
