//! Media sources.
//!
//! `MediaSourceManager` owns the single active `InputSource`:
//! - `None`: nothing to show
//! - `Camera`: an open device stream, plus the last captured snapshot if any
//! - `StaticImage`: a fully decoded upload
//!
//! Exactly one variant is active. Installing one tears down the other: an
//! upload stops the camera's tracks, a camera start releases the upload.
//!
//! The manager never holds a borrow of its state across an `.await`, so other
//! events may run while a camera is being acquired or an upload decoded.

pub mod camera;
pub mod frame;

use std::cell::RefCell;

pub use camera::{
    CameraConstraints, CameraStats, FacingMode, MediaDevice, MediaStream, SyntheticCamera,
};
pub use frame::{
    is_image_mime, DecodedImage, ImageCompleter, ImageDecoder, ImageHandle, RasterDecoder,
};

use crate::error::{AcquireError, FormatError};

/// An open camera stream and its most recent snapshot.
pub struct CameraFeed {
    stream: Box<dyn MediaStream>,
    snapshot: Option<ImageHandle>,
}

impl CameraFeed {
    pub fn label(&self) -> &str {
        self.stream.label()
    }

    pub fn snapshot(&self) -> Option<&ImageHandle> {
        self.snapshot.as_ref()
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        self.stream.stop_all_tracks();
    }
}

/// The active image origin.
#[derive(Default)]
pub enum InputSource {
    #[default]
    None,
    Camera(CameraFeed),
    StaticImage(ImageHandle),
}

/// Summary of a started camera stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraHandle {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

/// Outcome of `start_camera`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraStart {
    Started(CameraHandle),
    /// A stream was already open; nothing changed.
    AlreadyActive,
}

/// Which camera buttons are enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraControls {
    pub start: bool,
    pub capture: bool,
    pub stop: bool,
}

pub struct MediaSourceManager {
    device: Box<dyn MediaDevice>,
    decoder: Box<dyn ImageDecoder>,
    constraints: CameraConstraints,
    source: RefCell<InputSource>,
}

impl MediaSourceManager {
    pub fn new(
        device: Box<dyn MediaDevice>,
        decoder: Box<dyn ImageDecoder>,
        constraints: CameraConstraints,
    ) -> Self {
        Self {
            device,
            decoder,
            constraints,
            source: RefCell::new(InputSource::None),
        }
    }

    /// Open the camera at the preferred resolution. On failure nothing changes.
    pub async fn start_camera(&self) -> Result<CameraStart, AcquireError> {
        if self.camera_active() {
            return Ok(CameraStart::AlreadyActive);
        }

        let stream = match self.device.acquire_stream(&self.constraints).await {
            Ok(stream) => stream,
            // Single-client devices refuse a second open once a concurrent start holds them.
            Err(AcquireError::DeviceBusy) if self.camera_active() => {
                log::debug!("camera became active while acquiring; keeping the open stream");
                return Ok(CameraStart::AlreadyActive);
            }
            Err(err) => return Err(err),
        };

        let mut source = self.source.borrow_mut();
        if matches!(&*source, InputSource::Camera(_)) {
            // Another start finished while this one was acquiring on a shared device.
            drop(source);
            let mut extra = stream;
            extra.stop_all_tracks();
            return Ok(CameraStart::AlreadyActive);
        }
        let (width, height) = stream.resolution();
        let handle = CameraHandle {
            label: stream.label().to_string(),
            width,
            height,
        };
        *source = InputSource::Camera(CameraFeed {
            stream,
            snapshot: None,
        });
        Ok(CameraStart::Started(handle))
    }

    /// Release every track and return to `None`. Returns false when no camera was open.
    pub fn stop_camera(&self) -> bool {
        let mut source = self.source.borrow_mut();
        if !matches!(&*source, InputSource::Camera(_)) {
            return false;
        }
        // Dropping the feed stops its tracks.
        *source = InputSource::None;
        true
    }

    /// Snapshot the current camera frame. `None` when no camera is open.
    ///
    /// The stream keeps running; the snapshot replaces any previous one.
    pub fn capture_frame(&self) -> Option<ImageHandle> {
        let mut source = self.source.borrow_mut();
        let InputSource::Camera(feed) = &mut *source else {
            return None;
        };
        let handle = ImageHandle::ready(feed.stream.snapshot());
        feed.snapshot = Some(handle.clone());
        Some(handle)
    }

    /// Validate, decode, and install an upload, replacing whatever was active.
    ///
    /// Non-image MIME types and undecodable bytes leave the state unchanged.
    pub async fn load_image(&self, bytes: &[u8], mime: &str) -> Result<ImageHandle, FormatError> {
        if !is_image_mime(mime) {
            return Err(FormatError::NotImage {
                mime: mime.to_string(),
            });
        }
        let decoded = self.decoder.decode(bytes, mime).await?;
        let handle = ImageHandle::ready(decoded);
        let previous = self.source.replace(InputSource::StaticImage(handle.clone()));
        if let InputSource::Camera(feed) = &previous {
            log::info!("upload replaced camera stream {}", feed.label());
        }
        Ok(handle)
    }

    /// Drop the current image.
    ///
    /// An upload returns the source to `None`; a camera snapshot is discarded
    /// while the stream stays open. Returns false when there was no image.
    pub fn clear_image(&self) -> bool {
        let mut source = self.source.borrow_mut();
        match &mut *source {
            InputSource::StaticImage(_) => {
                *source = InputSource::None;
                true
            }
            InputSource::Camera(feed) => feed.snapshot.take().is_some(),
            InputSource::None => false,
        }
    }

    pub fn camera_active(&self) -> bool {
        matches!(&*self.source.borrow(), InputSource::Camera(_))
    }

    /// Image a detection pass would run on: the upload, or the latest camera snapshot.
    pub fn current_image(&self) -> Option<ImageHandle> {
        match &*self.source.borrow() {
            InputSource::StaticImage(handle) => Some(handle.clone()),
            InputSource::Camera(feed) => feed.snapshot.clone(),
            InputSource::None => None,
        }
    }

    pub fn controls(&self) -> CameraControls {
        let live = self.camera_active();
        CameraControls {
            start: !live,
            capture: live,
            stop: live,
        }
    }

    /// The upload panel shows the preview instead of the drop area.
    pub fn upload_preview_visible(&self) -> bool {
        matches!(&*self.source.borrow(), InputSource::StaticImage(_))
    }

    /// Borrow the active source.
    pub fn with_source<R>(&self, f: impl FnOnce(&InputSource) -> R) -> R {
        f(&self.source.borrow())
    }
}
