use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::detect::backend::DetectionModel;
use crate::detect::result::DetectionSet;
use crate::error::DetectError;
use crate::media::{DecodedImage, ImageHandle};

/// Wraps the model capability with a readiness check, a busy guard, and error
/// translation.
///
/// At most one pass is outstanding. A second request while one is running
/// fails with `DetectError::Busy`; nothing is queued and nothing is cancelled.
pub struct DetectionInvoker {
    model: RefCell<ModelSlot>,
    busy: Cell<bool>,
    timeout: Option<Duration>,
}

enum ModelSlot {
    Unloaded,
    Loaded(Rc<dyn DetectionModel>),
    Failed(String),
}

/// Output of a completed pass, paired with the image it ran on.
pub struct Detected {
    pub detections: DetectionSet,
    pub image: Rc<DecodedImage>,
}

impl DetectionInvoker {
    /// `timeout` of `None` waits on the model indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            model: RefCell::new(ModelSlot::Unloaded),
            busy: Cell::new(false),
            timeout,
        }
    }

    pub fn install(&self, model: Rc<dyn DetectionModel>) {
        log::info!("detection model '{}' installed", model.name());
        *self.model.borrow_mut() = ModelSlot::Loaded(model);
    }

    /// Record a failed model load. Detection stays disabled until a model is installed.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        *self.model.borrow_mut() = ModelSlot::Failed(reason.into());
    }

    pub fn load_failure(&self) -> Option<String> {
        match &*self.model.borrow() {
            ModelSlot::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.model.borrow(), ModelSlot::Loaded(model) if model.is_loaded())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Claim the invoker for one pass.
    ///
    /// Runs synchronously, so no other event can slip in between the checks and
    /// the claim. The claim is released when the ticket is dropped.
    pub fn try_begin(&self) -> Result<DetectionTicket<'_>, DetectError> {
        let model = match &*self.model.borrow() {
            ModelSlot::Loaded(model) if model.is_loaded() => model.clone(),
            _ => return Err(DetectError::ModelNotReady),
        };
        if self.busy.replace(true) {
            return Err(DetectError::Busy);
        }
        Ok(DetectionTicket {
            invoker: self,
            model,
        })
    }

    /// Run one pass over `image`, returning the unfiltered model output.
    pub async fn detect(&self, image: &ImageHandle) -> Result<DetectionSet, DetectError> {
        let detected = self.try_begin()?.run(image).await?;
        Ok(detected.detections)
    }
}

/// An exclusive claim on the invoker, held for the duration of one pass.
pub struct DetectionTicket<'a> {
    invoker: &'a DetectionInvoker,
    model: Rc<dyn DetectionModel>,
}

impl DetectionTicket<'_> {
    /// Wait for the image to be ready, then call the model. No retries.
    pub async fn run(self, image: &ImageHandle) -> Result<Detected, DetectError> {
        let decoded = image
            .wait_ready()
            .await
            .map_err(|err| DetectError::Failed {
                cause: err.to_string(),
            })?;

        let call = self.model.detect(&decoded);
        let outcome = match self.invoker.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| DetectError::TimedOut(limit))?,
            None => call.await,
        };

        match outcome {
            Ok(predictions) => {
                log::info!(
                    "{}: {} detections on {}x{} image",
                    self.model.name(),
                    predictions.len(),
                    decoded.width(),
                    decoded.height()
                );
                Ok(Detected {
                    detections: predictions.into(),
                    image: decoded,
                })
            }
            Err(err) => Err(DetectError::Failed {
                cause: format!("{:#}", err),
            }),
        }
    }
}

impl Drop for DetectionTicket<'_> {
    fn drop(&mut self) {
        self.invoker.busy.set(false);
    }
}
