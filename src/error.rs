//! Error taxonomy for the capture/detect/display pipeline.
//!
//! Every error is recovered at the controller's dispatch boundary and surfaced
//! as a transient notice. Only `ModelLoadError` leaves a standing condition
//! behind (detection stays disabled).

use std::time::Duration;

use thiserror::Error;

/// Camera acquisition failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AcquireError {
    #[error("camera access was denied")]
    Denied,
    #[error("no camera device is available")]
    NoDevice,
    #[error("camera device is busy")]
    DeviceBusy,
}

/// Rejected or undecodable image input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("not an image file (type '{mime}')")]
    NotImage { mime: String },
    #[error("image could not be decoded: {0}")]
    Decode(String),
}

/// The model failed to initialize. Detection stays disabled afterwards.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ModelLoadError(pub String);

/// Failures of a single detection pass.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("model not loaded yet")]
    ModelNotReady,
    #[error("a detection pass is already in progress")]
    Busy,
    #[error("{cause}")]
    Failed { cause: String },
    #[error("detection did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Umbrella error returned by the lifecycle controller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("no image is loaded")]
    NoImage,
}
