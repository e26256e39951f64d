use anyhow::Result;
use async_trait::async_trait;

use crate::detect::result::Detection;
use crate::media::DecodedImage;

/// Pretrained object detector capability.
///
/// The model is an external collaborator: it either reports itself loaded and
/// answers `detect` with an unfiltered list, or fails with an arbitrary error.
/// Calls run on the pipeline's single thread, so implementations take `&self`
/// and keep any mutable state behind `Cell`/`RefCell`.
#[async_trait(?Send)]
pub trait DetectionModel {
    /// Model identifier, used in logs.
    fn name(&self) -> &str;

    /// Returns true once the model can answer `detect`.
    fn is_loaded(&self) -> bool;

    /// Run detection on a decoded image.
    ///
    /// Boxes are in the image's natural pixel coordinates. Order is whatever
    /// the model produces; callers must not rely on sorting.
    async fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>>;
}
