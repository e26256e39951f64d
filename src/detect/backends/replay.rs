use std::cell::Cell;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::detect::backend::DetectionModel;
use crate::detect::result::Detection;
use crate::media::DecodedImage;

/// Fixture-backed model that answers every call with the same predictions.
///
/// Predictions use the model wire format, so a capture of a real model's
/// output can be replayed through the pipeline unchanged.
pub struct ReplayModel {
    name: String,
    outcome: Outcome,
    calls: Cell<u64>,
}

enum Outcome {
    Predictions(Vec<Detection>),
    Failure(String),
}

impl ReplayModel {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            name: "replay".to_string(),
            outcome: Outcome::Predictions(detections),
            calls: Cell::new(0),
        }
    }

    /// A model whose every `detect` call fails with `cause`.
    pub fn failing(cause: impl Into<String>) -> Self {
        Self {
            name: "replay".to_string(),
            outcome: Outcome::Failure(cause.into()),
            calls: Cell::new(0),
        }
    }

    /// Load predictions from a JSON file (`[{"bbox": [..], "class": .., "score": ..}]`).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read predictions from {}", path.display()))?;
        let mut model = Self::from_json_str(&raw)
            .with_context(|| format!("invalid predictions file {}", path.display()))?;
        model.name = format!("replay:{}", path.display());
        Ok(model)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let detections: Vec<Detection> = serde_json::from_str(raw)?;
        if let Some(bad) = detections
            .iter()
            .find(|d| !(0.0..=1.0).contains(&d.score))
        {
            return Err(anyhow!(
                "score {} for '{}' is outside [0, 1]",
                bad.score,
                bad.label
            ));
        }
        Ok(Self::new(detections))
    }

    /// Number of `detect` calls answered so far.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl DetectionModel for ReplayModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        true
    }

    async fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>> {
        self.calls.set(self.calls.get() + 1);
        log::debug!(
            "{}: detect on {}x{} image",
            self.name,
            image.width(),
            image.height()
        );
        match &self.outcome {
            Outcome::Predictions(detections) => Ok(detections.clone()),
            Outcome::Failure(cause) => Err(anyhow!("{}", cause)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn replays_predictions_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[{"bbox": [1, 2, 3, 4], "class": "cup", "score": 0.75}]"#)
            .unwrap();

        let model = ReplayModel::from_json_file(file.path()).unwrap();
        let image = DecodedImage::blank(8, 8);
        let first = model.detect(&image).await.unwrap();
        let second = model.detect(&image).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].label, "cup");
        assert_eq!(model.calls(), 2);
        assert!(model.name().starts_with("replay:"));
    }

    #[test]
    fn rejects_scores_outside_unit_range() {
        let err = ReplayModel::from_json_str(r#"[{"bbox": [0, 0, 1, 1], "class": "x", "score": 1.5}]"#)
            .err()
            .unwrap();
        assert!(err.to_string().contains("outside [0, 1]"));
    }

    #[tokio::test]
    async fn failing_model_reports_cause() {
        let model = ReplayModel::failing("backend crashed");
        let err = model.detect(&DecodedImage::blank(1, 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "backend crashed");
    }
}
