//! Camera capture.
//!
//! The device capability hands out streams; a stream yields snapshots of its
//! current frame and releases its tracks on `stop_all_tracks`.
//!
//! `SyntheticCamera` stands in for a real device in tests and in the CLI. It
//! renders a moving pattern at the requested resolution and keeps shared
//! counters so callers can check that tracks were actually released.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use serde::Deserialize;

use super::frame::DecodedImage;
use crate::error::AcquireError;

/// Which way the camera should face, when the device offers a choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    /// Rear-facing.
    #[default]
    Environment,
}

impl FacingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "environment" => Some(Self::Environment),
            _ => None,
        }
    }
}

/// Preferred stream parameters. Devices may deliver something else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 360,
            facing: FacingMode::Environment,
        }
    }
}

/// Media device capability.
#[async_trait(?Send)]
pub trait MediaDevice {
    async fn acquire_stream(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquireError>;
}

/// An open device stream.
pub trait MediaStream {
    /// Human-readable stream label for logs.
    fn label(&self) -> &str;

    /// Delivered resolution.
    fn resolution(&self) -> (u32, u32);

    /// Copy of the current frame. Zero-sized when no frame is available.
    fn snapshot(&mut self) -> DecodedImage;

    /// Stop every track. Idempotent.
    fn stop_all_tracks(&mut self);

    fn live_tracks(&self) -> usize;
}

/// Counters shared between a `SyntheticCamera` and the streams it opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CameraStats {
    pub streams_opened: u64,
    pub live_tracks: usize,
    pub frames_captured: u64,
}

/// In-process camera producing a synthetic scene.
#[derive(Clone, Default)]
pub struct SyntheticCamera {
    failure: Option<AcquireError>,
    stats: Rc<RefCell<CameraStats>>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose every acquisition fails with `failure`.
    pub fn failing(failure: AcquireError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn stats(&self) -> CameraStats {
        *self.stats.borrow()
    }
}

#[async_trait(?Send)]
impl MediaDevice for SyntheticCamera {
    async fn acquire_stream(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquireError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        // Single-client device: a second open while tracks are live is refused.
        if self.stats.borrow().live_tracks > 0 {
            return Err(AcquireError::DeviceBusy);
        }

        let mut stats = self.stats.borrow_mut();
        stats.streams_opened += 1;
        stats.live_tracks += 1;
        let stream = SyntheticStream {
            label: format!("stub://camera/{}", stats.streams_opened),
            width: constraints.ideal_width,
            height: constraints.ideal_height,
            frame_count: 0,
            scene_state: 0,
            video_live: true,
            stats: self.stats.clone(),
        };
        log::info!(
            "SyntheticCamera: opened {} at {}x{} ({:?})",
            stream.label,
            stream.width,
            stream.height,
            constraints.facing
        );
        Ok(Box::new(stream))
    }
}

struct SyntheticStream {
    label: String,
    width: u32,
    height: u32,
    frame_count: u64,
    /// Simulated scene; changes every 50 frames.
    scene_state: u8,
    video_live: bool,
    stats: Rc<RefCell<CameraStats>>,
}

impl SyntheticStream {
    fn generate_synthetic_frame(&mut self) -> RgbaImage {
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let shift = self.frame_count + self.scene_state as u64;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let v = ((x as u64 + y as u64 + shift) % 256) as u8;
            Rgba([v, v.wrapping_mul(3), 255 - v, 255])
        })
    }
}

impl MediaStream for SyntheticStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn snapshot(&mut self) -> DecodedImage {
        if !self.video_live {
            return DecodedImage::blank(0, 0);
        }
        self.frame_count += 1;
        self.stats.borrow_mut().frames_captured += 1;
        DecodedImage::new(self.generate_synthetic_frame())
    }

    fn stop_all_tracks(&mut self) {
        if self.video_live {
            self.video_live = false;
            self.stats.borrow_mut().live_tracks -= 1;
            log::info!("SyntheticCamera: stopped {}", self.label);
        }
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.video_live)
    }
}
