//! Pure transition function of the capture/detect/display pipeline.
//!
//! ```text
//! NoInput      --StartCamera-->           CameraActive
//! CameraActive --StopCamera-->            NoInput
//! CameraActive --CaptureFrame-->          ImageLoaded(snapshot), stream stays open
//! any          --FileSelected-->          ImageLoaded(upload)
//! ImageLoaded  --RemoveImage-->           NoInput (upload) / CameraActive (snapshot)
//! camera open  --SelectTab(Upload)-->     NoInput
//! camera open  --VisibilityChanged(hidden)--> NoInput
//! ```
//!
//! The function describes the state after an event's effects succeed. A
//! failing effect (camera denied, non-image upload) leaves the state as is.

use super::Event;

/// Where the loaded image came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageOrigin {
    Upload,
    /// Captured from a camera stream that is still open.
    CameraSnapshot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    NoInput,
    CameraActive,
    ImageLoaded(ImageOrigin),
}

impl PipelineState {
    /// True when a device stream is open.
    pub fn camera_open(self) -> bool {
        matches!(
            self,
            PipelineState::CameraActive | PipelineState::ImageLoaded(ImageOrigin::CameraSnapshot)
        )
    }
}

/// Tabs of the input panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Camera,
    Upload,
}

pub fn transition(state: PipelineState, event: &Event) -> PipelineState {
    use ImageOrigin::*;
    use PipelineState::*;

    match event {
        Event::StartCamera => match state {
            NoInput | ImageLoaded(Upload) => CameraActive,
            CameraActive | ImageLoaded(CameraSnapshot) => state,
        },
        Event::StopCamera => {
            if state.camera_open() {
                NoInput
            } else {
                state
            }
        }
        Event::CaptureFrame => {
            if state.camera_open() {
                ImageLoaded(CameraSnapshot)
            } else {
                state
            }
        }
        Event::FileSelected { .. } => ImageLoaded(Upload),
        Event::RemoveImage => match state {
            ImageLoaded(Upload) => NoInput,
            ImageLoaded(CameraSnapshot) => CameraActive,
            NoInput | CameraActive => state,
        },
        Event::SelectTab(Tab::Upload) | Event::VisibilityChanged { hidden: true } => {
            if state.camera_open() {
                NoInput
            } else {
                state
            }
        }
        Event::SelectTab(Tab::Camera)
        | Event::VisibilityChanged { hidden: false }
        | Event::ChangeImage
        | Event::Detect => state,
    }
}
