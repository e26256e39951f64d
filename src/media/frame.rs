//! Decoded images, readiness handles, and the file decode capability.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use tokio::sync::Notify;

use crate::error::FormatError;

/// Fully decoded RGBA image.
///
/// A zero-sized image stands for a frame with no natural dimensions yet, such
/// as a camera stream that has not delivered its first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pixels: RgbaImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Transparent image of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Natural dimensions, or `None` when either side is zero.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        match self.pixels.dimensions() {
            (0, _) | (_, 0) => None,
            dims => Some(dims),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Shared handle to an image that may still be decoding.
///
/// Clones refer to the same slot. Waiters are woken once the producer
/// completes or drops its `ImageCompleter`.
#[derive(Clone)]
pub struct ImageHandle {
    slot: Rc<ImageSlot>,
}

struct ImageSlot {
    state: RefCell<SlotState>,
    ready: Notify,
}

enum SlotState {
    Pending,
    Ready(Rc<DecodedImage>),
    Failed(String),
}

impl ImageSlot {
    fn finish(&self, state: SlotState) {
        *self.state.borrow_mut() = state;
        self.ready.notify_waiters();
    }
}

impl ImageHandle {
    pub fn ready(image: DecodedImage) -> Self {
        Self::with_state(SlotState::Ready(Rc::new(image)))
    }

    /// A handle that becomes ready when the returned completer is resolved.
    pub fn pending() -> (Self, ImageCompleter) {
        let handle = Self::with_state(SlotState::Pending);
        let completer = ImageCompleter {
            slot: Some(handle.slot.clone()),
        };
        (handle, completer)
    }

    fn with_state(state: SlotState) -> Self {
        Self {
            slot: Rc::new(ImageSlot {
                state: RefCell::new(state),
                ready: Notify::new(),
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.slot.state.borrow(), SlotState::Ready(_))
    }

    /// The decoded image, if ready.
    pub fn get(&self) -> Option<Rc<DecodedImage>> {
        match &*self.slot.state.borrow() {
            SlotState::Ready(image) => Some(image.clone()),
            _ => None,
        }
    }

    /// Suspend until the image is decoded. Returns immediately when already ready.
    pub async fn wait_ready(&self) -> Result<Rc<DecodedImage>, FormatError> {
        loop {
            let notified = self.slot.ready.notified();
            match &*self.slot.state.borrow() {
                SlotState::Ready(image) => return Ok(image.clone()),
                SlotState::Failed(reason) => return Err(FormatError::Decode(reason.clone())),
                SlotState::Pending => {}
            }
            notified.await;
        }
    }

    /// True when both handles refer to the same image slot.
    pub fn same_as(&self, other: &ImageHandle) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.slot.state.borrow() {
            SlotState::Pending => "pending".to_string(),
            SlotState::Ready(image) => format!("ready {}x{}", image.width(), image.height()),
            SlotState::Failed(reason) => format!("failed: {reason}"),
        };
        f.debug_struct("ImageHandle").field("state", &state).finish()
    }
}

/// Producer side of a pending `ImageHandle`. Dropping it unresolved fails the handle.
pub struct ImageCompleter {
    slot: Option<Rc<ImageSlot>>,
}

impl ImageCompleter {
    pub fn complete(mut self, result: Result<DecodedImage, FormatError>) {
        if let Some(slot) = self.slot.take() {
            slot.finish(match result {
                Ok(image) => SlotState::Ready(Rc::new(image)),
                Err(err) => SlotState::Failed(err.to_string()),
            });
        }
    }
}

impl Drop for ImageCompleter {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.finish(SlotState::Failed(
                "image source went away before decoding finished".to_string(),
            ));
        }
    }
}

/// Only types in the `image/` family are accepted for upload.
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// File decode capability: bytes plus MIME type to a decoded image.
#[async_trait(?Send)]
pub trait ImageDecoder {
    async fn decode(&self, bytes: &[u8], mime: &str) -> Result<DecodedImage, FormatError>;
}

/// Decoder backed by the `image` crate (PNG and JPEG).
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterDecoder;

#[async_trait(?Send)]
impl ImageDecoder for RasterDecoder {
    async fn decode(&self, bytes: &[u8], mime: &str) -> Result<DecodedImage, FormatError> {
        if !is_image_mime(mime) {
            return Err(FormatError::NotImage {
                mime: mime.to_string(),
            });
        }
        let decoded = match ImageFormat::from_mime_type(mime) {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
        .map_err(|err| FormatError::Decode(err.to_string()))?;
        Ok(DecodedImage::new(decoded.into_rgba8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn decodes_png_upload() {
        let decoded = RasterDecoder
            .decode(&png_bytes(12, 7), "image/png")
            .await
            .unwrap();
        assert_eq!(decoded.natural_size(), Some((12, 7)));
        assert_eq!(decoded.pixels().get_pixel(0, 0), &Rgba([200, 10, 10, 255]));
    }

    #[tokio::test]
    async fn rejects_non_image_mime() {
        let err = RasterDecoder
            .decode(b"hello", "text/plain")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FormatError::NotImage {
                mime: "text/plain".into()
            }
        );
    }

    #[tokio::test]
    async fn corrupt_bytes_fail_to_decode() {
        let err = RasterDecoder
            .decode(b"not really a png", "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, FormatError::Decode(_)));
    }

    #[test]
    fn zero_sized_image_has_no_natural_size() {
        assert_eq!(DecodedImage::blank(0, 0).natural_size(), None);
        assert_eq!(DecodedImage::blank(640, 0).natural_size(), None);
    }

    #[tokio::test]
    async fn dropped_completer_fails_waiters() {
        let (handle, completer) = ImageHandle::pending();
        assert!(!handle.is_ready());
        drop(completer);
        assert!(handle.wait_ready().await.is_err());
    }

    #[test]
    fn clones_share_a_slot() {
        let (handle, completer) = ImageHandle::pending();
        let other = handle.clone();
        completer.complete(Ok(DecodedImage::blank(2, 2)));
        assert!(other.is_ready());
        assert!(other.same_as(&handle));
        assert!(!handle.same_as(&ImageHandle::ready(DecodedImage::blank(2, 2))));
    }
}
