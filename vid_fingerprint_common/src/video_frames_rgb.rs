use image::RgbImage;

use crate::FrameError;

/// A non-empty sequence of frames, none of them empty.
///
/// Frames may differ in resolution, since every frame is canonicalized on its own.
#[derive(Debug, Clone)]
pub struct FrameSeqRgb {
    frames: Vec<RgbImage>,
}

impl FrameSeqRgb {
    /// # Errors
    /// * [`FrameError::Empty`] if there are no frames.
    /// * [`FrameError::Degenerate`] for the first frame with a zero dimension.
    pub fn from_images(images: impl IntoIterator<Item = RgbImage>) -> Result<Self, FrameError> {
        let frames = images.into_iter().collect::<Vec<_>>();

        if frames.is_empty() {
            return Err(FrameError::Empty);
        }

        for (index, frame) in frames.iter().enumerate() {
            let (width, height) = frame.dimensions();
            if width == 0 || height == 0 {
                return Err(FrameError::Degenerate { index, width, height });
            }
        }

        Ok(Self { frames })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Resolution of the first frame.
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        self.frames[0].dimensions()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[RgbImage] {
        &self.frames
    }
}
