use std::num::NonZeroU32;

use image::{imageops::FilterType, RgbImage};

/// Resize with the `image` crate's scalar triangle filter. The result depends only on the
/// input pixels, never on the CPU features of the machine doing the resize.
#[must_use]
pub fn resize_img_rgb(frame: &RgbImage, new_width: NonZeroU32, new_height: NonZeroU32) -> RgbImage {
    if frame.dimensions() == (new_width.get(), new_height.get()) {
        return frame.clone();
    }

    image::imageops::resize(frame, new_width.get(), new_height.get(), FilterType::Triangle)
}
