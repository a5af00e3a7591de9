use std::num::NonZeroU32;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::resize_rgb::resize_img_rgb;

/// A frame resized to the fixed canonical resolution, together with its luma plane.
///
/// Every cue is computed from one of these, so cue outputs do not depend on the
/// resolution of the source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFrame {
    rgb: RgbImage,
    luma: GrayImage,
}

impl CanonicalFrame {
    #[must_use]
    pub fn from_rgb(frame: &RgbImage, size: NonZeroU32) -> Self {
        let rgb = resize_img_rgb(frame, size, size);
        let luma = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            Luma([luma_bt601(*rgb.get_pixel(x, y))])
        });

        Self { rgb, luma }
    }

    #[must_use]
    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    #[must_use]
    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    /// Side length in pixels. Canonical frames are square.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.rgb.width()
    }
}

/// ITU-R BT.601 luma in integer arithmetic, rounded to nearest.
#[must_use]
pub fn luma_bt601(Rgb([r, g, b]): Rgb<u8>) -> u8 {
    let y = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((y + 500) / 1000) as u8
}
