//! Visual cue families. Each cue turns one canonical frame into a fixed number of real values.

mod colour;
mod edge;
mod saliency;
mod texture;

use serde::{Deserialize, Serialize};
use vid_fingerprint_common::CanonicalFrame;

pub use colour::ColourCue;
pub use edge::EdgeCue;
pub use saliency::SaliencyCue;
pub use texture::TextureCue;

pub type FeatureVector = Vec<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CueKind {
    Edge,
    Texture,
    Saliency,
    Colour,
}

/// One family of visual features.
///
/// `compute` must be a pure function of the frame and must always return exactly `len()`
/// values.
pub trait Cue: Send + Sync {
    fn kind(&self) -> CueKind;

    fn len(&self) -> usize;

    fn compute(&self, frame: &CanonicalFrame) -> FeatureVector;
}

/// The cues of the current bit layout, in layout order.
pub fn default_cues() -> Vec<Box<dyn Cue>> {
    vec![
        Box::new(EdgeCue::default()),
        Box::new(TextureCue::default()),
        Box::new(SaliencyCue),
        Box::new(ColourCue),
    ]
}

//Mean of `value(x, y)` over each cell of a `cells`x`cells` grid laid over a `width`x`height`
//image. Cells are returned row-major.
pub(crate) fn grid_cell_means(
    width: u32,
    height: u32,
    cells: u32,
    value: impl Fn(u32, u32) -> f64,
) -> FeatureVector {
    let mut ret = Vec::with_capacity((cells * cells) as usize);

    for cell_y in 0..cells {
        let (y_start, y_end) = (cell_y * height / cells, (cell_y + 1) * height / cells);
        for cell_x in 0..cells {
            let (x_start, x_end) = (cell_x * width / cells, (cell_x + 1) * width / cells);

            let mut sum = 0.0;
            for y in y_start..y_end {
                for x in x_start..x_end {
                    sum += value(x, y);
                }
            }

            let num_pixels = f64::from((y_end - y_start) * (x_end - x_start));
            ret.push(if num_pixels > 0.0 { sum / num_pixels } else { 0.0 });
        }
    }

    ret
}

#[cfg(test)]
pub(crate) mod test_frames {
    use std::num::NonZeroU32;

    use image::{Rgb, RgbImage};
    use vid_fingerprint_common::CanonicalFrame;

    use crate::definitions::CANONICAL_SIZE;

    pub fn canonical(frame: &RgbImage) -> CanonicalFrame {
        CanonicalFrame::from_rgb(frame, NonZeroU32::new(CANONICAL_SIZE).unwrap())
    }

    pub fn flat(colour: [u8; 3]) -> CanonicalFrame {
        canonical(&RgbImage::from_pixel(64, 64, Rgb(colour)))
    }

    //black on the left half, white on the right half.
    pub fn vertical_split() -> CanonicalFrame {
        canonical(&RgbImage::from_fn(64, 64, |x, _y| {
            if x < 32 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }

    pub fn stripes(period: u32, horizontal: bool) -> CanonicalFrame {
        canonical(&RgbImage::from_fn(64, 64, |x, y| {
            let pos = if horizontal { y } else { x };
            if (pos / (period / 2)) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }
}
