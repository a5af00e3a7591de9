use vid_fingerprint_common::CanonicalFrame;

use super::{grid_cell_means, Cue, CueKind, FeatureVector};
use crate::definitions::{CANNY_HIGH_THRESHOLD, CANNY_LOW_THRESHOLD, GRID_CELLS};

/// Fraction of Canny edge pixels in each cell of a grid over the luma plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCue {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeCue {
    fn default() -> Self {
        Self {
            low_threshold: CANNY_LOW_THRESHOLD,
            high_threshold: CANNY_HIGH_THRESHOLD,
        }
    }
}

impl Cue for EdgeCue {
    fn kind(&self) -> CueKind {
        CueKind::Edge
    }

    fn len(&self) -> usize {
        (GRID_CELLS * GRID_CELLS) as usize
    }

    fn compute(&self, frame: &CanonicalFrame) -> FeatureVector {
        let edges = imageproc::edges::canny(frame.luma(), self.low_threshold, self.high_threshold);

        grid_cell_means(edges.width(), edges.height(), GRID_CELLS, |x, y| {
            if edges.get_pixel(x, y).0[0] > 0 {
                1.0
            } else {
                0.0
            }
        })
    }
}
