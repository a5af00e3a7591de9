use vid_fingerprint_common::CanonicalFrame;

use super::{grid_cell_means, Cue, CueKind, FeatureVector};
use crate::definitions::GRID_CELLS;

/// Mean absolute 3x3 Laplacian response in each cell of a grid over the luma plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaliencyCue;

impl Cue for SaliencyCue {
    fn kind(&self) -> CueKind {
        CueKind::Saliency
    }

    fn len(&self) -> usize {
        (GRID_CELLS * GRID_CELLS) as usize
    }

    fn compute(&self, frame: &CanonicalFrame) -> FeatureVector {
        let response = imageproc::filter::laplacian_filter(frame.luma());

        grid_cell_means(response.width(), response.height(), GRID_CELLS, |x, y| {
            f64::from(response.get_pixel(x, y).0[0].unsigned_abs())
        })
    }
}
