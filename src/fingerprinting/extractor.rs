use std::num::NonZeroU32;

use log::trace;
use rayon::prelude::*;
use vid_fingerprint_common::{CanonicalFrame, FrameSeqRgb};

use super::cues::{default_cues, Cue, CueKind, FeatureVector};
use crate::{definitions::CANONICAL_SIZE, Error};

/// Computes an ordered list of cues over every frame of a video and averages them.
pub struct FeatureExtractor {
    cues: Vec<Box<dyn Cue>>,
    canonical_size: NonZeroU32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(default_cues())
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("cues", &self.cue_kinds())
            .field("canonical_size", &self.canonical_size)
            .finish()
    }
}

impl FeatureExtractor {
    pub fn new(cues: Vec<Box<dyn Cue>>) -> Self {
        Self {
            cues,
            canonical_size: NonZeroU32::new(CANONICAL_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }

    pub fn cue_kinds(&self) -> Vec<CueKind> {
        self.cues.iter().map(|cue| cue.kind()).collect()
    }

    /// Length of the vectors produced by [`FeatureExtractor::extract`].
    pub fn feature_len(&self) -> usize {
        self.cues.iter().map(|cue| cue.len()).sum()
    }

    /// All cues of one frame, concatenated in cue order.
    ///
    /// # Errors
    /// [`Error::DimensionMismatch`] if a cue does not return the number of values it declares.
    pub fn frame_features(&self, frame: &CanonicalFrame) -> Result<FeatureVector, Error> {
        let mut ret = Vec::with_capacity(self.feature_len());
        for cue in &self.cues {
            let values = cue.compute(frame);
            if values.len() != cue.len() {
                return Err(Error::DimensionMismatch {
                    expected: cue.len(),
                    actual: values.len(),
                });
            }
            ret.extend(values);
        }
        Ok(ret)
    }

    /// The mean of the per-frame feature vectors.
    ///
    /// Frames are processed in parallel but summed in frame order, so the result is
    /// bit-identical for identical input.
    pub fn extract(&self, frames: &FrameSeqRgb) -> Result<FeatureVector, Error> {
        let per_frame = frames
            .as_slice()
            .par_iter()
            .enumerate()
            .map(|(index, frame)| {
                trace!(target: "feature_extraction", "computing cues for frame {index}");
                let canonical = CanonicalFrame::from_rgb(frame, self.canonical_size);
                self.frame_features(&canonical)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut sums = vec![0f64; self.feature_len()];
        for features in &per_frame {
            for (acc, value) in sums.iter_mut().zip(features) {
                *acc += value;
            }
        }

        let num_frames = per_frame.len().max(1) as f64;
        Ok(sums.into_iter().map(|sum| sum / num_frames).collect())
    }
}
