use std::{path::Path, time::Duration};

use image::RgbImage;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    binarizer::Binarizer,
    extractor::FeatureExtractor,
    frame_source::{FrameSource, InMemoryFrames, VideoFile},
};
use crate::{
    definitions::{DEFAULT_DECODE_TIMEOUT_SECS, DEFAULT_MAX_FRAMES},
    Error, Fingerprint,
};

/// Options for how videos are sampled when creating fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationOptions {
    /// The maximum number of frames sampled from each video. Frames are spread evenly
    /// across the whole video. Must be at least 1.
    pub max_frames: u32,

    /// Time allowed for decoding one video. When it runs out, the frames decoded so far
    /// are used.
    pub timeout: Duration,
}

impl Default for CreationOptions {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            timeout: Duration::from_secs(DEFAULT_DECODE_TIMEOUT_SECS),
        }
    }
}

/// Facts about the frames a fingerprint was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStats {
    pub frame_count: usize,
    /// Resolution of the first sampled frame.
    pub resolution: (u32, u32),
}

/// A factory for fingerprints: frame sampling, then cue extraction, then binarization.
///
/// Use the default constructor unless supplying custom options.
#[derive(Debug, Default)]
pub struct FingerprintBuilder {
    options: CreationOptions,
    extractor: FeatureExtractor,
    binarizer: Binarizer,
}

impl FingerprintBuilder {
    pub fn from_options(options: CreationOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> CreationOptions {
        self.options
    }

    /// Fingerprint the video file at `src_path`.
    ///
    /// # Errors
    /// Returns `Err` if the file cannot be decoded, yields no frames, or contains a degenerate frame.
    pub fn fingerprint_path(&self, src_path: impl AsRef<Path>) -> Result<Fingerprint, Error> {
        let source = VideoFile::new(src_path).with_timeout(self.options.timeout);
        self.fingerprint_source(&source)
    }

    /// Fingerprint frames that have already been decoded.
    pub fn fingerprint_frames(
        &self,
        frames: impl IntoIterator<Item = RgbImage>,
    ) -> Result<Fingerprint, Error> {
        self.fingerprint_source(&InMemoryFrames::new(frames))
    }

    pub fn fingerprint_source(&self, source: &impl FrameSource) -> Result<Fingerprint, Error> {
        self.fingerprint_with_stats(source).map(|(fp, _stats)| fp)
    }

    pub fn fingerprint_with_stats(
        &self,
        source: &impl FrameSource,
    ) -> Result<(Fingerprint, SampleStats), Error> {
        let frames = source.sample(self.options.max_frames)?;
        let stats = SampleStats {
            frame_count: frames.len(),
            resolution: frames.resolution(),
        };

        let features = self.extractor.extract(&frames)?;
        let fingerprint = self.binarizer.binarize(&features)?;

        debug!(target: "fingerprint_creation",
            "{}: {} from {} frames",
            source.src_path().display(), fingerprint, stats.frame_count
        );

        Ok((fingerprint, stats))
    }
}

/// Fingerprint the video at `src_path` from at most `max_frames` evenly spaced frames, using the
/// default decode timeout.
///
/// # Errors
/// See [`FingerprintBuilder::fingerprint_path`]. `max_frames` of zero is [`Error::InvalidFrameCount`].
pub fn fingerprint(src_path: impl AsRef<Path>, max_frames: u32) -> Result<Fingerprint, Error> {
    FingerprintBuilder::from_options(CreationOptions {
        max_frames,
        ..CreationOptions::default()
    })
    .fingerprint_path(src_path)
}
