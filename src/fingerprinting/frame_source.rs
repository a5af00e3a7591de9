use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_cmdline_utils::{FfmpegError, FfmpegFrameReaderBuilder};
use image::RgbImage;
use log::{debug, warn};
use vid_fingerprint_common::FrameSeqRgb;

use crate::{definitions::DEFAULT_DECODE_TIMEOUT_SECS, Error};

/// Something that frames can be sampled from.
pub trait FrameSource {
    /// Identifies the source in errors and logs.
    fn src_path(&self) -> &Path;

    /// At most `max_frames` frames spread across the whole source, in timeline order.
    ///
    /// # Errors
    /// * [`Error::InvalidFrameCount`] if `max_frames` is zero.
    /// * [`Error::SourceUnreadable`] if the source cannot be opened or decoded.
    /// * [`Error::DecodeTimeout`] if decoding does not finish in time.
    /// * [`Error::EmptySource`] if no frames could be decoded.
    /// * [`Error::DegenerateFrame`] if a frame has no pixels.
    fn sample(&self, max_frames: u32) -> Result<FrameSeqRgb, Error>;
}

/// A video file on disk, decoded by an `ffmpeg` child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    src_path: PathBuf,
    timeout: Duration,
}

impl VideoFile {
    pub fn new(src_path: impl AsRef<Path>) -> Self {
        Self {
            src_path: src_path.as_ref().to_path_buf(),
            timeout: Duration::from_secs(DEFAULT_DECODE_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl FrameSource for VideoFile {
    fn src_path(&self) -> &Path {
        &self.src_path
    }

    fn sample(&self, max_frames: u32) -> Result<FrameSeqRgb, Error> {
        if max_frames == 0 {
            return Err(Error::InvalidFrameCount);
        }

        let (mut frame_iter, info) = FfmpegFrameReaderBuilder::new(&self.src_path)
            .evenly_spaced()
            .num_frames(max_frames)
            .timeout(self.timeout)
            .spawn_rgb()
            .map_err(|e| match e {
                //a file with no video stream has nothing to decode.
                FfmpegError::InvalidResolution => Error::EmptySource(self.src_path.clone()),
                e => Error::from_ffmpeg(&self.src_path, &e),
            })?;

        let frames = frame_iter.by_ref().collect::<Vec<_>>();

        if frame_iter.timed_out() {
            warn!(target: "frame_sampling",
                "Timed out after {:?} decoding {} ({} frames read)",
                self.timeout, self.src_path.display(), frames.len()
            );
            return Err(Error::DecodeTimeout {
                src_path: self.src_path.clone(),
                timeout: self.timeout,
            });
        }

        debug!(target: "frame_sampling",
            "sampled {} frames from {} (duration {:?}, resolution {:?})",
            frames.len(), self.src_path.display(), info.duration(), info.resolution()
        );

        if frames.is_empty() {
            return Err(Error::EmptySource(self.src_path.clone()));
        }

        Ok(FrameSeqRgb::from_images(frames)?)
    }
}

/// Frames that have already been decoded, for example by the caller's own decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryFrames {
    src_path: PathBuf,
    frames: Vec<RgbImage>,
}

impl InMemoryFrames {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            src_path: PathBuf::from("<memory>"),
            frames: frames.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn with_src_path(mut self, src_path: impl AsRef<Path>) -> Self {
        self.src_path = src_path.as_ref().to_path_buf();
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    //indices of `max_frames` frames spread evenly over `len`, or all of them if there are fewer.
    fn spaced_indices(len: usize, max_frames: usize) -> impl Iterator<Item = usize> {
        let take = len.min(max_frames);
        (0..take).map(move |i| i * len / take)
    }
}

impl FrameSource for InMemoryFrames {
    fn src_path(&self) -> &Path {
        &self.src_path
    }

    fn sample(&self, max_frames: u32) -> Result<FrameSeqRgb, Error> {
        if max_frames == 0 {
            return Err(Error::InvalidFrameCount);
        }

        if self.frames.is_empty() {
            return Err(Error::EmptySource(self.src_path.clone()));
        }

        let selected = Self::spaced_indices(self.frames.len(), max_frames as usize)
            .map(|i| self.frames[i].clone());

        Ok(FrameSeqRgb::from_images(selected)?)
    }
}

#[cfg(test)]
mod test {
    use image::Rgb;

    use super::*;

    fn numbered_frames(n: u8) -> InMemoryFrames {
        InMemoryFrames::new((0..n).map(|i| RgbImage::from_pixel(4, 4, Rgb([i, 0, 0]))))
    }

    fn frame_numbers(seq: &FrameSeqRgb) -> Vec<u8> {
        seq.as_slice().iter().map(|f| f.get_pixel(0, 0).0[0]).collect()
    }

    #[test]
    fn test_spacing_covers_the_whole_sequence() {
        let seq = numbered_frames(100).sample(4).unwrap();
        assert_eq!(frame_numbers(&seq), vec![0, 25, 50, 75]);

        let seq = numbered_frames(10).sample(3).unwrap();
        assert_eq!(frame_numbers(&seq), vec![0, 3, 6]);
    }

    #[test]
    fn test_short_sources_return_every_frame() {
        let seq = numbered_frames(5).sample(60).unwrap();
        assert_eq!(frame_numbers(&seq), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_max_frames_is_rejected() {
        assert_eq!(numbered_frames(5).sample(0).unwrap_err(), Error::InvalidFrameCount);
        assert_eq!(
            VideoFile::new("does_not_matter.mp4").sample(0).unwrap_err(),
            Error::InvalidFrameCount
        );
    }

    #[test]
    fn test_empty_source() {
        let source = InMemoryFrames::new(vec![]).with_src_path("empty.mp4");
        assert_eq!(
            source.sample(10).unwrap_err(),
            Error::EmptySource(PathBuf::from("empty.mp4"))
        );
    }

    #[test]
    fn test_degenerate_frame_is_reported_by_index() {
        let frames = vec![
            RgbImage::from_pixel(8, 8, Rgb([0, 0, 0])),
            RgbImage::new(0, 0),
        ];
        assert_eq!(
            InMemoryFrames::new(frames).sample(10).unwrap_err(),
            Error::DegenerateFrame { index: 1, width: 0, height: 0 }
        );
    }

    #[test]
    fn test_missing_video_is_unreadable() {
        if !ffmpeg_cmdline_utils::ffmpeg_and_ffprobe_are_callable() {
            return;
        }
        let err = VideoFile::new("/nonexistent/video.mp4").sample(10).unwrap_err();
        assert!(matches!(err, Error::SourceUnreadable { .. }), "{err:?}");
    }
}
