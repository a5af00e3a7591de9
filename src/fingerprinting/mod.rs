pub mod binarizer;
pub mod cues;
pub mod extractor;
pub mod fingerprint;
pub mod fingerprint_builder;
pub mod frame_source;
pub mod text_codec;

use std::{path::PathBuf, time::Duration};

use ffmpeg_cmdline_utils::FfmpegError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vid_fingerprint_common::FrameError;

/// Broad classification of an [`Error`], used to decide how it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The caller supplied something unusable: a missing or undecodable video, malformed
    /// fingerprint text, or bit sequences of the wrong length.
    Input,
    /// A frame could not be turned into features. The whole fingerprint is abandoned.
    Computation,
    /// A fingerprint store could not be read or written.
    Storage,
}

/// An error that prevented a fingerprint from being created, compared or decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// The video could not be opened or decoded.
    #[error("Could not read video {src_path}: {reason}")]
    SourceUnreadable { src_path: PathBuf, reason: String },

    /// The video was opened, but not a single frame could be decoded from it.
    #[error("No frames could be decoded from {0}")]
    EmptySource(PathBuf),

    /// Decoding did not finish before the deadline. Fingerprints are never built from the
    /// frames that happened to arrive in time.
    #[error("Decoding {src_path} did not finish within {}s", .timeout.as_secs())]
    DecodeTimeout { src_path: PathBuf, timeout: Duration },

    #[error("The maximum number of frames must be at least 1")]
    InvalidFrameCount,

    #[error("Frame {index} cannot be canonicalized ({width}x{height})")]
    DegenerateFrame { index: usize, width: u32, height: u32 },

    #[error("Expected a feature vector of length {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Expected {expected} bits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid fingerprint text: {0}")]
    InvalidFormat(String),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::SourceUnreadable { .. }
            | Error::EmptySource(_)
            | Error::DecodeTimeout { .. }
            | Error::InvalidFrameCount
            | Error::LengthMismatch { .. }
            | Error::InvalidFormat(_) => ErrorCategory::Input,
            Error::DegenerateFrame { .. } | Error::DimensionMismatch { .. } => {
                ErrorCategory::Computation
            }
        }
    }

    pub(crate) fn from_ffmpeg(src_path: impl Into<PathBuf>, error: &FfmpegError) -> Self {
        Error::SourceUnreadable {
            src_path: src_path.into(),
            reason: error.to_string(),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        match e {
            //an empty sequence is caught earlier with the source path attached, so this only
            //happens for in-memory sources.
            FrameError::Empty => Error::EmptySource(PathBuf::new()),
            FrameError::Degenerate { index, width, height } => {
                Error::DegenerateFrame { index, width, height }
            }
        }
    }
}
