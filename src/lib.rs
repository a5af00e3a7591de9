#![allow(clippy::let_and_return)]
#![allow(clippy::len_without_is_empty)]
#![warn(clippy::cast_lossless)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::todo)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]
#![allow(clippy::doc_markdown)]

//! # Overview
//! `vid_fingerprint_lib` computes compact perceptual fingerprints of video files.
//! Re-encoded, re-compressed or lightly edited copies of a video produce fingerprints that
//! differ from the original in only a few bits, while unrelated videos differ in roughly half
//! of their bits.
//!
//! # High Level API
//! ```rust,no_run
//! use vid_fingerprint_lib::{fingerprint, Fingerprint, DEFAULT_MATCH_THRESHOLD};
//!
//! let original = fingerprint("cat.mp4", 60).unwrap();
//! let reupload = fingerprint("cat_reencoded.webm", 60).unwrap();
//!
//! // Fingerprints are usually exchanged as 64 hex digits.
//! let hex = vid_fingerprint_lib::encode_hex(&original);
//! assert_eq!(vid_fingerprint_lib::decode(&hex).unwrap(), original);
//!
//! println!("distance: {}", original.hamming_distance(&reupload));
//! println!("similarity: {:.1}%", original.similarity(&reupload));
//! assert!(original.is_match(&reupload, DEFAULT_MATCH_THRESHOLD));
//! ```
//!
//! Frames that were decoded by other means can be fingerprinted with
//! [`FingerprintBuilder::fingerprint_frames`].
//!
//! # How it works
//! Up to N frames (60 by default) are sampled evenly across the whole video. Each frame is
//! resized to 64x64 pixels, and four families of visual cues are computed from it:
//! * edge structure: the density of Canny edges in each cell of an 8x8 grid;
//! * texture: the mean response of 16 Gabor filters (8 orientations, 2 wavelengths) in each
//!   quadrant of the frame;
//! * saliency: the mean Laplacian magnitude in each cell of an 8x8 grid;
//! * colour: 16-bin histograms of the red, green, blue and luma channels.
//!
//! Each family contributes 64 values. The values are averaged over all sampled frames, and each
//! is compared against the median of its family to give one bit. The mapping from features to
//! bits is identified by [`LAYOUT_VERSION`]; fingerprints of different layout versions must not
//! be compared.
//!
//! # Prerequisites
//! This crate calls Ffmpeg from the command line. You must make Ffmpeg and Ffprobe available
//! on the command line, for example:
//!
//! * Debian-based systems: ```# apt-get install ffmpeg```
//! * Yum-based systems: ```# yum install ffmpeg```
//! * Windows:
//!     1) Download the correct installer from <https://ffmpeg.org/download.html>
//!     2) Run the installer and install ffmpeg to any directory
//!     3) Add the directory into the PATH environment variable
//!
//! # Limitations
//! Fingerprints are not cryptographic. It is easy to construct a different video with the same
//! fingerprint. Mirroring, rotation, heavy cropping and picture-in-picture edits will defeat
//! matching.

mod definitions;
mod fingerprinting;

pub use definitions::{
    CUE_LEN, DEFAULT_DECODE_TIMEOUT_SECS, DEFAULT_MATCH_THRESHOLD, DEFAULT_MAX_FRAMES,
    FEATURE_LEN, FINGERPRINT_BITS, LAYOUT_VERSION,
};

pub use fingerprinting::{
    binarizer::{median, Binarizer},
    cues::{
        default_cues, ColourCue, Cue, CueKind, EdgeCue, FeatureVector, SaliencyCue, TextureCue,
    },
    extractor::FeatureExtractor,
    fingerprint::{
        hamming_distance, hamming_distance_bits, is_match, similarity, similarity_from_distance,
        Fingerprint,
    },
    fingerprint_builder::{fingerprint, CreationOptions, FingerprintBuilder, SampleStats},
    frame_source::{FrameSource, InMemoryFrames, VideoFile},
    text_codec::{decode, decode_decimal, encode_binary, encode_decimal, encode_hex, TextFormat},
    Error, ErrorCategory,
};

pub use vid_fingerprint_common::{CanonicalFrame, FrameSeqRgb};
