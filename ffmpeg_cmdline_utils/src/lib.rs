#![allow(clippy::let_and_return)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]

//! Rust wrapper around the `ffmpeg` and `ffprobe` command line tools.
//!
//! Frames are decoded by an `ffmpeg` child process which writes raw `rgb24`
//! pixels to a pipe, so no ffmpeg libraries are linked into the calling program.
//! `ffmpeg` and `ffprobe` must be available on the `PATH`.
//!
//! ```rust,no_run
//! use ffmpeg_cmdline_utils::FfmpegFrameReaderBuilder;
//!
//! let (frames, info) = FfmpegFrameReaderBuilder::new("video.mp4")
//!     .evenly_spaced()
//!     .num_frames(60)
//!     .spawn_rgb()
//!     .unwrap();
//!
//! println!("{:?}", info.duration());
//! let frames = frames.collect::<Vec<_>>();
//! ```

mod ffmpeg_error_kind;
mod ffmpeg_ops;
mod ffmpeg_stats;

pub use ffmpeg_error_kind::FfmpegError;
pub use ffmpeg_ops::{
    ffmpeg_and_ffprobe_are_callable, FfmpegFrameIter, FfmpegFrameReaderBuilder, FrameSpacing,
};
pub use ffmpeg_stats::{VideoInfo, VideoInfoError};
