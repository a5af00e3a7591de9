#![allow(clippy::let_and_return)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]

mod canonical_frame;
mod frame_error;
pub mod resize_rgb;
pub mod video_frames_rgb;

pub use canonical_frame::{luma_bt601, CanonicalFrame};
pub use frame_error::FrameError;
pub use resize_rgb::resize_img_rgb;
pub use video_frames_rgb::FrameSeqRgb;
