use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a sequence of frames cannot be canonicalized.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameError {
    #[error("No frames were supplied")]
    Empty,

    /// The frame at `index` has no pixels.
    #[error("Frame {index} is degenerate ({width}x{height})")]
    Degenerate { index: usize, width: u32, height: u32 },
}
