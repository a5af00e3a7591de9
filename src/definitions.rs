/// Identifier of the feature-to-bit mapping. Fingerprints produced under different layout
/// versions are not comparable, and stores keep this value beside every fingerprint.
pub const LAYOUT_VERSION: u32 = 1;

/// Number of bits in a fingerprint.
pub const FINGERPRINT_BITS: usize = 256;
pub const FINGERPRINT_WORDS: usize = FINGERPRINT_BITS / 64;

/// Length of a fingerprint written as hexadecimal digits.
pub const HEX_LEN: usize = FINGERPRINT_BITS / 4;

/// The default maximum number of frames sampled from each video.
pub const DEFAULT_MAX_FRAMES: u32 = 60;

/// The default time allowed for decoding the frames of one video, in seconds.
pub const DEFAULT_DECODE_TIMEOUT_SECS: u64 = 60;

/// Conventional Hamming distance at or below which two fingerprints are considered
/// near-duplicates.
pub const DEFAULT_MATCH_THRESHOLD: u32 = 30;

//Frames are resized to CANONICAL_SIZExCANONICAL_SIZE pixels before any cue is computed.
pub const CANONICAL_SIZE: u32 = 64;

//Each cue family contributes this many values (and therefore bits).
pub const CUE_LEN: usize = 64;
pub const NUM_CUES: usize = 4;
pub const FEATURE_LEN: usize = CUE_LEN * NUM_CUES;

//edge and saliency maps are summarised over a GRID_CELLSxGRID_CELLS grid.
pub const GRID_CELLS: u32 = 8;

pub const CANNY_LOW_THRESHOLD: f32 = 50.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 100.0;

pub const GABOR_ORIENTATIONS: usize = 8;
pub const GABOR_WAVELENGTHS: [f64; 2] = [4.0, 8.0];
pub const GABOR_ASPECT_RATIO: f64 = 0.5;

pub const HISTOGRAM_BINS: usize = 16;

const _: () = assert!(FEATURE_LEN == FINGERPRINT_BITS);
const _: () = assert!((GRID_CELLS * GRID_CELLS) as usize == CUE_LEN);
const _: () = assert!(GABOR_ORIENTATIONS * GABOR_WAVELENGTHS.len() * 4 == CUE_LEN);
const _: () = assert!(HISTOGRAM_BINS * 4 == CUE_LEN);
