use image::{Rgb, RgbImage};
use itertools::Itertools;
use rand::prelude::*;
use vid_fingerprint_lib::*;

const EDGE: std::ops::Range<usize> = 0..64;
const SALIENCY: std::ops::Range<usize> = 128..192;
const COLOUR: std::ops::Range<usize> = 192..256;

//a short "video" of a black/white vertical split.
fn split_video(num_frames: usize) -> Vec<RgbImage> {
    let frame = RgbImage::from_fn(64, 64, |x, _y| {
        if x < 32 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    vec![frame; num_frames]
}

fn noise_video(rng: &mut StdRng, num_frames: usize) -> Vec<RgbImage> {
    (0..num_frames)
        .map(|_| RgbImage::from_fn(64, 64, |_x, _y| Rgb(rng.gen())))
        .collect()
}

//pseudo-random but reproducible without an rng, so the pixels are fixed forever.
fn hashed_video(num_frames: u32) -> Vec<RgbImage> {
    (0..num_frames)
        .map(|f| {
            RgbImage::from_fn(64, 64, |x, y| {
                let h = x.wrapping_mul(0x9E37_79B9)
                    ^ y.wrapping_mul(0x85EB_CA6B)
                    ^ f.wrapping_mul(0xC2B2_AE35);
                let h = h.rotate_left(13).wrapping_mul(0x27D4_EB2D);
                Rgb([(h >> 24) as u8, (h >> 16) as u8, (h >> 8) as u8])
            })
        })
        .collect()
}

fn set_bits(fp: &Fingerprint, range: std::ops::Range<usize>) -> Vec<usize> {
    range
        .clone()
        .filter(|i| fp.bit(*i) == Some(true))
        .map(|i| i - range.start)
        .collect()
}

#[test]
fn test_fingerprint_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(10);
    let video = noise_video(&mut rng, 20);

    let builder = FingerprintBuilder::default();
    let first = builder.fingerprint_frames(video.clone()).unwrap();
    for _i in 0..3 {
        assert_eq!(builder.fingerprint_frames(video.clone()).unwrap(), first);
    }
}

#[test]
fn test_pipeline_is_extractor_then_binarizer() {
    let mut rng = StdRng::seed_from_u64(11);
    let video = noise_video(&mut rng, 6);

    let frames = FrameSeqRgb::from_images(video.clone()).unwrap();
    let features = FeatureExtractor::default().extract(&frames).unwrap();
    assert_eq!(features.len(), FEATURE_LEN);
    let expected = Binarizer::default().binarize(&features).unwrap();

    let actual = FingerprintBuilder::default().fingerprint_frames(video).unwrap();
    assert_eq!(actual, expected);
}

// Pins the bit layout of version 1: which bits light up for a picture whose only feature is
// a vertical black/white boundary down the middle.
#[test]
fn test_layout_version_1_split_frame() {
    assert_eq!(LAYOUT_VERSION, 1);

    let fp = FingerprintBuilder::default()
        .fingerprint_frames(split_video(5))
        .unwrap();

    let boundary_columns = |bits: &[usize]| bits.iter().all(|cell| [3, 4].contains(&(cell % 8)));

    //edges: only grid cells touching the boundary.
    let edge_bits = set_bits(&fp, EDGE);
    assert!(boundary_columns(&edge_bits), "{edge_bits:?}");
    assert!(edge_bits.len() >= 8, "{edge_bits:?}");

    //saliency: the Laplacian responds on both sides of the boundary in every row.
    let saliency_bits = set_bits(&fp, SALIENCY);
    let expected = (0..8).flat_map(|row| [row * 8 + 3, row * 8 + 4]).collect_vec();
    assert_eq!(saliency_bits, expected);

    //colour: the first and last bin of each of the R, G, B and luma histograms.
    let colour_bits = set_bits(&fp, COLOUR);
    assert_eq!(colour_bits, vec![0, 15, 16, 31, 32, 47, 48, 63]);
}

// Any change to the canonical size, the Canny or Gabor parameters, the grid, the histogram
// bins or the median rule changes these.
#[test]
fn test_layout_version_1_golden_hashes() {
    assert_eq!(LAYOUT_VERSION, 1);
    let builder = FingerprintBuilder::default();

    let split = builder.fingerprint_frames(split_video(3)).unwrap();
    assert_eq!(
        encode_hex(&split),
        "1818181818181818ff00000ffff000ff18181818181818188001800180018001"
    );

    let hashed = builder.fingerprint_frames(hashed_video(3)).unwrap();
    assert_eq!(
        encode_hex(&hashed),
        "2336864502bb9ffc00000000ffffffff7078d45e363371d830b413c8d5d70ff0"
    );
}

#[test]
fn test_flat_video_colour_bits() {
    let video = vec![RgbImage::from_pixel(64, 64, Rgb([255, 0, 40])); 3];
    let fp = FingerprintBuilder::default().fingerprint_frames(video).unwrap();

    assert!(set_bits(&fp, EDGE).is_empty());
    assert!(set_bits(&fp, SALIENCY).is_empty());
    // r=255 -> bin 15, g=0 -> bin 0, b=40 -> bin 2, luma=81 -> bin 5
    assert_eq!(set_bits(&fp, COLOUR), vec![15, 16, 34, 53]);
}

#[test]
fn test_frame_order_does_not_matter() {
    //features are averaged, and with two frames the sum is exact in either order.
    let mut rng = StdRng::seed_from_u64(12);
    let video = noise_video(&mut rng, 2);
    let reversed = video.iter().rev().cloned().collect_vec();

    let builder = FingerprintBuilder::default();
    assert_eq!(
        builder.fingerprint_frames(video).unwrap(),
        builder.fingerprint_frames(reversed).unwrap()
    );
}

#[test]
fn test_unrelated_videos_are_far_apart() {
    let mut rng = StdRng::seed_from_u64(13);
    let builder = FingerprintBuilder::default();

    let fingerprints = (0..4)
        .map(|_| builder.fingerprint_frames(noise_video(&mut rng, 3)).unwrap())
        .chain([builder.fingerprint_frames(split_video(3)).unwrap()])
        .collect_vec();

    for (a, b) in fingerprints.iter().tuple_combinations() {
        assert!(!a.is_match(b, DEFAULT_MATCH_THRESHOLD), "{a} ~ {b}");
    }
}

#[test]
fn test_degenerate_frame_aborts_with_index() {
    let mut video = split_video(4);
    video[2] = RgbImage::new(32, 0);

    assert_eq!(
        FingerprintBuilder::default().fingerprint_frames(video),
        Err(Error::DegenerateFrame { index: 2, width: 32, height: 0 })
    );
}

#[test]
fn test_resolution_change_is_fingerprinted() {
    let mut video = split_video(4);
    video[2] = RgbImage::from_fn(128, 96, |x, _y| {
        if x < 64 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });

    let frames = FrameSeqRgb::from_images(video.clone()).unwrap();
    assert_eq!(frames.resolution(), (64, 64));

    //a frame already at the canonical size is used as-is, so resizing the odd frame up front
    //must not change the result.
    let mut presized = video.clone();
    presized[2] = CanonicalFrame::from_rgb(&video[2], std::num::NonZeroU32::new(64).unwrap())
        .rgb()
        .clone();

    let builder = FingerprintBuilder::default();
    assert_eq!(
        builder.fingerprint_frames(video).unwrap(),
        builder.fingerprint_frames(presized).unwrap()
    );
}

#[test]
fn test_text_forms_agree() {
    let fp = FingerprintBuilder::default()
        .fingerprint_frames(split_video(2))
        .unwrap();

    let hex = encode_hex(&fp);
    let binary = encode_binary(&fp);
    let decimal = encode_decimal(&fp);

    assert_eq!(hex, fp.to_string());
    assert_eq!(decode(&hex), Ok(fp));
    assert_eq!(decode(&hex.to_uppercase()), Ok(fp));
    assert_eq!(decode(&binary), Ok(fp));
    assert_eq!(decode_decimal(&decimal), Ok(fp));
    assert_eq!(hex.parse::<Fingerprint>(), Ok(fp));

    assert!(matches!(decode(&binary[..255]), Err(Error::InvalidFormat(_))));
    assert!(matches!(decode(&format!("{hex}0")), Err(Error::InvalidFormat(_))));
    assert!(matches!(decode(&hex.replacen(&hex[..1], "z", 1)), Err(Error::InvalidFormat(_))));
}
