use imageproc::stats::histogram;
use vid_fingerprint_common::CanonicalFrame;

use super::{Cue, CueKind, FeatureVector};
use crate::definitions::HISTOGRAM_BINS;

/// Coarse normalised histograms of the red, green, blue and luma channels, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColourCue;

impl ColourCue {
    fn coarse_bins(channel: &[u32; 256], num_pixels: f64) -> impl Iterator<Item = f64> + '_ {
        let bin_width = 256 / HISTOGRAM_BINS;
        channel
            .chunks(bin_width)
            .map(move |bin| f64::from(bin.iter().sum::<u32>()) / num_pixels)
    }
}

impl Cue for ColourCue {
    fn kind(&self) -> CueKind {
        CueKind::Colour
    }

    fn len(&self) -> usize {
        HISTOGRAM_BINS * 4
    }

    fn compute(&self, frame: &CanonicalFrame) -> FeatureVector {
        let num_pixels = f64::from(frame.rgb().width() * frame.rgb().height()).max(1.0);

        let rgb_hist = histogram(frame.rgb());
        let luma_hist = histogram(frame.luma());

        rgb_hist
            .channels
            .iter()
            .chain(luma_hist.channels.iter())
            .flat_map(|channel| Self::coarse_bins(channel, num_pixels))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fingerprinting::cues::test_frames;

    #[test]
    fn test_flat_frame_fills_one_bin_per_channel() {
        let values = ColourCue.compute(&test_frames::flat([255, 0, 40]));
        assert_eq!(values.len(), 64);

        // r=255 -> bin 15, g=0 -> bin 0, b=40 -> bin 2
        assert_eq!(values[15], 1.0);
        assert_eq!(values[16], 1.0);
        assert_eq!(values[32 + 2], 1.0);
        assert_eq!(values.iter().sum::<f64>(), 4.0);
    }

    #[test]
    fn test_each_histogram_sums_to_one() {
        let values = ColourCue.compute(&test_frames::vertical_split());
        for channel in values.chunks(16) {
            assert!((channel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }
}
