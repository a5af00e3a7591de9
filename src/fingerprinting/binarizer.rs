use crate::{
    definitions::{CUE_LEN, FEATURE_LEN},
    Error, Fingerprint,
};

/// Thresholds a feature vector into fingerprint bits.
///
/// Feature `i` becomes bit `i`. A bit is set when its feature is strictly greater than the
/// median of the cue segment the feature belongs to, so every cue family contributes
/// bits regardless of the scale of its values. A segment whose values are all equal yields
/// only zero bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binarizer {
    segment_len: usize,
}

impl Default for Binarizer {
    fn default() -> Self {
        Self {
            segment_len: CUE_LEN,
        }
    }
}

impl Binarizer {
    /// # Errors
    /// [`Error::DimensionMismatch`] unless `features` has exactly one value per fingerprint bit.
    pub fn binarize(&self, features: &[f64]) -> Result<Fingerprint, Error> {
        if features.len() != FEATURE_LEN {
            return Err(Error::DimensionMismatch {
                expected: FEATURE_LEN,
                actual: features.len(),
            });
        }

        let bits = features.chunks(self.segment_len).flat_map(|segment| {
            let threshold = median(segment);
            segment.iter().map(move |v| *v > threshold)
        });

        Fingerprint::from_bools(bits)
    }
}

/// Median under the IEEE total order. For an even number of values this is the mean of the two
/// middle values.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
