use std::{fmt, str::FromStr};

use bitvec::prelude::*;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    definitions::{FINGERPRINT_BITS, FINGERPRINT_WORDS},
    Error,
};

type FingerprintBits = BitArray<[u64; FINGERPRINT_WORDS], Msb0>;

/// A 256-bit perceptual fingerprint of a video.
///
/// Bit 0 is the most significant bit of the first word, so the bit order matches the
/// order of the binary and hexadecimal text forms. Two fingerprints of near-duplicate
/// videos differ in few bits, which is measured with [`Fingerprint::hamming_distance`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fingerprint {
    words: [u64; FINGERPRINT_WORDS],
}

impl Fingerprint {
    pub const fn from_words(words: [u64; FINGERPRINT_WORDS]) -> Self {
        Self { words }
    }

    pub const fn words(&self) -> [u64; FINGERPRINT_WORDS] {
        self.words
    }

    /// Pack a sequence of bools, bit 0 first.
    ///
    /// # Errors
    /// [`Error::LengthMismatch`] unless exactly 256 bits are supplied.
    pub fn from_bools(bits: impl IntoIterator<Item = bool>) -> Result<Self, Error> {
        let mut bitarr: FingerprintBits = BitArray::ZERO;
        let mut len = 0;
        for bit in bits {
            if len < FINGERPRINT_BITS {
                bitarr.set(len, bit);
            }
            len += 1;
        }

        if len != FINGERPRINT_BITS {
            return Err(Error::LengthMismatch {
                expected: FINGERPRINT_BITS,
                actual: len,
            });
        }

        Ok(Self {
            words: bitarr.into_inner(),
        })
    }

    /// Pack a sequence of 0/1 values, bit 0 first.
    ///
    /// # Errors
    /// * [`Error::LengthMismatch`] unless exactly 256 values are supplied.
    /// * [`Error::InvalidFormat`] if any value is neither 0 nor 1.
    pub fn from_bits(bits: &[u8]) -> Result<Self, Error> {
        if bits.len() != FINGERPRINT_BITS {
            return Err(Error::LengthMismatch {
                expected: FINGERPRINT_BITS,
                actual: bits.len(),
            });
        }

        if let Some(pos) = bits.iter().position(|b| *b > 1) {
            return Err(Error::InvalidFormat(format!(
                "bit {pos} has value {}, expected 0 or 1",
                bits[pos]
            )));
        }

        Self::from_bools(bits.iter().map(|b| *b == 1))
    }

    pub fn bit(&self, index: usize) -> Option<bool> {
        self.as_bitslice().get(index).map(|b| *b)
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.as_bitslice().iter().by_vals()
    }

    /// The fingerprint as 256 values of 0 or 1, bit 0 first.
    pub fn to_bits(&self) -> Vec<u8> {
        self.bits().map(u8::from).collect()
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Number of bit positions in which the two fingerprints differ, in `0..=256`.
    pub fn hamming_distance(&self, other: &Fingerprint) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .fold(0, |acc, (x, y)| acc + (x ^ y).count_ones())
    }

    /// `100 * (1 - distance / 256)`. Identical fingerprints have a similarity of 100.
    pub fn similarity(&self, other: &Fingerprint) -> f64 {
        similarity_from_distance(self.hamming_distance(other))
    }

    /// Whether the distance between the fingerprints is at most `threshold`.
    pub fn is_match(&self, other: &Fingerprint, threshold: u32) -> bool {
        self.hamming_distance(other) <= threshold
    }

    fn as_bitslice(&self) -> &BitSlice<u64, Msb0> {
        self.words.view_bits::<Msb0>()
    }
}

pub fn hamming_distance(a: &Fingerprint, b: &Fingerprint) -> u32 {
    a.hamming_distance(b)
}

pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    a.similarity(b)
}

pub fn is_match(a: &Fingerprint, b: &Fingerprint, threshold: u32) -> bool {
    a.is_match(b, threshold)
}

pub fn similarity_from_distance(distance: u32) -> f64 {
    100.0 * (1.0 - f64::from(distance) / FINGERPRINT_BITS as f64)
}

/// Hamming distance between two raw bit sequences (values 0 or 1).
///
/// # Errors
/// [`Error::LengthMismatch`] unless both sequences are 256 long.
pub fn hamming_distance_bits(a: &[u8], b: &[u8]) -> Result<u32, Error> {
    for bits in [a, b] {
        if bits.len() != FINGERPRINT_BITS {
            return Err(Error::LengthMismatch {
                expected: FINGERPRINT_BITS,
                actual: bits.len(),
            });
        }
    }

    Ok(Fingerprint::from_bits(a)?.hamming_distance(&Fingerprint::from_bits(b)?))
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::encode_hex(self))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::decode(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::encode_hex(self))
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::decode(&s).map_err(de::Error::custom)
    }
}

//Utilities for testing
#[doc(hidden)]
pub mod test_util {
    use rand::prelude::*;

    use super::Fingerprint;
    use crate::definitions::FINGERPRINT_BITS;

    #[doc(hidden)]
    impl Fingerprint {
        pub fn random_fingerprint(rng: &mut StdRng) -> Self {
            Self::from_words(rng.gen())
        }

        pub fn full_fingerprint() -> Self {
            Self::from_words([u64::MAX; 4])
        }

        //flip `target_distance` distinct bits, chosen at random.
        pub fn with_distance(&self, target_distance: u32, rng: &mut StdRng) -> Self {
            assert!(target_distance as usize <= FINGERPRINT_BITS);

            let mut positions = (0..FINGERPRINT_BITS).collect::<Vec<_>>();
            positions.shuffle(rng);

            let mut words = self.words();
            for pos in positions.into_iter().take(target_distance as usize) {
                words[pos / 64] ^= 1u64 << (63 - pos % 64);
            }

            let ret = Self::from_words(words);
            assert_eq!(self.hamming_distance(&ret), target_distance);
            ret
        }
    }
}

#[cfg(test)]
mod test {
    use rand::prelude::*;

    use super::*;

    #[test]
    fn test_bit_zero_is_msb_of_first_word() {
        let mut bits = [0u8; FINGERPRINT_BITS];
        bits[0] = 1;
        bits[255] = 1;
        let fp = Fingerprint::from_bits(&bits).unwrap();

        assert_eq!(fp.words(), [1 << 63, 0, 0, 1]);
        assert_eq!(fp.bit(0), Some(true));
        assert_eq!(fp.bit(1), Some(false));
        assert_eq!(fp.bit(256), None);
        assert_eq!(fp.to_bits(), bits.to_vec());
    }

    #[test]
    fn test_from_bits_rejects_wrong_lengths() {
        for len in [0, 255, 257] {
            assert_eq!(
                Fingerprint::from_bits(&vec![0; len]),
                Err(Error::LengthMismatch { expected: 256, actual: len })
            );
        }
        assert!(matches!(
            Fingerprint::from_bits(&[2; 256]),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_distance_bounds_identity_and_symmetry() {
        let mut rng = StdRng::seed_from_u64(1);
        for _i in 0..1_000 {
            let a = Fingerprint::random_fingerprint(&mut rng);
            let b = Fingerprint::random_fingerprint(&mut rng);

            assert_eq!(a.hamming_distance(&a), 0);
            assert_eq!(a.similarity(&a), 100.0);
            assert_eq!(a.hamming_distance(&b), b.hamming_distance(&a));
            assert!(a.hamming_distance(&b) <= 256);
        }

        let empty = Fingerprint::default();
        let full = Fingerprint::full_fingerprint();
        assert_eq!(empty.hamming_distance(&full), 256);
        assert_eq!(empty.similarity(&full), 0.0);
        assert_eq!(full.count_ones(), 256);
    }

    #[test]
    fn test_triangle_inequality() {
        let mut rng = StdRng::seed_from_u64(2);
        for _i in 0..1_000 {
            let a = Fingerprint::random_fingerprint(&mut rng);
            let b = Fingerprint::random_fingerprint(&mut rng);
            let c = Fingerprint::random_fingerprint(&mut rng);

            assert!(a.hamming_distance(&b) <= a.hamming_distance(&c) + c.hamming_distance(&b));
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = Fingerprint::random_fingerprint(&mut rng);
        for distance in [0, 1, 29, 30, 31, 128, 256] {
            let b = a.with_distance(distance, &mut rng);
            assert!(a.is_match(&b, distance));
            assert!(is_match(&a, &b, distance + 1));
            if distance > 0 {
                assert!(!a.is_match(&b, distance - 1));
            }
        }
    }

    #[test]
    fn test_similarity_values() {
        assert_eq!(similarity_from_distance(0), 100.0);
        assert_eq!(similarity_from_distance(64), 75.0);
        assert_eq!(similarity_from_distance(128), 50.0);
        assert_eq!(similarity_from_distance(256), 0.0);
    }

    #[test]
    fn test_raw_bit_distance_requires_256_bits() {
        let a = vec![0u8; 256];
        let mut b = vec![0u8; 256];
        b[10] = 1;
        b[200] = 1;
        assert_eq!(hamming_distance_bits(&a, &b), Ok(2));
        assert_eq!(
            hamming_distance_bits(&a, &b[..255]),
            Err(Error::LengthMismatch { expected: 256, actual: 255 })
        );
        assert_eq!(
            hamming_distance_bits(&[0u8; 300], &b),
            Err(Error::LengthMismatch { expected: 256, actual: 300 })
        );
    }

    #[test]
    fn test_serde_uses_hex() {
        let fp = Fingerprint::from_words([0xdead_beef, 0, u64::MAX, 1]);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(
            json,
            "\"00000000deadbeef0000000000000000ffffffffffffffff0000000000000001\""
        );
        assert_eq!(serde_json::from_str::<Fingerprint>(&json).unwrap(), fp);
    }
}
