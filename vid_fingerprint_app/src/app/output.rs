use std::{fmt, path::PathBuf};

use fingerprint_store::{SimilarMatch, StoreStats, UNKNOWN_PLATFORM};
use itertools::Itertools;
use serde::Serialize;
use vid_fingerprint_lib::{
    similarity_from_distance, Fingerprint, SampleStats, TextFormat, FINGERPRINT_BITS,
};

fn percent_of_bits(bits: u32) -> f64 {
    f64::from(bits) / FINGERPRINT_BITS as f64 * 100.0
}

/// The fingerprint of one video, as printed by `extract`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedFingerprint {
    pub src_path: PathBuf,
    pub format: TextFormat,
    pub fingerprint: String,
    pub frame_count: usize,
    pub resolution: (u32, u32),
    pub bits_set: u32,
}

impl ExtractedFingerprint {
    pub fn new(src_path: PathBuf, format: TextFormat, fp: &Fingerprint, stats: SampleStats) -> Self {
        Self {
            src_path,
            format,
            fingerprint: format.encode(fp),
            frame_count: stats.frame_count,
            resolution: stats.resolution,
            bits_set: fp.count_ones(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtractReport {
    pub fingerprints: Vec<ExtractedFingerprint>,
}

// A single fingerprint is printed alone. Several are each followed by their path.
impl fmt::Display for ExtractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fingerprints.as_slice() {
            [single] => write!(f, "{}", single.fingerprint),
            many => {
                let lines = many
                    .iter()
                    .map(|e| format!("{}  {}", e.fingerprint, e.src_path.display()))
                    .join("\n");
                write!(f, "{lines}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompareReport {
    pub distance: u32,
    pub similarity: f64,
    pub threshold: u32,
    pub is_match: bool,
}

impl CompareReport {
    pub fn new(a: &Fingerprint, b: &Fingerprint, threshold: u32) -> Self {
        let distance = a.hamming_distance(b);
        Self {
            distance,
            similarity: similarity_from_distance(distance),
            threshold,
            is_match: a.is_match(b, threshold),
        }
    }
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Hamming distance: {} / {FINGERPRINT_BITS} bits ({:.1}%)",
            self.distance,
            percent_of_bits(self.distance)
        )?;
        writeln!(f, "Similarity: {:.1}%", self.similarity)?;
        writeln!(
            f,
            "Threshold: {} bits ({:.1}%)",
            self.threshold,
            percent_of_bits(self.threshold)
        )?;
        write!(f, "Match: {}", if self.is_match { "yes" } else { "no" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PutReport {
    pub id: u64,
    pub fingerprint: Fingerprint,
}

impl fmt::Display for PutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryReport {
    pub matches: Vec<SimilarMatch>,
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .matches
            .iter()
            .map(|m| {
                let fields = &m.record.fields;
                format!(
                    "{}\t{}\t{:.1}%\t{}\t{}\t{}",
                    m.record.id,
                    m.distance,
                    m.similarity,
                    fields.platform.as_deref().unwrap_or(UNKNOWN_PLATFORM),
                    fields.video_id.as_deref().unwrap_or("-"),
                    m.record.fingerprint,
                )
            })
            .join("\n");
        write!(f, "{lines}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatsReport(pub StoreStats);

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.0;
        write!(f, "Records: {}", stats.total)?;
        for (platform, count) in &stats.by_platform {
            write!(f, "\n  {platform}: {count}")?;
        }
        if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
            write!(f, "\nOldest: {}\nNewest: {}", oldest.to_rfc3339(), newest.to_rfc3339())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub id: u64,
    pub deleted: bool,
}

impl fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deleted {
            write!(f, "Deleted record {}", self.id)
        } else {
            write!(f, "No record with id {}", self.id)
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn extracted(path: &str, fp: &Fingerprint) -> ExtractedFingerprint {
        let stats = SampleStats {
            frame_count: 60,
            resolution: (320, 240),
        };
        ExtractedFingerprint::new(path.into(), TextFormat::Hex, fp, stats)
    }

    #[test]
    fn test_extract_text() {
        let zero = Fingerprint::default();
        let ones = Fingerprint::full_fingerprint();

        let single = ExtractReport {
            fingerprints: vec![extracted("a.mp4", &zero)],
        };
        assert_eq!(single.to_string(), "0".repeat(64));

        let several = ExtractReport {
            fingerprints: vec![extracted("a.mp4", &zero), extracted("b.mp4", &ones)],
        };
        assert_eq!(
            several.to_string(),
            format!("{}  a.mp4\n{}  b.mp4", "0".repeat(64), "f".repeat(64))
        );
    }

    #[test]
    fn test_extract_json() {
        let report = ExtractReport {
            fingerprints: vec![extracted("a.mp4", &Fingerprint::full_fingerprint())],
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value[0]["src_path"], json!("a.mp4"));
        assert_eq!(value[0]["fingerprint"], json!("f".repeat(64)));
        assert_eq!(value[0]["frame_count"], json!(60));
        assert_eq!(value[0]["bits_set"], json!(256));
    }

    #[test]
    fn test_compare_text() {
        let a = Fingerprint::default();
        let b = Fingerprint::from_words([0, 0, 0, 0xFFF]);

        let report = CompareReport::new(&a, &b, 30);
        assert_eq!(report.distance, 12);
        assert!(report.is_match);
        assert_eq!(
            report.to_string(),
            "Hamming distance: 12 / 256 bits (4.7%)\n\
             Similarity: 95.3%\n\
             Threshold: 30 bits (11.7%)\n\
             Match: yes"
        );

        let report = CompareReport::new(&a, &b, 11);
        assert!(!report.is_match);
        assert!(report.to_string().ends_with("Match: no"));
    }

    #[test]
    fn test_stats_text() {
        let stats = StoreStats {
            total: 3,
            by_platform: BTreeMap::from([("unknown".to_string(), 1), ("youtube".to_string(), 2)]),
            oldest: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
            newest: Some(Utc.with_ymd_and_hms(2024, 7, 9, 8, 30, 0).unwrap()),
        };

        assert_eq!(
            StatsReport(stats).to_string(),
            "Records: 3\n  unknown: 1\n  youtube: 2\n\
             Oldest: 2021-01-01T00:00:00+00:00\n\
             Newest: 2024-07-09T08:30:00+00:00"
        );

        assert_eq!(StatsReport(StoreStats::default()).to_string(), "Records: 0");
    }

    #[test]
    fn test_delete_text() {
        assert_eq!(DeleteReport { id: 4, deleted: true }.to_string(), "Deleted record 4");
        assert_eq!(DeleteReport { id: 4, deleted: false }.to_string(), "No record with id 4");
    }
}
