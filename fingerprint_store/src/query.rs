use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vid_fingerprint_lib::similarity_from_distance;

use crate::record::FingerprintRecord;

/// Platform bucket for records stored without a platform.
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// A record found by [`crate::FingerprintStore::query_similar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMatch {
    pub record: FingerprintRecord,
    pub distance: u32,
    pub similarity: f64,
}

impl SimilarMatch {
    pub(crate) fn new(record: FingerprintRecord, distance: u32) -> Self {
        Self {
            record,
            distance,
            similarity: similarity_from_distance(distance),
        }
    }
}

/// Aggregate statistics of a store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    /// Record count per platform. Records without a platform are counted under
    /// [`UNKNOWN_PLATFORM`].
    pub by_platform: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl StoreStats {
    pub(crate) fn from_records<'a>(records: impl Iterator<Item = &'a FingerprintRecord>) -> Self {
        let mut ret = Self::default();

        for record in records {
            ret.total += 1;

            let platform = record.fields.platform.as_deref().unwrap_or(UNKNOWN_PLATFORM);
            *ret.by_platform.entry(platform.to_string()).or_default() += 1;

            ret.oldest = Some(ret.oldest.map_or(record.created_at, |t| t.min(record.created_at)));
            ret.newest = Some(ret.newest.map_or(record.created_at, |t| t.max(record.created_at)));
        }

        ret
    }
}
