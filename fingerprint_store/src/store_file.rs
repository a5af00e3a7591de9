use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use vid_fingerprint_lib::{encode_binary, encode_hex, Fingerprint, TextFormat};

use crate::{
    errors::{StoreError, StoreResult},
    record::{FingerprintRecord, Metadata, RecordFields},
};

pub(crate) const STORE_FORMAT_VERSION: u32 = 1;

// The on-disk format of a store.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoreFile {
    format_version: u32,
    next_id: u64,
    rows: Vec<StoredRow>,
}

// bincode is not self-describing, so metadata is kept as a JSON string.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    id: u64,
    fingerprint_bits: String,
    fingerprint_hex: String,
    layout_version: u32,
    video_id: Option<String>,
    platform: Option<String>,
    upload_date: Option<NaiveDate>,
    source_path: Option<PathBuf>,
    frame_count: Option<u32>,
    metadata_json: Option<String>,
    created_at: DateTime<Utc>,
}

/// Records indexed by id and by fingerprint.
#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub next_id: u64,
    pub records: BTreeMap<u64, FingerprintRecord>,
    pub by_fingerprint: HashMap<Fingerprint, u64>,
}

impl Tables {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }
}

impl StoreFile {
    pub fn from_tables(tables: &Tables) -> Self {
        let rows = tables
            .records
            .values()
            .map(|record| StoredRow {
                id: record.id,
                fingerprint_bits: encode_binary(&record.fingerprint),
                fingerprint_hex: encode_hex(&record.fingerprint),
                layout_version: record.layout_version,
                video_id: record.fields.video_id.clone(),
                platform: record.fields.platform.clone(),
                upload_date: record.fields.upload_date,
                source_path: record.fields.source_path.clone(),
                frame_count: record.fields.frame_count,
                metadata_json: record
                    .fields
                    .metadata
                    .as_ref()
                    .map(|m| serde_json::Value::Object(m.clone()).to_string()),
                created_at: record.created_at,
            })
            .collect();

        Self {
            format_version: STORE_FORMAT_VERSION,
            next_id: tables.next_id,
            rows,
        }
    }

    /// Rebuild the tables, checking every row.
    pub fn into_tables(self, path: &Path) -> StoreResult<Tables> {
        let corrupt = |reason: String| StoreError::Corrupt {
            reason,
            path: path.to_path_buf(),
        };

        if self.format_version != STORE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }

        let mut tables = Tables::new();
        tables.next_id = self.next_id.max(1);

        for row in self.rows {
            let from_bits = TextFormat::Binary
                .decode(&row.fingerprint_bits)
                .map_err(|e| corrupt(format!("record {}: {e}", row.id)))?;
            let from_hex = TextFormat::Hex
                .decode(&row.fingerprint_hex)
                .map_err(|e| corrupt(format!("record {}: {e}", row.id)))?;
            if from_bits != from_hex {
                return Err(corrupt(format!(
                    "record {}: binary and hex fingerprints disagree",
                    row.id
                )));
            }

            let metadata = row
                .metadata_json
                .map(|json| match serde_json::from_str(&json) {
                    Ok(serde_json::Value::Object(map)) => Ok::<Metadata, StoreError>(map),
                    _ => Err(corrupt(format!("record {}: unreadable metadata", row.id))),
                })
                .transpose()?;

            if tables.records.contains_key(&row.id) {
                return Err(corrupt(format!("duplicate record id {}", row.id)));
            }
            if tables.by_fingerprint.insert(from_bits, row.id).is_some() {
                return Err(corrupt(format!("duplicate fingerprint {from_bits}")));
            }

            tables.next_id = tables.next_id.max(row.id + 1);
            tables.records.insert(
                row.id,
                FingerprintRecord {
                    id: row.id,
                    fingerprint: from_bits,
                    layout_version: row.layout_version,
                    created_at: row.created_at,
                    fields: RecordFields {
                        video_id: row.video_id,
                        platform: row.platform,
                        upload_date: row.upload_date,
                        source_path: row.source_path,
                        frame_count: row.frame_count,
                        metadata,
                    },
                },
            );
        }

        Ok(tables)
    }

    #[cfg(test)]
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (&mut String, &mut String)> {
        self.rows
            .iter_mut()
            .map(|row| (&mut row.fingerprint_bits, &mut row.fingerprint_hex))
    }

    #[cfg(test)]
    pub fn duplicate_first_row(&mut self) {
        if let Some(first) = self.rows.first() {
            let copy = StoredRow {
                id: first.id + 100,
                fingerprint_bits: first.fingerprint_bits.clone(),
                fingerprint_hex: first.fingerprint_hex.clone(),
                layout_version: first.layout_version,
                video_id: None,
                platform: None,
                upload_date: None,
                source_path: None,
                frame_count: None,
                metadata_json: None,
                created_at: first.created_at,
            };
            self.rows.push(copy);
        }
    }
}
