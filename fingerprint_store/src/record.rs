use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vid_fingerprint_lib::{Fingerprint, LAYOUT_VERSION};

use crate::errors::{StoreError, StoreResult};

/// Free-form key/value metadata attached to a record.
pub type Metadata = serde_json::Map<String, Value>;

/// The optional, mergeable fields of a record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordFields {
    pub video_id: Option<String>,
    pub platform: Option<String>,
    pub upload_date: Option<NaiveDate>,
    pub source_path: Option<PathBuf>,
    pub frame_count: Option<u32>,
    pub metadata: Option<Metadata>,
}

impl RecordFields {
    //each field is overwritten only when the incoming value is present.
    pub(crate) fn merge_from(&mut self, incoming: RecordFields) {
        fn merge<T>(current: &mut Option<T>, incoming: Option<T>) {
            if incoming.is_some() {
                *current = incoming;
            }
        }

        merge(&mut self.video_id, incoming.video_id);
        merge(&mut self.platform, incoming.platform);
        merge(&mut self.upload_date, incoming.upload_date);
        merge(&mut self.source_path, incoming.source_path);
        merge(&mut self.frame_count, incoming.frame_count);
        merge(&mut self.metadata, incoming.metadata);
    }
}

/// A fingerprint and its fields, ready to be put into a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub fingerprint: Fingerprint,
    pub layout_version: u32,
    pub fields: RecordFields,
}

impl NewRecord {
    /// A record with no optional fields, tagged with the current layout version.
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            layout_version: LAYOUT_VERSION,
            fields: RecordFields::default(),
        }
    }

    #[must_use]
    pub fn with_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.fields.video_id = Some(video_id.into());
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.fields.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn with_upload_date(mut self, upload_date: NaiveDate) -> Self {
        self.fields.upload_date = Some(upload_date);
        self
    }

    #[must_use]
    pub fn with_source_path(mut self, source_path: impl AsRef<Path>) -> Self {
        self.fields.source_path = Some(source_path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_frame_count(mut self, frame_count: u32) -> Self {
        self.fields.frame_count = Some(frame_count);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.fields.metadata = Some(metadata);
        self
    }

    /// # Errors
    /// [`StoreError::InvalidMetadata`] unless `json` is a JSON object.
    pub fn with_metadata_json(self, json: &str) -> StoreResult<Self> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(metadata)) => Ok(self.with_metadata(metadata)),
            Ok(other) => Err(StoreError::InvalidMetadata(format!(
                "expected a JSON object, got {other}"
            ))),
            Err(e) => Err(StoreError::InvalidMetadata(e.to_string())),
        }
    }

    #[must_use]
    pub fn with_layout_version(mut self, layout_version: u32) -> Self {
        self.layout_version = layout_version;
        self
    }
}

/// A record held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub id: u64,
    pub fingerprint: Fingerprint,
    pub layout_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: RecordFields,
}
