use std::{fmt::Debug, path::PathBuf};

use thiserror::Error;
use vid_fingerprint_lib::ErrorCategory;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Error accessing store file {path}: {src}")]
    StoreFileIo { src: std::io::Error, path: PathBuf },

    #[error("Failed to serialize fingerprints to store file {path}: {src}")]
    Serialization { src: String, path: PathBuf },

    /// The file could not be decoded, or its contents are inconsistent.
    #[error("Store file {path} is corrupt: {reason}")]
    Corrupt { reason: String, path: PathBuf },

    /// Metadata supplied by the caller could not be stored.
    #[error("Invalid record metadata: {0}")]
    InvalidMetadata(String),

    /// The fingerprint is already stored, but was computed with another layout version.
    #[error("Record {id} has layout version {stored}, cannot merge a fingerprint with layout version {incoming}")]
    LayoutVersionConflict { id: u64, stored: u32, incoming: u32 },
}

impl StoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::InvalidMetadata(_) | StoreError::LayoutVersionConflict { .. } => {
                ErrorCategory::Input
            }
            _ => ErrorCategory::Storage,
        }
    }
}
