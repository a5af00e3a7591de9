use std::path::PathBuf;

use fingerprint_store::StoreError;
use thiserror::Error;
use vid_fingerprint_lib::{Error, ErrorCategory};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Fingerprint creation error: {0}")]
    CreateFingerprintError(#[from] Error),

    #[error(transparent)]
    StoreError(#[from] StoreError),

    #[error("Failed to read fingerprint file {path}: {reason}")]
    HashFileError { reason: String, path: PathBuf },

    #[error("Failed to write {path}: {src}")]
    OutputError { src: std::io::Error, path: PathBuf },

    #[error("{failed} of {total} videos could not be fingerprinted")]
    ExtractFailures { failed: usize, total: usize },
}

impl AppError {
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            AppError::CreateFingerprintError(e) => Some(e.category()),
            AppError::HashFileError { .. } => Some(ErrorCategory::Input),
            AppError::StoreError(e) => Some(e.category()),
            AppError::OutputError { .. } | AppError::ExtractFailures { .. } => None,
        }
    }
}

pub fn print_error_and_quit(e: eyre::Report, exit_code: i32) -> ! {
    #[allow(clippy::print_stderr)]
    let () = eprintln!("{:?}", e);
    std::process::exit(exit_code);
}
