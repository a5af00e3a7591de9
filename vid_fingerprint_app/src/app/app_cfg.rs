use std::path::PathBuf;

use chrono::NaiveDate;
use vid_fingerprint_lib::{decode, CreationOptions, Error, Fingerprint, TextFormat};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportVerbosity {
    Quiet,
    Default,
    Verbose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFormat {
    Normal,
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(super) enum TextFormatArg {
    Binary,
    Hex,
    Decimal,
}

impl From<TextFormatArg> for TextFormat {
    fn from(arg: TextFormatArg) -> Self {
        match arg {
            TextFormatArg::Binary => TextFormat::Binary,
            TextFormatArg::Hex => TextFormat::Hex,
            TextFormatArg::Decimal => TextFormat::Decimal,
        }
    }
}

/// Decode fingerprint text in the given form, or detect binary/hex when no form is given.
pub fn decode_as(text: &str, format: Option<TextFormat>) -> Result<Fingerprint, Error> {
    match format {
        Some(format) => format.decode(text),
        None => decode(text),
    }
}

/// Where a fingerprint comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintInput {
    Video(PathBuf),
    /// A text file holding one fingerprint. Binary and hex are detected when `format` is `None`.
    HashFile {
        path: PathBuf,
        format: Option<TextFormat>,
    },
    Literal(Fingerprint),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractCfg {
    pub videos: Vec<PathBuf>,
    pub format: TextFormat,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareCfg {
    pub first: FingerprintInput,
    pub second: FingerprintInput,
    pub threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCmd {
    Put {
        input: FingerprintInput,
        video_id: Option<String>,
        platform: Option<String>,
        upload_date: Option<NaiveDate>,
        metadata_json: Option<String>,
    },
    Query {
        input: FingerprintInput,
        threshold: u32,
        platform: Option<String>,
        limit: usize,
    },
    Stats,
    Delete {
        id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCfg {
    pub db_path: PathBuf,
    pub cmd: StoreCmd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Extract(ExtractCfg),
    Compare(CompareCfg),
    Store(StoreCfg),
}

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub verbosity: ReportVerbosity,
    pub output_format: OutputFormat,
    pub creation_options: CreationOptions,
    pub command: Command,
}
