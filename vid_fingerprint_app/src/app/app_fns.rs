use std::{
    error::Error as StdError,
    fmt,
    path::{Path, PathBuf},
};

use fingerprint_store::{FingerprintStore, NewRecord};
use rayon::prelude::*;
use serde::Serialize;
use vid_fingerprint_lib::{Fingerprint, FingerprintBuilder, SampleStats, TextFormat, VideoFile};

use super::output::*;
use crate::app::*;

const EXIT_NO_MATCH: i32 = 1;
const EXIT_ERROR: i32 = 1;
const EXIT_COMPARE_ERROR: i32 = 2;
// the same code clap exits with on a malformed command line.
const EXIT_USAGE_ERROR: i32 = 2;

pub fn run_app() -> i32 {
    let cfg = super::arg_parse::parse_args().unwrap_or_else(|e| print_error_and_quit(e, EXIT_USAGE_ERROR));
    configure_logs(cfg.verbosity)
        .unwrap_or_else(|e| print_error_and_quit(e, error_exit_code(&cfg.command)));

    let ret = match run_app_inner(&cfg) {
        Ok(code) => code,
        Err(fatal_error) => {
            print_fatal_err(fatal_error, cfg.verbosity);
            error_exit_code(&cfg.command)
        }
    };

    ret
}

// `compare` reserves 1 for "no match".
fn error_exit_code(command: &Command) -> i32 {
    match command {
        Command::Compare(_) => EXIT_COMPARE_ERROR,
        Command::Extract(_) | Command::Store(_) => EXIT_ERROR,
    }
}

fn run_app_inner(cfg: &AppCfg) -> eyre::Result<i32> {
    let builder = FingerprintBuilder::from_options(cfg.creation_options);

    match &cfg.command {
        Command::Extract(extract_cfg) => run_extract(cfg, extract_cfg, &builder),
        Command::Compare(compare_cfg) => run_compare(cfg, compare_cfg, &builder),
        Command::Store(store_cfg) => run_store(cfg, store_cfg, &builder),
    }
}

fn run_extract(cfg: &AppCfg, extract_cfg: &ExtractCfg, builder: &FingerprintBuilder) -> eyre::Result<i32> {
    //fingerprint in parallel, but keep the results in the order the videos were given.
    let results = extract_cfg
        .videos
        .par_iter()
        .map(|src_path| {
            let source = VideoFile::new(src_path).with_timeout(builder.options().timeout);
            builder
                .fingerprint_with_stats(&source)
                .map(|(fp, stats)| ExtractedFingerprint::new(src_path.clone(), extract_cfg.format, &fp, stats))
        })
        .collect::<Vec<_>>();

    let total = results.len();
    let mut fingerprints = Vec::with_capacity(total);
    for result in results {
        match result {
            Ok(extracted) => {
                debug!(target: "extract",
                    "{}: {} frames at {}x{}, {} bits set",
                    extracted.src_path.display(),
                    extracted.frame_count,
                    extracted.resolution.0,
                    extracted.resolution.1,
                    extracted.bits_set
                );
                fingerprints.push(extracted);
            }
            Err(e) => error!(target: "app-errorlog", "{e}"),
        }
    }

    let failed = total - fingerprints.len();
    let report = ExtractReport { fingerprints };

    match &extract_cfg.output_path {
        Some(output_path) if !report.fingerprints.is_empty() => {
            let text = render(&report, cfg.output_format)? + "\n";
            std::fs::write(output_path, text).map_err(|src| AppError::OutputError {
                src,
                path: output_path.clone(),
            })?;
            info!(target: "extract", "Fingerprint saved to {}", output_path.display());
        }
        Some(_) => (),
        None => print_report(&report, cfg.output_format)?,
    }

    if failed > 0 {
        return Err(AppError::ExtractFailures { failed, total }.into());
    }

    Ok(0)
}

fn run_compare(cfg: &AppCfg, compare_cfg: &CompareCfg, builder: &FingerprintBuilder) -> eyre::Result<i32> {
    let (first, second) = rayon::join(
        || resolve_input(&compare_cfg.first, builder),
        || resolve_input(&compare_cfg.second, builder),
    );
    let (first, second) = (first?, second?);

    debug!(target: "compare",
        "bits set: {} and {} of {}",
        first.fingerprint.count_ones(),
        second.fingerprint.count_ones(),
        vid_fingerprint_lib::FINGERPRINT_BITS
    );

    let report = CompareReport::new(&first.fingerprint, &second.fingerprint, compare_cfg.threshold);
    print_report(&report, cfg.output_format)?;

    Ok(if report.is_match { 0 } else { EXIT_NO_MATCH })
}

fn run_store(cfg: &AppCfg, store_cfg: &StoreCfg, builder: &FingerprintBuilder) -> eyre::Result<i32> {
    let store = FingerprintStore::open(&store_cfg.db_path).map_err(AppError::from)?;

    match &store_cfg.cmd {
        StoreCmd::Put {
            input,
            video_id,
            platform,
            upload_date,
            metadata_json,
        } => {
            let resolved = resolve_input(input, builder)?;
            let fingerprint = resolved.fingerprint;

            let mut record = NewRecord::new(fingerprint);
            if let Some(src_path) = resolved.src_path {
                record = record.with_source_path(absolutify_path(&src_path));
            }
            if let Some(stats) = resolved.stats {
                record = record.with_frame_count(u32::try_from(stats.frame_count).unwrap_or(u32::MAX));
            }
            if let Some(video_id) = video_id {
                record = record.with_video_id(video_id.clone());
            }
            if let Some(platform) = platform {
                record = record.with_platform(platform.clone());
            }
            if let Some(upload_date) = upload_date {
                record = record.with_upload_date(*upload_date);
            }
            if let Some(json) = metadata_json {
                record = record.with_metadata_json(json).map_err(AppError::from)?;
            }

            let id = store.put(record).map_err(AppError::from)?;
            print_report(&PutReport { id, fingerprint }, cfg.output_format)?;
        }

        StoreCmd::Query {
            input,
            threshold,
            platform,
            limit,
        } => {
            let resolved = resolve_input(input, builder)?;
            let matches =
                store.query_similar(&resolved.fingerprint, *threshold, platform.as_deref(), *limit);

            if matches.is_empty() {
                info!(target: "store", "No stored fingerprints within {threshold} bits");
            }
            print_report(&QueryReport { matches }, cfg.output_format)?;
        }

        StoreCmd::Stats => print_report(&StatsReport(store.stats()), cfg.output_format)?,

        StoreCmd::Delete { id } => {
            let deleted = store.delete(*id).map_err(AppError::from)?;
            print_report(&DeleteReport { id: *id, deleted }, cfg.output_format)?;
        }
    }

    store.close().map_err(AppError::from)?;
    Ok(0)
}

#[derive(Debug, Clone, PartialEq)]
struct ResolvedInput {
    fingerprint: Fingerprint,
    src_path: Option<PathBuf>,
    stats: Option<SampleStats>,
}

impl From<Fingerprint> for ResolvedInput {
    fn from(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            src_path: None,
            stats: None,
        }
    }
}

fn resolve_input(input: &FingerprintInput, builder: &FingerprintBuilder) -> Result<ResolvedInput, AppError> {
    match input {
        FingerprintInput::Video(src_path) => {
            let source = VideoFile::new(src_path).with_timeout(builder.options().timeout);
            let (fingerprint, stats) = builder.fingerprint_with_stats(&source)?;
            Ok(ResolvedInput {
                fingerprint,
                src_path: Some(src_path.clone()),
                stats: Some(stats),
            })
        }
        FingerprintInput::HashFile { path, format } => {
            read_hash_file(path, *format).map(ResolvedInput::from)
        }
        FingerprintInput::Literal(fingerprint) => Ok(ResolvedInput::from(*fingerprint)),
    }
}

// Fingerprint files hold a single fingerprint, as written by `extract --output`.
fn read_hash_file(path: &Path, format: Option<TextFormat>) -> Result<Fingerprint, AppError> {
    let hash_file_error = |reason: String| AppError::HashFileError {
        reason,
        path: path.to_path_buf(),
    };

    let text = std::fs::read_to_string(path).map_err(|e| hash_file_error(e.to_string()))?;
    decode_as(&text, format).map_err(|e| hash_file_error(e.to_string()))
}

fn render<T: Serialize + fmt::Display>(report: &T, format: OutputFormat) -> eyre::Result<String> {
    let ret = match format {
        OutputFormat::Normal => report.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    };
    Ok(ret)
}

#[allow(clippy::print_stdout)]
fn print_report<T: Serialize + fmt::Display>(report: &T, format: OutputFormat) -> eyre::Result<()> {
    let text = render(report, format)?;
    if !text.is_empty() {
        println!("{text}");
    }
    Ok(())
}

fn absolutify_path(path: &Path) -> PathBuf {
    //canonicalizing fails when the path does not exist. Fall back to the path as given.
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn print_fatal_err(fatal_err: eyre::Report, verbosity: ReportVerbosity) {
    match fatal_err.downcast_ref::<AppError>().and_then(AppError::category) {
        Some(category) => error!(target: "app-errorlog", "{category:?} error: {}", fatal_err),
        None => error!(target: "app-errorlog", "{}", fatal_err),
    }

    if verbosity == ReportVerbosity::Verbose {
        let mut source: Option<&(dyn StdError + 'static)> = fatal_err.source();
        while let Some(e) = source {
            error!(target: "app-errorlog", "    caused by: {}", e);
            source = e.source();
        }
    }
}

pub fn configure_logs(verbosity: ReportVerbosity) -> eyre::Result<()> {
    use simplelog::*;

    let mut cfg = simplelog::ConfigBuilder::new();
    cfg.set_time_level(LevelFilter::Off);

    let min_loglevel = match verbosity {
        ReportVerbosity::Quiet => LevelFilter::Warn,
        ReportVerbosity::Default => LevelFilter::Info,
        ReportVerbosity::Verbose => LevelFilter::Trace,
    };

    TermLogger::init(
        min_loglevel,
        cfg.build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    Ok(())
}

#[cfg(test)]
mod test {
    use fingerprint_store::StoreError;
    use vid_fingerprint_lib::{encode_binary, encode_hex, CreationOptions, ErrorCategory};

    use super::*;

    fn app_cfg(command: Command) -> AppCfg {
        AppCfg {
            verbosity: ReportVerbosity::Quiet,
            output_format: OutputFormat::Json,
            creation_options: CreationOptions::default(),
            command,
        }
    }

    fn store_cfg(db_path: &Path, cmd: StoreCmd) -> AppCfg {
        app_cfg(Command::Store(StoreCfg {
            db_path: db_path.to_path_buf(),
            cmd,
        }))
    }

    #[test]
    fn test_read_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_words([1, 2, 3, u64::MAX]);

        let hex_path = dir.path().join("hex.txt");
        std::fs::write(&hex_path, encode_hex(&fp) + "\n").unwrap();
        assert_eq!(read_hash_file(&hex_path, None).unwrap(), fp);
        assert_eq!(read_hash_file(&hex_path, Some(TextFormat::Hex)).unwrap(), fp);
        assert!(read_hash_file(&hex_path, Some(TextFormat::Binary)).is_err());

        let bin_path = dir.path().join("bin.txt");
        std::fs::write(&bin_path, encode_binary(&fp)).unwrap();
        assert_eq!(read_hash_file(&bin_path, None).unwrap(), fp);

        let bad_path = dir.path().join("bad.txt");
        std::fs::write(&bad_path, "not a fingerprint").unwrap();
        let err = read_hash_file(&bad_path, None).unwrap_err();
        assert!(matches!(err, AppError::HashFileError { .. }));
        assert_eq!(err.category(), Some(ErrorCategory::Input));

        let err = read_hash_file(&dir.path().join("missing.txt"), None).unwrap_err();
        assert!(matches!(err, AppError::HashFileError { .. }));
    }

    #[test]
    fn test_decimal_hash_file_round_trips_through_compare() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::from_words([9, 0, 0, 0xFFFF]);

        //as written by `extract --format decimal --output`.
        let dec_path = dir.path().join("dec.txt");
        std::fs::write(&dec_path, TextFormat::Decimal.encode(&fp) + "\n").unwrap();
        assert!(read_hash_file(&dec_path, None).is_err());

        let cfg = app_cfg(Command::Compare(CompareCfg {
            first: FingerprintInput::HashFile {
                path: dec_path,
                format: Some(TextFormat::Decimal),
            },
            second: FingerprintInput::Literal(fp),
            threshold: 0,
        }));
        assert_eq!(run_app_inner(&cfg).unwrap(), 0);
    }

    #[test]
    fn test_error_exit_codes() {
        let compare = Command::Compare(CompareCfg {
            first: FingerprintInput::Literal(Fingerprint::default()),
            second: FingerprintInput::Literal(Fingerprint::default()),
            threshold: 30,
        });
        assert_eq!(error_exit_code(&compare), 2);
        assert_ne!(error_exit_code(&compare), EXIT_NO_MATCH);
        assert_eq!(error_exit_code(&Command::Store(StoreCfg { db_path: "x".into(), cmd: StoreCmd::Stats })), 1);
        assert_eq!(EXIT_USAGE_ERROR, 2);
    }

    #[test]
    fn test_compare_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let a = Fingerprint::default();
        let near = Fingerprint::from_words([0b111, 0, 0, 0]);

        let a_path = dir.path().join("a.txt");
        std::fs::write(&a_path, TextFormat::Hex.encode(&a)).unwrap();

        let compare = |second: Fingerprint, threshold: u32| {
            let cfg = app_cfg(Command::Compare(CompareCfg {
                first: FingerprintInput::HashFile {
                    path: a_path.clone(),
                    format: None,
                },
                second: FingerprintInput::Literal(second),
                threshold,
            }));
            run_app_inner(&cfg).unwrap()
        };

        assert_eq!(compare(near, 3), 0);
        assert_eq!(compare(near, 2), EXIT_NO_MATCH);
        assert_eq!(compare(Fingerprint::full_fingerprint(), 30), EXIT_NO_MATCH);
    }

    #[test]
    fn test_compare_missing_hash_file_is_an_error() {
        let cfg = app_cfg(Command::Compare(CompareCfg {
            first: FingerprintInput::HashFile {
                path: "/nonexistent/fingerprint.txt".into(),
                format: None,
            },
            second: FingerprintInput::Literal(Fingerprint::default()),
            threshold: 30,
        }));
        assert!(run_app_inner(&cfg).is_err());
    }

    #[test]
    fn test_store_commands() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("store").join("fingerprints.bin");
        let fp = Fingerprint::from_words([5, 6, 7, 8]);

        let put = store_cfg(
            &db_path,
            StoreCmd::Put {
                input: FingerprintInput::Literal(fp),
                video_id: Some("abc".to_string()),
                platform: Some("youtube".to_string()),
                upload_date: None,
                metadata_json: Some(r#"{"title": "cat"}"#.to_string()),
            },
        );
        assert_eq!(run_app_inner(&put).unwrap(), 0);
        assert_eq!(run_app_inner(&put).unwrap(), 0);

        let store = FingerprintStore::open(&db_path).unwrap();
        assert_eq!(store.len(), 1);
        let record = store.get_by_fingerprint(&fp).unwrap();
        assert_eq!(record.fields.video_id.as_deref(), Some("abc"));
        assert_eq!(record.fields.source_path, None);
        drop(store);

        let query = store_cfg(
            &db_path,
            StoreCmd::Query {
                input: FingerprintInput::Literal(fp),
                threshold: 30,
                platform: Some("youtube".to_string()),
                limit: 10,
            },
        );
        assert_eq!(run_app_inner(&query).unwrap(), 0);
        assert_eq!(run_app_inner(&store_cfg(&db_path, StoreCmd::Stats)).unwrap(), 0);

        let delete = store_cfg(&db_path, StoreCmd::Delete { id: record.id });
        assert_eq!(run_app_inner(&delete).unwrap(), 0);
        assert!(FingerprintStore::open(&db_path).unwrap().is_empty());
    }

    #[test]
    fn test_store_rejects_bad_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let put = store_cfg(
            &dir.path().join("fingerprints.bin"),
            StoreCmd::Put {
                input: FingerprintInput::Literal(Fingerprint::default()),
                video_id: None,
                platform: None,
                upload_date: None,
                metadata_json: Some("[1, 2, 3]".to_string()),
            },
        );

        let err = run_app_inner(&put).unwrap_err();
        let app_err = err.downcast_ref::<AppError>().unwrap();
        assert!(matches!(
            app_err,
            AppError::StoreError(StoreError::InvalidMetadata(_))
        ));
        assert_eq!(app_err.category(), Some(ErrorCategory::Input));
    }

    #[test]
    fn test_render_json() {
        let report = DeleteReport { id: 3, deleted: true };
        let json = render(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"id": 3, "deleted": true}));
        assert_eq!(render(&report, OutputFormat::Normal).unwrap(), "Deleted record 3");
    }
}
