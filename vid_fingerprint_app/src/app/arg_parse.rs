use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{value_parser, ArgAction::*, ArgMatches};
use eyre::WrapErr;
use vid_fingerprint_lib::*;

use crate::app::*;

// subcommands
const EXTRACT: &str = "extract";
const COMPARE: &str = "compare";
const STORE: &str = "store";
const STORE_PUT: &str = "put";
const STORE_QUERY: &str = "query";
const STORE_STATS: &str = "stats";
const STORE_DELETE: &str = "delete";

// fingerprint sources
const VIDEOS: &str = "Videos";
const VIDEO: &str = "Video";
const FIRST_INPUT: &str = "First input";
const SECOND_INPUT: &str = "Second input";
const HASH_INPUT: &str = "Inputs are fingerprint files";
const TARGET: &str = "Target bits";
const HASH: &str = "Fingerprint";
const HASH_FORMAT: &str = "Fingerprint text format";

// fingerprinting configuration
const FRAMES: &str = "Frames";

// extract output
const TEXT_FORMAT: &str = "Text format";
const OUTPUT_FILE: &str = "Output file";

// matching
const THRESHOLD: &str = "Threshold";
const LIMIT: &str = "Limit";

// store
const DB_PATH: &str = "Store path";
const VIDEO_ID: &str = "Video id";
const PLATFORM: &str = "Platform";
const UPLOAD_DATE: &str = "Upload date";
const METADATA: &str = "Metadata";
const RECORD_ID: &str = "Record id";

// Arg specification
const ARGS_FILE: &str = "Args file";

// output
const JSON_OUTPUT: &str = "Json";
const VERBOSITY_QUIET: &str = "Quiet";
const VERBOSITY_VERBOSE: &str = "Verbose";

fn frames_arg() -> clap::Arg {
    clap::Arg::new(FRAMES)
        .long("frames")
        .value_parser(value_parser!(u32).range(1..))
        .num_args(1)
        .default_value(DEFAULT_MAX_FRAMES.to_string())
        .help("The maximum number of evenly spaced frames sampled from each video")
}

fn threshold_arg() -> clap::Arg {
    clap::Arg::new(THRESHOLD)
        .long("threshold")
        .value_parser(value_parser!(u32).range(0..=FINGERPRINT_BITS as i64))
        .num_args(1)
        .default_value(DEFAULT_MATCH_THRESHOLD.to_string())
        .help("Two fingerprints match when they differ in at most this many bits")
}

fn hash_arg() -> clap::Arg {
    clap::Arg::new(HASH)
        .long("hash")
        .num_args(1)
        .help("A fingerprint given as text instead of a video. 256 binary digits or 64 hex digits, or the form named by --hash-format")
}

fn hash_format_arg() -> clap::Arg {
    clap::Arg::new(HASH_FORMAT)
        .long("hash-format")
        .value_parser(value_parser!(TextFormatArg))
        .num_args(1)
        .help("The text form of fingerprints given on the command line or in files. Binary and hex are detected when this is not given")
}

fn decode_target_bits(s: &str) -> Result<Fingerprint, Error> {
    TextFormat::Binary.decode(s)
}

//obtain the path to the default store file at runtime.
fn default_db_path() -> Option<PathBuf> {
    directories_next::ProjectDirs::from("", "vid_fingerprint", "vid_fingerprint")
        .map(|dirs| dirs.data_dir().join("fingerprints.bin"))
}

fn build_extract_cmd() -> clap::Command {
    let mut cmd = clap::Command::new(EXTRACT).about("Print the fingerprint of one or more videos");

    cmd = cmd.arg(
        clap::Arg::new(VIDEOS)
            .required(true)
            .num_args(1..)
            .value_parser(value_parser!(PathBuf))
            .action(Append)
            .help("Videos to fingerprint. Fingerprints are printed in the order the videos are given"),
    );

    cmd = cmd.arg(frames_arg());

    cmd = cmd.arg(
        clap::Arg::new(TEXT_FORMAT)
            .long("format")
            .value_parser(value_parser!(TextFormatArg))
            .num_args(1)
            .default_value("binary")
            .help("How fingerprints are written"),
    );

    cmd = cmd.arg(
        clap::Arg::new(OUTPUT_FILE)
            .long("output")
            .value_parser(value_parser!(PathBuf))
            .num_args(1)
            .help("Write the fingerprint to this file instead of stdout. Only valid with a single video"),
    );

    cmd
}

fn build_compare_cmd() -> clap::Command {
    let mut cmd = clap::Command::new(COMPARE)
        .about("Compare two fingerprints. Exits with 0 on a match, 1 on no match and 2 on error");

    cmd = cmd.arg(
        clap::Arg::new(FIRST_INPUT)
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("First video, or fingerprint file with --hash-input"),
    );

    cmd = cmd.arg(
        clap::Arg::new(SECOND_INPUT)
            .required_unless_present(TARGET)
            .conflicts_with(TARGET)
            .value_parser(value_parser!(PathBuf))
            .help("Second video, or fingerprint file with --hash-input"),
    );

    cmd = cmd.arg(
        clap::Arg::new(HASH_INPUT)
            .long("hash-input")
            .action(SetTrue)
            .help("Inputs are text files containing fingerprints, not videos"),
    );

    cmd = cmd.arg(hash_format_arg().requires(HASH_INPUT));

    cmd = cmd.arg(
        clap::Arg::new(TARGET)
            .long("target")
            .value_parser(decode_target_bits)
            .num_args(1)
            .help("Compare the first input against this fingerprint, given as 256 binary digits"),
    );

    cmd = cmd.arg(frames_arg());
    cmd = cmd.arg(threshold_arg());

    cmd
}

fn build_store_cmd() -> clap::Command {
    let mut cmd = clap::Command::new(STORE)
        .about("Manage a persistent store of fingerprints")
        .subcommand_required(true);

    let db_arg = clap::Arg::new(DB_PATH)
        .long("db")
        .global(true)
        .value_parser(value_parser!(PathBuf))
        .num_args(1)
        .help("Location of the store file");

    cmd = cmd.arg(match default_db_path() {
        Some(path) => db_arg.default_value(path.to_string_lossy().to_string()),
        None => db_arg,
    });

    let video_arg = || {
        clap::Arg::new(VIDEO)
            .required_unless_present(HASH)
            .conflicts_with(HASH)
            .value_parser(value_parser!(PathBuf))
            .help("Video to fingerprint")
    };

    let platform_arg = || {
        clap::Arg::new(PLATFORM)
            .long("platform")
            .num_args(1)
            .help("Name of the platform the video came from")
    };

    let put = clap::Command::new(STORE_PUT)
        .about("Add a fingerprint to the store, or update the record that already holds it")
        .arg(video_arg())
        .arg(hash_arg())
        .arg(hash_format_arg().requires(HASH))
        .arg(frames_arg())
        .arg(
            clap::Arg::new(VIDEO_ID)
                .long("video-id")
                .num_args(1)
                .help("Identifier of the video on its platform"),
        )
        .arg(platform_arg())
        .arg(
            clap::Arg::new(UPLOAD_DATE)
                .long("upload-date")
                .value_parser(value_parser!(NaiveDate))
                .num_args(1)
                .help("Upload date of the video, as YYYY-MM-DD"),
        )
        .arg(
            clap::Arg::new(METADATA)
                .long("metadata")
                .num_args(1)
                .help("Arbitrary metadata, as a JSON object"),
        );

    let query = clap::Command::new(STORE_QUERY)
        .about("List stored fingerprints that match a video or fingerprint, closest first")
        .arg(video_arg())
        .arg(hash_arg())
        .arg(hash_format_arg().requires(HASH))
        .arg(frames_arg())
        .arg(threshold_arg())
        .arg(platform_arg().help("Only return records from this platform"))
        .arg(
            clap::Arg::new(LIMIT)
                .long("limit")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("10")
                .help("The maximum number of matches returned"),
        );

    let stats = clap::Command::new(STORE_STATS).about("Print the number of stored records");

    let delete = clap::Command::new(STORE_DELETE).about("Remove a record").arg(
        clap::Arg::new(RECORD_ID)
            .required(true)
            .value_parser(value_parser!(u64))
            .help("Id of the record to remove"),
    );

    cmd.subcommands([put, query, stats, delete])
}

fn build_app() -> clap::Command {
    //args are not added through method chaining because rustfmt struggles with very long expressions.
    let mut clap_app = clap::Command::new("Video fingerprint")
        .version(clap::crate_version!())
        .about("Create, compare and store perceptual fingerprints of videos")
        .arg_required_else_help(true);

    clap_app = clap_app.subcommands([build_extract_cmd(), build_compare_cmd(), build_store_cmd()]);

    clap_app = clap_app.arg(
        clap::Arg::new(JSON_OUTPUT)
            .long("json")
            .global(true)
            .action(SetTrue)
            .help("Print results as JSON"),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(ARGS_FILE)
            .long("args-file")
            .value_parser(value_parser!(PathBuf))
            .num_args(1)
            .help("Read command line arguments from a file. If this argument is used it must be the only argument"),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(VERBOSITY_QUIET)
            .short('q')
            .long("quiet")
            .global(true)
            .help("Reduced verbosity")
            .conflicts_with(VERBOSITY_VERBOSE)
            .action(SetTrue),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(VERBOSITY_VERBOSE)
            .short('v')
            .long("verbose")
            .global(true)
            .help("Increased verbosity")
            .conflicts_with(VERBOSITY_QUIET)
            .action(SetTrue),
    );

    clap_app
}

pub fn parse_args() -> eyre::Result<AppCfg> {
    //Start by parsing the provided arguments from the commandline. If the --args-file
    //argument is provided, then we will ignore the true command line arguments and
    //take the arguments from the file instead.
    let args = get_args_from_cmdline_or_file()?;
    cfg_from_matches(&args)
}

fn cfg_from_matches(args: &ArgMatches) -> eyre::Result<AppCfg> {
    let verbosity = if args.get_flag(VERBOSITY_QUIET) {
        ReportVerbosity::Quiet
    } else if args.get_flag(VERBOSITY_VERBOSE) {
        ReportVerbosity::Verbose
    } else {
        ReportVerbosity::Default
    };

    let output_format = if args.get_flag(JSON_OUTPUT) {
        OutputFormat::Json
    } else {
        OutputFormat::Normal
    };

    let Some((subcommand, sub_args)) = args.subcommand() else {
        return Err(eyre::eyre!("No command given. Run with --help to see the available commands"));
    };

    let mut creation_options = CreationOptions::default();
    if let Some(max_frames) = sub_args
        .subcommand()
        .map_or(sub_args, |(_, store_args)| store_args)
        .try_get_one::<u32>(FRAMES)
        .ok()
        .flatten()
    {
        creation_options.max_frames = *max_frames;
    }

    let command = match subcommand {
        EXTRACT => Command::Extract(extract_cfg(sub_args)?),
        COMPARE => Command::Compare(compare_cfg(sub_args)),
        STORE => Command::Store(store_cfg(sub_args)?),
        other => return Err(eyre::eyre!("Unknown command: {other}")),
    };

    Ok(AppCfg {
        verbosity,
        output_format,
        creation_options,
        command,
    })
}

fn extract_cfg(args: &ArgMatches) -> eyre::Result<ExtractCfg> {
    let videos = args
        .get_many::<PathBuf>(VIDEOS)
        .map(|paths| paths.cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    let output_path = args.get_one::<PathBuf>(OUTPUT_FILE).cloned();
    if output_path.is_some() && videos.len() != 1 {
        return Err(eyre::eyre!("--output can only be used when fingerprinting a single video"));
    }

    let format = args
        .get_one::<TextFormatArg>(TEXT_FORMAT)
        .copied()
        .map_or(TextFormat::Binary, TextFormat::from);

    Ok(ExtractCfg {
        videos,
        format,
        output_path,
    })
}

fn hash_format_from(args: &ArgMatches) -> Option<TextFormat> {
    args.get_one::<TextFormatArg>(HASH_FORMAT)
        .copied()
        .map(TextFormat::from)
}

fn compare_cfg(args: &ArgMatches) -> CompareCfg {
    let hash_input = args.get_flag(HASH_INPUT);
    let format = hash_format_from(args);
    let input_from_path = |path: &PathBuf| {
        if hash_input {
            FingerprintInput::HashFile {
                path: path.clone(),
                format,
            }
        } else {
            FingerprintInput::Video(path.clone())
        }
    };

    let first = args
        .get_one::<PathBuf>(FIRST_INPUT)
        .map_or(FingerprintInput::Video(PathBuf::new()), input_from_path);

    let second = match args.get_one::<Fingerprint>(TARGET) {
        Some(target) => FingerprintInput::Literal(*target),
        None => args
            .get_one::<PathBuf>(SECOND_INPUT)
            .map_or(FingerprintInput::Video(PathBuf::new()), input_from_path),
    };

    CompareCfg {
        first,
        second,
        threshold: threshold_from(args),
    }
}

fn store_cfg(args: &ArgMatches) -> eyre::Result<StoreCfg> {
    let db_path = args
        .get_one::<PathBuf>(DB_PATH)
        .cloned()
        .ok_or_else(|| {
            eyre::eyre!("No per-user data directory is available. Give the store location with --db")
        })?;

    let cmd = match args.subcommand() {
        Some((STORE_PUT, put_args)) => StoreCmd::Put {
            input: store_input(put_args)?,
            video_id: put_args.get_one::<String>(VIDEO_ID).cloned(),
            platform: put_args.get_one::<String>(PLATFORM).cloned(),
            upload_date: put_args.get_one::<NaiveDate>(UPLOAD_DATE).copied(),
            metadata_json: put_args.get_one::<String>(METADATA).cloned(),
        },
        Some((STORE_QUERY, query_args)) => StoreCmd::Query {
            input: store_input(query_args)?,
            threshold: threshold_from(query_args),
            platform: query_args.get_one::<String>(PLATFORM).cloned(),
            limit: *query_args.get_one::<usize>(LIMIT).unwrap_or(&10),
        },
        Some((STORE_STATS, _)) => StoreCmd::Stats,
        Some((STORE_DELETE, delete_args)) => StoreCmd::Delete {
            id: *delete_args
                .get_one::<u64>(RECORD_ID)
                .ok_or_else(|| eyre::eyre!("No record id given"))?,
        },
        _ => return Err(eyre::eyre!("No store command given")),
    };

    Ok(StoreCfg { db_path, cmd })
}

fn store_input(args: &ArgMatches) -> eyre::Result<FingerprintInput> {
    let input = match args.get_one::<String>(HASH) {
        Some(text) => {
            let fp = decode_as(text, hash_format_from(args))
                .wrap_err_with(|| format!("Invalid value for --hash: {text}"))?;
            FingerprintInput::Literal(fp)
        }
        None => FingerprintInput::Video(args.get_one::<PathBuf>(VIDEO).cloned().unwrap_or_default()),
    };
    Ok(input)
}

fn threshold_from(args: &ArgMatches) -> u32 {
    *args
        .get_one::<u32>(THRESHOLD)
        .unwrap_or(&DEFAULT_MATCH_THRESHOLD)
}

// Arguments are always first read from the command line, but if --args-file
// is present, then arguments are actually located in a file on disk.
// This fn obtains the args from the correct location.
fn get_args_from_cmdline_or_file() -> eyre::Result<ArgMatches> {
    let cmdline_args = build_app().get_matches();

    match cmdline_args.get_one::<PathBuf>(ARGS_FILE) {
        None => Ok(cmdline_args),
        Some(args_path) => get_argsfile_args(args_path),
    }
}

fn get_argsfile_args(argsfile_path: &Path) -> eyre::Result<ArgMatches> {
    let args = std::fs::read_to_string(argsfile_path)
        .map_err(eyre::Report::msg)
        .and_then(|text| super::args_file::split_args(&text))
        .wrap_err_with(|| {
            format!(
                "Failed to parse args file at location {}",
                argsfile_path.to_string_lossy()
            )
        })?;

    //When parsing args from file, the binary name will not be present,
    // so update the parser that we use to not expect it.
    let matches = build_app().no_binary_name(true).get_matches_from(args);
    Ok(matches)
}
