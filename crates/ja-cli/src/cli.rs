//! CLI argument definitions for `ja-prep`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use ja_cache::HashAlgorithm;

#[derive(Parser)]
#[command(
    name = "ja-prep",
    version,
    about = "Convert SAS7BDAT extracts to SQLite and track database changes",
    long_about = "Convert a directory of SAS7BDAT extracts into one SQLite database.\n\n\
                  Keeps content hashes of the original and slim databases in a cache\n\
                  directory so downstream preprocessing only reruns when needed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: <config dir>/ja-prep/ja-prep.toml).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

/// Cache settings that override the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct CacheArgs {
    /// Cache directory holding the pointer and hash records.
    #[arg(long = "cache-dir", value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Digest algorithm (sha256 or blake3).
    #[arg(long = "algorithm", value_name = "NAME", global = true)]
    pub algorithm: Option<HashAlgorithm>,

    /// Bytes read per block while hashing.
    #[arg(long = "block-size", value_name = "BYTES", global = true)]
    pub block_size: Option<usize>,

    /// Extension of the slim database.
    #[arg(long = "slim-extension", value_name = "EXT", global = true)]
    pub slim_extension: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert the mapped extracts into a fresh SQLite database.
    Convert(ConvertArgs),

    /// Register the original database in the cache.
    Register(RegisterArgs),

    /// Report whether the original or slim database changed (exit 3 if so).
    Status(StatusArgs),

    /// Hash a database and store the digest as the new baseline.
    Record(RecordArgs),

    /// Print the digest of a file.
    Hash(HashArgs),

    /// List the tables of a database.
    Tables(TablesArgs),

    /// Delete the cache directory.
    Invalidate,
}

#[derive(Parser)]
pub struct ConvertArgs {
    /// Directory containing the extract files.
    #[arg(long = "source-dir", value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Output SQLite database (replaced on every run).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Table mapping entry, NAME=FILE or NAME (repeatable).
    #[arg(long = "table", short = 't', value_name = "NAME=FILE")]
    pub tables: Vec<String>,

    /// Expected extract extension.
    #[arg(long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    /// Rows read and committed at a time.
    #[arg(long = "chunk-size", value_name = "ROWS")]
    pub chunk_size: Option<usize>,

    /// Keep blank character values as empty strings instead of NULL.
    #[arg(long = "keep-blank")]
    pub keep_blank: bool,

    /// Store date and datetime columns as raw SAS numbers.
    #[arg(long = "raw-dates")]
    pub raw_dates: bool,

    /// Register the output as the original database after conversion.
    #[arg(long = "register")]
    pub register: bool,

    /// Hide the progress spinner.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

#[derive(Parser)]
pub struct RegisterArgs {
    /// Path to the original database.
    #[arg(value_name = "DB")]
    pub database: PathBuf,
}

#[derive(Parser)]
pub struct StatusArgs {
    /// Print the status as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct RecordArgs {
    /// Which database to hash.
    #[arg(value_enum)]
    pub target: RecordTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RecordTarget {
    Original,
    Slim,
}

#[derive(Parser)]
pub struct HashArgs {
    /// File to hash.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser)]
pub struct TablesArgs {
    /// SQLite database to inspect.
    #[arg(value_name = "DB")]
    pub database: PathBuf,

    /// Fail when this table is missing (repeatable, comma separated).
    #[arg(long = "require", value_name = "TABLE", value_delimiter = ',')]
    pub require: Vec<String>,

    /// Fail when any of the standard extract tables is missing.
    #[arg(long = "require-standard")]
    pub require_standard: bool,

    /// Rename tables to lowercase snake case before listing.
    #[arg(long = "standardize")]
    pub standardize: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
