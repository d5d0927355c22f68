//! `ja-prep`: SAS7BDAT → SQLite conversion and database change detection.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use ja_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use ja_cli::config::load_config;
use ja_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod commands;
mod progress;
mod summary;
mod types;

use crate::commands::{
    run_convert, run_hash, run_invalidate, run_record, run_register, run_status, run_tables,
};

/// Exit code when `status` finds that reprocessing is needed.
const EXIT_NEEDS_REPROCESSING: i32 = 3;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    let cache = config.cache_config(&cli.cache);
    match &cli.command {
        Command::Convert(args) => run_convert(&config, cache, args)?,
        Command::Register(args) => run_register(cache, args)?,
        Command::Status(args) => {
            let report = run_status(cache, args)?;
            if report.needs_reprocessing {
                return Ok(EXIT_NEEDS_REPROCESSING);
            }
        }
        Command::Record(args) => run_record(cache, args)?,
        Command::Hash(args) => run_hash(cache, args)?,
        Command::Tables(args) => run_tables(args)?,
        Command::Invalidate => run_invalidate(cache)?,
    }
    Ok(0)
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
