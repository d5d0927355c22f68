use std::time::Instant;

use anyhow::{Context, Result, bail};
use ja_cache::{CacheConfig, ChangeDetector};
use ja_cli::cli::{
    ConvertArgs, HashArgs, RecordArgs, RecordTarget, RegisterArgs, StatusArgs, TablesArgs,
};
use ja_cli::config::PipelineConfig;
use ja_store::{
    REQUIRED_TABLES, convert_with_progress, missing_tables, standardize_table_names,
    table_dimensions,
};
use rusqlite::{Connection, OpenFlags};
use tracing::{info, info_span};

use crate::progress::ConvertSpinner;
use crate::summary::{print_conversion_summary, print_status, print_table_dimensions};
use crate::types::StatusReport;

pub fn run_convert(config: &PipelineConfig, cache: CacheConfig, args: &ConvertArgs) -> Result<()> {
    let plan = config.conversion_plan(args)?;
    let span = info_span!("convert", output = %plan.output.display());
    let _guard = span.enter();

    let start = Instant::now();
    let mut spinner = ConvertSpinner::new(args.no_progress);
    let report = convert_with_progress(
        &plan.source_dir,
        &plan.mappings,
        &plan.output,
        &plan.options,
        &mut spinner,
    )
    .with_context(|| format!("convert extracts in {}", plan.source_dir.display()))?;
    info!(
        tables = report.tables.len(),
        rows = report.total_rows(),
        duration_ms = start.elapsed().as_millis(),
        "conversion complete"
    );
    print_conversion_summary(&report);

    if args.register {
        let detector = ChangeDetector::new(cache);
        let path = detector
            .set_original_database_path(&report.output)
            .context("register original database")?;
        println!("Registered: {}", path.display());
    }
    Ok(())
}

pub fn run_register(cache: CacheConfig, args: &RegisterArgs) -> Result<()> {
    if !args.database.is_file() {
        bail!("database not found: {}", args.database.display());
    }
    let detector = ChangeDetector::new(cache);
    let path = detector
        .set_original_database_path(&args.database)
        .context("register original database")?;
    println!("Registered: {}", path.display());
    Ok(())
}

pub fn run_status(cache: CacheConfig, args: &StatusArgs) -> Result<StatusReport> {
    let detector = ChangeDetector::new(cache);
    let assessment = detector.assess().context("assess cache")?;
    let report = StatusReport::new(
        detector.config().root().to_path_buf(),
        detector.config().algorithm,
        detector.original_database_path()?,
        detector.slim_database_path()?,
        assessment,
    );
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize status")?
        );
    } else {
        print_status(&report);
    }
    Ok(report)
}

pub fn run_record(cache: CacheConfig, args: &RecordArgs) -> Result<()> {
    let detector = ChangeDetector::new(cache);
    let digest = match args.target {
        RecordTarget::Original => detector.record_original_hash(),
        RecordTarget::Slim => detector.record_slim_hash(),
    }
    .context("record database hash")?;
    println!("{digest}");
    Ok(())
}

pub fn run_hash(cache: CacheConfig, args: &HashArgs) -> Result<()> {
    let detector = ChangeDetector::new(cache);
    let digest = detector
        .hash_file(&args.file)
        .with_context(|| format!("hash {}", args.file.display()))?;
    println!("{digest}  {}", args.file.display());
    Ok(())
}

pub fn run_tables(args: &TablesArgs) -> Result<()> {
    if !args.database.is_file() {
        bail!("database not found: {}", args.database.display());
    }
    let flags = if args.standardize {
        OpenFlags::SQLITE_OPEN_READ_WRITE
    } else {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    };
    let mut conn = Connection::open_with_flags(&args.database, flags)
        .with_context(|| format!("open {}", args.database.display()))?;

    let renamed = if args.standardize {
        standardize_table_names(&mut conn).context("standardize table names")?
    } else {
        Vec::new()
    };

    let mut required: Vec<String> = args.require.clone();
    if args.require_standard {
        required.extend(REQUIRED_TABLES.iter().map(|name| (*name).to_string()));
    }
    let missing = missing_tables(&conn, &required).context("check required tables")?;
    let dimensions = table_dimensions(&conn).context("read table dimensions")?;
    print_table_dimensions(&args.database, &dimensions, &renamed, &missing);

    if !missing.is_empty() {
        bail!("missing required tables: {}", missing.join(", "));
    }
    Ok(())
}

pub fn run_invalidate(cache: CacheConfig) -> Result<()> {
    let detector = ChangeDetector::new(cache);
    detector.invalidate().context("invalidate cache")?;
    println!("Removed: {}", detector.config().root().display());
    Ok(())
}
