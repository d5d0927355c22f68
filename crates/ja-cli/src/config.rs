//! Configuration file loading and flag precedence.
//!
//! Settings come from command-line flags, then the TOML configuration file,
//! then built-in defaults. The default file lives in the platform config
//! directory:
//! - Linux: ~/.config/ja-prep/ja-prep.toml
//! - macOS: ~/Library/Application Support/ja-prep/ja-prep.toml
//! - Windows: %APPDATA%/ja-prep/config/ja-prep.toml

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use ja_cache::{CacheConfig, HashAlgorithm};
use ja_sas7bdat::ReaderOptions;
use ja_store::{ConvertOptions, TableMapping};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cli::{CacheArgs, ConvertArgs};

const CONFIG_FILENAME: &str = "ja-prep.toml";

/// Contents of `ja-prep.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub conversion: ConversionSection,
    pub cache: CacheSection,
}

/// `[conversion]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionSection {
    pub source_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub extension: Option<String>,
    pub chunk_size: Option<usize>,
    /// Table name → extract file, converted in name order.
    pub tables: BTreeMap<String, String>,
}

/// `[cache]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub dir: Option<PathBuf>,
    pub algorithm: Option<HashAlgorithm>,
    pub block_size: Option<usize>,
    pub slim_extension: Option<String>,
}

/// Fully resolved `convert` invocation.
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    pub source_dir: PathBuf,
    pub output: PathBuf,
    pub mappings: Vec<TableMapping>,
    pub options: ConvertOptions,
}

/// Path of the default configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ja-prep").map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Load the configuration.
///
/// An explicit path must exist and parse. The default file is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = explicit {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        return parse_config(&content, path);
    }

    let Some(path) = default_config_path() else {
        debug!("no platform config directory, using defaults");
        return Ok(PipelineConfig::default());
    };
    match fs::read_to_string(&path) {
        Ok(content) => parse_config(&content, &path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(PipelineConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("read config {}", path.display())),
    }
}

fn parse_config(content: &str, path: &Path) -> Result<PipelineConfig> {
    let config: PipelineConfig =
        toml::from_str(content).with_context(|| format!("parse config {}", path.display()))?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

impl PipelineConfig {
    /// Cache settings with flags taking precedence over the file.
    pub fn cache_config(&self, args: &CacheArgs) -> CacheConfig {
        let file = &self.cache;
        let mut config = match args.cache_dir.as_ref().or(file.dir.as_ref()) {
            Some(dir) => CacheConfig::new(dir),
            None => CacheConfig::default(),
        };
        if let Some(algorithm) = args.algorithm.or(file.algorithm) {
            config = config.with_algorithm(algorithm);
        }
        if let Some(block_size) = args.block_size.or(file.block_size) {
            config = config.with_block_size(block_size);
        }
        if let Some(extension) = args.slim_extension.as_ref().or(file.slim_extension.as_ref()) {
            config = config.with_slim_extension(extension.clone());
        }
        config
    }

    /// Resolve a `convert` invocation against the file.
    pub fn conversion_plan(&self, args: &ConvertArgs) -> Result<ConversionPlan> {
        let file = &self.conversion;

        let source_dir = args
            .source_dir
            .clone()
            .or_else(|| file.source_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let Some(output) = args.output.clone().or_else(|| file.output.clone()) else {
            bail!("no output database given (use --output or [conversion].output)");
        };

        let mappings = if args.tables.is_empty() {
            file.tables
                .iter()
                .map(|(table, extract)| TableMapping::new(table.clone(), extract.clone()))
                .collect()
        } else {
            args.tables
                .iter()
                .map(|entry| entry.parse::<TableMapping>())
                .collect::<Result<Vec<_>, _>>()?
        };
        if mappings.is_empty() {
            bail!("no tables to convert (use --table or [conversion.tables])");
        }

        let mut reader = ReaderOptions::default();
        if args.keep_blank {
            reader = reader.keep_blank_strings();
        }
        if args.raw_dates {
            reader = reader.raw_dates();
        }
        let mut options = ConvertOptions::default().with_reader_options(reader);
        if let Some(chunk_size) = args.chunk_size.or(file.chunk_size) {
            options = options.with_chunk_size(chunk_size);
        }
        if let Some(extension) = args.extension.as_ref().or(file.extension.as_ref()) {
            options = options.with_extension(extension.clone());
        }

        Ok(ConversionPlan {
            source_dir,
            output,
            mappings,
            options,
        })
    }
}
