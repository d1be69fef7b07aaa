//! Command-line interface
//!
//! `vcs-status [--recurse] [--summary] [--format text|json] PATH...` queries
//! each path through a [`StatusCache`] backed by git and waits for the
//! background answer of every cache miss.

use crate::backend::GitBackend;
use crate::cache::StatusCache;
use crate::config::{ConfigLoader, StatusCacheConfig};
use crate::format::{format_result_text, format_results_json};
use crate::logging::init_logging;
use crate::types::{CheckOptions, StatusResult};
use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// vcs-status - query cached version-control status
#[derive(Parser, Debug)]
#[command(name = "vcs-status")]
#[command(about = "Print the version-control status of paths in a git working copy")]
pub struct Cli {
    /// Paths to query
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Include every path below each requested directory
    #[arg(long)]
    pub recurse: bool,

    /// Print the aggregated status of each path
    #[arg(long)]
    pub summary: bool,

    /// Force a fresh check instead of using cached data
    #[arg(long)]
    pub invalidate: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    fn options(&self) -> CheckOptions {
        CheckOptions::new()
            .recurse(self.recurse)
            .summary(self.summary)
            .invalidate(self.invalidate)
    }

    /// Apply logging flags on top of loaded configuration
    fn apply_overrides(&self, config: &mut StatusCacheConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if self.no_color {
            config.logging.color = false;
        }
    }
}

/// Run the CLI and return the text to print
pub fn run(cli: &Cli) -> anyhow::Result<String> {
    let mut config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let backend = Arc::new(GitBackend::new(config.backend.git_binary.clone()));
    let cache = StatusCache::spawn(backend, config.cache.clone())?;
    let results = query_paths(&cache, &cli.paths, cli.options())?;
    cache.shutdown();

    match cli.format {
        OutputFormat::Json => Ok(format_results_json(&results)?),
        OutputFormat::Text => {
            let color = !cli.no_color;
            Ok(results
                .iter()
                .map(|(path, result)| format_result_text(path, result, color))
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

/// Query every path, waiting for background answers
pub fn query_paths(
    cache: &StatusCache,
    paths: &[PathBuf],
    options: CheckOptions,
) -> anyhow::Result<Vec<(PathBuf, StatusResult)>> {
    let mut resolved = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            bail!("Path does not exist: {}", path.display());
        }
        let path = dunce::canonicalize(path)
            .with_context(|| format!("Failed to resolve path {}", path.display()))?;

        let start = Instant::now();
        let response = cache.check_status(&path, options, None);
        let from_cache = response.is_ready();
        let result = response
            .resolve_blocking()
            .with_context(|| format!("Status check for {} did not complete", path.display()))?;
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(path = %path.display(), from_cache, duration_ms, "Resolved status");
        resolved.push((path, result));
    }

    let stats = cache.stats();
    info!(
        paths = resolved.len(),
        backend_calls = stats.queue.backend_calls,
        entries = stats.store.entries,
        "Status query finished"
    );
    Ok(resolved)
}
