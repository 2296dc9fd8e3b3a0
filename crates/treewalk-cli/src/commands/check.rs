//! Check command implementation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treewalk_checks::{apply_preset, standard_registry};
use treewalk_core::{CheckerBuilder, Config};

use crate::config_resolver::{self, ConfigSource};
use crate::OutputFormat;

/// Extension processed when the configuration names none.
const DEFAULT_EXTENSION: &str = "java";

/// Arguments of the check command.
#[derive(Debug)]
pub struct CheckArgs {
    /// Files or directories to check.
    pub paths: Vec<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
    /// Worker thread override.
    pub threads: Option<usize>,
    /// Extra exclude patterns.
    pub exclude: Vec<String>,
    /// Cache file override.
    pub cache: Option<PathBuf>,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
}

/// Runs the check command and returns the exit code.
pub fn run(args: &CheckArgs) -> Result<i32> {
    let project_dir = project_dir(&args.paths);
    let source = config_resolver::resolve(&project_dir, args.config.as_deref());
    let mut config = load_config(&source)?;
    apply_preset(&mut config).context("Failed to apply preset")?;

    if let Some(cache) = &args.cache {
        config.checker.cache_file = Some(cache.clone());
    }
    let mut exclude = config.checker.exclude.clone();
    exclude.extend(args.exclude.iter().cloned());

    let mut builder = CheckerBuilder::from_config(&config)
        .context("Failed to load result cache")?
        .factory(Arc::new(standard_registry()));
    if let Some(threads) = args.threads {
        builder = builder.threads(threads);
    }
    if config.checker.file_extensions.is_empty() {
        builder = builder.file_extensions([DEFAULT_EXTENSION]);
    }
    let mut checker = builder.build().context("Failed to configure checker")?;

    let files = discover_files(&args.paths, &exclude)?;
    tracing::info!(files = files.len(), threads = checker.threads(), "checking");

    let report = checker.process(&files).context("Check run failed")?;
    checker.destroy();

    super::output::print(&report, args.format)?;
    Ok(i32::try_from(report.threshold_count).unwrap_or(i32::MAX))
}

fn project_dir(paths: &[PathBuf]) -> PathBuf {
    match paths.first() {
        Some(path) if path.is_dir() => path.clone(),
        Some(path) => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        None => PathBuf::from("."),
    }
}

fn load_config(source: &ConfigSource) -> Result<Config> {
    match source {
        ConfigSource::Default => {
            tracing::debug!("no configuration file, using the default preset");
            let mut config = Config::new();
            config.preset = Some("default".to_string());
            Ok(config)
        }
        other => {
            // Invariant: non-Default variants always have a path
            let p = other.path().context("resolved config has no path")?;
            if source.is_global() {
                tracing::info!("Using global config: {}", p.display());
            }
            Config::from_file(p).with_context(|| format!("Failed to load config: {}", p.display()))
        }
    }
}

/// Collects the files under `paths`, honoring `.gitignore` and `exclude`
/// globs. Files named directly are always kept. The result is sorted.
pub fn discover_files(paths: &[PathBuf], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let patterns = exclude
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid exclude pattern: {p}")))
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        let mut builder = ignore::WalkBuilder::new(root);
        builder.hidden(false).git_ignore(true);
        for entry in builder.build() {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            if patterns.iter().any(|p| p.matches_path(relative) || p.matches_path(path)) {
                tracing::debug!(path = %path.display(), "excluded");
                continue;
            }
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
