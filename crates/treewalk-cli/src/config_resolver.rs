//! Configuration file lookup.
//!
//! First match wins:
//!
//! 1. `--config <FILE>`
//! 2. `treewalk.toml`, then `.treewalk.toml`, in the project directory or
//!    the nearest ancestor that has one
//! 3. `config.toml` in `$TREEWALK_CONFIG_DIR`, or in `~/.treewalk/`
//! 4. nothing: the default preset is used

use std::path::{Path, PathBuf};

/// Environment variable overriding the global configuration directory.
pub const CONFIG_DIR_ENV: &str = "TREEWALK_CONFIG_DIR";

/// Project-level file names, in lookup order.
const PROJECT_CONFIG_NAMES: &[&str] = &["treewalk.toml", ".treewalk.toml"];

/// File name inside the global configuration directory.
const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`; not checked for existence.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the global configuration directory.
    Global(PathBuf),
    /// No file anywhere.
    Default,
}

impl ConfigSource {
    /// Path of the file, if there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// True for a file from the global directory.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

/// Looks up the configuration for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, global_config_dir().as_deref())
}

fn resolve_in(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<&Path>) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    if let Some(found) = project_dir.ancestors().find_map(|dir| {
        PROJECT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }) {
        tracing::debug!(path = %found.display(), "project config");
        return ConfigSource::Project(found);
    }

    match global_dir.map(|dir| dir.join(GLOBAL_CONFIG_NAME)) {
        Some(found) if found.is_file() => {
            tracing::debug!(path = %found.display(), "global config");
            ConfigSource::Global(found)
        }
        _ => ConfigSource::Default,
    }
}

/// `$TREEWALK_CONFIG_DIR`, else `~/.treewalk`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    std::env::var_os(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|home| home.join(".treewalk")))
}
