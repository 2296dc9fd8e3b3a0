//! Check presets for common configurations.

use std::str::FromStr;
use treewalk_core::{Config, ConfigError, ModuleEntry};

use crate::{boolean_expression_complexity, empty_block, method_count, method_length, todo_comment};

/// Preset sets of built-in checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Every built-in check that works without configuration, with defaults.
    Default,
    /// A small set for gradual adoption.
    Minimal,
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "minimal" => Ok(Self::Minimal),
            other => Err(ConfigError::UnknownPreset { name: other.to_string() }),
        }
    }
}

impl Preset {
    /// Module entries of this preset.
    #[must_use]
    pub fn modules(self) -> Vec<ModuleEntry> {
        match self {
            Self::Default => default_modules(),
            Self::Minimal => minimal_modules(),
        }
    }

    /// Adds the preset's modules to `config`.
    ///
    /// Modules the file configures itself keep the file's settings; the
    /// preset only contributes the ones it does not name.
    pub fn apply(self, config: &mut Config) {
        let mut added: Vec<ModuleEntry> = self
            .modules()
            .into_iter()
            .filter(|entry| !config.modules.iter().any(|m| m.name == entry.name))
            .collect();
        added.append(&mut config.modules);
        config.modules = added;
    }
}

/// Resolves `config.preset`, if any, into concrete modules.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownPreset`] for an unknown preset name.
pub fn apply_preset(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(name) = config.preset.take() {
        let preset: Preset = name.parse()?;
        tracing::debug!(preset = %name, "applying preset");
        preset.apply(config);
    }
    Ok(())
}

/// Returns the default set of modules.
///
/// `IllegalToken` and `DescendantToken` are left out: neither reports
/// anything useful before it is told which kinds to look for.
#[must_use]
pub fn default_modules() -> Vec<ModuleEntry> {
    vec![
        ModuleEntry::new(boolean_expression_complexity::NAME),
        ModuleEntry::new(empty_block::NAME),
        ModuleEntry::new(method_count::NAME),
        ModuleEntry::new(method_length::NAME),
        ModuleEntry::new(todo_comment::NAME),
    ]
}

/// Returns the minimal set of modules.
#[must_use]
pub fn minimal_modules() -> Vec<ModuleEntry> {
    vec![ModuleEntry::new(empty_block::NAME), ModuleEntry::new(method_length::NAME)]
}
