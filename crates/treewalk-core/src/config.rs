//! Configuration loading and the module configuration tree.
//!
//! A `treewalk.toml` file deserializes into [`Config`], which converts into a
//! [`ModuleConfig`] tree: the checker at the root, the tree walker below it,
//! and one node per configured check or filter with string properties.

use crate::kind::NodeKind;
use crate::types::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Name of the root module of a configuration tree.
pub const CHECKER_MODULE: &str = "Checker";

/// Name of the module that owns checks and walker filters.
pub const WALKER_MODULE: &str = "TreeWalker";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Preset of built-in modules to start from (e.g. "default", "minimal").
    #[serde(default)]
    pub preset: Option<String>,

    /// Execution settings.
    #[serde(default)]
    pub checker: CheckerSection,

    /// Tree walker settings.
    #[serde(default)]
    pub walker: WalkerSection,

    /// Configured checks, in file order.
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,

    /// Filters applied to violations after the walk.
    #[serde(default, rename = "filter")]
    pub filters: Vec<ModuleEntry>,

    /// Filters deciding which files are processed at all.
    #[serde(default, rename = "file_filter")]
    pub file_filters: Vec<ModuleEntry>,
}

impl Config {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Converts the file into its module tree.
    #[must_use]
    pub fn module_tree(&self) -> ModuleConfig {
        let mut walker = ModuleConfig::new(WALKER_MODULE);
        if let Some(tab_width) = self.walker.tab_width {
            walker = walker.with_property("tab_width", tab_width.to_string());
        }
        if self.walker.skip_on_parse_error {
            walker = walker.with_property("skip_on_parse_error", "true");
        }
        if let Some(severity) = self.walker.parse_error_severity {
            walker = walker.with_property("parse_error_severity", severity.to_string());
        }
        for entry in self.modules.iter().chain(&self.filters) {
            walker = walker.with_child(entry.to_module_config());
        }

        let mut checker = ModuleConfig::new(CHECKER_MODULE);
        let section = &self.checker;
        if let Some(threads) = section.threads {
            checker = checker.with_property("threads", threads.to_string());
        }
        if let Some(severity) = section.severity {
            checker = checker.with_property("severity", severity.to_string());
        }
        if !section.file_extensions.is_empty() {
            checker = checker.with_property("file_extensions", section.file_extensions.join(","));
        }
        if let Some(halt) = section.halt_on_exception {
            checker = checker.with_property("halt_on_exception", halt.to_string());
        }
        for entry in &self.file_filters {
            checker = checker.with_child(entry.to_module_config());
        }
        checker.with_child(walker)
    }
}

/// `[checker]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckerSection {
    /// Worker threads (default 1).
    #[serde(default)]
    pub threads: Option<usize>,

    /// Severity at or above which violations count toward the exit status.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// File extensions to process; empty means every file.
    #[serde(default)]
    pub file_extensions: Vec<String>,

    /// Location of the result cache.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    /// Stop the run when a check fails on a file (default true).
    #[serde(default)]
    pub halt_on_exception: Option<bool>,

    /// Glob patterns excluded from discovery.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[walker]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkerSection {
    /// Tab width used to compute violation columns (default 8).
    #[serde(default)]
    pub tab_width: Option<usize>,

    /// Turn parse failures into a single violation instead of an error.
    #[serde(default)]
    pub skip_on_parse_error: bool,

    /// Severity of the violation reported for a parse failure.
    #[serde(default)]
    pub parse_error_severity: Option<Severity>,
}

/// One `[[module]]`, `[[filter]]` or `[[file_filter]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Module name as registered.
    pub name: String,

    /// Remaining keys are module properties.
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}

impl ModuleEntry {
    /// Creates an entry without options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    /// Converts the entry into a module configuration node.
    #[must_use]
    pub fn to_module_config(&self) -> ModuleConfig {
        let mut config = ModuleConfig::new(&self.name);
        for (key, value) in &self.options {
            config = config.with_property(key, property_text(value));
        }
        config
    }
}

/// Renders a TOML value as a property string. Arrays become comma-joined
/// lists; numbers and booleans their text form.
#[must_use]
pub fn property_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items.iter().map(property_text).collect::<Vec<_>>().join(","),
        toml::Value::Table(table) => table
            .iter()
            .map(|(k, v)| format!("{k}={}", property_text(v)))
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// A named module with string properties and child modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module name.
    pub name: String,
    /// Properties, sorted by key.
    pub properties: BTreeMap<String, String>,
    /// Child modules in configuration order.
    pub children: Vec<ModuleConfig>,
}

impl ModuleConfig {
    /// Creates a module without properties.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Adds a child module.
    #[must_use]
    pub fn with_child(mut self, child: ModuleConfig) -> Self {
        self.children.push(child);
        self
    }

    /// Returns a property value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns the first child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ModuleConfig> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Stable SHA-256 hex digest of the whole tree.
    #[must_use]
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, module)) = stack.pop() {
            hasher.update(depth.to_le_bytes());
            hasher.update(module.name.as_bytes());
            hasher.update([0]);
            for (key, value) in &module.properties {
                hasher.update(key.as_bytes());
                hasher.update([1]);
                hasher.update(value.as_bytes());
                hasher.update([0]);
            }
            stack.extend(module.children.iter().rev().map(|c| (depth + 1, c)));
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Typed access to a module's properties while it configures itself.
///
/// Every key read is marked as used; [`PropertyReader::finish`] rejects the
/// ones nobody read.
#[derive(Debug)]
pub struct PropertyReader<'a> {
    module: &'a str,
    properties: &'a BTreeMap<String, String>,
    used: BTreeSet<&'a str>,
}

impl<'a> PropertyReader<'a> {
    /// Wraps the properties of `config`.
    #[must_use]
    pub fn new(config: &'a ModuleConfig) -> Self {
        Self {
            module: &config.name,
            properties: &config.properties,
            used: BTreeSet::new(),
        }
    }

    /// Name of the module being configured.
    #[must_use]
    pub fn module(&self) -> &'a str {
        self.module
    }

    /// Raw string value.
    pub fn get_str(&mut self, key: &str) -> Option<&'a str> {
        let (stored, value) = self.properties.get_key_value(key)?;
        self.used.insert(stored.as_str());
        Some(value.as_str())
    }

    fn invalid(&self, key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidProperty {
            module: self.module.to_string(),
            property: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Value parsed with [`FromStr`](std::str::FromStr).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProperty`] if the value does not parse.
    pub fn get_parsed<T>(&mut self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.get_str(key) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| self.invalid(key, value, e.to_string()))
    }

    /// Non-negative integer value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProperty`] if the value is not a number.
    pub fn get_usize(&mut self, key: &str) -> Result<Option<usize>, ConfigError> {
        self.get_parsed(key)
    }

    /// Boolean value (`true` or `false`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProperty`] for anything else.
    pub fn get_bool(&mut self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get_parsed(key)
    }

    /// Severity value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProperty`] for an unknown level.
    pub fn get_severity(&mut self, key: &str) -> Result<Option<Severity>, ConfigError> {
        self.get_parsed(key)
    }

    /// Regular expression value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProperty`] if the pattern does not compile.
    pub fn get_regex(&mut self, key: &str) -> Result<Option<Regex>, ConfigError> {
        let Some(value) = self.get_str(key) else {
            return Ok(None);
        };
        Regex::new(value)
            .map(Some)
            .map_err(|e| self.invalid(key, value, e.to_string()))
    }

    /// Comma separated list of node kind names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKind`] for a name that is not a kind.
    pub fn get_kinds(&mut self, key: &str) -> Result<Option<Vec<NodeKind>>, ConfigError> {
        let Some(value) = self.get_str(key) else {
            return Ok(None);
        };
        NodeKind::parse_list(value)
            .map(Some)
            .map_err(|kind| ConfigError::UnknownKind {
                module: self.module.to_string(),
                kind,
            })
    }

    /// Comma separated list of strings, trimmed, empty items dropped.
    pub fn get_list(&mut self, key: &str) -> Option<Vec<String>> {
        self.get_str(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }

    /// Takes every property whose key starts with `prefix`, keyed by the rest.
    pub fn take_prefixed(&mut self, prefix: &str) -> BTreeMap<String, String> {
        let mut taken = BTreeMap::new();
        for (key, value) in self.properties {
            if let Some(rest) = key.strip_prefix(prefix) {
                self.used.insert(key.as_str());
                taken.insert(rest.to_string(), value.clone());
            }
        }
        taken
    }

    /// Fails if a property was never read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProperty`] naming the first unread key.
    pub fn finish(self) -> Result<(), ConfigError> {
        match self.properties.keys().find(|k| !self.used.contains(k.as_str())) {
            Some(key) => Err(ConfigError::UnknownProperty {
                module: self.module.to_string(),
                property: key.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Configuration errors. All of them are fatal before any file is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// No module is registered under this name.
    #[error("Unknown module `{name}`")]
    UnknownModule {
        /// Requested name.
        name: String,
    },

    /// A module was given a property it does not have.
    #[error("Property `{property}` does not exist in module `{module}`")]
    UnknownProperty {
        /// Module name.
        module: String,
        /// Offending property.
        property: String,
    },

    /// A property value could not be converted.
    #[error("Cannot set property `{property}` of `{module}` to `{value}`: {reason}")]
    InvalidProperty {
        /// Module name.
        module: String,
        /// Property name.
        property: String,
        /// Raw value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A kind name that is not part of the vocabulary.
    #[error("Unknown node kind `{kind}` in module `{module}`")]
    UnknownKind {
        /// Module name.
        module: String,
        /// Offending name.
        kind: String,
    },

    /// A kind outside the check's acceptable set.
    #[error("Node kind `{kind}` is not acceptable for check `{module}`")]
    UnacceptableKind {
        /// Check name.
        module: String,
        /// Offending kind.
        kind: NodeKind,
    },

    /// A preset name that does not exist.
    #[error("Unknown preset `{name}`")]
    UnknownPreset {
        /// Requested preset.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[checker]
threads = 4
severity = "warning"
file_extensions = ["java"]
cache_file = ".treewalk-cache.json"

[walker]
tab_width = 4
skip_on_parse_error = true

[[module]]
name = "MethodCount"
max_total = 10

[[module]]
name = "IllegalToken"
tokens = ["LITERAL_NATIVE", "LITERAL_VOLATILE"]

[[filter]]
name = "SuppressWithNearbyComment"
"#;

    #[test]
    fn parses_sections_and_modules() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.checker.threads, Some(4));
        assert_eq!(config.checker.severity, Some(Severity::Warning));
        assert_eq!(config.walker.tab_width, Some(4));
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.filters[0].name, "SuppressWithNearbyComment");
    }

    #[test]
    fn module_tree_uses_string_properties() {
        let tree = Config::parse(SAMPLE).unwrap().module_tree();
        assert_eq!(tree.name, CHECKER_MODULE);
        assert_eq!(tree.property("threads"), Some("4"));
        let walker = tree.child(WALKER_MODULE).unwrap();
        assert_eq!(walker.property("skip_on_parse_error"), Some("true"));
        assert_eq!(walker.children.len(), 3);
        assert_eq!(walker.children[0].property("max_total"), Some("10"));
        assert_eq!(
            walker.children[1].property("tokens"),
            Some("LITERAL_NATIVE,LITERAL_VOLATILE")
        );
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        assert!(matches!(
            Config::parse("[checker]\nthreadz = 2\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn hash_is_stable_and_sensitive() {
        let a = Config::parse(SAMPLE).unwrap().module_tree();
        let b = Config::parse(SAMPLE).unwrap().module_tree();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);

        let changed = Config::parse(&SAMPLE.replace("max_total = 10", "max_total = 11"))
            .unwrap()
            .module_tree();
        assert_ne!(a.hash(), changed.hash());
    }

    #[test]
    fn hash_distinguishes_nesting() {
        let flat = ModuleConfig::new("A").with_child(ModuleConfig::new("B")).with_child(ModuleConfig::new("C"));
        let nested = ModuleConfig::new("A").with_child(ModuleConfig::new("B").with_child(ModuleConfig::new("C")));
        assert_ne!(flat.hash(), nested.hash());
    }

    // --- property reader ---

    #[test]
    fn reader_parses_typed_values() {
        let config = ModuleConfig::new("X")
            .with_property("max", "7")
            .with_property("flag", "true")
            .with_property("tokens", "METHOD_DEF, CTOR_DEF")
            .with_property("message.a.b", "custom");
        let mut reader = PropertyReader::new(&config);
        assert_eq!(reader.get_usize("max").unwrap(), Some(7));
        assert_eq!(reader.get_bool("flag").unwrap(), Some(true));
        assert_eq!(
            reader.get_kinds("tokens").unwrap(),
            Some(vec![NodeKind::MethodDef, NodeKind::CtorDef])
        );
        let messages = reader.take_prefixed("message.");
        assert_eq!(messages.get("a.b").map(String::as_str), Some("custom"));
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn reader_reports_unread_properties() {
        let config = ModuleConfig::new("X").with_property("max", "7").with_property("typo", "1");
        let mut reader = PropertyReader::new(&config);
        let _ = reader.get_usize("max");
        match reader.finish() {
            Err(ConfigError::UnknownProperty { module, property }) => {
                assert_eq!(module, "X");
                assert_eq!(property, "typo");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn reader_rejects_bad_values() {
        let config = ModuleConfig::new("X")
            .with_property("max", "seven")
            .with_property("tokens", "NOT_A_KIND")
            .with_property("format", "(");
        let mut reader = PropertyReader::new(&config);
        assert!(matches!(reader.get_usize("max"), Err(ConfigError::InvalidProperty { .. })));
        assert!(matches!(reader.get_kinds("tokens"), Err(ConfigError::UnknownKind { .. })));
        assert!(matches!(reader.get_regex("format"), Err(ConfigError::InvalidProperty { .. })));
    }
}
