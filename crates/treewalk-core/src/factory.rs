//! Construction of modules by name.
//!
//! The walker never names concrete check types. It asks a [`ModuleFactory`]
//! for a fresh, unconfigured instance, both at setup and whenever a worker
//! needs its own copy of a file-stateful check.

use crate::check::CheckBox;
use crate::config::ConfigError;
use crate::filter::{ExcludeFiles, FileFilterBox, FilterBox, SeverityMatch, SuppressWithNearbyComment};
use std::collections::BTreeMap;
use std::fmt;

/// What a registered name builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// A [`Check`](crate::Check).
    Check,
    /// A walker [`Filter`](crate::Filter).
    Filter,
    /// A [`FileFilter`](crate::FileFilter).
    FileFilter,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check => write!(f, "check"),
            Self::Filter => write!(f, "filter"),
            Self::FileFilter => write!(f, "file filter"),
        }
    }
}

/// Builds fresh module instances from configured names.
pub trait ModuleFactory: Send + Sync {
    /// What `name` refers to, if anything.
    fn module_kind(&self, name: &str) -> Option<ModuleKind>;

    /// Creates an unconfigured check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModule`] if no check has that name.
    fn create_check(&self, name: &str) -> Result<CheckBox, ConfigError>;

    /// Creates an unconfigured walker filter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModule`] if no filter has that name.
    fn create_filter(&self, name: &str) -> Result<FilterBox, ConfigError>;

    /// Creates an unconfigured file filter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModule`] if no file filter has that name.
    fn create_file_filter(&self, name: &str) -> Result<FileFilterBox, ConfigError>;
}

type CheckCtor = fn() -> CheckBox;
type FilterCtor = fn() -> FilterBox;
type FileFilterCtor = fn() -> FileFilterBox;

/// Name-to-constructor tables, built once at startup and read-only afterwards.
///
/// Lookups accept the registered name or the name followed by `Check`
/// (`MethodLength` and `MethodLengthCheck` are the same module).
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    checks: BTreeMap<&'static str, CheckCtor>,
    filters: BTreeMap<&'static str, FilterCtor>,
    file_filters: BTreeMap<&'static str, FileFilterCtor>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the filters shipped with the core.
    #[must_use]
    pub fn with_filters() -> Self {
        Self::new()
            .filter("SuppressWithNearbyComment", || Box::new(SuppressWithNearbyComment::new()))
            .filter("SeverityMatch", || Box::new(SeverityMatch::new()))
            .file_filter("ExcludeFiles", || Box::new(ExcludeFiles::new()))
    }

    /// Registers a check constructor.
    #[must_use]
    pub fn check(mut self, name: &'static str, ctor: CheckCtor) -> Self {
        self.checks.insert(name, ctor);
        self
    }

    /// Registers a walker filter constructor.
    #[must_use]
    pub fn filter(mut self, name: &'static str, ctor: FilterCtor) -> Self {
        self.filters.insert(name, ctor);
        self
    }

    /// Registers a file filter constructor.
    #[must_use]
    pub fn file_filter(mut self, name: &'static str, ctor: FileFilterCtor) -> Self {
        self.file_filters.insert(name, ctor);
        self
    }

    /// Registered names with their kind, sorted by name within each kind.
    #[must_use]
    pub fn names(&self) -> Vec<(&'static str, ModuleKind)> {
        self.checks
            .keys()
            .map(|n| (*n, ModuleKind::Check))
            .chain(self.filters.keys().map(|n| (*n, ModuleKind::Filter)))
            .chain(self.file_filters.keys().map(|n| (*n, ModuleKind::FileFilter)))
            .collect()
    }

    fn lookup<'a, T>(table: &'a BTreeMap<&'static str, T>, name: &str) -> Option<&'a T> {
        table
            .get(name)
            .or_else(|| name.strip_suffix("Check").and_then(|short| table.get(short)))
    }

    fn unknown(name: &str) -> ConfigError {
        ConfigError::UnknownModule { name: name.to_string() }
    }
}

impl ModuleFactory for ModuleRegistry {
    fn module_kind(&self, name: &str) -> Option<ModuleKind> {
        if Self::lookup(&self.checks, name).is_some() {
            Some(ModuleKind::Check)
        } else if Self::lookup(&self.filters, name).is_some() {
            Some(ModuleKind::Filter)
        } else if Self::lookup(&self.file_filters, name).is_some() {
            Some(ModuleKind::FileFilter)
        } else {
            None
        }
    }

    fn create_check(&self, name: &str) -> Result<CheckBox, ConfigError> {
        Self::lookup(&self.checks, name)
            .map(|ctor| ctor())
            .ok_or_else(|| Self::unknown(name))
    }

    fn create_filter(&self, name: &str) -> Result<FilterBox, ConfigError> {
        Self::lookup(&self.filters, name)
            .map(|ctor| ctor())
            .ok_or_else(|| Self::unknown(name))
    }

    fn create_file_filter(&self, name: &str) -> Result<FileFilterBox, ConfigError> {
        Self::lookup(&self.file_filters, name)
            .map(|ctor| ctor())
            .ok_or_else(|| Self::unknown(name))
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("checks", &self.checks.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("file_filters", &self.file_filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Check, CheckMetadata};
    use crate::kind::NodeKind;

    struct Dummy;

    impl CheckMetadata for Dummy {
        fn name(&self) -> &'static str {
            "Dummy"
        }
    }

    impl Check for Dummy {
        fn default_kinds(&self) -> Vec<NodeKind> {
            vec![NodeKind::Ident]
        }
    }

    fn registry() -> ModuleRegistry {
        ModuleRegistry::with_filters().check("Dummy", || Box::new(Dummy))
    }

    #[test]
    fn creates_by_name_and_suffixed_name() {
        let registry = registry();
        assert_eq!(registry.create_check("Dummy").unwrap().name(), "Dummy");
        assert_eq!(registry.create_check("DummyCheck").unwrap().name(), "Dummy");
        assert_eq!(registry.module_kind("SeverityMatch"), Some(ModuleKind::Filter));
        assert_eq!(registry.module_kind("ExcludeFiles"), Some(ModuleKind::FileFilter));
    }

    #[test]
    fn unknown_names_are_config_errors() {
        let registry = registry();
        assert!(matches!(
            registry.create_check("Nope"),
            Err(ConfigError::UnknownModule { name }) if name == "Nope"
        ));
        assert!(registry.create_filter("Dummy").is_err());
        assert_eq!(registry.module_kind("Nope"), None);
    }

    #[test]
    fn names_are_listed_by_kind() {
        let names = registry().names();
        assert_eq!(names[0], ("Dummy", ModuleKind::Check));
        assert!(names.contains(&("ExcludeFiles", ModuleKind::FileFilter)));
        assert_eq!(names.len(), 4);
    }
}
