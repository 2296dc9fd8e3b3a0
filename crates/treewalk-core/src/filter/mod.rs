//! Filters applied to violations after a walk, and to files before one.

mod exclude_files;
mod severity_match;
mod suppress_nearby;

pub use exclude_files::ExcludeFiles;
pub use severity_match::SeverityMatch;
pub use suppress_nearby::SuppressWithNearbyComment;

use crate::check::CheckError;
use crate::config::{ConfigError, ModuleConfig, PropertyReader};
use crate::contents::FileContents;
use crate::tree::SyntaxTree;
use crate::types::Violation;
use std::path::Path;

/// One violation offered to the walker filters.
#[derive(Debug, Clone, Copy)]
pub struct AuditEvent<'a> {
    /// Path of the file.
    pub path: &'a Path,
    /// The violation under review.
    pub violation: &'a Violation,
    /// Text of the file.
    pub contents: &'a FileContents,
    /// Plain tree of the file, absent when the file did not parse.
    pub tree: Option<&'a SyntaxTree>,
}

/// A filter run by the walker over each file's violations.
#[allow(unused_variables)]
pub trait Filter: Send {
    /// Registered module name.
    fn name(&self) -> &'static str;

    /// Reads filter properties.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed values.
    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Called once per file before any of its violations is offered.
    ///
    /// # Errors
    ///
    /// An error aborts the processing of the file.
    fn file_started(&mut self, contents: &FileContents, tree: Option<&SyntaxTree>) -> Result<(), CheckError> {
        Ok(())
    }

    /// Returns false to drop the violation.
    fn accept(&self, event: &AuditEvent<'_>) -> bool;

    /// Files the filter reads, hashed into the result cache.
    fn external_resource_locations(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Type alias for boxed Filter trait objects.
pub type FilterBox = Box<dyn Filter>;

/// A filter deciding which files are processed at all.
#[allow(unused_variables)]
pub trait FileFilter: Send + Sync {
    /// Registered module name.
    fn name(&self) -> &'static str;

    /// Reads filter properties.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed values.
    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Returns false to skip the file.
    fn accept(&self, path: &Path) -> bool;
}

/// Type alias for boxed FileFilter trait objects.
pub type FileFilterBox = Box<dyn FileFilter>;

/// Applies a module configuration to a walker filter.
///
/// # Errors
///
/// Returns the first configuration problem, unread properties included.
pub fn configure_filter(filter: &mut dyn Filter, config: &ModuleConfig) -> Result<(), ConfigError> {
    let mut reader = PropertyReader::new(config);
    filter.configure(&mut reader)?;
    reader.finish()
}

/// Applies a module configuration to a file filter.
///
/// # Errors
///
/// Returns the first configuration problem, unread properties included.
pub fn configure_file_filter(filter: &mut dyn FileFilter, config: &ModuleConfig) -> Result<(), ConfigError> {
    let mut reader = PropertyReader::new(config);
    filter.configure(&mut reader)?;
    reader.finish()
}
