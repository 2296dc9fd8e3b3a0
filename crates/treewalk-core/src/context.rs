//! Per-file context handed to check hooks.

use crate::config::{ConfigError, PropertyReader};
use crate::contents::FileContents;
use crate::kind::NodeKind;
use crate::tree::NodeRef;
use crate::types::{Severity, Violation};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

/// Properties every check accepts, read before the check's own ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSettings {
    /// Kind-set override from the `tokens` property.
    pub kinds: Option<Vec<NodeKind>>,
    /// Severity of reported violations (`severity`, default error).
    pub severity: Severity,
    /// User-assigned module id (`id`).
    pub id: Option<String>,
    /// Custom message templates keyed by message key (`message.<key>`).
    pub messages: BTreeMap<String, String>,
}

impl CheckSettings {
    /// Reads the common properties.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown kind name or severity.
    pub fn read(reader: &mut PropertyReader<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            kinds: reader.get_kinds("tokens")?,
            severity: reader.get_severity("severity")?.unwrap_or_default(),
            id: reader.get_str("id").map(String::from),
            messages: reader.take_prefixed("message."),
        })
    }
}

/// What a check sees of the file being walked.
///
/// Violations logged here are collected by the walker for this check only.
pub struct CheckContext<'a> {
    contents: &'a FileContents,
    tab_width: usize,
    check: &'a str,
    settings: &'a CheckSettings,
    templates: &'static [(&'static str, &'static str)],
    sink: &'a mut Vec<Violation>,
}

impl<'a> CheckContext<'a> {
    /// Creates a context for one check.
    #[must_use]
    pub fn new(
        contents: &'a FileContents,
        tab_width: usize,
        check: &'a str,
        settings: &'a CheckSettings,
        templates: &'static [(&'static str, &'static str)],
        sink: &'a mut Vec<Violation>,
    ) -> Self {
        Self {
            contents,
            tab_width,
            check,
            settings,
            templates,
            sink,
        }
    }

    /// Path of the file being walked.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.contents.path()
    }

    /// Text of the file being walked.
    #[must_use]
    pub fn contents(&self) -> &FileContents {
        self.contents
    }

    /// Tab width used for columns.
    #[must_use]
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Logs a violation at a node.
    pub fn log(&mut self, node: NodeRef<'_>, key: &str, args: &[&dyn Display]) {
        self.log_at(node.line(), node.column(), key, args);
    }

    /// Logs a violation at a 1-based line and 0-based character column.
    pub fn log_at(&mut self, line: usize, column: usize, key: &str, args: &[&dyn Display]) {
        let column = self.contents.expanded_column(line, column, self.tab_width) + 1;
        self.push(line, column, key, None, args);
    }

    /// Logs a violation at a node with a template chosen by the check.
    ///
    /// A `message.<key>` property still takes precedence over `template`.
    pub fn log_with_template(&mut self, node: NodeRef<'_>, key: &str, template: &str, args: &[&dyn Display]) {
        let column = self.contents.expanded_column(node.line(), node.column(), self.tab_width) + 1;
        self.push(node.line(), column, key, Some(template), args);
    }

    /// Logs a violation for a whole line (column 0).
    pub fn log_line(&mut self, line: usize, key: &str, args: &[&dyn Display]) {
        self.push(line, 0, key, None, args);
    }

    fn push(&mut self, line: usize, column: usize, key: &str, template: Option<&str>, args: &[&dyn Display]) {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let template = self
            .settings
            .messages
            .get(key)
            .map(String::as_str)
            .or(template)
            .or_else(|| self.templates.iter().find(|(k, _)| *k == key).map(|(_, t)| *t));
        let violation = Violation::new(line, column, self.settings.severity, key, args, template, self.check)
            .with_module_id(self.settings.id.clone());
        self.sink.push(violation);
    }
}

impl std::fmt::Debug for CheckContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckContext")
            .field("path", &self.contents.path())
            .field("check", &self.check)
            .field("logged", &self.sink.len())
            .finish_non_exhaustive()
    }
}
