//! Core types for violations and audit results.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Severity level for violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recorded but never reported.
    Ignore,
    /// Informational message.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown severity `{other}`. Valid values: ignore, info, warning, error"
            )),
        }
    }
}

/// Key of the engine's own message for exceptions turned into violations.
pub const GENERAL_EXCEPTION: &str = "general.exception";

/// Template of [`GENERAL_EXCEPTION`].
pub const GENERAL_EXCEPTION_TEMPLATE: &str = "Got an exception - {0}";

/// Substitutes positional `{n}` placeholders in a message template.
///
/// A placeholder without a matching argument is kept as written.
#[must_use]
pub fn format_message(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });
        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// One rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, tabs expanded).
    pub column: usize,
    /// Severity of this violation.
    pub severity: Severity,
    /// Message key (e.g. "block.empty").
    pub key: String,
    /// Formatting arguments of the message.
    pub args: Vec<String>,
    /// Resolved message text.
    pub message: String,
    /// Name of the module that reported it.
    pub check: String,
    /// User-assigned module id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

impl Violation {
    /// Creates a violation, resolving the message from `template`.
    ///
    /// Without a template the message is the key followed by the arguments.
    #[must_use]
    pub fn new(
        line: usize,
        column: usize,
        severity: Severity,
        key: impl Into<String>,
        args: Vec<String>,
        template: Option<&str>,
        check: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let message = match template {
            Some(template) => format_message(template, &args),
            None if args.is_empty() => key.clone(),
            None => format!("{key} {}", args.join(" ")),
        };
        Self {
            line,
            column,
            severity,
            key,
            args,
            message,
            check: check.into(),
            module_id: None,
        }
    }

    /// Sets the module id.
    #[must_use]
    pub fn with_module_id(mut self, module_id: Option<String>) -> Self {
        self.module_id = module_id;
        self
    }

    /// Builds the engine violation reported for a file that could not be
    /// processed.
    #[must_use]
    pub fn exception(severity: Severity, detail: impl Into<String>, check: impl Into<String>) -> Self {
        Self::new(
            1,
            0,
            severity,
            GENERAL_EXCEPTION,
            vec![detail.into()],
            Some(GENERAL_EXCEPTION_TEMPLATE),
            check,
        )
    }
}

impl Ord for Violation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.message.cmp(&other.message))
            .then_with(|| self.check.cmp(&other.check))
            .then_with(|| self.module_id.cmp(&other.module_id))
            .then_with(|| self.severity.cmp(&other.severity))
            .then_with(|| self.args.cmp(&other.args))
    }
}

impl PartialOrd for Violation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.line, self.column, self.severity, self.check, self.message
        )
    }
}

/// Ordered violations of one audited file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileReport {
    /// Path of the file.
    pub path: PathBuf,
    /// Violations in natural order.
    pub violations: Vec<Violation>,
    /// True if the file was skipped because the cache had it unchanged.
    #[serde(default)]
    pub cached: bool,
}

/// Result of one audit run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuditReport {
    /// One entry per processed or cached file, in input order.
    pub files: Vec<FileReport>,
    /// Violations at or above the configured severity threshold.
    pub threshold_count: usize,
}

impl AuditReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates every violation with the path it belongs to.
    pub fn violations(&self) -> impl Iterator<Item = (&PathBuf, &Violation)> {
        self.files
            .iter()
            .flat_map(|f| f.violations.iter().map(move |v| (&f.path, v)))
    }

    /// Number of files in the report.
    #[must_use]
    pub fn files_checked(&self) -> usize {
        self.files.len()
    }

    /// Checks if any violation meets or exceeds the given severity.
    #[must_use]
    pub fn has_violations_at(&self, severity: Severity) -> bool {
        self.violations().any(|(_, v)| v.severity >= severity)
    }

    /// Counts violations by severity as (errors, warnings, infos).
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for (_, v) in self.violations() {
            match v.severity {
                Severity::Error => counts.0 += 1,
                Severity::Warning => counts.1 += 1,
                Severity::Info => counts.2 += 1,
                Severity::Ignore => {}
            }
        }
        counts
    }

    /// Formats violations at or above `fail_on` as a multi-line report,
    /// suitable for a test failure message.
    #[must_use]
    pub fn format_test_report(&self, fail_on: Severity) -> String {
        use std::fmt::Write;

        let failing: Vec<_> = self.violations().filter(|(_, v)| v.severity >= fail_on).collect();
        let mut report = String::new();
        let _ = writeln!(report, "\n=== treewalk: {} violation(s) ===\n", failing.len());
        for (path, v) in &failing {
            let _ = writeln!(report, "{}:{}:{}: {} [{}]", path.display(), v.line, v.column, v.severity, v.check);
            let _ = writeln!(report, "  {}", v.message);
        }
        let (errors, warnings, infos) = self.count_by_severity();
        let _ = writeln!(
            report,
            "Total: {} error(s), {} warning(s), {} info(s) in {} file(s)",
            errors,
            warnings,
            infos,
            self.files_checked()
        );
        report
    }
}
