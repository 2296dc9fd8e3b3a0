use super::{AuditEvent, Filter};
use crate::config::{ConfigError, PropertyReader};
use crate::types::Severity;

/// Keeps (or drops, with `accept_on_match = false`) violations of one
/// severity.
#[derive(Debug, Clone)]
pub struct SeverityMatch {
    severity: Severity,
    accept_on_match: bool,
}

impl Default for SeverityMatch {
    fn default() -> Self {
        Self {
            severity: Severity::Error,
            accept_on_match: true,
        }
    }
}

impl SeverityMatch {
    /// Creates the filter with its defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for SeverityMatch {
    fn name(&self) -> &'static str {
        "SeverityMatch"
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(severity) = props.get_severity("severity")? {
            self.severity = severity;
        }
        if let Some(accept) = props.get_bool("accept_on_match")? {
            self.accept_on_match = accept;
        }
        Ok(())
    }

    fn accept(&self, event: &AuditEvent<'_>) -> bool {
        (event.violation.severity == self.severity) == self.accept_on_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::contents::FileContents;
    use crate::filter::configure_filter;
    use crate::types::Violation;
    use std::path::Path;

    fn accepts(filter: &SeverityMatch, severity: Severity) -> bool {
        let contents = FileContents::new("A.java", "");
        let violation = Violation::new(1, 1, severity, "k", vec![], None, "C");
        filter.accept(&AuditEvent {
            path: Path::new("A.java"),
            violation: &violation,
            contents: &contents,
            tree: None,
        })
    }

    #[test]
    fn accepts_matching_severity_by_default() {
        let filter = SeverityMatch::new();
        assert!(accepts(&filter, Severity::Error));
        assert!(!accepts(&filter, Severity::Warning));
    }

    #[test]
    fn inverted_match_drops_severity() {
        let mut filter = SeverityMatch::new();
        let config = ModuleConfig::new("SeverityMatch")
            .with_property("severity", "info")
            .with_property("accept_on_match", "false");
        configure_filter(&mut filter, &config).unwrap();
        assert!(!accepts(&filter, Severity::Info));
        assert!(accepts(&filter, Severity::Error));
    }
}
