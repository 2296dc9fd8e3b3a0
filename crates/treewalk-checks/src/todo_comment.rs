//! Check for to-do markers in comments.
//!
//! # Configuration
//!
//! - `format`: regex searched in each comment line (default: `TODO:`)
//! - `tokens`: `COMMENT_CONTENT` (default), `JAVADOC_CONTENT`

use regex::Regex;
use treewalk_core::{Check, CheckContext, CheckError, CheckMeta, ConfigError, NodeKind, NodeRef, PropertyReader};

/// Module name.
pub const NAME: &str = "TodoComment";

/// Key reported for a matching comment line.
pub const MSG_KEY: &str = "todo.match";

const MESSAGES: &[(&str, &str)] = &[(MSG_KEY, "Comment matches to-do format '{0}'.")];

const DEFAULT_FORMAT: &str = "TODO:";

/// Reports comment lines matching a pattern.
#[derive(Debug, Clone, Default, CheckMeta)]
#[check(name = "TodoComment", mutability = "stateless")]
pub struct TodoComment {
    /// `None` matches the literal `TODO:`.
    format: Option<Regex>,
}

impl TodoComment {
    /// Creates a new check matching `TODO:`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pattern.
    #[must_use]
    pub fn format(mut self, format: Regex) -> Self {
        self.format = Some(format);
        self
    }

    fn pattern(&self) -> &str {
        self.format.as_ref().map_or(DEFAULT_FORMAT, Regex::as_str)
    }

    fn matches(&self, line: &str) -> bool {
        match &self.format {
            Some(format) => format.is_match(line),
            None => line.contains(DEFAULT_FORMAT),
        }
    }
}

impl Check for TodoComment {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::CommentContent]
    }

    fn acceptable_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::CommentContent, NodeKind::JavadocContent]
    }

    fn requires_comments(&self) -> bool {
        true
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(format) = props.get_regex("format")? {
            self.format = Some(format);
        }
        Ok(())
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        for (offset, line) in node.text().split('\n').enumerate() {
            if self.matches(line) {
                ctx.log_line(node.line() + offset, MSG_KEY, &[&self.pattern()]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{check_code, config_error};
    use treewalk_core::ModuleConfig;

    const SOURCE: &str = "\
class A {
  // TODO: split this
  int x;
  /* first
     TODO: second
     done */
  /** TODO: in docs */
  void m() { } // todo: lower case
}
";

    #[test]
    fn test_reports_each_matching_line() {
        let violations = check_code(ModuleConfig::new(NAME), SOURCE);
        let lines: Vec<usize> = violations.iter().map(|v| v.line).collect();
        assert_eq!(lines, vec![2, 5]);
        assert_eq!(violations[0].column, 0);
        assert_eq!(violations[0].message, "Comment matches to-do format 'TODO:'.");
    }

    #[test]
    fn test_custom_format_and_javadoc() {
        let config = ModuleConfig::new(NAME)
            .with_property("format", "(?i)todo:")
            .with_property("tokens", "COMMENT_CONTENT, JAVADOC_CONTENT");
        let lines: Vec<usize> = check_code(config, SOURCE).iter().map(|v| v.line).collect();
        assert_eq!(lines, vec![2, 5, 7, 8]);
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let err = config_error(ModuleConfig::new(NAME).with_property("format", "(unclosed"));
        assert!(err.to_string().contains("format"));
    }
}
