//! Check for long methods and constructors.
//!
//! # Rationale
//!
//! A method that runs over a screen or two is hard to follow and usually
//! does more than one thing.
//!
//! # Configuration
//!
//! - `max`: maximum number of lines from `{` to `}` (default: 150)
//! - `count_empty`: count blank and `//`-only lines (default: true)
//! - `tokens`: `METHOD_DEF`, `CTOR_DEF`

use treewalk_core::{Check, CheckContext, CheckError, CheckMeta, ConfigError, NodeKind, NodeRef, PropertyReader};

/// Module name.
pub const NAME: &str = "MethodLength";

/// Key reported for a long method.
pub const MSG_KEY: &str = "maxLen.method";

const MESSAGES: &[(&str, &str)] = &[(MSG_KEY, "Method {2} length is {0} lines (max allowed is {1}).")];

const DEFAULT_MAX: usize = 150;

/// Limits the length of method bodies.
#[derive(Debug, Clone, CheckMeta)]
#[check(name = "MethodLength", mutability = "stateless")]
pub struct MethodLength {
    max: usize,
    count_empty: bool,
}

impl Default for MethodLength {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodLength {
    /// Creates a new check with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max: DEFAULT_MAX,
            count_empty: true,
        }
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Sets whether blank and comment-only lines count.
    #[must_use]
    pub fn count_empty(mut self, count: bool) -> Self {
        self.count_empty = count;
        self
    }
}

impl Check for MethodLength {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::MethodDef, NodeKind::CtorDef]
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(max) = props.get_usize("max")? {
            self.max = max;
        }
        if let Some(count) = props.get_bool("count_empty")? {
            self.count_empty = count;
        }
        Ok(())
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        let Some(open) = node.find_first_child(NodeKind::Slist) else {
            return Ok(());
        };
        let Some(close) = open.last_child() else {
            return Ok(());
        };
        let length = if self.count_empty {
            close.line() - open.line() + 1
        } else {
            (open.line()..=close.line())
                .filter(|line| !is_empty_line(ctx.contents().line(*line).unwrap_or_default()))
                .count()
        };
        if length > self.max {
            let name = node.find_first_child(NodeKind::Ident).map_or("", |id| id.text());
            ctx.log(node, MSG_KEY, &[&length, &self.max, &name]);
        }
        Ok(())
    }
}

fn is_empty_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{check_code, config_error};
    use treewalk_core::{ConfigError, ModuleConfig};

    const SOURCE: &str = "class A {\n  A() {\n    int x = 1;\n  }\n\n  void run() {\n    int a = 1;\n\n    // note\n    a++;\n  }\n}\n";

    #[test]
    fn test_counts_from_brace_to_brace() {
        let violations = check_code(ModuleConfig::new(NAME).with_property("max", "4"), SOURCE);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 6);
        assert_eq!(violations[0].message, "Method run length is 6 lines (max allowed is 4).");
    }

    #[test]
    fn test_skips_empty_lines_when_asked() {
        let config = ModuleConfig::new(NAME)
            .with_property("max", "4")
            .with_property("count_empty", "false");
        assert!(check_code(config, SOURCE).is_empty());
    }

    #[test]
    fn test_constructors_can_be_left_out() {
        let config = ModuleConfig::new(NAME)
            .with_property("max", "2")
            .with_property("tokens", "METHOD_DEF");
        let violations = check_code(config, SOURCE);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("run"));
    }

    #[test]
    fn test_rejects_bad_max() {
        let err = config_error(ModuleConfig::new(NAME).with_property("max", "many"));
        assert!(matches!(err, ConfigError::InvalidProperty { property, .. } if property == "max"));
    }
}
