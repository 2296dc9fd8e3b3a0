//! Check for empty blocks.
//!
//! # Rationale
//!
//! An empty `if`, loop or initializer body is usually unfinished code or a
//! swallowed case that deserves at least a statement.
//!
//! # Configuration
//!
//! - `option`: `statement` (default) reports blocks without statements,
//!   `text` reports blocks without any text, comments included
//! - `tokens`: any of `LITERAL_WHILE`, `LITERAL_DO`, `LITERAL_IF`,
//!   `LITERAL_ELSE`, `LITERAL_FOR`, `INSTANCE_INIT`, `STATIC_INIT`,
//!   `LITERAL_SYNCHRONIZED`

use std::str::FromStr;
use treewalk_core::utils::is_blank;
use treewalk_core::{Check, CheckContext, CheckError, CheckMeta, ConfigError, NodeKind, NodeRef, PropertyReader};

/// Module name.
pub const NAME: &str = "EmptyBlock";

/// Key reported for a block without statements.
pub const MSG_BLOCK_NO_STATEMENT: &str = "block.noStatement";

/// Key reported for a block without text.
pub const MSG_BLOCK_EMPTY: &str = "block.empty";

const MESSAGES: &[(&str, &str)] = &[
    (MSG_BLOCK_NO_STATEMENT, "Must have at least one statement."),
    (MSG_BLOCK_EMPTY, "Empty {0} block."),
];

const DEFAULT_KINDS: &[NodeKind] = &[
    NodeKind::LiteralWhile,
    NodeKind::LiteralDo,
    NodeKind::LiteralIf,
    NodeKind::LiteralElse,
    NodeKind::LiteralFor,
    NodeKind::InstanceInit,
    NodeKind::StaticInit,
];

/// What counts as an empty block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockOption {
    /// No statement between the braces.
    #[default]
    Statement,
    /// Nothing but whitespace between the braces.
    Text,
}

impl FromStr for BlockOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "statement" => Ok(Self::Statement),
            "text" => Ok(Self::Text),
            other => Err(format!("expected `statement` or `text`, got `{other}`")),
        }
    }
}

/// Reports empty blocks.
#[derive(Debug, Clone, Default, CheckMeta)]
#[check(name = "EmptyBlock", mutability = "stateless")]
pub struct EmptyBlock {
    option: BlockOption,
}

impl EmptyBlock {
    /// Creates a new check with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what counts as empty.
    #[must_use]
    pub fn option(mut self, option: BlockOption) -> Self {
        self.option = option;
        self
    }
}

impl Check for EmptyBlock {
    fn default_kinds(&self) -> Vec<NodeKind> {
        DEFAULT_KINDS.to_vec()
    }

    fn acceptable_kinds(&self) -> Vec<NodeKind> {
        let mut kinds = DEFAULT_KINDS.to_vec();
        kinds.push(NodeKind::LiteralSynchronized);
        kinds
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(option) = props.get_parsed("option")? {
            self.option = option;
        }
        Ok(())
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        let Some(slist) = node.find_first_child(NodeKind::Slist) else {
            return Ok(());
        };
        match self.option {
            BlockOption::Statement => {
                if slist.child_count() <= 1 {
                    ctx.log(slist, MSG_BLOCK_NO_STATEMENT, &[]);
                }
            }
            BlockOption::Text => {
                if !has_text(ctx, slist) {
                    ctx.log(slist, MSG_BLOCK_EMPTY, &[&node.text()]);
                }
            }
        }
        Ok(())
    }
}

/// Returns true if anything but whitespace sits between the braces of `slist`.
fn has_text(ctx: &CheckContext<'_>, slist: NodeRef<'_>) -> bool {
    let Some(rcurly) = slist
        .find_first_child(NodeKind::RCurly)
        .or_else(|| slist.parent().and_then(|p| p.find_first_child(NodeKind::RCurly)))
    else {
        return true;
    };
    let contents = ctx.contents();
    let line_text = |line: usize| contents.line(line).unwrap_or_default();
    let after = |text: &str, column: usize| text.chars().skip(column + 1).collect::<String>();
    let before = |text: &str, column: usize| text.chars().take(column).collect::<String>();

    let (open_line, open_col) = (slist.line(), slist.column());
    let (close_line, close_col) = (rcurly.line(), rcurly.column());
    if open_line == close_line {
        let text: String = line_text(open_line)
            .chars()
            .skip(open_col + 1)
            .take(close_col.saturating_sub(open_col + 1))
            .collect();
        return !is_blank(&text);
    }
    let first = after(line_text(open_line), open_col);
    let last = before(line_text(close_line), close_col);
    !(is_blank(&first) && is_blank(&last)) || ((open_line + 1)..close_line).any(|l| !contents.is_blank_line(l))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::check_code;
    use treewalk_core::ModuleConfig;

    fn config(option: &str) -> ModuleConfig {
        ModuleConfig::new(NAME).with_property("option", option)
    }

    #[test]
    fn test_detects_block_without_statement() {
        let violations = check_code(
            ModuleConfig::new(NAME),
            "class A {\n  void m(int x) {\n    if (x > 0) {\n    }\n    while (x > 0) { x--; }\n  }\n}\n",
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].key, MSG_BLOCK_NO_STATEMENT);
        assert_eq!((violations[0].line, violations[0].column), (3, 16));
        assert_eq!(violations[0].message, "Must have at least one statement.");
    }

    #[test]
    fn test_comment_only_block_passes_text_option() {
        let source = "class A {\n  void m(int x) {\n    if (x > 0) {\n      // later\n    }\n    for (;;) { }\n  }\n}\n";
        let statement = check_code(ModuleConfig::new(NAME), source);
        assert_eq!(statement.len(), 2);

        let text = check_code(config("text"), source);
        assert_eq!(text.len(), 1);
        assert_eq!(text[0].key, MSG_BLOCK_EMPTY);
        assert_eq!(text[0].message, "Empty for block.");
        assert_eq!(text[0].line, 6);
    }

    #[test]
    fn test_initializers_and_else() {
        let violations = check_code(
            ModuleConfig::new(NAME),
            "class A {\n  static { }\n  { }\n  void m(boolean b) {\n    if (b) { m(b); } else { }\n  }\n}\n",
        );
        let lines: Vec<usize> = violations.iter().map(|v| v.line).collect();
        assert_eq!(lines, vec![2, 3, 5]);
    }

    #[test]
    fn test_tokens_limit_what_is_checked() {
        let source = "class A {\n  void m(boolean b) {\n    if (b) { }\n    while (b) { }\n  }\n}\n";
        let violations = check_code(ModuleConfig::new(NAME).with_property("tokens", "LITERAL_WHILE"), source);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 4);
    }

    #[test]
    fn test_rejects_unknown_option() {
        assert!(BlockOption::from_str("nothing").is_err());
        assert_eq!(BlockOption::from_str("TEXT"), Ok(BlockOption::Text));
    }
}
