use super::{AuditEvent, Filter};
use crate::check::CheckError;
use crate::config::{ConfigError, PropertyReader};
use crate::contents::FileContents;
use crate::kind::NodeKind;
use crate::tree::SyntaxTree;
use regex::Regex;
use std::sync::LazyLock;

const NAME: &str = "SuppressWithNearbyComment";

/// Suppresses violations on lines near a comment matching `comment_format`.
///
/// `check_format`, `message_format`, `id_format` and `influence_format` may
/// refer to groups of the comment match as `$1`, `$2`, ... The influence is a
/// line count: positive extends the suppression below the comment, negative
/// above it.
#[derive(Debug, Clone)]
pub struct SuppressWithNearbyComment {
    comment_format: Regex,
    check_format: String,
    message_format: Option<String>,
    id_format: Option<String>,
    influence_format: String,
    check_c: bool,
    check_cpp: bool,
    tags: Vec<Tag>,
}

#[derive(Debug, Clone)]
struct Tag {
    first_line: i64,
    last_line: i64,
    check: Regex,
    message: Option<Regex>,
    id: Option<Regex>,
}

impl Default for SuppressWithNearbyComment {
    fn default() -> Self {
        Self {
            comment_format: DEFAULT_COMMENT_FORMAT.clone(),
            check_format: ".*".to_string(),
            message_format: None,
            id_format: None,
            influence_format: "0".to_string(),
            check_c: true,
            check_cpp: true,
            tags: Vec::new(),
        }
    }
}

#[allow(clippy::unwrap_used)]
static DEFAULT_COMMENT_FORMAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SUPPRESS CHECKSTYLE (\w+)").unwrap());

impl SuppressWithNearbyComment {
    /// Creates the filter with its defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitutes `$n` in `template` with group `n` of the comment match.
    fn expand(&self, template: &str, text: &str) -> String {
        let mut result = template.to_string();
        if let Some(caps) = self.comment_format.captures(text) {
            for i in (0..caps.len()).rev() {
                let group = caps.get(i).map_or("", |m| m.as_str());
                result = result.replace(&format!("${i}"), group);
            }
        }
        result
    }

    fn compile(&self, template: &str, text: &str) -> Result<Regex, CheckError> {
        let expanded = self.expand(template, text);
        Regex::new(&expanded).map_err(|e| CheckError::new(NAME, format!("unable to parse expanded comment {expanded}: {e}")))
    }

    fn tag(&self, text: &str, line: usize) -> Result<Tag, CheckError> {
        let check = self.compile(&self.check_format, text)?;
        let message = self.message_format.as_deref().map(|f| self.compile(f, text)).transpose()?;
        let id = self.id_format.as_deref().map(|f| self.compile(f, text)).transpose()?;
        let influence_text = self.expand(&self.influence_format, text);
        let influence: i64 = influence_text.trim().parse().map_err(|_| {
            CheckError::new(
                NAME,
                format!("unable to parse influence from '{text}' using {}", self.influence_format),
            )
        })?;
        let line = i64::try_from(line).unwrap_or(i64::MAX);
        let (first_line, last_line) = if influence >= 1 {
            (line, line + influence)
        } else {
            (line + influence, line)
        };
        Ok(Tag {
            first_line,
            last_line,
            check,
            message,
            id,
        })
    }
}

impl Tag {
    fn matches(&self, event: &AuditEvent<'_>) -> bool {
        let violation = event.violation;
        let line = i64::try_from(violation.line).unwrap_or(i64::MAX);
        if line < self.first_line || line > self.last_line || !self.check.is_match(&violation.check) {
            return false;
        }
        let id_matches = match (&self.id, &violation.module_id) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(re), Some(id)) => re.is_match(id),
        };
        id_matches && self.message.as_ref().map_or(true, |re| re.is_match(&violation.message))
    }
}

impl Filter for SuppressWithNearbyComment {
    fn name(&self) -> &'static str {
        NAME
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(format) = props.get_regex("comment_format")? {
            self.comment_format = format;
        }
        if let Some(format) = props.get_str("check_format") {
            self.check_format = format.to_string();
        }
        self.message_format = props.get_str("message_format").map(String::from);
        self.id_format = props.get_str("id_format").map(String::from);
        if let Some(format) = props.get_str("influence_format") {
            self.influence_format = format.to_string();
        }
        if let Some(check_c) = props.get_bool("check_c")? {
            self.check_c = check_c;
        }
        if let Some(check_cpp) = props.get_bool("check_cpp")? {
            self.check_cpp = check_cpp;
        }
        Ok(())
    }

    fn file_started(&mut self, _contents: &FileContents, tree: Option<&SyntaxTree>) -> Result<(), CheckError> {
        self.tags.clear();
        let Some(tree) = tree else {
            return Ok(());
        };
        let mut tags = Vec::new();
        for token in tree.hidden_tokens() {
            let wanted = match token.kind {
                NodeKind::SingleLineComment => self.check_cpp,
                _ => self.check_c,
            };
            if !wanted {
                continue;
            }
            for (offset, text) in token.text.lines().enumerate() {
                if let Some(found) = self.comment_format.find(text) {
                    tags.push(self.tag(found.as_str(), token.line + offset)?);
                }
            }
        }
        self.tags = tags;
        Ok(())
    }

    fn accept(&self, event: &AuditEvent<'_>) -> bool {
        !self.tags.iter().any(|tag| tag.matches(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_tree;
    use crate::config::ModuleConfig;
    use crate::filter::configure_filter;
    use crate::grammar::{JavaSubsetParser, ParserAdapter};
    use crate::types::{Severity, Violation};
    use std::path::Path;

    const SOURCE: &str = "class A {\n  int a; // SUPPRESS CHECKSTYLE MemberName\n  int b;\n  /* SUPPRESS CHECKSTYLE Magic */ int c;\n}\n";

    fn filter_with(props: &[(&str, &str)]) -> (SuppressWithNearbyComment, SyntaxTree, FileContents) {
        let mut config = ModuleConfig::new(NAME);
        for (k, v) in props {
            config = config.with_property(*k, *v);
        }
        let mut filter = SuppressWithNearbyComment::new();
        configure_filter(&mut filter, &config).unwrap();
        let tree = build_tree(&JavaSubsetParser.parse(SOURCE).unwrap());
        let contents = FileContents::new("A.java", SOURCE);
        filter.file_started(&contents, Some(&tree)).unwrap();
        (filter, tree, contents)
    }

    fn accepted(filter: &SuppressWithNearbyComment, tree: &SyntaxTree, contents: &FileContents, v: &Violation) -> bool {
        filter.accept(&AuditEvent {
            path: Path::new("A.java"),
            violation: v,
            contents,
            tree: Some(tree),
        })
    }

    fn make_violation(line: usize, check: &str) -> Violation {
        Violation::new(line, 3, Severity::Error, "k", vec![], None, check)
    }

    #[test]
    fn suppresses_on_the_comment_line_only_by_default() {
        let (filter, tree, contents) = filter_with(&[]);
        assert!(!accepted(&filter, &tree, &contents, &make_violation(2, "MemberName")));
        assert!(accepted(&filter, &tree, &contents, &make_violation(3, "MemberName")));
        assert!(!accepted(&filter, &tree, &contents, &make_violation(4, "Magic")));
    }

    #[test]
    fn check_format_uses_comment_groups() {
        let (filter, tree, contents) = filter_with(&[("check_format", "$1")]);
        assert!(!accepted(&filter, &tree, &contents, &make_violation(2, "MemberName")));
        assert!(accepted(&filter, &tree, &contents, &make_violation(2, "MethodLength")));
    }

    #[test]
    fn influence_extends_below() {
        let (filter, tree, contents) = filter_with(&[("influence_format", "1")]);
        assert!(!accepted(&filter, &tree, &contents, &make_violation(3, "Any")));
    }

    #[test]
    fn block_comments_can_be_ignored() {
        let (filter, tree, contents) = filter_with(&[("check_c", "false")]);
        assert!(accepted(&filter, &tree, &contents, &make_violation(4, "Magic")));
        assert!(!accepted(&filter, &tree, &contents, &make_violation(2, "MemberName")));
    }

    #[test]
    fn id_format_requires_module_id() {
        let (filter, tree, contents) = filter_with(&[("id_format", "ignore")]);
        let without_id = make_violation(2, "MemberName");
        let with_id = make_violation(2, "MemberName").with_module_id(Some("ignore".into()));
        assert!(accepted(&filter, &tree, &contents, &without_id));
        assert!(!accepted(&filter, &tree, &contents, &with_id));
    }

    #[test]
    fn bad_influence_fails_the_file() {
        let config = ModuleConfig::new(NAME).with_property("influence_format", "x");
        let mut filter = SuppressWithNearbyComment::new();
        configure_filter(&mut filter, &config).unwrap();
        let tree = build_tree(&JavaSubsetParser.parse(SOURCE).unwrap());
        let contents = FileContents::new("A.java", SOURCE);
        assert!(filter.file_started(&contents, Some(&tree)).is_err());
    }
}
