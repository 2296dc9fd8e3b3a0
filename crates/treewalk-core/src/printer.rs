//! Text dump of a syntax tree.

use crate::tree::{NodeId, SyntaxTree};
use std::fmt::Write;

/// Renders a tree one node per line as `KIND -> text [line:column]`.
///
/// Top-level siblings are printed flush left; children are indented with
/// `|--` and `` `-- `` connectors. Control characters in node text are
/// escaped so that each node stays on one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AstPrinter {
    skip_comments: bool,
}

impl AstPrinter {
    /// Creates a printer that prints every node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaves comment nodes out of the dump.
    #[must_use]
    pub fn skip_comments(mut self, skip: bool) -> Self {
        self.skip_comments = skip;
        self
    }

    /// Renders the whole tree.
    #[must_use]
    pub fn print(&self, tree: &SyntaxTree) -> String {
        let mut out = String::new();
        let Some(root) = tree.root() else {
            return out;
        };
        let top: Vec<NodeId> = self.siblings(tree, Some(root));
        // (node, indentation of its children, connector of the node itself)
        let mut stack: Vec<(NodeId, String, &str)> =
            top.into_iter().rev().map(|id| (id, String::new(), "")).collect();

        while let Some((id, indent, connector)) = stack.pop() {
            let _ = writeln!(
                out,
                "{indent}{connector}{} -> {} [{}:{}]",
                tree.kind(id),
                escape(tree.text(id)),
                tree.line(id),
                tree.column(id)
            );
            let child_indent = match connector {
                "" => indent,
                "`--" => format!("{indent}    "),
                _ => format!("{indent}|   "),
            };
            let children = self.siblings(tree, tree.first_child(id));
            let count = children.len();
            for (i, child) in children.into_iter().enumerate().rev() {
                let connector = if i + 1 == count { "`--" } else { "|--" };
                stack.push((child, child_indent.clone(), connector));
            }
        }
        out
    }

    fn siblings(&self, tree: &SyntaxTree, first: Option<NodeId>) -> Vec<NodeId> {
        std::iter::successors(first, |id| tree.next_sibling(*id))
            .filter(|id| !(self.skip_comments && tree.kind(*id).is_comment()))
            .collect()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{JavaSubsetParser, ParserAdapter};
    use crate::{build_tree, with_comments};

    fn plain(source: &str) -> SyntaxTree {
        build_tree(&JavaSubsetParser.parse(source).unwrap())
    }

    #[test]
    fn prints_class_with_method() {
        let tree = plain("class A {\n  void f() { return; }\n}\n");
        let dump = AstPrinter::new().print(&tree);
        insta::assert_snapshot!(dump.trim_end(), @r"
        CLASS_DEF -> CLASS_DEF [1:0]
        |--MODIFIERS -> MODIFIERS [1:0]
        |--LITERAL_CLASS -> class [1:0]
        |--IDENT -> A [1:6]
        `--OBJBLOCK -> OBJBLOCK [1:8]
            |--LCURLY -> { [1:8]
            |--METHOD_DEF -> METHOD_DEF [2:2]
            |   |--MODIFIERS -> MODIFIERS [2:2]
            |   |--TYPE -> TYPE [2:2]
            |   |   `--LITERAL_VOID -> void [2:2]
            |   |--IDENT -> f [2:7]
            |   |--LPAREN -> ( [2:8]
            |   |--PARAMETERS -> PARAMETERS [2:9]
            |   |--RPAREN -> ) [2:9]
            |   `--SLIST -> { [2:11]
            |       |--LITERAL_RETURN -> return [2:13]
            |       |   `--SEMI -> ; [2:19]
            |       `--RCURLY -> } [2:21]
            `--RCURLY -> } [3:0]
        ");
    }

    #[test]
    fn prints_comments_unless_skipped() {
        let tree = with_comments(&plain("// lead\npackage a;\n"));
        let dump = AstPrinter::new().print(&tree);
        insta::assert_snapshot!(dump.trim_end(), @r"
        SINGLE_LINE_COMMENT -> // [1:0]
        `--COMMENT_CONTENT ->  lead [1:2]
        PACKAGE_DEF -> package [2:0]
        |--ANNOTATIONS -> ANNOTATIONS [2:8]
        |--IDENT -> a [2:8]
        `--SEMI -> ; [2:9]
        ");
        let skipped = AstPrinter::new().skip_comments(true).print(&tree);
        assert!(skipped.starts_with("PACKAGE_DEF"));
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape("a\nb\t\\"), "a\\nb\\t\\\\");
    }

    #[test]
    fn deep_trees_print_without_recursion() {
        let source = format!("class A {{ int x = {}; }}", vec!["a"; 1000].join(" + "));
        let output = AstPrinter::new().print(&plain(&source));
        assert_eq!(output.matches("PLUS -> +").count(), 999);
    }
}
