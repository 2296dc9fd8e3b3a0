//! Splicing of comment nodes into a built tree.

use crate::grammar::Token;
use crate::kind::NodeKind;
use crate::tree::{NodeId, SyntaxTree};

/// Returns a copy of `tree` with comment nodes spliced in.
///
/// The plain tree is left untouched, so both shapes can be walked for the same
/// file.
#[must_use]
pub fn with_comments(tree: &SyntaxTree) -> SyntaxTree {
    let mut augmented = tree.clone();
    splice_comments(&mut augmented);
    augmented
}

/// Inserts comment nodes recorded as hidden tokens.
///
/// Comments before a node become its preceding siblings, in source order.
/// Comments after the last node of the tree become trailing siblings of that
/// node. A comment in front of the first top-level node becomes the new root.
pub fn splice_comments(tree: &mut SyntaxTree) {
    let Some(root) = tree.root() else {
        return;
    };
    let order = pre_order(tree, root);

    for id in &order {
        let before = tree.hidden_before(*id).to_vec();
        for token in &before {
            let comment = comment_node(tree, token);
            tree.add_previous_sibling(*id, comment);
        }
    }

    if let Some(last) = order.last() {
        let after = tree.hidden_after(*last).to_vec();
        let mut current = *last;
        for token in &after {
            let comment = comment_node(tree, token);
            tree.add_next_sibling(current, comment);
            current = comment;
        }
    }

    let mut new_root = root;
    while let Some(previous) = tree.previous_sibling(new_root) {
        new_root = previous;
    }
    tree.set_root(Some(new_root));
}

fn pre_order(tree: &SyntaxTree, root: NodeId) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(tree.len());
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        order.push(id);
        if let Some(next) = tree.next_sibling(id) {
            stack.push(next);
        }
        if let Some(child) = tree.first_child(id) {
            stack.push(child);
        }
    }
    order
}

/// Builds the subtree of one comment token.
fn comment_node(tree: &mut SyntaxTree, token: &Token) -> NodeId {
    if token.kind == NodeKind::SingleLineComment {
        let comment = tree.new_node(NodeKind::SingleLineComment, "//", token.line, token.column);
        let body = token.text.get(2..).unwrap_or_default();
        let content = tree.new_node(NodeKind::CommentContent, body, token.line, token.column + 2);
        tree.add_child(comment, content);
        return comment;
    }

    let comment = tree.new_node(NodeKind::BlockCommentBegin, "/*", token.line, token.column);
    let text = token.text.as_str();
    let body = text
        .strip_prefix("/*")
        .and_then(|rest| rest.strip_suffix("*/"))
        .unwrap_or_default();
    let content_kind = if body.starts_with('*') && text != "/**/" {
        NodeKind::JavadocContent
    } else {
        NodeKind::CommentContent
    };
    let content = tree.new_node(content_kind, body, token.line, token.column + 2);
    tree.add_child(comment, content);

    let (end_line, end_column) = token.end_position();
    let end = tree.new_node(NodeKind::BlockCommentEnd, "*/", end_line, end_column.saturating_sub(2));
    tree.add_child(comment, end);
    comment
}
