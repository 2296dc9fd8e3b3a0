//! Sibling-linked syntax tree stored in an arena.
//!
//! Nodes are addressed by [`NodeId`] and link to their parent, first child and
//! siblings by id. Two derived properties are cached per node and cleared on
//! every structural mutation:
//!
//! - the child count, cleared on the directly enclosing parent;
//! - the set of kinds in the subtree, cleared on every ancestor.

use crate::grammar::Token;
use crate::kind::{KindSet, NodeKind};
use id_arena::{Arena, Id};
use std::cell::Cell;

/// Identifier of a node in a [`SyntaxTree`].
pub type NodeId = Id<Node>;

/// One node of the syntax tree.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    text: String,
    line: usize,
    column: usize,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    previous_sibling: Option<NodeId>,
    child_count: Cell<Option<usize>>,
    kinds: Cell<Option<KindSet>>,
    hidden_before: Vec<Token>,
    hidden_after: Vec<Token>,
}

impl Node {
    fn new(kind: NodeKind, text: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            text,
            line,
            column,
            parent: None,
            first_child: None,
            next_sibling: None,
            previous_sibling: None,
            child_count: Cell::new(None),
            kinds: Cell::new(None),
            hidden_before: Vec::new(),
            hidden_after: Vec::new(),
        }
    }
}

/// An arena of syntax nodes with a designated root.
///
/// The root may have siblings: a compilation unit is represented by its first
/// top-level node, the remaining top-level nodes follow as siblings.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    arena: Arena<Node>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a detached node.
    pub fn new_node(&mut self, kind: NodeKind, text: impl Into<String>, line: usize, column: usize) -> NodeId {
        self.arena.alloc(Node::new(kind, text.into(), line, column))
    }

    /// Returns the root node, if any.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Sets the root node.
    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Returns a view of the root.
    #[must_use]
    pub fn root_ref(&self) -> Option<NodeRef<'_>> {
        self.root.map(|id| self.node(id))
    }

    /// Returns a view of a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Number of allocated nodes, detached ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns true if no node was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    // --- field accessors ---

    /// Kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.arena[id].kind
    }

    /// Text of a node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> &str {
        &self.arena[id].text
    }

    /// Line of a node (1-indexed).
    #[must_use]
    pub fn line(&self, id: NodeId) -> usize {
        self.arena[id].line
    }

    /// Column of a node (0-indexed).
    #[must_use]
    pub fn column(&self, id: NodeId) -> usize {
        self.arena[id].column
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent
    }

    /// First child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child
    }

    /// Next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling
    }

    /// Previous sibling of a node.
    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].previous_sibling
    }

    /// Last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.first_child(id).map(|first| self.last_in_chain(first))
    }

    /// Comments directly before the node's token.
    #[must_use]
    pub fn hidden_before(&self, id: NodeId) -> &[Token] {
        &self.arena[id].hidden_before
    }

    /// Comments directly after the node's token.
    #[must_use]
    pub fn hidden_after(&self, id: NodeId) -> &[Token] {
        &self.arena[id].hidden_after
    }

    /// Every comment token attached to any node, once each, in source order.
    #[must_use]
    pub fn hidden_tokens(&self) -> Vec<&Token> {
        let mut tokens: Vec<&Token> = self
            .arena
            .iter()
            .flat_map(|(_, node)| node.hidden_before.iter().chain(&node.hidden_after))
            .collect();
        tokens.sort_by_key(|t| t.index);
        tokens.dedup_by_key(|t| t.index);
        tokens
    }

    /// Iterates the children of a node.
    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Iterates the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Last node of the sibling chain starting at `id`.
    #[must_use]
    pub fn last_in_chain(&self, mut id: NodeId) -> NodeId {
        while let Some(next) = self.next_sibling(id) {
            id = next;
        }
        id
    }

    // --- cached queries ---

    /// Number of children, cached until the next mutation of the node.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        let node = &self.arena[id];
        if let Some(count) = node.child_count.get() {
            return count;
        }
        let count = self.children(id).count();
        node.child_count.set(Some(count));
        count
    }

    /// Number of children of `kind`.
    #[must_use]
    pub fn child_count_of(&self, id: NodeId, kind: NodeKind) -> usize {
        self.children(id).filter(|c| self.kind(*c) == kind).count()
    }

    /// First child of `kind`.
    #[must_use]
    pub fn find_first_child(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).find(|c| self.kind(*c) == kind)
    }

    /// Returns true if `kind` occurs in the subtree rooted at `id`, the node
    /// itself included.
    #[must_use]
    pub fn branch_contains(&self, id: NodeId, kind: NodeKind) -> bool {
        self.branch_kinds(id).contains(kind)
    }

    /// Kinds occurring in the subtree rooted at `id`, computed without
    /// recursion and cached on every node visited.
    #[must_use]
    pub fn branch_kinds(&self, id: NodeId) -> KindSet {
        if let Some(kinds) = self.arena[id].kinds.get() {
            return kinds;
        }
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if self.arena[current].kinds.get().is_some() {
                continue;
            }
            if expanded {
                let mut kinds = KindSet::new();
                kinds.insert(self.kind(current));
                for child in self.children(current) {
                    kinds.union_with(&self.arena[child].kinds.get().unwrap_or_default());
                }
                self.arena[current].kinds.set(Some(kinds));
            } else {
                stack.push((current, true));
                stack.extend(
                    self.children(current)
                        .filter(|c| self.arena[*c].kinds.get().is_none())
                        .map(|c| (c, false)),
                );
            }
        }
        self.arena[id].kinds.get().unwrap_or_default()
    }

    // --- mutation ---

    fn clear_child_count(&self, id: Option<NodeId>) {
        if let Some(id) = id {
            self.arena[id].child_count.set(None);
        }
    }

    /// Clears the kind-set cache of `id` and all its ancestors.
    fn clear_branch_kinds(&self, id: Option<NodeId>) {
        let mut current = id;
        while let Some(node) = current {
            self.arena[node].kinds.set(None);
            current = self.arena[node].parent;
        }
    }

    /// Sets the parent of `id` and of every sibling following it.
    fn set_parent_of_chain(&mut self, id: NodeId, parent: Option<NodeId>) {
        let mut current = Some(id);
        while let Some(node) = current {
            self.arena[node].parent = parent;
            current = self.arena[node].next_sibling;
        }
    }

    /// Appends `child` (and any siblings chained after it) to `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.clear_branch_kinds(Some(parent));
        self.clear_child_count(Some(parent));
        let last = self.last_child(parent);
        self.set_parent_of_chain(child, Some(parent));
        self.arena[child].previous_sibling = last;
        match last {
            Some(last) => self.arena[last].next_sibling = Some(child),
            None => self.arena[parent].first_child = Some(child),
        }
    }

    /// Replaces the first-child link of `parent`. The new child's chain is
    /// re-parented; the old children are not unlinked.
    pub fn set_first_child(&mut self, parent: NodeId, child: Option<NodeId>) {
        self.clear_branch_kinds(Some(parent));
        self.clear_child_count(Some(parent));
        self.arena[parent].first_child = child;
        if let Some(child) = child {
            self.arena[child].previous_sibling = None;
            self.set_parent_of_chain(child, Some(parent));
        }
    }

    /// Replaces the next-sibling link of `id`.
    pub fn set_next_sibling(&mut self, id: NodeId, sibling: Option<NodeId>) {
        let parent = self.parent(id);
        self.clear_branch_kinds(parent);
        self.clear_child_count(parent);
        self.arena[id].next_sibling = sibling;
        if let Some(sibling) = sibling {
            if parent.is_some() {
                self.set_parent_of_chain(sibling, parent);
            }
            self.arena[sibling].previous_sibling = Some(id);
        }
    }

    /// Inserts `sibling` directly before `id`.
    pub fn add_previous_sibling(&mut self, id: NodeId, sibling: NodeId) {
        if let Some(previous) = self.previous_sibling(id) {
            self.set_next_sibling(previous, Some(sibling));
        } else if let Some(parent) = self.parent(id) {
            self.set_first_child(parent, Some(sibling));
        } else {
            self.arena[sibling].previous_sibling = None;
        }
        self.set_next_sibling(sibling, Some(id));
    }

    /// Inserts `sibling` directly after `id`.
    pub fn add_next_sibling(&mut self, id: NodeId, sibling: NodeId) {
        let next = self.next_sibling(id);
        self.arena[sibling].next_sibling = next;
        if let Some(next) = next {
            self.arena[next].previous_sibling = Some(sibling);
        }
        self.set_next_sibling(id, Some(sibling));
    }

    /// Changes the kind of a node.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.clear_branch_kinds(Some(id));
        self.arena[id].kind = kind;
    }

    /// Changes the text of a node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.arena[id].text = text.into();
    }

    /// Moves a node to another position.
    pub fn set_position(&mut self, id: NodeId, line: usize, column: usize) {
        let node = &mut self.arena[id];
        node.line = line;
        node.column = column;
    }

    /// Records the comments around the node's token.
    pub fn set_hidden(&mut self, id: NodeId, before: Vec<Token>, after: Vec<Token>) {
        let node = &mut self.arena[id];
        node.hidden_before = before;
        node.hidden_after = after;
    }
}

/// Iterator over a sibling chain.
#[derive(Debug, Clone)]
pub struct Siblings<'t> {
    tree: &'t SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

/// Borrowed view of one node, used by checks for navigation.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> NodeRef<'t> {
    fn wrap(&self, id: Option<NodeId>) -> Option<NodeRef<'t>> {
        id.map(|id| NodeRef { tree: self.tree, id })
    }

    /// Node id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Owning tree.
    #[must_use]
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// Node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.tree.kind(self.id)
    }

    /// Node text.
    #[must_use]
    pub fn text(&self) -> &'t str {
        self.tree.text(self.id)
    }

    /// Line (1-indexed).
    #[must_use]
    pub fn line(&self) -> usize {
        self.tree.line(self.id)
    }

    /// Column (0-indexed).
    #[must_use]
    pub fn column(&self) -> usize {
        self.tree.column(self.id)
    }

    /// Parent node.
    #[must_use]
    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.wrap(self.tree.parent(self.id))
    }

    /// First child.
    #[must_use]
    pub fn first_child(&self) -> Option<NodeRef<'t>> {
        self.wrap(self.tree.first_child(self.id))
    }

    /// Last child.
    #[must_use]
    pub fn last_child(&self) -> Option<NodeRef<'t>> {
        self.wrap(self.tree.last_child(self.id))
    }

    /// Next sibling.
    #[must_use]
    pub fn next_sibling(&self) -> Option<NodeRef<'t>> {
        self.wrap(self.tree.next_sibling(self.id))
    }

    /// Previous sibling.
    #[must_use]
    pub fn previous_sibling(&self) -> Option<NodeRef<'t>> {
        self.wrap(self.tree.previous_sibling(self.id))
    }

    /// Iterates the children.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        tree.children(self.id).map(move |id| NodeRef { tree, id })
    }

    /// Iterates the ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        tree.ancestors(self.id).map(move |id| NodeRef { tree, id })
    }

    /// Number of children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.tree.child_count(self.id)
    }

    /// Number of children of `kind`.
    #[must_use]
    pub fn child_count_of(&self, kind: NodeKind) -> usize {
        self.tree.child_count_of(self.id, kind)
    }

    /// First child of `kind`.
    #[must_use]
    pub fn find_first_child(&self, kind: NodeKind) -> Option<NodeRef<'t>> {
        self.wrap(self.tree.find_first_child(self.id, kind))
    }

    /// Returns true if `kind` occurs in this subtree.
    #[must_use]
    pub fn branch_contains(&self, kind: NodeKind) -> bool {
        self.tree.branch_contains(self.id, kind)
    }

    /// Comments before the node's token.
    #[must_use]
    pub fn hidden_before(&self) -> &'t [Token] {
        self.tree.hidden_before(self.id)
    }

    /// Comments after the node's token.
    #[must_use]
    pub fn hidden_after(&self) -> &'t [Token] {
        self.tree.hidden_after(self.id)
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tree: &mut SyntaxTree, kind: NodeKind) -> NodeId {
        tree.new_node(kind, kind.name(), 1, 0)
    }

    fn kinds_of(tree: &SyntaxTree, ids: impl Iterator<Item = NodeId>) -> Vec<NodeKind> {
        ids.map(|id| tree.kind(id)).collect()
    }

    #[test]
    fn add_child_links_chain() {
        let mut tree = SyntaxTree::new();
        let parent = leaf(&mut tree, NodeKind::Slist);
        let a = leaf(&mut tree, NodeKind::Ident);
        let b = leaf(&mut tree, NodeKind::Semi);
        let c = leaf(&mut tree, NodeKind::RCurly);
        tree.add_child(parent, a);
        tree.set_next_sibling(b, Some(c));
        tree.add_child(parent, b);

        assert_eq!(tree.child_count(parent), 3);
        assert_eq!(tree.parent(c), Some(parent));
        assert_eq!(tree.previous_sibling(b), Some(a));
        assert_eq!(tree.last_child(parent), Some(c));
    }

    #[test]
    fn child_count_cache_is_cleared_by_mutation() {
        let mut tree = SyntaxTree::new();
        let parent = leaf(&mut tree, NodeKind::Elist);
        let a = leaf(&mut tree, NodeKind::Expr);
        tree.add_child(parent, a);
        assert_eq!(tree.child_count(parent), 1);

        let b = leaf(&mut tree, NodeKind::Comma);
        tree.add_next_sibling(a, b);
        assert_eq!(tree.child_count(parent), 2);

        let c = leaf(&mut tree, NodeKind::Expr);
        tree.add_previous_sibling(a, c);
        assert_eq!(tree.child_count(parent), 3);
        assert_eq!(
            kinds_of(&tree, tree.children(parent)),
            vec![NodeKind::Expr, NodeKind::Expr, NodeKind::Comma]
        );
        assert_eq!(tree.first_child(parent), Some(c));
    }

    #[test]
    fn kind_set_sees_insertions_below_cached_ancestors() {
        let mut tree = SyntaxTree::new();
        let root = leaf(&mut tree, NodeKind::ClassDef);
        let block = leaf(&mut tree, NodeKind::ObjBlock);
        let method = leaf(&mut tree, NodeKind::MethodDef);
        let body = leaf(&mut tree, NodeKind::Slist);
        tree.add_child(root, block);
        tree.add_child(block, method);
        tree.add_child(method, body);

        assert!(!tree.branch_contains(root, NodeKind::LiteralReturn));
        assert!(!tree.branch_contains(method, NodeKind::LiteralReturn));

        let ret = leaf(&mut tree, NodeKind::LiteralReturn);
        tree.add_child(body, ret);
        for id in [body, method, block, root] {
            assert!(tree.branch_contains(id, NodeKind::LiteralReturn));
        }
        assert!(tree.branch_contains(root, NodeKind::ClassDef));
    }

    #[test]
    fn kind_set_sees_sibling_insertions() {
        let mut tree = SyntaxTree::new();
        let root = leaf(&mut tree, NodeKind::MethodDef);
        let body = leaf(&mut tree, NodeKind::Slist);
        let close = leaf(&mut tree, NodeKind::RCurly);
        tree.add_child(root, body);
        tree.add_child(body, close);
        assert!(!tree.branch_contains(root, NodeKind::SingleLineComment));

        let comment = leaf(&mut tree, NodeKind::SingleLineComment);
        tree.add_previous_sibling(close, comment);
        assert!(tree.branch_contains(body, NodeKind::SingleLineComment));
        assert!(tree.branch_contains(root, NodeKind::SingleLineComment));
    }

    #[test]
    fn deep_tree_kind_set_does_not_recurse() {
        let mut tree = SyntaxTree::new();
        let root = leaf(&mut tree, NodeKind::Expr);
        let mut current = root;
        for _ in 0..10_000 {
            let next = leaf(&mut tree, NodeKind::Plus);
            tree.add_child(current, next);
            current = next;
        }
        let tail = leaf(&mut tree, NodeKind::Ident);
        tree.add_child(current, tail);
        assert!(tree.branch_contains(root, NodeKind::Ident));
    }

    #[test]
    fn queries_by_kind() {
        let mut tree = SyntaxTree::new();
        let def = leaf(&mut tree, NodeKind::VariableDef);
        for kind in [NodeKind::Modifiers, NodeKind::Type, NodeKind::Ident, NodeKind::Ident] {
            let child = leaf(&mut tree, kind);
            tree.add_child(def, child);
        }
        assert_eq!(tree.child_count_of(def, NodeKind::Ident), 2);
        let ty = tree.find_first_child(def, NodeKind::Type).unwrap();
        assert_eq!(tree.kind(ty), NodeKind::Type);
        assert!(tree.find_first_child(def, NodeKind::Assign).is_none());

        let view = tree.node(ty);
        assert_eq!(view.parent().map(|p| p.kind()), Some(NodeKind::VariableDef));
        assert_eq!(view.ancestors().count(), 1);
    }

    #[test]
    fn clone_keeps_ids_valid() {
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, NodeKind::Ident);
        tree.set_root(Some(a));
        let copy = tree.clone();
        assert_eq!(copy.kind(a), NodeKind::Ident);
        assert_eq!(copy.root(), Some(a));
    }
    #[test]
    fn hidden_tokens_are_listed_once() {
        use crate::grammar::Channel;
        let comment = |index: usize| Token {
            kind: NodeKind::SingleLineComment,
            text: format!("// {index}"),
            line: index,
            column: 0,
            index,
            channel: Channel::Hidden,
        };
        let mut tree = SyntaxTree::new();
        let a = leaf(&mut tree, NodeKind::Ident);
        let b = leaf(&mut tree, NodeKind::Semi);
        tree.set_hidden(a, vec![comment(0)], vec![comment(2)]);
        tree.set_hidden(b, vec![comment(2)], vec![comment(4)]);
        let indices: Vec<_> = tree.hidden_tokens().iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 2, 4]);
    }
}
