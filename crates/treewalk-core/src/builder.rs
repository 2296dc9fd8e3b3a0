//! Builds a [`SyntaxTree`] from a [`ParsedSource`].
//!
//! The generic parse tree mirrors the grammar; the syntax tree is shaped for
//! checks. Grouping productions are flattened into sibling chains, imaginary
//! wrappers (`MODIFIERS`, `OBJBLOCK`, `EXPR`, `ELIST`, `TYPE`, ...) are
//! synthesized, and operators become the parent of their operands.
//!
//! # Panics
//!
//! Building assumes the parse tree uses the child layouts produced by
//! [`JavaSubsetParser`](crate::grammar::JavaSubsetParser). A parse tree from an
//! adapter that violates them may panic on an out-of-range child index.

use crate::grammar::{ParseNodeId, ParsedSource, Rule, Token};
use crate::kind::NodeKind;
use crate::tree::{NodeId, SyntaxTree};
use std::collections::HashSet;

/// Builds the plain syntax tree of a parsed file. Comments stay attached to
/// nodes as hidden tokens; see [`splice_comments`](crate::splice_comments).
#[must_use]
pub fn build_tree(parsed: &ParsedSource) -> SyntaxTree {
    TreeBuilder::new(parsed).build()
}

/// Running root and insertion point used to build qualified names and other
/// left-nested shapes.
#[derive(Debug, Default)]
struct AstPair {
    root: Option<NodeId>,
    child: Option<NodeId>,
}

impl AstPair {
    /// Makes `ast` the new root with the current root as its children.
    fn make_root(&mut self, tree: &mut SyntaxTree, ast: NodeId) {
        if let Some(root) = self.root {
            tree.add_child(ast, root);
            self.child = Some(tree.last_in_chain(root));
        }
        self.root = Some(ast);
    }

    /// Appends `ast` after the current insertion point.
    fn add_child(&mut self, tree: &mut SyntaxTree, ast: Option<NodeId>) {
        let Some(ast) = ast else {
            return;
        };
        match (self.root, self.child) {
            (None, _) => self.root = Some(ast),
            (Some(_), Some(child)) => tree.set_next_sibling(child, Some(ast)),
            (Some(root), None) => {
                let last = tree.last_in_chain(root);
                tree.set_next_sibling(last, Some(ast));
            }
        }
        self.child = Some(tree.last_in_chain(ast));
    }
}

struct TreeBuilder<'a> {
    parsed: &'a ParsedSource,
    tree: SyntaxTree,
    materialized: HashSet<usize>,
}

impl<'a> TreeBuilder<'a> {
    fn new(parsed: &'a ParsedSource) -> Self {
        Self {
            parsed,
            tree: SyntaxTree::new(),
            materialized: HashSet::new(),
        }
    }

    fn build(mut self) -> SyntaxTree {
        let root = self.parsed.tree.root().and_then(|root| self.visit(root));
        self.tree.set_root(root);
        self.tree
    }

    // --- parse tree access ---

    fn kids(&self, pid: ParseNodeId) -> &'a [ParseNodeId] {
        self.parsed.tree.children(pid)
    }

    fn rule(&self, pid: ParseNodeId) -> Option<Rule> {
        self.parsed.tree.rule_of(pid)
    }

    fn is_rule(&self, pid: Option<&ParseNodeId>, rule: Rule) -> bool {
        pid.is_some_and(|p| self.rule(*p) == Some(rule))
    }

    fn token(&self, pid: ParseNodeId) -> &'a Token {
        let index = self.parsed.tree.first_token(pid).unwrap_or_default();
        &self.parsed.tokens[index]
    }

    // --- node creation ---

    fn create_from(&mut self, index: usize, kind: Option<NodeKind>) -> NodeId {
        let token = &self.parsed.tokens[index];
        let id = self
            .tree
            .new_node(kind.unwrap_or(token.kind), token.text.as_str(), token.line, token.column);
        if self.materialized.insert(index) {
            let before = self.parsed.tokens.hidden_to_left(index).to_vec();
            let after = self.parsed.tokens.hidden_to_right(index).to_vec();
            if !before.is_empty() || !after.is_empty() {
                self.tree.set_hidden(id, before, after);
            }
        }
        id
    }

    /// Node for a terminal, with the token's own kind.
    fn create(&mut self, pid: ParseNodeId) -> NodeId {
        let index = self.token(pid).index;
        self.create_from(index, None)
    }

    /// Node for a terminal, with another kind.
    fn create_as(&mut self, kind: NodeKind, pid: ParseNodeId) -> NodeId {
        let index = self.token(pid).index;
        self.create_from(index, Some(kind))
    }

    /// Imaginary node positioned at the first token of `pid`.
    fn imaginary(&mut self, kind: NodeKind, pid: ParseNodeId) -> NodeId {
        let token = self.token(pid);
        let (line, column) = (token.line, token.column);
        self.tree.new_node(kind, kind.name(), line, column)
    }

    /// Imaginary node positioned at `node`.
    fn copy(&mut self, kind: NodeKind, node: NodeId) -> NodeId {
        let (line, column) = (self.tree.line(node), self.tree.column(node));
        self.tree.new_node(kind, kind.name(), line, column)
    }

    fn add(&mut self, parent: NodeId, child: Option<NodeId>) {
        if let Some(child) = child {
            self.tree.add_child(parent, child);
        }
    }

    /// Appends `sibling` at the end of the chain starting at `head`.
    fn add_last_sibling(&mut self, head: NodeId, sibling: NodeId) {
        let last = self.tree.last_in_chain(head);
        self.tree.set_next_sibling(last, Some(sibling));
    }

    fn process(&mut self, parent: NodeId, pids: &[ParseNodeId]) {
        for pid in pids {
            let child = self.visit(*pid);
            self.add(parent, child);
        }
    }

    /// Chains the results of `pids` as siblings and returns the head.
    fn flatten(&mut self, pids: &[ParseNodeId]) -> Option<NodeId> {
        let mut head = None;
        for pid in pids {
            let Some(node) = self.visit(*pid) else {
                continue;
            };
            match head {
                None => head = Some(node),
                Some(head) => self.add_last_sibling(head, node),
            }
        }
        head
    }

    fn chain(&mut self, nodes: &[NodeId]) -> Option<NodeId> {
        let (&head, rest) = nodes.split_first()?;
        for node in rest {
            self.add_last_sibling(head, *node);
        }
        Some(head)
    }

    // --- dispatch ---

    fn visit(&mut self, pid: ParseNodeId) -> Option<NodeId> {
        let Some(rule) = self.rule(pid) else {
            return Some(self.create(pid));
        };
        let kids = self.kids(pid);
        let node = match rule {
            Rule::CompilationUnit
            | Rule::Modifier
            | Rule::TypeList
            | Rule::QualifiedNameList
            | Rule::LocalVariableStatement
            | Rule::ParExpression
            | Rule::ParenPrimary => return self.flatten(kids),
            Rule::PackageDeclaration => self.package_declaration(kids),
            Rule::ImportDeclaration => self.import_declaration(kids),
            Rule::TypeDeclaration => return self.type_declaration(kids),
            Rule::ClassDeclaration | Rule::InterfaceDeclaration => self.type_definition(pid, &[]),
            Rule::ClassExtends => {
                let clause = self.create_as(NodeKind::ExtendsClause, kids[0]);
                let ty = self.type_chain(kids[1]);
                self.add(clause, ty);
                clause
            }
            Rule::InterfaceExtends => {
                let clause = self.create_as(NodeKind::ExtendsClause, kids[0]);
                let list = self.bare_type_list(kids[1]);
                self.add(clause, list);
                clause
            }
            Rule::ImplementsClause => {
                let clause = self.create_as(NodeKind::ImplementsClause, kids[0]);
                let list = self.bare_type_list(kids[1]);
                self.add(clause, list);
                clause
            }
            Rule::ClassBody => {
                let block = self.imaginary(NodeKind::ObjBlock, kids[0]);
                self.process(block, kids);
                block
            }
            Rule::ClassBodyDeclaration => return self.class_body_declaration(kids),
            Rule::EmptyMember => self.create(kids[0]),
            Rule::InitializerBlock => self.initializer(kids),
            Rule::MethodDeclaration => self.method(pid, &[]),
            Rule::ConstructorDeclaration => self.constructor(pid, &[]),
            Rule::FieldDeclaration => return self.field(pid, &[]),
            Rule::ThrowsClause => {
                let throws = self.create(kids[0]);
                self.process(throws, &kids[1..]);
                throws
            }
            Rule::VariableDeclarators | Rule::VariableDeclarator => {
                return self.flatten(kids);
            }
            Rule::FormalParameters => return self.formal_parameters(kids),
            Rule::FormalParameterList => {
                let first = self.visit(kids[0])?;
                let params = self.copy(NodeKind::Parameters, first);
                self.add(params, Some(first));
                self.process(params, &kids[1..]);
                params
            }
            Rule::FormalParameter => self.formal_parameter(kids),
            Rule::QualifiedName => return self.qualified_name(kids),
            Rule::TypeType => return self.type_type(pid),
            Rule::ClassType => return self.class_type(kids),
            Rule::TypeArguments => {
                let args = self.imaginary(NodeKind::TypeArguments, kids[0]);
                let start = self.create_as(NodeKind::GenericStart, kids[0]);
                self.add(args, Some(start));
                self.process(args, &kids[1..kids.len() - 1]);
                let end = self.create_as(NodeKind::GenericEnd, kids[kids.len() - 1]);
                self.add(args, Some(end));
                args
            }
            Rule::TypeArgument => return self.type_argument(kids),
            Rule::Block => {
                let slist = self.create_as(NodeKind::Slist, kids[0]);
                self.process(slist, &kids[1..]);
                slist
            }
            Rule::LocalVariableDeclaration => {
                let (mods, rest) = kids.split_at(kids.len() - 2);
                return self.variable_declarators(rest[1], mods, rest[0]);
            }
            Rule::IfStatement
            | Rule::ElseClause
            | Rule::WhileStatement
            | Rule::ForStatement
            | Rule::ReturnStatement
            | Rule::BreakStatement
            | Rule::ContinueStatement
            | Rule::ThrowStatement
            | Rule::NewExpr => {
                let keyword = self.create(kids[0]);
                self.process(keyword, &kids[1..]);
                if rule == Rule::NewExpr {
                    self.ensure_expression_list(keyword);
                }
                keyword
            }
            Rule::DoStatement => {
                let keyword = self.create(kids[0]);
                let body = self.visit(kids[1]);
                self.add(keyword, body);
                let do_while = self.create_as(NodeKind::DoWhile, kids[2]);
                self.add(keyword, Some(do_while));
                self.process(keyword, &kids[3..]);
                keyword
            }
            Rule::ForControl => return self.for_control(kids),
            Rule::ForInit => {
                let init = self.visit(kids[0])?;
                let slot = self.copy(NodeKind::ForInit, init);
                self.add(slot, Some(init));
                slot
            }
            Rule::EmptyStatement => self.create_as(NodeKind::EmptyStat, kids[0]),
            Rule::ExpressionStatement => {
                let expr = self.visit(kids[0])?;
                let semi = self.create(kids[1]);
                return self.chain(&[expr, semi]);
            }
            Rule::Expression => self.wrap(NodeKind::Expr, kids[0])?,
            Rule::ExpressionList => {
                let first = self.visit(kids[0])?;
                let list = self.copy(NodeKind::Elist, first);
                self.add(list, Some(first));
                self.process(list, &kids[1..]);
                list
            }
            Rule::Primary => self.create(kids[0]),
            Rule::FieldAccess => {
                let dot = self.create(kids[1]);
                self.process(dot, &kids[..1]);
                let name = self.create_as(NodeKind::Ident, kids[2]);
                self.add(dot, Some(name));
                dot
            }
            Rule::MethodCall => {
                let call = self.create_as(NodeKind::MethodCall, kids[1]);
                let target = self.create(kids[0]);
                self.add(call, Some(target));
                self.call_arguments(call, &kids[1..]);
                call
            }
            Rule::QualifiedMethodCall => {
                let call = self.create_as(NodeKind::MethodCall, kids[3]);
                let dot = self.create(kids[1]);
                self.process(dot, &[kids[0], kids[2]]);
                self.add(call, Some(dot));
                self.call_arguments(call, &kids[3..]);
                call
            }
            Rule::IndexExpr => {
                let index = self.create_as(NodeKind::IndexOp, kids[1]);
                self.process(index, &kids[..1]);
                let expr = self.wrap(NodeKind::Expr, kids[2]);
                self.add(index, expr);
                self.process(index, &kids[3..]);
                index
            }
            Rule::CastExpr => {
                let cast = self.create_as(NodeKind::Typecast, kids[0]);
                self.process(cast, &kids[1..]);
                cast
            }
            Rule::PostfixExpr => {
                let kind = if self.token(kids[1]).kind == NodeKind::Inc {
                    NodeKind::PostInc
                } else {
                    NodeKind::PostDec
                };
                let op = self.create_as(kind, kids[1]);
                self.process(op, &kids[..1]);
                op
            }
            Rule::PrefixExpr => {
                let kind = match self.token(kids[0]).kind {
                    NodeKind::Plus => NodeKind::UnaryPlus,
                    NodeKind::Minus => NodeKind::UnaryMinus,
                    other => other,
                };
                let op = self.create_as(kind, kids[0]);
                self.process(op, &kids[1..]);
                op
            }
            Rule::BinOp | Rule::BitShift => self.binary_operation(pid),
            Rule::InstanceOf => {
                let op = self.create(kids[1]);
                self.process(op, &[kids[0], kids[2]]);
                op
            }
            Rule::Ternary => {
                let question = self.create(kids[1]);
                self.process(question, &[kids[0], kids[2], kids[3], kids[4]]);
                question
            }
        };
        Some(node)
    }

    /// Imaginary `kind` node over the result of `pid`, positioned at it.
    fn wrap(&mut self, kind: NodeKind, pid: ParseNodeId) -> Option<NodeId> {
        let inner = self.visit(pid)?;
        let wrapper = self.copy(kind, inner);
        self.add(wrapper, Some(inner));
        Some(wrapper)
    }

    // --- declarations ---

    fn package_declaration(&mut self, kids: &[ParseNodeId]) -> NodeId {
        let package = self.create_as(NodeKind::PackageDef, kids[0]);
        let name = self.visit(kids[1]);
        let annotations = match name {
            Some(name) => self.copy(NodeKind::Annotations, name),
            None => self.imaginary(NodeKind::Annotations, kids[1]),
        };
        self.add(package, Some(annotations));
        self.add(package, name);
        self.process(package, &kids[2..]);
        package
    }

    fn import_declaration(&mut self, kids: &[ParseNodeId]) -> NodeId {
        let import = self.create_as(NodeKind::Import, kids[0]);
        let mut rest = &kids[1..];
        if self.token(rest[0]).kind == NodeKind::LiteralStatic && self.rule(rest[0]).is_none() {
            self.tree.set_kind(import, NodeKind::StaticImport);
            let keyword = self.create(rest[0]);
            self.add(import, Some(keyword));
            rest = &rest[1..];
        }
        let name = self.visit(rest[0]);
        if rest.len() == 4 {
            let dot = self.create(rest[1]);
            self.add(dot, name);
            let star = self.create(rest[2]);
            self.add(dot, Some(star));
            self.add(import, Some(dot));
        } else {
            self.add(import, name);
        }
        let semi = self.create(rest[rest.len() - 1]);
        self.add(import, Some(semi));
        import
    }

    fn type_declaration(&mut self, kids: &[ParseNodeId]) -> Option<NodeId> {
        let (mods, decl) = kids.split_at(kids.len() - 1);
        if self.rule(decl[0]).is_none() {
            return Some(self.create(decl[0]));
        }
        Some(self.type_definition(decl[0], mods))
    }

    /// Builds `MODIFIERS`, positioned at the first modifier or at `anchor`.
    fn modifiers(&mut self, mods: &[ParseNodeId], anchor: (usize, usize)) -> NodeId {
        let (line, column) = match mods.first() {
            Some(first) => {
                let token = self.token(*first);
                (token.line, token.column)
            }
            None => anchor,
        };
        let node = self.tree.new_node(NodeKind::Modifiers, NodeKind::Modifiers.name(), line, column);
        self.process(node, mods);
        node
    }

    fn position(&self, node: NodeId) -> (usize, usize) {
        (self.tree.line(node), self.tree.column(node))
    }

    fn token_position(&self, pid: ParseNodeId) -> (usize, usize) {
        let token = self.token(pid);
        (token.line, token.column)
    }

    fn type_definition(&mut self, pid: ParseNodeId, mods: &[ParseNodeId]) -> NodeId {
        let kids = self.kids(pid);
        let kind = if self.rule(pid) == Some(Rule::InterfaceDeclaration) {
            NodeKind::InterfaceDef
        } else {
            NodeKind::ClassDef
        };
        let anchor = self.token_position(kids[0]);
        let modifiers = self.modifiers(mods, anchor);
        let def = self.copy(kind, modifiers);
        self.add(def, Some(modifiers));
        self.process(def, kids);
        def
    }

    fn class_body_declaration(&mut self, kids: &[ParseNodeId]) -> Option<NodeId> {
        let (mods, member) = kids.split_at(kids.len() - 1);
        let member = member[0];
        match self.rule(member) {
            Some(Rule::ClassDeclaration | Rule::InterfaceDeclaration) => {
                Some(self.type_definition(member, mods))
            }
            Some(Rule::MethodDeclaration) => Some(self.method(member, mods)),
            Some(Rule::ConstructorDeclaration) => Some(self.constructor(member, mods)),
            Some(Rule::FieldDeclaration) => self.field(member, mods),
            _ => self.visit(member),
        }
    }

    fn initializer(&mut self, kids: &[ParseNodeId]) -> NodeId {
        let block = kids[kids.len() - 1];
        let init = if kids.len() == 2 {
            let init = self.create_as(NodeKind::StaticInit, kids[0]);
            self.tree.set_text(init, NodeKind::StaticInit.name());
            init
        } else {
            self.imaginary(NodeKind::InstanceInit, block)
        };
        let body = self.visit(block);
        self.add(init, body);
        init
    }

    fn method(&mut self, pid: ParseNodeId, mods: &[ParseNodeId]) -> NodeId {
        let kids = self.kids(pid);
        let return_type = self.visit(kids[0]);
        let anchor = match return_type {
            Some(ty) => self.position(ty),
            None => self.token_position(kids[0]),
        };
        let modifiers = self.modifiers(mods, anchor);
        let method = self.copy(NodeKind::MethodDef, modifiers);
        self.add(method, Some(modifiers));
        self.add(method, return_type);
        self.process(method, &kids[1..]);
        method
    }

    fn constructor(&mut self, pid: ParseNodeId, mods: &[ParseNodeId]) -> NodeId {
        let kids = self.kids(pid);
        let anchor = self.token_position(kids[0]);
        let modifiers = self.modifiers(mods, anchor);
        let ctor = self.copy(NodeKind::CtorDef, modifiers);
        self.add(ctor, Some(modifiers));
        self.process(ctor, kids);
        ctor
    }

    /// Field declarators chained as siblings; the `;` becomes the last child of
    /// the first `VARIABLE_DEF`.
    fn field(&mut self, pid: ParseNodeId, mods: &[ParseNodeId]) -> Option<NodeId> {
        let kids = self.kids(pid);
        let head = self.variable_declarators(kids[1], mods, kids[0])?;
        let semi = self.create(kids[2]);
        self.add(head, Some(semi));
        Some(head)
    }

    fn variable_declarators(
        &mut self,
        pid: ParseNodeId,
        mods: &[ParseNodeId],
        type_pid: ParseNodeId,
    ) -> Option<NodeId> {
        let mut nodes = Vec::new();
        for kid in self.kids(pid) {
            if self.rule(*kid) == Some(Rule::VariableDeclarator) {
                nodes.push(self.variable_declarator(*kid, mods, type_pid));
            } else {
                nodes.push(self.create(*kid));
            }
        }
        self.chain(&nodes)
    }

    /// One `VARIABLE_DEF`. Modifiers and type are rebuilt for every
    /// declarator so each definition owns its subtree.
    fn variable_declarator(&mut self, pid: ParseNodeId, mods: &[ParseNodeId], type_pid: ParseNodeId) -> NodeId {
        let kids = self.kids(pid);
        let ty = self.visit(type_pid);
        let anchor = match ty {
            Some(ty) => self.position(ty),
            None => self.token_position(type_pid),
        };
        let modifiers = self.modifiers(mods, anchor);
        let def = self.copy(NodeKind::VariableDef, modifiers);
        self.add(def, Some(modifiers));
        self.add(def, ty);
        let name = self.create(kids[0]);
        self.add(def, Some(name));
        if kids.len() == 3 {
            let assign = self.create(kids[1]);
            let value = self.wrap_expression(kids[2]);
            self.add(assign, value);
            self.add(def, Some(assign));
        }
        def
    }

    /// Initializer expressions arrive as `Expression` rules already.
    fn wrap_expression(&mut self, pid: ParseNodeId) -> Option<NodeId> {
        if self.rule(pid) == Some(Rule::Expression) {
            self.visit(pid)
        } else {
            self.wrap(NodeKind::Expr, pid)
        }
    }

    fn formal_parameters(&mut self, kids: &[ParseNodeId]) -> Option<NodeId> {
        let lparen = self.create(kids[0]);
        let rparen_pid = kids[kids.len() - 1];
        let params = if kids.len() == 3 {
            self.visit(kids[1])?
        } else {
            self.imaginary(NodeKind::Parameters, rparen_pid)
        };
        let rparen = self.create(rparen_pid);
        self.chain(&[lparen, params, rparen])
    }

    fn formal_parameter(&mut self, kids: &[ParseNodeId]) -> NodeId {
        let (mods, rest) = kids.split_at(kids.len() - 2);
        let ty = self.visit(rest[0]);
        let anchor = match ty {
            Some(ty) => self.position(ty),
            None => self.token_position(rest[0]),
        };
        let modifiers = self.modifiers(mods, anchor);
        let param = self.copy(NodeKind::ParameterDef, modifiers);
        self.add(param, Some(modifiers));
        self.add(param, ty);
        let name = self.create(rest[1]);
        self.add(param, Some(name));
        param
    }

    /// `a.b.c` becomes `DOT(DOT(a, b), c)`.
    fn qualified_name(&mut self, kids: &[ParseNodeId]) -> Option<NodeId> {
        let mut pair = AstPair::default();
        let first = self.create(kids[0]);
        pair.add_child(&mut self.tree, Some(first));
        for step in kids[1..].chunks(2) {
            let dot = self.create(step[0]);
            pair.make_root(&mut self.tree, dot);
            if let Some(name) = step.get(1) {
                let name = self.create(*name);
                pair.add_child(&mut self.tree, Some(name));
            }
        }
        pair.root
    }

    // --- types ---

    /// `TYPE` wrapper over the type chain, positioned at its first child.
    fn type_type(&mut self, pid: ParseNodeId) -> Option<NodeId> {
        let chain = self.type_chain(pid)?;
        let ty = self.copy(NodeKind::Type, chain);
        self.add(ty, Some(chain));
        Some(ty)
    }

    /// The children a `TYPE` would have, as a sibling chain.
    fn type_chain(&mut self, pid: ParseNodeId) -> Option<NodeId> {
        let kids = self.kids(pid);
        let head = self.visit(kids[0])?;
        for brackets in kids[1..].chunks(2) {
            let declarator = self.create_as(NodeKind::ArrayDeclarator, brackets[0]);
            if let Some(rbrack) = brackets.get(1) {
                let rbrack = self.create(*rbrack);
                self.add(declarator, Some(rbrack));
            }
            self.add_last_sibling(head, declarator);
        }
        Some(head)
    }

    fn bare_type_list(&mut self, pid: ParseNodeId) -> Option<NodeId> {
        let mut nodes = Vec::new();
        for kid in self.kids(pid) {
            if self.rule(*kid) == Some(Rule::TypeType) {
                nodes.extend(self.type_chain(*kid));
            } else {
                nodes.push(self.create(*kid));
            }
        }
        self.chain(&nodes)
    }

    /// `a.b<T>.C` becomes `DOT(DOT(a, b, TYPE_ARGUMENTS), C)`.
    fn class_type(&mut self, kids: &[ParseNodeId]) -> Option<NodeId> {
        let mut pair = AstPair::default();
        for kid in kids {
            let is_dot = self.rule(*kid).is_none() && self.token(*kid).kind == NodeKind::Dot;
            if is_dot {
                let dot = self.create(*kid);
                pair.make_root(&mut self.tree, dot);
            } else {
                let node = self.visit(*kid);
                pair.add_child(&mut self.tree, node);
            }
        }
        pair.root
    }

    fn type_argument(&mut self, kids: &[ParseNodeId]) -> Option<NodeId> {
        if self.rule(kids[0]) == Some(Rule::TypeType) {
            let inner = self.type_chain(kids[0])?;
            let argument = self.copy(NodeKind::TypeArgument, inner);
            self.add(argument, Some(inner));
            return Some(argument);
        }
        let argument = self.imaginary(NodeKind::TypeArgument, kids[0]);
        let wildcard = self.create_as(NodeKind::WildcardType, kids[0]);
        self.add(argument, Some(wildcard));
        if kids.len() == 3 {
            let kind = if self.token(kids[1]).kind == NodeKind::LiteralExtends {
                NodeKind::TypeUpperBounds
            } else {
                NodeKind::TypeLowerBounds
            };
            let bounds = self.create_as(kind, kids[1]);
            let bound_type = self.type_chain(kids[2]);
            self.add(bounds, bound_type);
            self.add(argument, Some(bounds));
        }
        Some(argument)
    }

    // --- statements ---

    fn for_control(&mut self, kids: &[ParseNodeId]) -> Option<NodeId> {
        let mut nodes = vec![self.create(kids[0])];
        let mut i = 1;

        if self.is_rule(kids.get(i), Rule::ForInit) {
            nodes.extend(self.visit(kids[i]));
            i += 1;
        } else {
            nodes.push(self.imaginary(NodeKind::ForInit, kids[i]));
        }
        nodes.push(self.create(kids[i]));
        i += 1;

        if self.is_rule(kids.get(i), Rule::Expression) {
            nodes.extend(self.wrap(NodeKind::ForCondition, kids[i]));
            i += 1;
        } else {
            nodes.push(self.imaginary(NodeKind::ForCondition, kids[i]));
        }
        nodes.push(self.create(kids[i]));
        i += 1;

        if self.is_rule(kids.get(i), Rule::ExpressionList) {
            nodes.extend(self.wrap(NodeKind::ForIterator, kids[i]));
            i += 1;
        } else {
            nodes.push(self.imaginary(NodeKind::ForIterator, kids[i]));
        }
        nodes.push(self.create(kids[i]));
        self.chain(&nodes)
    }

    // --- expressions ---

    /// Appends `ELIST` (imaginary at `)` when empty) and `)` to a call.
    /// `rest` starts at the call's `(`.
    fn call_arguments(&mut self, call: NodeId, rest: &[ParseNodeId]) {
        let rparen = rest[rest.len() - 1];
        let list = if rest.len() == 3 {
            self.visit(rest[1])
        } else {
            Some(self.imaginary(NodeKind::Elist, rparen))
        };
        self.add(call, list);
        let rparen = self.create(rparen);
        self.add(call, Some(rparen));
    }

    /// `new T()` gets an empty `ELIST` before its `)`.
    fn ensure_expression_list(&mut self, new: NodeId) {
        if self.tree.find_first_child(new, NodeKind::Elist).is_some() {
            return;
        }
        if let Some(rparen) = self.tree.last_child(new) {
            let (line, column) = self.position(rparen);
            let list = self.tree.new_node(NodeKind::Elist, NodeKind::Elist.name(), line, column);
            self.tree.add_previous_sibling(rparen, list);
        }
    }

    /// Left-nested operator chains, shifts included, are collected without
    /// recursion, then reassembled under the outermost operator.
    fn binary_operation(&mut self, pid: ParseNodeId) -> NodeId {
        let kids = self.kids(pid);
        let op = self.operator(pid);

        let mut nested = Vec::new();
        let mut left = kids[0];
        while self.is_binary(left) {
            nested.push(left);
            left = self.kids(left)[0];
        }

        if nested.is_empty() {
            let operand = self.visit(kids[0]);
            self.add(op, operand);
        } else {
            let descendants: Vec<NodeId> = nested.iter().map(|d| self.inner_operation(*d)).collect();
            self.add(op, Some(descendants[0]));
            let mut pointer = descendants[0];
            for descendant in &descendants[1..] {
                if let Some(first) = self.tree.first_child(pointer) {
                    self.tree.add_previous_sibling(first, *descendant);
                }
                pointer = *descendant;
            }
        }

        let right = self.visit(kids[kids.len() - 1]);
        self.add(op, right);
        op
    }

    /// An inner operator of a chain with its right operand; only the innermost
    /// one also gets its left operand.
    fn inner_operation(&mut self, pid: ParseNodeId) -> NodeId {
        let kids = self.kids(pid);
        let op = self.operator(pid);
        if !self.is_binary(kids[0]) {
            let left = self.visit(kids[0]);
            self.add(op, left);
        }
        let right = self.visit(kids[kids.len() - 1]);
        self.add(op, right);
        op
    }

    fn is_binary(&self, pid: ParseNodeId) -> bool {
        matches!(self.rule(pid), Some(Rule::BinOp | Rule::BitShift))
    }

    /// The operator node of a binary rule. Shifts arrive as two or three
    /// bracket tokens and get a composite token.
    fn operator(&mut self, pid: ParseNodeId) -> NodeId {
        let kids = self.kids(pid);
        if self.rule(pid) != Some(Rule::BitShift) {
            return self.create(kids[1]);
        }
        let brackets = kids.len() - 2;
        let (kind, text) = if self.token(kids[1]).kind == NodeKind::Lt {
            (NodeKind::Sl, "<<")
        } else if brackets == 3 {
            (NodeKind::Bsr, ">>>")
        } else {
            (NodeKind::Sr, ">>")
        };
        let op = self.create_as(kind, kids[1]);
        self.tree.set_text(op, text);
        op
    }
}
