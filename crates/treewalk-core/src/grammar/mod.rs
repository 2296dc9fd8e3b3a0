//! Parser adapter contract and the reference Java-subset grammar.
//!
//! The tree builder never looks at source text. It consumes a [`ParsedSource`]:
//! a [`TokenStream`] (real and hidden-channel tokens) plus a generic
//! [`ParseTree`] whose rule nodes are tagged with a [`Rule`] and whose leaves
//! point back into the token stream.

mod lexer;
mod parser;

use crate::kind::NodeKind;
use id_arena::{Arena, Id};
use miette::{Diagnostic, SourceSpan};

pub use lexer::tokenize;
pub use parser::JavaSubsetParser;

/// Token channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Tokens the grammar consumes.
    Default,
    /// Comments, kept for reattachment.
    Hidden,
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind from the shared vocabulary.
    pub kind: NodeKind,
    /// Literal text.
    pub text: String,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (0-indexed, in characters).
    pub column: usize,
    /// Position in the token stream.
    pub index: usize,
    /// Channel the token was emitted on.
    pub channel: Channel,
}

impl Token {
    /// Returns true for hidden-channel tokens.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.channel == Channel::Hidden
    }

    /// Line and column just past the last character of the token.
    #[must_use]
    pub fn end_position(&self) -> (usize, usize) {
        let mut line = self.line;
        let mut column = self.column;
        let mut chars = self.text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\n' => {
                    line += 1;
                    column = 0;
                }
                '\r' => {
                    if chars.peek() != Some(&'\n') {
                        line += 1;
                        column = 0;
                    }
                }
                _ => column += 1,
            }
        }
        (line, column)
    }
}

/// All tokens of one file, real and hidden, in source order.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Wraps a token vector. Token indices must match positions.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Returns the token at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Number of tokens, hidden ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the stream has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates every token.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Iterates the hidden-channel tokens.
    pub fn hidden(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_hidden())
    }

    /// Hidden tokens between the previous real token and `index`.
    #[must_use]
    pub fn hidden_to_left(&self, index: usize) -> &[Token] {
        let end = index.min(self.tokens.len());
        let mut start = end;
        while start > 0 && self.tokens[start - 1].is_hidden() {
            start -= 1;
        }
        &self.tokens[start..end]
    }

    /// Hidden tokens between `index` and the next real token.
    #[must_use]
    pub fn hidden_to_right(&self, index: usize) -> &[Token] {
        let start = (index + 1).min(self.tokens.len());
        let mut end = start;
        while end < self.tokens.len() && self.tokens[end].is_hidden() {
            end += 1;
        }
        &self.tokens[start..end]
    }
}

impl std::ops::Index<usize> for TokenStream {
    type Output = Token;

    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

/// Grammar productions that appear as rule nodes in a [`ParseTree`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    CompilationUnit,
    PackageDeclaration,
    ImportDeclaration,
    TypeDeclaration,
    Modifier,
    ClassDeclaration,
    InterfaceDeclaration,
    ClassExtends,
    InterfaceExtends,
    ImplementsClause,
    TypeList,
    ClassBody,
    ClassBodyDeclaration,
    EmptyMember,
    InitializerBlock,
    MethodDeclaration,
    ConstructorDeclaration,
    FieldDeclaration,
    ThrowsClause,
    QualifiedNameList,
    VariableDeclarators,
    VariableDeclarator,
    FormalParameters,
    FormalParameterList,
    FormalParameter,
    QualifiedName,
    TypeType,
    ClassType,
    TypeArguments,
    TypeArgument,
    Block,
    LocalVariableDeclaration,
    LocalVariableStatement,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ForStatement,
    ForControl,
    ForInit,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    ThrowStatement,
    EmptyStatement,
    ExpressionStatement,
    ParExpression,
    ExpressionList,
    Expression,
    Primary,
    ParenPrimary,
    FieldAccess,
    MethodCall,
    QualifiedMethodCall,
    IndexExpr,
    NewExpr,
    CastExpr,
    PostfixExpr,
    PrefixExpr,
    BinOp,
    BitShift,
    InstanceOf,
    Ternary,
}

/// Identifier of a parse tree node.
pub type ParseNodeId = Id<ParseNode>;

/// A node of the generic parse tree.
#[derive(Debug, Clone)]
pub enum ParseNode {
    /// A production with its children in source order.
    Rule {
        /// The production.
        rule: Rule,
        /// Child nodes.
        children: Vec<ParseNodeId>,
    },
    /// A real token, by stream index.
    Terminal(usize),
}

/// Concrete derivation produced by a parser adapter.
#[derive(Debug, Default)]
pub struct ParseTree {
    arena: Arena<ParseNode>,
    root: Option<ParseNodeId>,
}

impl ParseTree {
    /// Creates an empty parse tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a terminal node.
    pub fn terminal(&mut self, token_index: usize) -> ParseNodeId {
        self.arena.alloc(ParseNode::Terminal(token_index))
    }

    /// Allocates a rule node.
    pub fn rule(&mut self, rule: Rule, children: Vec<ParseNodeId>) -> ParseNodeId {
        self.arena.alloc(ParseNode::Rule { rule, children })
    }

    /// Sets the root node.
    pub fn set_root(&mut self, root: ParseNodeId) {
        self.root = Some(root);
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> Option<ParseNodeId> {
        self.root
    }

    /// Returns a node.
    #[must_use]
    pub fn get(&self, id: ParseNodeId) -> &ParseNode {
        &self.arena[id]
    }

    /// Returns the rule tag of a node, or `None` for terminals.
    #[must_use]
    pub fn rule_of(&self, id: ParseNodeId) -> Option<Rule> {
        match &self.arena[id] {
            ParseNode::Rule { rule, .. } => Some(*rule),
            ParseNode::Terminal(_) => None,
        }
    }

    /// Returns the children of a node (empty for terminals).
    #[must_use]
    pub fn children(&self, id: ParseNodeId) -> &[ParseNodeId] {
        match &self.arena[id] {
            ParseNode::Rule { children, .. } => children,
            ParseNode::Terminal(_) => &[],
        }
    }

    /// Returns the token index of a terminal node.
    #[must_use]
    pub fn token_index(&self, id: ParseNodeId) -> Option<usize> {
        match &self.arena[id] {
            ParseNode::Terminal(index) => Some(*index),
            ParseNode::Rule { .. } => None,
        }
    }

    /// Token index of the first terminal under `id`.
    #[must_use]
    pub fn first_token(&self, id: ParseNodeId) -> Option<usize> {
        let mut current = id;
        loop {
            match &self.arena[current] {
                ParseNode::Terminal(index) => return Some(*index),
                ParseNode::Rule { children, .. } => current = *children.first()?,
            }
        }
    }

    /// Number of allocated nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns true if no node was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }
}

/// Output of a successful parse.
#[derive(Debug)]
pub struct ParsedSource {
    /// Every token of the file.
    pub tokens: TokenStream,
    /// The derivation over the real tokens.
    pub tree: ParseTree,
}

/// A file the grammar could not derive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
#[error("{line}:{column}: {message}")]
#[diagnostic(code(treewalk::parse))]
pub struct ParseFailure {
    /// Line of the offending token (1-indexed).
    pub line: usize,
    /// Column of the offending token (0-indexed).
    pub column: usize,
    /// What went wrong.
    pub message: String,
    /// Byte span of the offending token, for diagnostics.
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl ParseFailure {
    /// Creates a failure at a position.
    #[must_use]
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            span: None,
        }
    }

    /// Computes the byte span of the failure within `source`.
    #[must_use]
    pub fn with_source_span(mut self, source: &str) -> Self {
        let offset = source
            .split_inclusive('\n')
            .take(self.line.saturating_sub(1))
            .map(str::len)
            .sum::<usize>();
        let line_text = source.lines().nth(self.line.saturating_sub(1)).unwrap_or("");
        let column_bytes = line_text
            .char_indices()
            .nth(self.column)
            .map_or(line_text.len(), |(i, _)| i);
        self.span = Some(SourceSpan::from((offset + column_bytes, 1)));
        self
    }
}

/// Turns file text into a [`ParsedSource`].
pub trait ParserAdapter: Send + Sync {
    /// Short name of the grammar, for logs.
    fn name(&self) -> &'static str;

    /// Parses `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseFailure`] when the text is not derivable.
    fn parse(&self, source: &str) -> Result<ParsedSource, ParseFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: NodeKind, index: usize, channel: Channel) -> Token {
        Token {
            kind,
            text: kind.name().to_string(),
            line: 1,
            column: index,
            index,
            channel,
        }
    }

    #[test]
    fn hidden_neighbours_stop_at_real_tokens() {
        let stream = TokenStream::new(vec![
            token(NodeKind::Ident, 0, Channel::Default),
            token(NodeKind::SingleLineComment, 1, Channel::Hidden),
            token(NodeKind::BlockCommentBegin, 2, Channel::Hidden),
            token(NodeKind::Semi, 3, Channel::Default),
            token(NodeKind::SingleLineComment, 4, Channel::Hidden),
        ]);

        assert_eq!(stream.hidden_to_left(0).len(), 0);
        assert_eq!(stream.hidden_to_right(0).len(), 2);
        assert_eq!(stream.hidden_to_left(3).len(), 2);
        assert_eq!(stream.hidden_to_right(3).len(), 1);
        assert_eq!(stream.hidden().count(), 3);
    }

    #[test]
    fn end_position_counts_newlines() {
        let mut t = token(NodeKind::BlockCommentBegin, 0, Channel::Hidden);
        t.text = "/* a\n  b */".to_string();
        t.column = 4;
        assert_eq!(t.end_position(), (2, 6));
    }

    #[test]
    fn failure_span_points_at_column() {
        let failure = ParseFailure::new(2, 3, "boom").with_source_span("ab\ncdefg\n");
        assert_eq!(failure.span, Some(SourceSpan::from((6, 1))));
    }
}
