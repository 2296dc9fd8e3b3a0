//! Recursive-descent parser for the Java-like subset.
//!
//! Same-precedence operator chains are parsed in loops and come out
//! left-nested, so the parser's own stack depth depends on the number of
//! precedence levels, not on the length of a chain.

use super::{lexer, ParseFailure, ParseNodeId, ParseTree, ParsedSource, ParserAdapter, Rule, TokenStream};
use crate::kind::NodeKind;

/// Reference [`ParserAdapter`] for a Java-like subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaSubsetParser;

impl JavaSubsetParser {
    /// Creates the parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ParserAdapter for JavaSubsetParser {
    fn name(&self) -> &'static str {
        "java-subset"
    }

    fn parse(&self, source: &str) -> Result<ParsedSource, ParseFailure> {
        let tokens = lexer::tokenize(source)?;
        let tree = {
            let mut parser = Parser::new(&tokens, source);
            let root = parser.compilation_unit()?;
            parser.tree.set_root(root);
            parser.tree
        };
        Ok(ParsedSource { tokens, tree })
    }
}

type PResult<T> = Result<T, ParseFailure>;

const MODIFIERS: &[NodeKind] = &[
    NodeKind::LiteralPublic,
    NodeKind::LiteralProtected,
    NodeKind::LiteralPrivate,
    NodeKind::LiteralStatic,
    NodeKind::Abstract,
    NodeKind::Final,
    NodeKind::LiteralNative,
    NodeKind::LiteralSynchronized,
    NodeKind::LiteralTransient,
    NodeKind::LiteralVolatile,
    NodeKind::Strictfp,
    NodeKind::LiteralDefault,
];

const PRIMITIVES: &[NodeKind] = &[
    NodeKind::LiteralBoolean,
    NodeKind::LiteralByte,
    NodeKind::LiteralChar,
    NodeKind::LiteralShort,
    NodeKind::LiteralInt,
    NodeKind::LiteralLong,
    NodeKind::LiteralFloat,
    NodeKind::LiteralDouble,
];

const LITERALS: &[NodeKind] = &[
    NodeKind::NumInt,
    NodeKind::NumLong,
    NodeKind::NumFloat,
    NodeKind::NumDouble,
    NodeKind::CharLiteral,
    NodeKind::StringLiteral,
    NodeKind::LiteralTrue,
    NodeKind::LiteralFalse,
    NodeKind::LiteralNull,
];

const ASSIGNMENTS: &[NodeKind] = &[
    NodeKind::Assign,
    NodeKind::PlusAssign,
    NodeKind::MinusAssign,
    NodeKind::StarAssign,
    NodeKind::DivAssign,
    NodeKind::ModAssign,
    NodeKind::BandAssign,
    NodeKind::BorAssign,
    NodeKind::BxorAssign,
    NodeKind::SlAssign,
    NodeKind::SrAssign,
    NodeKind::BsrAssign,
];

/// Binary operator levels, loosest first. Relational and shift levels are
/// handled separately because of `instanceof` and bracket counting.
const BINARY_LEVELS: &[&[NodeKind]] = &[
    &[NodeKind::Lor],
    &[NodeKind::Land],
    &[NodeKind::Bor],
    &[NodeKind::Bxor],
    &[NodeKind::Band],
    &[NodeKind::Equal, NodeKind::NotEqual],
    &[NodeKind::Lt, NodeKind::Gt, NodeKind::Le, NodeKind::Ge],
    &[],
    &[NodeKind::Plus, NodeKind::Minus],
    &[NodeKind::Star, NodeKind::Div, NodeKind::Mod],
];

const RELATIONAL_LEVEL: usize = 6;
const SHIFT_LEVEL: usize = 7;

struct Parser<'a> {
    stream: &'a TokenStream,
    real: Vec<usize>,
    pos: usize,
    tree: ParseTree,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn new(stream: &'a TokenStream, source: &'a str) -> Self {
        let real = stream
            .iter()
            .filter(|t| !t.is_hidden())
            .map(|t| t.index)
            .collect();
        Self {
            stream,
            real,
            pos: 0,
            tree: ParseTree::new(),
            source,
        }
    }

    // --- token access ---

    fn kind_at(&self, offset: usize) -> Option<NodeKind> {
        self.real
            .get(self.pos + offset)
            .and_then(|i| self.stream.get(*i))
            .map(|t| t.kind)
    }

    fn at(&self, kind: NodeKind) -> bool {
        self.kind_at(0) == Some(kind)
    }

    fn at_any(&self, kinds: &[NodeKind]) -> bool {
        self.kind_at(0).is_some_and(|k| kinds.contains(&k))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.real.len()
    }

    fn bump(&mut self) -> ParseNodeId {
        let index = self.real[self.pos];
        self.pos += 1;
        self.tree.terminal(index)
    }

    fn eat(&mut self, kind: NodeKind) -> Option<ParseNodeId> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: NodeKind, what: &str) -> PResult<ParseNodeId> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_expecting(what))
        }
    }

    fn error_expecting(&self, what: &str) -> ParseFailure {
        match self.real.get(self.pos).and_then(|i| self.stream.get(*i)) {
            Some(token) => ParseFailure::new(
                token.line,
                token.column,
                format!("mismatched input '{}' expecting {what}", token.text),
            ),
            None => {
                let (line, column) = self
                    .real
                    .last()
                    .and_then(|i| self.stream.get(*i))
                    .map_or((1, 0), super::Token::end_position);
                ParseFailure::new(line, column, format!("unexpected end of file, expecting {what}"))
            }
        }
        .with_source_span(self.source)
    }

    /// Two tokens at `offset` and `offset + 1` with no gap between them.
    fn adjacent(&self, offset: usize) -> bool {
        let token = |o: usize| self.real.get(self.pos + o).and_then(|i| self.stream.get(*i));
        match (token(offset), token(offset + 1)) {
            (Some(a), Some(b)) => a.line == b.line && a.column + 1 == b.column,
            _ => false,
        }
    }

    // --- lookahead without allocation ---

    fn kind_abs(&self, i: usize) -> Option<NodeKind> {
        self.real.get(i).and_then(|t| self.stream.get(*t)).map(|t| t.kind)
    }

    fn scan_type(&self, mut i: usize) -> Option<usize> {
        match self.kind_abs(i)? {
            k if PRIMITIVES.contains(&k) => i += 1,
            NodeKind::Ident => i = self.scan_class_type(i)?,
            _ => return None,
        }
        while self.kind_abs(i) == Some(NodeKind::LBrack) && self.kind_abs(i + 1) == Some(NodeKind::RBrack) {
            i += 2;
        }
        Some(i)
    }

    fn scan_class_type(&self, mut i: usize) -> Option<usize> {
        if self.kind_abs(i)? != NodeKind::Ident {
            return None;
        }
        i += 1;
        if self.kind_abs(i) == Some(NodeKind::Lt) {
            i = self.scan_type_arguments(i)?;
        }
        while self.kind_abs(i) == Some(NodeKind::Dot) && self.kind_abs(i + 1) == Some(NodeKind::Ident) {
            i += 2;
            if self.kind_abs(i) == Some(NodeKind::Lt) {
                i = self.scan_type_arguments(i)?;
            }
        }
        Some(i)
    }

    fn scan_type_arguments(&self, mut i: usize) -> Option<usize> {
        i += 1;
        loop {
            if self.kind_abs(i) == Some(NodeKind::Question) {
                i += 1;
                if matches!(self.kind_abs(i), Some(NodeKind::LiteralExtends | NodeKind::LiteralSuper)) {
                    i = self.scan_type(i + 1)?;
                }
            } else {
                i = self.scan_type(i)?;
            }
            match self.kind_abs(i)? {
                NodeKind::Comma => i += 1,
                NodeKind::Gt => return Some(i + 1),
                _ => return None,
            }
        }
    }

    fn is_local_variable_declaration(&self) -> bool {
        let mut i = self.pos;
        while self.kind_abs(i) == Some(NodeKind::Final) {
            i += 1;
        }
        self.scan_type(i)
            .is_some_and(|end| self.kind_abs(end) == Some(NodeKind::Ident))
    }

    fn is_cast(&self) -> bool {
        let Some(end) = self.scan_type(self.pos + 1) else {
            return false;
        };
        if self.kind_abs(end) != Some(NodeKind::RParen) {
            return false;
        }
        let primitive = self.kind_abs(self.pos + 1).is_some_and(|k| PRIMITIVES.contains(&k));
        let next = self.kind_abs(end + 1);
        primitive
            || next.is_some_and(|k| {
                k == NodeKind::Ident
                    || k == NodeKind::LParen
                    || k == NodeKind::Lnot
                    || k == NodeKind::Bnot
                    || k == NodeKind::LiteralThis
                    || k == NodeKind::LiteralSuper
                    || k == NodeKind::LiteralNew
                    || LITERALS.contains(&k)
            })
    }

    // --- declarations ---

    fn compilation_unit(&mut self) -> PResult<ParseNodeId> {
        let mut children = Vec::new();
        if self.at(NodeKind::LiteralPackage) {
            children.push(self.package_declaration()?);
        }
        while self.at(NodeKind::LiteralImport) {
            children.push(self.import_declaration()?);
        }
        while !self.at_end() {
            children.push(self.type_declaration()?);
        }
        Ok(self.tree.rule(Rule::CompilationUnit, children))
    }

    fn package_declaration(&mut self) -> PResult<ParseNodeId> {
        let keyword = self.bump();
        let name = self.qualified_name()?;
        let semi = self.expect(NodeKind::Semi, "';'")?;
        Ok(self.tree.rule(Rule::PackageDeclaration, vec![keyword, name, semi]))
    }

    fn import_declaration(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.bump()];
        if let Some(stat) = self.eat(NodeKind::LiteralStatic) {
            children.push(stat);
        }
        children.push(self.qualified_name()?);
        if self.at(NodeKind::Dot) && self.kind_at(1) == Some(NodeKind::Star) {
            children.push(self.bump());
            children.push(self.bump());
        }
        children.push(self.expect(NodeKind::Semi, "';'")?);
        Ok(self.tree.rule(Rule::ImportDeclaration, children))
    }

    fn type_declaration(&mut self) -> PResult<ParseNodeId> {
        if self.at(NodeKind::Semi) {
            let semi = self.bump();
            return Ok(self.tree.rule(Rule::TypeDeclaration, vec![semi]));
        }
        let mut children = self.modifiers();
        children.push(self.class_or_interface()?);
        Ok(self.tree.rule(Rule::TypeDeclaration, children))
    }

    fn modifiers(&mut self) -> Vec<ParseNodeId> {
        let mut mods = Vec::new();
        while self.at_any(MODIFIERS) {
            // `static {` opens an initializer, not a modifier list
            if self.at(NodeKind::LiteralStatic) && self.kind_at(1) == Some(NodeKind::LCurly) {
                break;
            }
            let keyword = self.bump();
            mods.push(self.tree.rule(Rule::Modifier, vec![keyword]));
        }
        mods
    }

    fn class_or_interface(&mut self) -> PResult<ParseNodeId> {
        match self.kind_at(0) {
            Some(NodeKind::LiteralClass) => self.class_declaration(),
            Some(NodeKind::LiteralInterface) => self.interface_declaration(),
            _ => Err(self.error_expecting("'class' or 'interface'")),
        }
    }

    fn class_declaration(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.bump(), self.expect(NodeKind::Ident, "identifier")?];
        if self.at(NodeKind::LiteralExtends) {
            let keyword = self.bump();
            let ty = self.type_type()?;
            children.push(self.tree.rule(Rule::ClassExtends, vec![keyword, ty]));
        }
        if self.at(NodeKind::LiteralImplements) {
            let keyword = self.bump();
            let list = self.type_list()?;
            children.push(self.tree.rule(Rule::ImplementsClause, vec![keyword, list]));
        }
        children.push(self.class_body()?);
        Ok(self.tree.rule(Rule::ClassDeclaration, children))
    }

    fn interface_declaration(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.bump(), self.expect(NodeKind::Ident, "identifier")?];
        if self.at(NodeKind::LiteralExtends) {
            let keyword = self.bump();
            let list = self.type_list()?;
            children.push(self.tree.rule(Rule::InterfaceExtends, vec![keyword, list]));
        }
        children.push(self.class_body()?);
        Ok(self.tree.rule(Rule::InterfaceDeclaration, children))
    }

    fn type_list(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.type_type()?];
        while let Some(comma) = self.eat(NodeKind::Comma) {
            children.push(comma);
            children.push(self.type_type()?);
        }
        Ok(self.tree.rule(Rule::TypeList, children))
    }

    fn class_body(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.expect(NodeKind::LCurly, "'{'")?];
        while !self.at(NodeKind::RCurly) {
            if self.at_end() {
                return Err(self.error_expecting("'}'"));
            }
            children.push(self.class_body_declaration()?);
        }
        children.push(self.bump());
        Ok(self.tree.rule(Rule::ClassBody, children))
    }

    fn class_body_declaration(&mut self) -> PResult<ParseNodeId> {
        if self.at(NodeKind::Semi) {
            let semi = self.bump();
            return Ok(self.tree.rule(Rule::EmptyMember, vec![semi]));
        }
        if self.at(NodeKind::LCurly) {
            let block = self.block()?;
            return Ok(self.tree.rule(Rule::InitializerBlock, vec![block]));
        }
        if self.at(NodeKind::LiteralStatic) && self.kind_at(1) == Some(NodeKind::LCurly) {
            let keyword = self.bump();
            let block = self.block()?;
            return Ok(self.tree.rule(Rule::InitializerBlock, vec![keyword, block]));
        }

        let mut children = self.modifiers();
        let member = match self.kind_at(0) {
            Some(NodeKind::LiteralClass | NodeKind::LiteralInterface) => self.class_or_interface()?,
            Some(NodeKind::Ident) if self.kind_at(1) == Some(NodeKind::LParen) => {
                self.constructor_declaration()?
            }
            _ => {
                let ty = self.type_or_void()?;
                let name = self.expect(NodeKind::Ident, "identifier")?;
                if self.at(NodeKind::LParen) {
                    self.method_declaration(ty, name)?
                } else {
                    let declarators = self.variable_declarators(Some(name))?;
                    let semi = self.expect(NodeKind::Semi, "';'")?;
                    self.tree.rule(Rule::FieldDeclaration, vec![ty, declarators, semi])
                }
            }
        };
        children.push(member);
        Ok(self.tree.rule(Rule::ClassBodyDeclaration, children))
    }

    fn method_declaration(&mut self, ty: ParseNodeId, name: ParseNodeId) -> PResult<ParseNodeId> {
        let mut children = vec![ty, name, self.formal_parameters()?];
        if self.at(NodeKind::LiteralThrows) {
            children.push(self.throws_clause()?);
        }
        if self.at(NodeKind::Semi) {
            children.push(self.bump());
        } else {
            children.push(self.block()?);
        }
        Ok(self.tree.rule(Rule::MethodDeclaration, children))
    }

    fn constructor_declaration(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.bump(), self.formal_parameters()?];
        if self.at(NodeKind::LiteralThrows) {
            children.push(self.throws_clause()?);
        }
        children.push(self.block()?);
        Ok(self.tree.rule(Rule::ConstructorDeclaration, children))
    }

    fn throws_clause(&mut self) -> PResult<ParseNodeId> {
        let keyword = self.bump();
        let mut names = vec![self.qualified_name()?];
        while let Some(comma) = self.eat(NodeKind::Comma) {
            names.push(comma);
            names.push(self.qualified_name()?);
        }
        let list = self.tree.rule(Rule::QualifiedNameList, names);
        Ok(self.tree.rule(Rule::ThrowsClause, vec![keyword, list]))
    }

    fn variable_declarators(&mut self, first_name: Option<ParseNodeId>) -> PResult<ParseNodeId> {
        let mut children = vec![self.variable_declarator(first_name)?];
        while let Some(comma) = self.eat(NodeKind::Comma) {
            children.push(comma);
            children.push(self.variable_declarator(None)?);
        }
        Ok(self.tree.rule(Rule::VariableDeclarators, children))
    }

    fn variable_declarator(&mut self, name: Option<ParseNodeId>) -> PResult<ParseNodeId> {
        let name = match name {
            Some(name) => name,
            None => self.expect(NodeKind::Ident, "identifier")?,
        };
        let mut children = vec![name];
        if let Some(assign) = self.eat(NodeKind::Assign) {
            children.push(assign);
            children.push(self.expression()?);
        }
        Ok(self.tree.rule(Rule::VariableDeclarator, children))
    }

    fn formal_parameters(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.expect(NodeKind::LParen, "'('")?];
        if !self.at(NodeKind::RParen) {
            let mut params = vec![self.formal_parameter()?];
            while let Some(comma) = self.eat(NodeKind::Comma) {
                params.push(comma);
                params.push(self.formal_parameter()?);
            }
            children.push(self.tree.rule(Rule::FormalParameterList, params));
        }
        children.push(self.expect(NodeKind::RParen, "')'")?);
        Ok(self.tree.rule(Rule::FormalParameters, children))
    }

    fn formal_parameter(&mut self) -> PResult<ParseNodeId> {
        let mut children = Vec::new();
        while self.at(NodeKind::Final) {
            let keyword = self.bump();
            children.push(self.tree.rule(Rule::Modifier, vec![keyword]));
        }
        children.push(self.type_type()?);
        children.push(self.expect(NodeKind::Ident, "identifier")?);
        Ok(self.tree.rule(Rule::FormalParameter, children))
    }

    fn qualified_name(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.expect(NodeKind::Ident, "identifier")?];
        while self.at(NodeKind::Dot) && self.kind_at(1) == Some(NodeKind::Ident) {
            children.push(self.bump());
            children.push(self.bump());
        }
        Ok(self.tree.rule(Rule::QualifiedName, children))
    }

    // --- types ---

    fn type_or_void(&mut self) -> PResult<ParseNodeId> {
        if self.at(NodeKind::LiteralVoid) {
            let void = self.bump();
            return Ok(self.tree.rule(Rule::TypeType, vec![void]));
        }
        self.type_type()
    }

    fn type_type(&mut self) -> PResult<ParseNodeId> {
        let mut children = Vec::new();
        if self.at_any(PRIMITIVES) {
            children.push(self.bump());
        } else if self.at(NodeKind::Ident) {
            children.push(self.class_type()?);
        } else {
            return Err(self.error_expecting("a type"));
        }
        while self.at(NodeKind::LBrack) && self.kind_at(1) == Some(NodeKind::RBrack) {
            children.push(self.bump());
            children.push(self.bump());
        }
        Ok(self.tree.rule(Rule::TypeType, children))
    }

    fn class_type(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.expect(NodeKind::Ident, "identifier")?];
        if self.at(NodeKind::Lt) {
            children.push(self.type_arguments()?);
        }
        while self.at(NodeKind::Dot) && self.kind_at(1) == Some(NodeKind::Ident) {
            children.push(self.bump());
            children.push(self.bump());
            if self.at(NodeKind::Lt) {
                children.push(self.type_arguments()?);
            }
        }
        Ok(self.tree.rule(Rule::ClassType, children))
    }

    fn type_arguments(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.bump(), self.type_argument()?];
        while let Some(comma) = self.eat(NodeKind::Comma) {
            children.push(comma);
            children.push(self.type_argument()?);
        }
        children.push(self.expect(NodeKind::Gt, "'>'")?);
        Ok(self.tree.rule(Rule::TypeArguments, children))
    }

    fn type_argument(&mut self) -> PResult<ParseNodeId> {
        let children = if let Some(question) = self.eat(NodeKind::Question) {
            let mut children = vec![question];
            if self.at_any(&[NodeKind::LiteralExtends, NodeKind::LiteralSuper]) {
                children.push(self.bump());
                children.push(self.type_type()?);
            }
            children
        } else {
            vec![self.type_type()?]
        };
        Ok(self.tree.rule(Rule::TypeArgument, children))
    }

    // --- statements ---

    fn block(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.expect(NodeKind::LCurly, "'{'")?];
        while !self.at(NodeKind::RCurly) {
            if self.at_end() {
                return Err(self.error_expecting("'}'"));
            }
            children.push(self.block_statement()?);
        }
        children.push(self.bump());
        Ok(self.tree.rule(Rule::Block, children))
    }

    fn block_statement(&mut self) -> PResult<ParseNodeId> {
        if self.is_local_variable_declaration() {
            let declaration = self.local_variable_declaration()?;
            let semi = self.expect(NodeKind::Semi, "';'")?;
            return Ok(self.tree.rule(Rule::LocalVariableStatement, vec![declaration, semi]));
        }
        self.statement()
    }

    fn local_variable_declaration(&mut self) -> PResult<ParseNodeId> {
        let mut children = Vec::new();
        while self.at(NodeKind::Final) {
            let keyword = self.bump();
            children.push(self.tree.rule(Rule::Modifier, vec![keyword]));
        }
        children.push(self.type_type()?);
        children.push(self.variable_declarators(None)?);
        Ok(self.tree.rule(Rule::LocalVariableDeclaration, children))
    }

    fn statement(&mut self) -> PResult<ParseNodeId> {
        let Some(kind) = self.kind_at(0) else {
            return Err(self.error_expecting("a statement"));
        };
        let node = match kind {
            NodeKind::LCurly => self.block()?,
            NodeKind::LiteralIf => {
                let mut children = vec![self.bump(), self.par_expression()?, self.statement()?];
                if self.at(NodeKind::LiteralElse) {
                    let keyword = self.bump();
                    let body = self.statement()?;
                    children.push(self.tree.rule(Rule::ElseClause, vec![keyword, body]));
                }
                self.tree.rule(Rule::IfStatement, children)
            }
            NodeKind::LiteralWhile => {
                let children = vec![self.bump(), self.par_expression()?, self.statement()?];
                self.tree.rule(Rule::WhileStatement, children)
            }
            NodeKind::LiteralDo => {
                let children = vec![
                    self.bump(),
                    self.statement()?,
                    self.expect(NodeKind::LiteralWhile, "'while'")?,
                    self.par_expression()?,
                    self.expect(NodeKind::Semi, "';'")?,
                ];
                self.tree.rule(Rule::DoStatement, children)
            }
            NodeKind::LiteralFor => {
                let children = vec![self.bump(), self.for_control()?, self.statement()?];
                self.tree.rule(Rule::ForStatement, children)
            }
            NodeKind::LiteralReturn => {
                let mut children = vec![self.bump()];
                if !self.at(NodeKind::Semi) {
                    children.push(self.expression()?);
                }
                children.push(self.expect(NodeKind::Semi, "';'")?);
                self.tree.rule(Rule::ReturnStatement, children)
            }
            NodeKind::LiteralBreak | NodeKind::LiteralContinue => {
                let mut children = vec![self.bump()];
                if let Some(label) = self.eat(NodeKind::Ident) {
                    children.push(label);
                }
                children.push(self.expect(NodeKind::Semi, "';'")?);
                let rule = if kind == NodeKind::LiteralBreak {
                    Rule::BreakStatement
                } else {
                    Rule::ContinueStatement
                };
                self.tree.rule(rule, children)
            }
            NodeKind::LiteralThrow => {
                let children = vec![
                    self.bump(),
                    self.expression()?,
                    self.expect(NodeKind::Semi, "';'")?,
                ];
                self.tree.rule(Rule::ThrowStatement, children)
            }
            NodeKind::Semi => {
                let semi = self.bump();
                self.tree.rule(Rule::EmptyStatement, vec![semi])
            }
            _ => {
                let children = vec![self.expression()?, self.expect(NodeKind::Semi, "';'")?];
                self.tree.rule(Rule::ExpressionStatement, children)
            }
        };
        Ok(node)
    }

    fn for_control(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.expect(NodeKind::LParen, "'('")?];
        if !self.at(NodeKind::Semi) {
            let init = if self.is_local_variable_declaration() {
                self.local_variable_declaration()?
            } else {
                self.expression_list()?
            };
            children.push(self.tree.rule(Rule::ForInit, vec![init]));
        }
        children.push(self.expect(NodeKind::Semi, "';'")?);
        if !self.at(NodeKind::Semi) {
            children.push(self.expression()?);
        }
        children.push(self.expect(NodeKind::Semi, "';'")?);
        if !self.at(NodeKind::RParen) {
            children.push(self.expression_list()?);
        }
        children.push(self.expect(NodeKind::RParen, "')'")?);
        Ok(self.tree.rule(Rule::ForControl, children))
    }

    fn par_expression(&mut self) -> PResult<ParseNodeId> {
        let children = vec![
            self.expect(NodeKind::LParen, "'('")?,
            self.expression()?,
            self.expect(NodeKind::RParen, "')'")?,
        ];
        Ok(self.tree.rule(Rule::ParExpression, children))
    }

    // --- expressions ---

    fn expression_list(&mut self) -> PResult<ParseNodeId> {
        let mut children = vec![self.expression()?];
        while let Some(comma) = self.eat(NodeKind::Comma) {
            children.push(comma);
            children.push(self.expression()?);
        }
        Ok(self.tree.rule(Rule::ExpressionList, children))
    }

    fn expression(&mut self) -> PResult<ParseNodeId> {
        let expr = self.expr()?;
        Ok(self.tree.rule(Rule::Expression, vec![expr]))
    }

    fn expr(&mut self) -> PResult<ParseNodeId> {
        let lhs = self.ternary()?;
        if self.at_any(ASSIGNMENTS) {
            let op = self.bump();
            let rhs = self.expr()?;
            return Ok(self.tree.rule(Rule::BinOp, vec![lhs, op, rhs]));
        }
        Ok(lhs)
    }

    fn ternary(&mut self) -> PResult<ParseNodeId> {
        let condition = self.binary(0)?;
        if let Some(question) = self.eat(NodeKind::Question) {
            let then = self.expr()?;
            let colon = self.expect(NodeKind::Colon, "':'")?;
            let otherwise = self.ternary()?;
            return Ok(self
                .tree
                .rule(Rule::Ternary, vec![condition, question, then, colon, otherwise]));
        }
        Ok(condition)
    }

    fn binary(&mut self, level: usize) -> PResult<ParseNodeId> {
        if level == BINARY_LEVELS.len() {
            return self.unary();
        }
        let mut lhs = self.binary(level + 1)?;
        loop {
            if level == SHIFT_LEVEL {
                let Some(brackets) = self.shift_brackets() else {
                    break;
                };
                let mut children = vec![lhs];
                for _ in 0..brackets {
                    children.push(self.bump());
                }
                children.push(self.binary(level + 1)?);
                lhs = self.tree.rule(Rule::BitShift, children);
            } else if level == RELATIONAL_LEVEL && self.at(NodeKind::LiteralInstanceof) {
                let keyword = self.bump();
                let ty = self.type_type()?;
                lhs = self.tree.rule(Rule::InstanceOf, vec![lhs, keyword, ty]);
            } else if self.at_any(BINARY_LEVELS[level]) && !self.starts_shift() {
                let op = self.bump();
                let rhs = self.binary(level + 1)?;
                lhs = self.tree.rule(Rule::BinOp, vec![lhs, op, rhs]);
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn starts_shift(&self) -> bool {
        self.shift_brackets().is_some()
    }

    /// Number of adjacent `<` or `>` tokens forming a shift operator here.
    fn shift_brackets(&self) -> Option<usize> {
        match self.kind_at(0)? {
            NodeKind::Lt if self.kind_at(1) == Some(NodeKind::Lt) && self.adjacent(0) => Some(2),
            NodeKind::Gt if self.kind_at(1) == Some(NodeKind::Gt) && self.adjacent(0) => {
                if self.kind_at(2) == Some(NodeKind::Gt) && self.adjacent(1) {
                    Some(3)
                } else {
                    Some(2)
                }
            }
            _ => None,
        }
    }

    fn unary(&mut self) -> PResult<ParseNodeId> {
        if self.at_any(&[
            NodeKind::Plus,
            NodeKind::Minus,
            NodeKind::Inc,
            NodeKind::Dec,
            NodeKind::Bnot,
            NodeKind::Lnot,
        ]) {
            let op = self.bump();
            let operand = self.unary()?;
            return Ok(self.tree.rule(Rule::PrefixExpr, vec![op, operand]));
        }
        if self.at(NodeKind::LParen) && self.is_cast() {
            let children = vec![
                self.bump(),
                self.type_type()?,
                self.expect(NodeKind::RParen, "')'")?,
                self.unary()?,
            ];
            return Ok(self.tree.rule(Rule::CastExpr, children));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> PResult<ParseNodeId> {
        let mut expr = self.primary()?;
        loop {
            match self.kind_at(0) {
                Some(NodeKind::Dot) => {
                    let dot = self.bump();
                    let name = self.expect(NodeKind::Ident, "identifier")?;
                    if self.at(NodeKind::LParen) {
                        let mut children = vec![expr, dot, name];
                        self.arguments(&mut children)?;
                        expr = self.tree.rule(Rule::QualifiedMethodCall, children);
                    } else {
                        expr = self.tree.rule(Rule::FieldAccess, vec![expr, dot, name]);
                    }
                }
                Some(NodeKind::LBrack) => {
                    let children = vec![
                        expr,
                        self.bump(),
                        self.expr()?,
                        self.expect(NodeKind::RBrack, "']'")?,
                    ];
                    expr = self.tree.rule(Rule::IndexExpr, children);
                }
                Some(NodeKind::Inc | NodeKind::Dec) => {
                    let op = self.bump();
                    expr = self.tree.rule(Rule::PostfixExpr, vec![expr, op]);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> PResult<ParseNodeId> {
        let Some(kind) = self.kind_at(0) else {
            return Err(self.error_expecting("an expression"));
        };
        match kind {
            NodeKind::LParen => {
                let children = vec![
                    self.bump(),
                    self.expr()?,
                    self.expect(NodeKind::RParen, "')'")?,
                ];
                Ok(self.tree.rule(Rule::ParenPrimary, children))
            }
            NodeKind::Ident | NodeKind::LiteralThis | NodeKind::LiteralSuper => {
                let name = self.bump();
                if self.at(NodeKind::LParen) {
                    let mut children = vec![name];
                    self.arguments(&mut children)?;
                    Ok(self.tree.rule(Rule::MethodCall, children))
                } else {
                    Ok(self.tree.rule(Rule::Primary, vec![name]))
                }
            }
            NodeKind::LiteralNew => {
                let mut children = vec![self.bump(), self.class_type()?];
                self.arguments(&mut children)?;
                Ok(self.tree.rule(Rule::NewExpr, children))
            }
            k if LITERALS.contains(&k) => {
                let literal = self.bump();
                Ok(self.tree.rule(Rule::Primary, vec![literal]))
            }
            _ => Err(self.error_expecting("an expression")),
        }
    }

    /// Appends `(`, an optional expression list and `)` to `children`.
    fn arguments(&mut self, children: &mut Vec<ParseNodeId>) -> PResult<()> {
        children.push(self.expect(NodeKind::LParen, "'('")?);
        if !self.at(NodeKind::RParen) {
            children.push(self.expression_list()?);
        }
        children.push(self.expect(NodeKind::RParen, "')'")?);
        Ok(())
    }
}
