//! Lexer for the Java-like subset.

use super::{Channel, ParseFailure, Token, TokenStream};
use crate::kind::NodeKind;

/// Operators, longest first so that a greedy scan picks the right one.
/// `<<`, `>>` and `>>>` are deliberately absent: angle brackets are always
/// single tokens and shifts are recovered when the tree is built.
const OPERATORS: &[(&str, NodeKind)] = &[
    (">>>=", NodeKind::BsrAssign),
    ("<<=", NodeKind::SlAssign),
    (">>=", NodeKind::SrAssign),
    ("==", NodeKind::Equal),
    ("!=", NodeKind::NotEqual),
    ("<=", NodeKind::Le),
    (">=", NodeKind::Ge),
    ("&&", NodeKind::Land),
    ("||", NodeKind::Lor),
    ("++", NodeKind::Inc),
    ("--", NodeKind::Dec),
    ("+=", NodeKind::PlusAssign),
    ("-=", NodeKind::MinusAssign),
    ("*=", NodeKind::StarAssign),
    ("/=", NodeKind::DivAssign),
    ("%=", NodeKind::ModAssign),
    ("&=", NodeKind::BandAssign),
    ("|=", NodeKind::BorAssign),
    ("^=", NodeKind::BxorAssign),
    ("(", NodeKind::LParen),
    (")", NodeKind::RParen),
    ("{", NodeKind::LCurly),
    ("}", NodeKind::RCurly),
    ("[", NodeKind::LBrack),
    ("]", NodeKind::RBrack),
    (";", NodeKind::Semi),
    (",", NodeKind::Comma),
    (".", NodeKind::Dot),
    ("=", NodeKind::Assign),
    ("<", NodeKind::Lt),
    (">", NodeKind::Gt),
    ("!", NodeKind::Lnot),
    ("~", NodeKind::Bnot),
    ("?", NodeKind::Question),
    (":", NodeKind::Colon),
    ("+", NodeKind::Plus),
    ("-", NodeKind::Minus),
    ("*", NodeKind::Star),
    ("/", NodeKind::Div),
    ("&", NodeKind::Band),
    ("|", NodeKind::Bor),
    ("^", NodeKind::Bxor),
    ("%", NodeKind::Mod),
];

fn keyword(word: &str) -> Option<NodeKind> {
    let kind = match word {
        "package" => NodeKind::LiteralPackage,
        "import" => NodeKind::LiteralImport,
        "class" => NodeKind::LiteralClass,
        "interface" => NodeKind::LiteralInterface,
        "public" => NodeKind::LiteralPublic,
        "protected" => NodeKind::LiteralProtected,
        "private" => NodeKind::LiteralPrivate,
        "static" => NodeKind::LiteralStatic,
        "abstract" => NodeKind::Abstract,
        "final" => NodeKind::Final,
        "native" => NodeKind::LiteralNative,
        "synchronized" => NodeKind::LiteralSynchronized,
        "transient" => NodeKind::LiteralTransient,
        "volatile" => NodeKind::LiteralVolatile,
        "strictfp" => NodeKind::Strictfp,
        "default" => NodeKind::LiteralDefault,
        "extends" => NodeKind::LiteralExtends,
        "implements" => NodeKind::LiteralImplements,
        "throws" => NodeKind::LiteralThrows,
        "void" => NodeKind::LiteralVoid,
        "boolean" => NodeKind::LiteralBoolean,
        "byte" => NodeKind::LiteralByte,
        "char" => NodeKind::LiteralChar,
        "short" => NodeKind::LiteralShort,
        "int" => NodeKind::LiteralInt,
        "long" => NodeKind::LiteralLong,
        "float" => NodeKind::LiteralFloat,
        "double" => NodeKind::LiteralDouble,
        "if" => NodeKind::LiteralIf,
        "else" => NodeKind::LiteralElse,
        "while" => NodeKind::LiteralWhile,
        "do" => NodeKind::LiteralDo,
        "for" => NodeKind::LiteralFor,
        "return" => NodeKind::LiteralReturn,
        "break" => NodeKind::LiteralBreak,
        "continue" => NodeKind::LiteralContinue,
        "throw" => NodeKind::LiteralThrow,
        "new" => NodeKind::LiteralNew,
        "this" => NodeKind::LiteralThis,
        "super" => NodeKind::LiteralSuper,
        "true" => NodeKind::LiteralTrue,
        "false" => NodeKind::LiteralFalse,
        "null" => NodeKind::LiteralNull,
        "instanceof" => NodeKind::LiteralInstanceof,
        _ => return None,
    };
    Some(kind)
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    source: &'a str,
}

/// Splits `source` into real and hidden tokens.
///
/// # Errors
///
/// Returns a [`ParseFailure`] for unterminated literals or comments and for
/// characters outside the vocabulary.
pub fn tokenize(source: &str) -> Result<TokenStream, ParseFailure> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 0,
        tokens: Vec::new(),
        source,
    };
    lexer.run()?;
    Ok(TokenStream::new(lexer.tokens))
}

impl Lexer<'_> {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 0;
            }
            '\r' => {
                if self.peek(0) != Some('\n') {
                    self.line += 1;
                    self.column = 0;
                }
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    fn fail(&self, line: usize, column: usize, message: impl Into<String>) -> ParseFailure {
        ParseFailure::new(line, column, message).with_source_span(self.source)
    }

    fn push(&mut self, kind: NodeKind, start: usize, line: usize, column: usize, channel: Channel) {
        let text: String = self.chars[start..self.pos].iter().collect();
        let index = self.tokens.len();
        self.tokens.push(Token {
            kind,
            text,
            line,
            column,
            index,
            channel,
        });
    }

    fn run(&mut self) -> Result<(), ParseFailure> {
        while let Some(c) = self.peek(0) {
            let (start, line, column) = (self.pos, self.line, self.column);
            if c.is_whitespace() {
                self.advance();
            } else if c == '/' && self.peek(1) == Some('/') {
                while self.peek(0).is_some_and(|c| c != '\n' && c != '\r') {
                    self.advance();
                }
                self.push(NodeKind::SingleLineComment, start, line, column, Channel::Hidden);
            } else if c == '/' && self.peek(1) == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.peek(0) {
                        None => return Err(self.fail(line, column, "unterminated comment")),
                        Some('*') if self.peek(1) == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(_) => {
                            self.advance();
                        }
                    }
                }
                self.push(NodeKind::BlockCommentBegin, start, line, column, Channel::Hidden);
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                while self
                    .peek(0)
                    .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
                {
                    self.advance();
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                let kind = keyword(&word).unwrap_or(NodeKind::Ident);
                self.push(kind, start, line, column, Channel::Default);
            } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                let kind = self.number();
                self.push(kind, start, line, column, Channel::Default);
            } else if c == '"' || c == '\'' {
                self.quoted(c, line, column)?;
                let kind = if c == '"' {
                    NodeKind::StringLiteral
                } else {
                    NodeKind::CharLiteral
                };
                self.push(kind, start, line, column, Channel::Default);
            } else {
                let Some((op, kind)) = OPERATORS.iter().find(|(op, _)| self.looking_at(op)) else {
                    return Err(self.fail(line, column, format!("unexpected character '{c}'")));
                };
                for _ in 0..op.chars().count() {
                    self.advance();
                }
                self.push(*kind, start, line, column, Channel::Default);
            }
        }
        Ok(())
    }

    fn looking_at(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn number(&mut self) -> NodeKind {
        let mut floating = false;
        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X' | 'b' | 'B')) {
            self.advance();
            self.advance();
            while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.advance();
            }
        } else {
            self.digits();
            if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
                floating = true;
                self.advance();
                self.digits();
            }
            if matches!(self.peek(0), Some('e' | 'E')) {
                floating = true;
                self.advance();
                if matches!(self.peek(0), Some('+' | '-')) {
                    self.advance();
                }
                while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        match self.peek(0) {
            Some('l' | 'L') => {
                self.advance();
                NodeKind::NumLong
            }
            Some('f' | 'F') => {
                self.advance();
                NodeKind::NumFloat
            }
            Some('d' | 'D') => {
                self.advance();
                NodeKind::NumDouble
            }
            _ if floating => NodeKind::NumDouble,
            _ => NodeKind::NumInt,
        }
    }

    fn digits(&mut self) {
        while self.peek(0).is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.advance();
        }
    }

    fn quoted(&mut self, quote: char, line: usize, column: usize) -> Result<(), ParseFailure> {
        self.advance();
        loop {
            match self.peek(0) {
                None | Some('\n' | '\r') => {
                    return Err(self.fail(line, column, "unterminated literal"));
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}
