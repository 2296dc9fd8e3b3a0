//! Node kinds and kind bitsets.
//!
//! [`NodeKind`] is the fixed vocabulary shared by the lexer, the parse tree and
//! the syntax tree. Every kind has a canonical upper-case name used in
//! configuration (`tokens = ["METHOD_DEF", "CTOR_DEF"]`) and in tree dumps.

use std::fmt;

macro_rules! node_kinds {
    ($($variant:ident => $name:literal,)*) => {
        /// Tag identifying what a syntax node represents.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum NodeKind {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl NodeKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$variant,)*];

            /// Canonical name of this kind.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Looks up a kind by its canonical name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

node_kinds! {
    // declarations and structure
    PackageDef => "PACKAGE_DEF",
    Annotations => "ANNOTATIONS",
    Import => "IMPORT",
    StaticImport => "STATIC_IMPORT",
    ClassDef => "CLASS_DEF",
    InterfaceDef => "INTERFACE_DEF",
    ObjBlock => "OBJBLOCK",
    Modifiers => "MODIFIERS",
    MethodDef => "METHOD_DEF",
    CtorDef => "CTOR_DEF",
    VariableDef => "VARIABLE_DEF",
    Parameters => "PARAMETERS",
    ParameterDef => "PARAMETER_DEF",
    Type => "TYPE",
    TypeArguments => "TYPE_ARGUMENTS",
    TypeArgument => "TYPE_ARGUMENT",
    WildcardType => "WILDCARD_TYPE",
    TypeUpperBounds => "TYPE_UPPER_BOUNDS",
    TypeLowerBounds => "TYPE_LOWER_BOUNDS",
    GenericStart => "GENERIC_START",
    GenericEnd => "GENERIC_END",
    ExtendsClause => "EXTENDS_CLAUSE",
    ImplementsClause => "IMPLEMENTS_CLAUSE",
    LiteralThrows => "LITERAL_THROWS",
    ArrayDeclarator => "ARRAY_DECLARATOR",
    StaticInit => "STATIC_INIT",
    InstanceInit => "INSTANCE_INIT",
    Slist => "SLIST",
    // punctuation
    LCurly => "LCURLY",
    RCurly => "RCURLY",
    Semi => "SEMI",
    Comma => "COMMA",
    LParen => "LPAREN",
    RParen => "RPAREN",
    LBrack => "LBRACK",
    RBrack => "RBRACK",
    Dot => "DOT",
    Star => "STAR",
    // keywords and modifiers
    LiteralClass => "LITERAL_CLASS",
    LiteralInterface => "LITERAL_INTERFACE",
    LiteralPackage => "LITERAL_PACKAGE",
    LiteralImport => "LITERAL_IMPORT",
    LiteralPublic => "LITERAL_PUBLIC",
    LiteralProtected => "LITERAL_PROTECTED",
    LiteralPrivate => "LITERAL_PRIVATE",
    LiteralStatic => "LITERAL_STATIC",
    Abstract => "ABSTRACT",
    Final => "FINAL",
    LiteralNative => "LITERAL_NATIVE",
    LiteralSynchronized => "LITERAL_SYNCHRONIZED",
    LiteralTransient => "LITERAL_TRANSIENT",
    LiteralVolatile => "LITERAL_VOLATILE",
    Strictfp => "STRICTFP",
    LiteralDefault => "LITERAL_DEFAULT",
    LiteralExtends => "LITERAL_EXTENDS",
    LiteralImplements => "LITERAL_IMPLEMENTS",
    LiteralVoid => "LITERAL_VOID",
    LiteralBoolean => "LITERAL_BOOLEAN",
    LiteralByte => "LITERAL_BYTE",
    LiteralChar => "LITERAL_CHAR",
    LiteralShort => "LITERAL_SHORT",
    LiteralInt => "LITERAL_INT",
    LiteralLong => "LITERAL_LONG",
    LiteralFloat => "LITERAL_FLOAT",
    LiteralDouble => "LITERAL_DOUBLE",
    LiteralIf => "LITERAL_IF",
    LiteralElse => "LITERAL_ELSE",
    LiteralWhile => "LITERAL_WHILE",
    LiteralDo => "LITERAL_DO",
    DoWhile => "DO_WHILE",
    LiteralFor => "LITERAL_FOR",
    LiteralReturn => "LITERAL_RETURN",
    LiteralBreak => "LITERAL_BREAK",
    LiteralContinue => "LITERAL_CONTINUE",
    LiteralThrow => "LITERAL_THROW",
    LiteralNew => "LITERAL_NEW",
    LiteralThis => "LITERAL_THIS",
    LiteralSuper => "LITERAL_SUPER",
    LiteralTrue => "LITERAL_TRUE",
    LiteralFalse => "LITERAL_FALSE",
    LiteralNull => "LITERAL_NULL",
    LiteralInstanceof => "LITERAL_INSTANCEOF",
    // expressions
    Expr => "EXPR",
    Elist => "ELIST",
    MethodCall => "METHOD_CALL",
    Ident => "IDENT",
    NumInt => "NUM_INT",
    NumLong => "NUM_LONG",
    NumFloat => "NUM_FLOAT",
    NumDouble => "NUM_DOUBLE",
    CharLiteral => "CHAR_LITERAL",
    StringLiteral => "STRING_LITERAL",
    Assign => "ASSIGN",
    PlusAssign => "PLUS_ASSIGN",
    MinusAssign => "MINUS_ASSIGN",
    StarAssign => "STAR_ASSIGN",
    DivAssign => "DIV_ASSIGN",
    ModAssign => "MOD_ASSIGN",
    BandAssign => "BAND_ASSIGN",
    BorAssign => "BOR_ASSIGN",
    BxorAssign => "BXOR_ASSIGN",
    SlAssign => "SL_ASSIGN",
    SrAssign => "SR_ASSIGN",
    BsrAssign => "BSR_ASSIGN",
    Question => "QUESTION",
    Colon => "COLON",
    Lor => "LOR",
    Land => "LAND",
    Bor => "BOR",
    Bxor => "BXOR",
    Band => "BAND",
    Equal => "EQUAL",
    NotEqual => "NOT_EQUAL",
    Lt => "LT",
    Gt => "GT",
    Le => "LE",
    Ge => "GE",
    Sl => "SL",
    Sr => "SR",
    Bsr => "BSR",
    Plus => "PLUS",
    Minus => "MINUS",
    Div => "DIV",
    Mod => "MOD",
    Inc => "INC",
    Dec => "DEC",
    PostInc => "POST_INC",
    PostDec => "POST_DEC",
    UnaryMinus => "UNARY_MINUS",
    UnaryPlus => "UNARY_PLUS",
    Bnot => "BNOT",
    Lnot => "LNOT",
    Typecast => "TYPECAST",
    IndexOp => "INDEX_OP",
    // statements
    ForInit => "FOR_INIT",
    ForCondition => "FOR_CONDITION",
    ForIterator => "FOR_ITERATOR",
    EmptyStat => "EMPTY_STAT",
    // comments
    SingleLineComment => "SINGLE_LINE_COMMENT",
    BlockCommentBegin => "BLOCK_COMMENT_BEGIN",
    BlockCommentEnd => "BLOCK_COMMENT_END",
    CommentContent => "COMMENT_CONTENT",
    JavadocContent => "JAVADOC_CONTENT",
}

impl NodeKind {
    /// Number of kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this kind in [`NodeKind::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns true for the kinds that only appear in the comment-augmented tree.
    #[must_use]
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            Self::SingleLineComment
                | Self::BlockCommentBegin
                | Self::BlockCommentEnd
                | Self::CommentContent
                | Self::JavadocContent
        )
    }

    /// Parses a comma separated list of kind names.
    ///
    /// # Errors
    ///
    /// Returns the first name that is not a known kind.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|name| Self::from_name(name).ok_or_else(|| name.to_string()))
            .collect()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const WORDS: usize = NodeKind::COUNT.div_ceil(64);

/// A set of node kinds stored as a fixed-width bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KindSet {
    bits: [u64; WORDS],
}

impl KindSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: [0; WORDS] }
    }

    /// Creates a set containing every kind.
    #[must_use]
    pub fn all() -> Self {
        NodeKind::ALL.iter().copied().collect()
    }

    /// Adds a kind to the set.
    pub fn insert(&mut self, kind: NodeKind) {
        let i = kind.index();
        self.bits[i / 64] |= 1 << (i % 64);
    }

    /// Returns true if the kind is in the set.
    #[must_use]
    pub fn contains(&self, kind: NodeKind) -> bool {
        let i = kind.index();
        self.bits[i / 64] & (1 << (i % 64)) != 0
    }

    /// Adds every kind of `other` to this set.
    pub fn union_with(&mut self, other: &Self) {
        for (word, theirs) in self.bits.iter_mut().zip(other.bits.iter()) {
            *word |= theirs;
        }
    }

    /// Returns true if every kind of this set is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .all(|(mine, theirs)| mine & !theirs == 0)
    }

    /// Returns true if the set has no kinds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Iterates the kinds of the set in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = NodeKind> + '_ {
        NodeKind::ALL.iter().copied().filter(|k| self.contains(*k))
    }
}

impl FromIterator<NodeKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = NodeKind>>(iter: I) -> Self {
        let mut set = Self::new();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl<'a> FromIterator<&'a NodeKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = &'a NodeKind>>(iter: I) -> Self {
        iter.into_iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_for_every_kind() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_name(kind.name()), Some(*kind));
        }
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(NodeKind::from_name("NOT_A_KIND"), None);
    }

    #[test]
    fn comment_kinds() {
        assert!(NodeKind::SingleLineComment.is_comment());
        assert!(NodeKind::JavadocContent.is_comment());
        assert!(!NodeKind::Slist.is_comment());
    }

    #[test]
    fn parse_list_reports_bad_name() {
        let kinds = NodeKind::parse_list("METHOD_DEF, CTOR_DEF").unwrap();
        assert_eq!(kinds, vec![NodeKind::MethodDef, NodeKind::CtorDef]);
        assert_eq!(
            NodeKind::parse_list("METHOD_DEF,BOGUS"),
            Err("BOGUS".to_string())
        );
    }

    // --- KindSet tests ---

    #[test]
    fn kind_set_insert_and_contains() {
        let mut set = KindSet::new();
        assert!(set.is_empty());
        set.insert(NodeKind::JavadocContent);
        set.insert(NodeKind::PackageDef);
        assert!(set.contains(NodeKind::JavadocContent));
        assert!(set.contains(NodeKind::PackageDef));
        assert!(!set.contains(NodeKind::Ident));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn kind_set_subset() {
        let small: KindSet = [NodeKind::Land, NodeKind::Lor].iter().collect();
        let big: KindSet = [NodeKind::Land, NodeKind::Lor, NodeKind::Band]
            .iter()
            .collect();
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
        assert!(big.is_subset(&KindSet::all()));
    }
}
