//! Token model for lossless C tokenization.
//!
//! A token stream is a flat, order-preserving sequence in which whitespace,
//! newlines, comments and directives are first-class tokens. Concatenating
//! the text of every token reproduces the input exactly; [`reconstruct`] is
//! that concatenation.

pub mod lexer;

pub use lexer::tokenize;

use std::fmt;

/// 1-based line/column coordinate, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };

    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// C reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Auto,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Register,
    Restrict,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
    Bool,
}

impl Keyword {
    pub fn from_ident(ident: &str) -> Option<Self> {
        let kw = match ident {
            "auto" => Keyword::Auto,
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "char" => Keyword::Char,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "default" => Keyword::Default,
            "do" => Keyword::Do,
            "double" => Keyword::Double,
            "else" => Keyword::Else,
            "enum" => Keyword::Enum,
            "extern" => Keyword::Extern,
            "float" => Keyword::Float,
            "for" => Keyword::For,
            "goto" => Keyword::Goto,
            "if" => Keyword::If,
            "inline" => Keyword::Inline,
            "int" => Keyword::Int,
            "long" => Keyword::Long,
            "register" => Keyword::Register,
            "restrict" => Keyword::Restrict,
            "return" => Keyword::Return,
            "short" => Keyword::Short,
            "signed" => Keyword::Signed,
            "sizeof" => Keyword::Sizeof,
            "static" => Keyword::Static,
            "struct" => Keyword::Struct,
            "switch" => Keyword::Switch,
            "typedef" => Keyword::Typedef,
            "union" => Keyword::Union,
            "unsigned" => Keyword::Unsigned,
            "void" => Keyword::Void,
            "volatile" => Keyword::Volatile,
            "while" => Keyword::While,
            "_Bool" => Keyword::Bool,
            _ => return None,
        };
        Some(kw)
    }

    /// Keywords that can end a type in a declaration (`unsigned int`, `char`).
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Keyword::Char
                | Keyword::Double
                | Keyword::Float
                | Keyword::Int
                | Keyword::Long
                | Keyword::Short
                | Keyword::Signed
                | Keyword::Unsigned
                | Keyword::Void
                | Keyword::Bool
                | Keyword::Const
                | Keyword::Volatile
                | Keyword::Restrict
        )
    }

    /// Keywords that must be followed by a space before their operand.
    pub fn wants_trailing_space(self) -> bool {
        matches!(
            self,
            Keyword::Return
                | Keyword::If
                | Keyword::While
                | Keyword::For
                | Keyword::Switch
                | Keyword::Else
                | Keyword::Do
                | Keyword::Case
        )
    }
}

/// Operators and punctuation lexemes, matched longest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    ShlAssign,
    ShrAssign,
    Ellipsis,
    Arrow,
    Increment,
    Decrement,
    Shl,
    Shr,
    LessEq,
    GreaterEq,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Less,
    Greater,
    Not,
    Tilde,
    And,
    Or,
    Xor,
    Question,
    Colon,
}

impl Operator {
    /// Every operator paired with its lexeme, longest lexemes first.
    pub const TABLE: &'static [(&'static str, Operator)] = &[
        ("<<=", Operator::ShlAssign),
        (">>=", Operator::ShrAssign),
        ("...", Operator::Ellipsis),
        ("->", Operator::Arrow),
        ("++", Operator::Increment),
        ("--", Operator::Decrement),
        ("<<", Operator::Shl),
        (">>", Operator::Shr),
        ("<=", Operator::LessEq),
        (">=", Operator::GreaterEq),
        ("==", Operator::EqEq),
        ("!=", Operator::NotEq),
        ("&&", Operator::AndAnd),
        ("||", Operator::OrOr),
        ("+=", Operator::PlusAssign),
        ("-=", Operator::MinusAssign),
        ("*=", Operator::StarAssign),
        ("/=", Operator::SlashAssign),
        ("%=", Operator::PercentAssign),
        ("&=", Operator::AndAssign),
        ("^=", Operator::XorAssign),
        ("|=", Operator::OrAssign),
        ("+", Operator::Plus),
        ("-", Operator::Minus),
        ("*", Operator::Star),
        ("/", Operator::Slash),
        ("%", Operator::Percent),
        ("=", Operator::Assign),
        ("<", Operator::Less),
        (">", Operator::Greater),
        ("!", Operator::Not),
        ("~", Operator::Tilde),
        ("&", Operator::And),
        ("|", Operator::Or),
        ("^", Operator::Xor),
        ("?", Operator::Question),
        (":", Operator::Colon),
    ];

    pub fn as_str(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(text, _)| *text)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bracket {
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenSquare,
    CloseSquare,
}

impl Bracket {
    pub fn from_char(c: char) -> Option<Self> {
        let bracket = match c {
            '(' => Bracket::OpenParen,
            ')' => Bracket::CloseParen,
            '{' => Bracket::OpenBrace,
            '}' => Bracket::CloseBrace,
            '[' => Bracket::OpenSquare,
            ']' => Bracket::CloseSquare,
            _ => return None,
        };
        Some(bracket)
    }

    pub fn is_open(self) -> bool {
        matches!(
            self,
            Bracket::OpenParen | Bracket::OpenBrace | Bracket::OpenSquare
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    Semicolon,
    Comma,
    Dot,
}

impl Separator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ';' => Some(Separator::Semicolon),
            ',' => Some(Separator::Comma),
            '.' => Some(Separator::Dot),
            _ => None,
        }
    }
}

/// Closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    Str,
    Char,
    Keyword(Keyword),
    Operator(Operator),
    Bracket(Bracket),
    Separator(Separator),
    /// Whole preprocessor line, including continuations.
    Directive,
    /// Line or block comment, delimiters included.
    Comment,
    /// One or more literal spaces.
    Space,
    /// Exactly one literal tab.
    Tab,
    Newline,
    Eof,
    /// A single character no recognizer claimed.
    Unrecognized,
}

impl TokenKind {
    /// Space or tab.
    pub fn is_blank(self) -> bool {
        matches!(self, TokenKind::Space | TokenKind::Tab)
    }

    /// Ends the current line (newline or end of stream).
    pub fn is_line_end(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Eof)
    }

    /// Carries program content: anything but blanks, newlines, comments and EOF.
    pub fn is_significant(self) -> bool {
        !matches!(
            self,
            TokenKind::Space
                | TokenKind::Tab
                | TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Comment
        )
    }
}

/// An immutable token: kind, origin position and exact source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position, text: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            text: text.into(),
        }
    }

    pub fn space(position: Position) -> Self {
        Self::new(TokenKind::Space, position, " ")
    }

    pub fn tab(position: Position) -> Self {
        Self::new(TokenKind::Tab, position, "\t")
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Concatenate token texts in order, stopping at the end-of-stream token.
#[must_use]
pub fn reconstruct(tokens: &[Token]) -> String {
    let mut out = String::with_capacity(tokens.iter().map(|t| t.text.len()).sum());
    for token in tokens {
        if token.kind == TokenKind::Eof {
            break;
        }
        out.push_str(&token.text);
    }
    out
}
