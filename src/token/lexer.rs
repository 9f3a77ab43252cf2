//! Single-pass lossless tokenizer for C sources.
//!
//! Recognizers run in a fixed priority order at each position and never
//! backtrack. Nothing is ever dropped: a character no recognizer claims
//! becomes an `Unrecognized` token, and unterminated comments or literals
//! run to the end of input. `tokenize` cannot fail.

use super::{Bracket, Keyword, Operator, Position, Separator, Token, TokenKind};

/// Tokenize `source` into a stream terminated by exactly one `Eof` token.
#[must_use]
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    while !lexer.at_end() {
        let (kind, len) = lexer.scan();
        tokens.push(lexer.emit(kind, len));
    }

    tokens.push(Token::new(TokenKind::Eof, lexer.position(), ""));
    tokens
}

struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.offset >= self.src.len()
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    /// Classify the token starting at the current offset and return its byte length.
    fn scan(&self) -> (TokenKind, usize) {
        let rest = self.rest();
        let bytes = rest.as_bytes();

        if rest.starts_with("//") {
            return (TokenKind::Comment, line_comment_len(rest));
        }
        if rest.starts_with("/*") {
            return (TokenKind::Comment, block_comment_len(rest));
        }
        if bytes[0] == b'#' {
            return (TokenKind::Directive, directive_len(rest));
        }
        if bytes[0] == b'"' {
            return (TokenKind::Str, quoted_len(rest, b'"'));
        }
        if bytes[0] == b'\'' {
            return (TokenKind::Char, quoted_len(rest, b'\''));
        }
        if bytes[0].is_ascii_digit() {
            return (TokenKind::Number, number_len(rest));
        }
        if let Some((text, op)) = Operator::TABLE.iter().find(|(text, _)| rest.starts_with(text)) {
            return (TokenKind::Operator(*op), text.len());
        }

        // Non-empty: at_end() was checked by the caller.
        let Some(c) = rest.chars().next() else {
            return (TokenKind::Eof, 0);
        };

        if let Some(sep) = Separator::from_char(c) {
            return (TokenKind::Separator(sep), 1);
        }
        if let Some(bracket) = Bracket::from_char(c) {
            return (TokenKind::Bracket(bracket), 1);
        }
        if c == '_' || c.is_ascii_alphabetic() {
            let len = ident_len(rest);
            let kind = Keyword::from_ident(&rest[..len])
                .map(TokenKind::Keyword)
                .unwrap_or(TokenKind::Identifier);
            return (kind, len);
        }
        match c {
            ' ' => (TokenKind::Space, run_len(bytes, b' ')),
            '\t' => (TokenKind::Tab, 1),
            '\n' => (TokenKind::Newline, 1),
            '\r' if rest.starts_with("\r\n") => (TokenKind::Newline, 2),
            other => (TokenKind::Unrecognized, other.len_utf8()),
        }
    }

    /// Cut `len` bytes into a token and advance the line/column counters over them.
    fn emit(&mut self, kind: TokenKind, len: usize) -> Token {
        let start = self.position();
        let text = &self.src[self.offset..self.offset + len];

        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }

        self.offset += len;
        Token::new(kind, start, text)
    }
}

fn line_comment_len(rest: &str) -> usize {
    match rest.find('\n') {
        // Leave a CRLF's '\r' attached to the newline token.
        Some(nl) if nl > 0 && rest.as_bytes()[nl - 1] == b'\r' => nl - 1,
        Some(nl) => nl,
        None => rest.len(),
    }
}

fn block_comment_len(rest: &str) -> usize {
    match rest[2..].find("*/") {
        Some(end) => end + 4,
        None => rest.len(),
    }
}

/// A directive runs to end of line, following backslash continuations.
fn directive_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            b'\\' if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') => {
                i += 3
            }
            b'\n' => break,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => break,
            _ => i += 1,
        }
    }
    i
}

/// Quoted literal including delimiters; a backslash always takes the next character.
fn quoted_len(rest: &str, quote: u8) -> usize {
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            if chars.next().is_none() {
                return rest.len();
            }
        } else if c as u32 == u32::from(quote) {
            return i + 1;
        }
    }
    rest.len()
}

fn number_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut i;

    if bytes.len() > 1 && bytes[0] == b'0' && (bytes[1] == b'x' || bytes[1] == b'X') {
        i = 2;
        while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
    } else {
        i = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    // Suffix (`UL`, `f`, exponent) is taken as-is; validity is the checker's concern.
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    i
}

fn ident_len(rest: &str) -> usize {
    rest.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count()
}

fn run_len(bytes: &[u8], byte: u8) -> usize {
    bytes.iter().take_while(|b| **b == byte).count()
}
