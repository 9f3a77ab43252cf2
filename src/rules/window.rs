//! Token-window helpers shared by the rule set.
//!
//! Rules look only at the reported line. A *gap* is a maximal run of
//! space/tab tokens; anchors are the tokens on either side of it.

use std::ops::Range;

use crate::token::{tokenize, Bracket, Keyword, Operator, Position, Token, TokenKind};

/// Replace `range` with `replacement`. The unit every rule produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub replacement: Vec<Token>,
}

impl Splice {
    pub fn new(range: Range<usize>, replacement: Vec<Token>) -> Self {
        Self { range, replacement }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::new(range, Vec::new())
    }

    pub fn insert(at: usize, token: Token) -> Self {
        Self::new(at..at, vec![token])
    }

    /// True when applying the splice would not change the text.
    pub fn is_noop(&self, tokens: &[Token]) -> bool {
        let before: String = tokens[self.range.clone()]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        let after: String = self.replacement.iter().map(|t| t.text.as_str()).collect();
        before == after
    }

    /// True when the edited neighbourhood still lexes into the same
    /// tokens, so a deletion never glues `+ +` into `++` or `/ *` into a
    /// comment opener.
    pub fn keeps_lexing(&self, tokens: &[Token]) -> bool {
        let lo = self.range.start.saturating_sub(1);
        let hi = (self.range.end + 1).min(tokens.len());
        let edited: Vec<&Token> = tokens[lo..self.range.start]
            .iter()
            .chain(&self.replacement)
            .chain(&tokens[self.range.end..hi])
            .collect();

        let text: String = edited.iter().map(|t| t.text.as_str()).collect();
        let relexed = tokenize(&text);
        let expected = edited.iter().filter(|t| is_solid(t)).map(|t| t.text.as_str());
        expected.eq(relexed.iter().filter(|t| is_solid(t)).map(|t| t.text.as_str()))
    }

    pub fn apply(&self, tokens: &[Token]) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len() + self.replacement.len());
        out.extend_from_slice(&tokens[..self.range.start]);
        out.extend(self.replacement.iter().cloned());
        out.extend_from_slice(&tokens[self.range.end..]);
        out
    }
}

fn is_solid(token: &Token) -> bool {
    !token.kind.is_blank() && token.kind != TokenKind::Eof
}

/// Index range of the tokens that start on `line`, excluding the line terminator.
pub fn line_span(tokens: &[Token], line: usize) -> Option<Range<usize>> {
    let start = tokens
        .iter()
        .position(|t| t.position.line == line && !t.kind.is_line_end())?;
    let len = tokens[start..]
        .iter()
        .take_while(|t| t.position.line == line && !t.kind.is_line_end())
        .count();
    Some(start..start + len)
}

/// Blank run starting at `from` (possibly empty), bounded by `end`.
pub fn gap_from(tokens: &[Token], from: usize, end: usize) -> Range<usize> {
    let len = tokens[from..end]
        .iter()
        .take_while(|t| t.kind.is_blank())
        .count();
    from..from + len
}

/// Blank run ending just before `to` (possibly empty), bounded by `start`.
pub fn gap_before(tokens: &[Token], to: usize, start: usize) -> Range<usize> {
    let len = tokens[start..to]
        .iter()
        .rev()
        .take_while(|t| t.kind.is_blank())
        .count();
    to - len..to
}

/// Every maximal blank run in `span` together with its neighbours.
pub fn gaps(tokens: &[Token], span: Range<usize>) -> Vec<Gap> {
    let mut out = Vec::new();
    let mut i = span.start;
    while i < span.end {
        if !tokens[i].kind.is_blank() {
            i += 1;
            continue;
        }
        let run = gap_from(tokens, i, span.end);
        out.push(Gap {
            left: (run.start > span.start).then(|| run.start - 1),
            right: (run.end < span.end).then_some(run.end),
            range: run.clone(),
        });
        i = run.end;
    }
    out
}

/// A blank run and the indices of the tokens around it on the same line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub range: Range<usize>,
    /// `None` when the gap is leading indentation.
    pub left: Option<usize>,
    /// `None` when the gap runs to the end of the line.
    pub right: Option<usize>,
}

impl Gap {
    pub fn contains(&self, tokens: &[Token], kind: TokenKind) -> bool {
        tokens[self.range.clone()].iter().any(|t| t.kind == kind)
    }

    /// Both neighbours exist: the gap sits between two tokens on the line.
    pub fn is_inner(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn position(&self, tokens: &[Token]) -> Position {
        tokens[self.range.start].position
    }

    /// Whether `column` falls on the gap or on one of its neighbours.
    pub fn covers(&self, tokens: &[Token], column: usize) -> bool {
        let first = self.left.unwrap_or(self.range.start);
        let last = self.right.map_or(self.range.end, |r| r + 1);
        covers(tokens, first..last, column)
    }

    /// Total number of space characters in the run.
    pub fn space_count(&self, tokens: &[Token]) -> usize {
        tokens[self.range.clone()]
            .iter()
            .filter(|t| t.kind == TokenKind::Space)
            .map(Token::len)
            .sum()
    }
}

/// Whether `column` lies on `tokens[range]` or touches its end.
///
/// Candidates that fail this are not the window the checker reported, so
/// a rule never reaches across the line for some other match.
pub fn covers(tokens: &[Token], range: Range<usize>, column: usize) -> bool {
    let (Some(first), Some(last)) = (tokens.get(range.start), tokens.get(range.end.wrapping_sub(1)))
    else {
        return false;
    };
    !range.is_empty() && (first.position.column..=after(last).column).contains(&column)
}

/// `range` widened over the blank runs on either side, within `span`.
pub fn around(tokens: &[Token], range: Range<usize>, span: Range<usize>) -> Range<usize> {
    gap_before(tokens, range.start, span.start).start..gap_from(tokens, range.end, span.end).end
}

/// Pick the candidate whose origin column is closest to `column`.
pub fn nearest<T>(
    candidates: impl IntoIterator<Item = T>,
    column: usize,
    position: impl Fn(&T) -> Position,
) -> Option<T> {
    candidates
        .into_iter()
        .min_by_key(|c| position(c).column.abs_diff(column))
}

/// Position immediately after a single-line token, in origin coordinates.
pub fn after(token: &Token) -> Position {
    Position::new(token.position.line, token.position.column + token.len())
}

/// Tokens that can end the type part of a declaration.
pub fn is_type_like(token: &Token) -> bool {
    match token.kind {
        TokenKind::Identifier => true,
        TokenKind::Keyword(kw) => kw.is_type(),
        _ => false,
    }
}

pub fn is_star(token: &Token) -> bool {
    token.kind == TokenKind::Operator(Operator::Star)
}

pub fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    token.kind == TokenKind::Keyword(keyword)
}

pub fn is_open_group(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Bracket(Bracket::OpenParen) | TokenKind::Bracket(Bracket::OpenSquare)
    )
}

pub fn is_close_group(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Bracket(Bracket::CloseParen) | TokenKind::Bracket(Bracket::CloseSquare)
    )
}

/// Index of the first significant token at or after `from` within `end`.
pub fn next_significant(tokens: &[Token], from: usize, end: usize) -> Option<usize> {
    (from..end).find(|&i| tokens[i].kind.is_significant())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    #[test]
    fn test_line_span_skips_other_lines() {
        let tokens = tokenize("a\n b c\nd");
        let span = line_span(&tokens, 2).unwrap();
        let texts: Vec<_> = tokens[span].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec![" ", "b", " ", "c"]);
        assert!(line_span(&tokens, 9).is_none());
    }

    #[test]
    fn test_gaps_classify_leading_inner_trailing() {
        let tokens = tokenize("\t int  x; \n");
        let span = line_span(&tokens, 1).unwrap();
        let found = gaps(&tokens, span);
        assert_eq!(found.len(), 3);
        assert!(found[0].left.is_none());
        assert!(found[1].is_inner());
        assert_eq!(found[1].space_count(&tokens), 2);
        assert!(found[2].right.is_none());
    }

    #[test]
    fn test_splice_noop_detection() {
        let tokens = tokenize("a b");
        let same = Splice::new(1..2, vec![Token::space(tokens[1].position)]);
        assert!(same.is_noop(&tokens));
        let tab = Splice::new(1..2, vec![Token::tab(tokens[1].position)]);
        assert!(!tab.is_noop(&tokens));
        assert_eq!(crate::token::reconstruct(&tab.apply(&tokens)), "a\tb");
    }

    #[test]
    fn test_splice_must_not_merge_tokens() {
        let tokens = tokenize("a + +b");
        assert!(!Splice::delete(3..4).keeps_lexing(&tokens));
        assert!(Splice::delete(1..2).keeps_lexing(&tokens));

        let tokens = tokenize("x / *p");
        assert!(!Splice::delete(3..4).keeps_lexing(&tokens));
    }

    #[test]
    fn test_covers_stops_at_the_window() {
        let tokens = tokenize("int x; char c;");
        let span = line_span(&tokens, 1).unwrap();
        let found = gaps(&tokens, span.clone());
        // `int x` spans columns 1..=6 including the touch on `;`.
        assert!(found[0].covers(&tokens, 4));
        assert!(found[0].covers(&tokens, 6));
        assert!(!found[0].covers(&tokens, 7));
        assert!(!found[2].covers(&tokens, 4));
        assert!(found[2].covers(&tokens, 11));

        // `;` at column 13 widened over the blank before it.
        let tokens = tokenize("\treturn (x) ;");
        let span = line_span(&tokens, 1).unwrap();
        let semi = span.end - 1;
        assert!(covers(&tokens, around(&tokens, semi..semi + 1, span.clone()), 12));
        assert!(!covers(&tokens, semi..semi + 1, 12));
        assert!(!covers(&tokens, 0..0, 1));
    }

    #[test]
    fn test_nearest_prefers_closest_column() {
        let tokens = tokenize("a b c d");
        let span = line_span(&tokens, 1).unwrap();
        let found = gaps(&tokens, span);
        let pick = nearest(found, 5, |g| g.position(&tokens)).unwrap();
        assert_eq!(pick.range, 3..4);
    }
}
