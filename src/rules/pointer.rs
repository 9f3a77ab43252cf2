//! Spacing around the pointer star in declarations.

use super::window::{
    around, covers, gap_before, gap_from, is_star, is_type_like, line_span, nearest, Splice,
};
use super::{Layout, Rule};
use crate::checker::{Diagnostic, ErrorCode};
use crate::token::{Bracket, Token, TokenKind};

pub const RULES: &[Rule] = &[
    Rule {
        name: "space-after-pointer",
        codes: &[ErrorCode::SpcAfterPointer],
        priority: 30,
        locate: space_after_pointer,
    },
    Rule {
        name: "space-before-pointer",
        codes: &[ErrorCode::SpcBfrPointer],
        priority: 30,
        locate: space_before_pointer,
    },
];

/// What may follow a pointer star directly: a name, another star, `(*fp)`.
fn binds_to_star(token: &Token) -> bool {
    token.kind == TokenKind::Identifier
        || is_star(token)
        || token.kind == TokenKind::Bracket(Bracket::OpenParen)
}

/// Index one past the star run starting at `star`.
fn run_end(tokens: &[Token], star: usize, end: usize) -> usize {
    (star..end).find(|&i| !is_star(&tokens[i])).unwrap_or(end)
}

/// `*<blanks>name` becomes `*name`.
fn space_after_pointer(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    let candidates = span.clone().filter_map(|i| {
        if !is_star(&tokens[i]) {
            return None;
        }
        let gap = gap_from(tokens, i + 1, span.end);
        if gap.is_empty() || gap.end == span.end || !binds_to_star(&tokens[gap.end]) {
            return None;
        }
        let mut first = i;
        while first > span.start && is_star(&tokens[first - 1]) {
            first -= 1;
        }
        let reach = around(tokens, first..gap.end, span.clone());
        covers(tokens, reach, diag.column).then_some((i, gap))
    });
    let (_, gap) = nearest(candidates, diag.column, |(i, _)| tokens[*i].position)?;
    Some(Splice::delete(gap))
}

/// `type*name` / `type* name` / `type *  name` becomes `type *name`.
fn space_before_pointer(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    let candidates = span.clone().filter(|&i| {
        if !is_star(&tokens[i]) {
            return false;
        }
        let before = gap_before(tokens, i, span.start);
        // First star of a run, with the type right before it.
        before.start > span.start
            && is_type_like(&tokens[before.start - 1])
            && covers(tokens, before.start - 1..run_end(tokens, i, span.end), diag.column)
    });
    let star = nearest(candidates, diag.column, |&i| tokens[i].position)?;
    let last = run_end(tokens, star, span.end) - 1;

    let before = gap_before(tokens, star, span.start);
    let after = gap_from(tokens, last + 1, span.end);
    let keep_after = !(after.end < span.end && binds_to_star(&tokens[after.end]));

    let mut replacement = if before.is_empty() {
        vec![Token::space(tokens[star].position)]
    } else {
        tokens[before.clone()].to_vec()
    };
    replacement.extend_from_slice(&tokens[star..=last]);
    if keep_after {
        replacement.extend_from_slice(&tokens[after.clone()]);
    }
    Some(Splice::new(before.start..after.end, replacement))
}
