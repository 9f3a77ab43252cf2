//! Spacing around parentheses and operators.

use super::window::{
    after, around, covers, gap_before, gap_from, is_close_group, is_open_group, line_span, nearest,
    Splice,
};
use super::{Layout, Rule};
use crate::checker::{Diagnostic, ErrorCode};
use crate::token::{Separator, Token, TokenKind};

pub const RULES: &[Rule] = &[
    Rule {
        name: "space-after-paren",
        codes: &[ErrorCode::NoSpcAfrPar],
        priority: 40,
        locate: space_after_paren,
    },
    Rule {
        name: "space-before-paren",
        codes: &[ErrorCode::NoSpcBfrPar],
        priority: 40,
        locate: space_before_paren,
    },
    Rule {
        name: "missing-space-after-operator",
        codes: &[ErrorCode::SpcAfterOperator],
        priority: 50,
        locate: missing_space_after_operator,
    },
    Rule {
        name: "missing-space-before-operator",
        codes: &[ErrorCode::SpcBfrOperator],
        priority: 50,
        locate: missing_space_before_operator,
    },
    Rule {
        name: "extra-space-after-operator",
        codes: &[ErrorCode::NoSpcAfrOpr],
        priority: 50,
        locate: extra_space_after_operator,
    },
    Rule {
        name: "extra-space-before-operator",
        codes: &[ErrorCode::NoSpcBfrOpr],
        priority: 50,
        locate: extra_space_before_operator,
    },
];

fn is_operator(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Operator(_))
}

/// Operators plus the separators the checker treats alike for spacing.
fn is_operator_like(token: &Token) -> bool {
    is_operator(token)
        || matches!(
            token.kind,
            TokenKind::Separator(Separator::Comma) | TokenKind::Separator(Separator::Semicolon)
        )
}

/// Pick the anchor nearest the column among `anchor` tokens on the line.
///
/// An anchor only counts when the column lands on it or on the blanks
/// next to it.
fn pick(
    tokens: &[Token],
    diag: &Diagnostic,
    anchor: impl Fn(&[Token], usize, std::ops::Range<usize>) -> bool,
) -> Option<(usize, std::ops::Range<usize>)> {
    let span = line_span(tokens, diag.line)?;
    let candidates = span
        .clone()
        .filter(|&i| {
            anchor(tokens, i, span.clone())
                && covers(tokens, around(tokens, i..i + 1, span.clone()), diag.column)
        })
        .collect::<Vec<_>>();
    let i = nearest(candidates, diag.column, |&i| tokens[i].position)?;
    Some((i, span))
}

fn space_after_paren(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let (i, span) = pick(tokens, diag, |t, i, span| {
        let gap = gap_from(t, i + 1, span.end);
        is_open_group(&t[i]) && !gap.is_empty() && gap.end < span.end
    })?;
    Some(Splice::delete(gap_from(tokens, i + 1, span.end)))
}

fn space_before_paren(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let (i, span) = pick(tokens, diag, |t, i, span| {
        let gap = gap_before(t, i, span.start);
        is_close_group(&t[i]) && !gap.is_empty() && gap.start > span.start
    })?;
    Some(Splice::delete(gap_before(tokens, i, span.start)))
}

fn missing_space_after_operator(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let (i, _) = pick(tokens, diag, |t, i, span| {
        is_operator_like(&t[i]) && i + 1 < span.end && t[i + 1].kind.is_significant()
    })?;
    Some(Splice::insert(i + 1, Token::space(after(&tokens[i]))))
}

fn missing_space_before_operator(
    tokens: &[Token],
    diag: &Diagnostic,
    _: &Layout,
) -> Option<Splice> {
    let (i, _) = pick(tokens, diag, |t, i, span| {
        is_operator(&t[i]) && i > span.start && t[i - 1].kind.is_significant()
    })?;
    Some(Splice::insert(i, Token::space(tokens[i].position)))
}

fn extra_space_after_operator(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let (i, span) = pick(tokens, diag, |t, i, span| {
        let gap = gap_from(t, i + 1, span.end);
        is_operator(&t[i]) && !gap.is_empty() && gap.end < span.end
    })?;
    Some(Splice::delete(gap_from(tokens, i + 1, span.end)))
}

fn extra_space_before_operator(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let (i, span) = pick(tokens, diag, |t, i, span| {
        let gap = gap_before(t, i, span.start);
        is_operator_like(&t[i]) && !gap.is_empty() && gap.start > span.start
    })?;
    Some(Splice::delete(gap_before(tokens, i, span.start)))
}
