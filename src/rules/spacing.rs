//! Rules about blank runs: indentation, tabs versus spaces, trailing blanks.

use super::window::{self, after, gaps, is_type_like, line_span, nearest, Gap, Splice};
use super::{Layout, Rule};
use crate::checker::{Diagnostic, ErrorCode};
use crate::token::{Bracket, Separator, Token, TokenKind};

pub const RULES: &[Rule] = &[
    Rule {
        name: "trailing-whitespace",
        codes: &[ErrorCode::SpcBeforeNl, ErrorCode::SpaceEmptyLine],
        priority: 5,
        locate: trailing_whitespace,
    },
    Rule {
        name: "mixed-indentation",
        codes: &[ErrorCode::MixedSpaceTab],
        priority: 8,
        locate: mixed_indentation,
    },
    Rule {
        name: "space-before-function",
        codes: &[ErrorCode::SpaceBeforeFunc],
        priority: 10,
        locate: space_before_function,
    },
    Rule {
        name: "space-instead-of-tab",
        codes: &[ErrorCode::SpaceReplaceTab],
        priority: 10,
        locate: space_instead_of_tab,
    },
    Rule {
        name: "tab-instead-of-space",
        codes: &[ErrorCode::TabReplaceSpace],
        priority: 20,
        locate: tab_instead_of_space,
    },
    Rule {
        name: "consecutive-spaces",
        codes: &[ErrorCode::ConsecutiveSpc],
        priority: 20,
        locate: consecutive_spaces,
    },
    Rule {
        name: "space-after-keyword",
        codes: &[ErrorCode::SpaceAfterKw],
        priority: 60,
        locate: space_after_keyword,
    },
];

fn trailing_whitespace(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    // A multi-line comment ending the span means the line end is elsewhere.
    if !tokens[span.end].kind.is_line_end() {
        return None;
    }
    let run = window::gap_before(tokens, span.end, span.start);
    (!run.is_empty()).then(|| Splice::delete(run))
}

fn mixed_indentation(tokens: &[Token], diag: &Diagnostic, layout: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    let gap = gaps(tokens, span).into_iter().next()?;
    if gap.left.is_some() || gap.right.is_none() || !gap.contains(tokens, TokenKind::Space) {
        return None;
    }

    let tab = layout.tab_width.max(1);
    let width = tokens[gap.range.clone()]
        .iter()
        .fold(0, |col, t| match t.kind {
            TokenKind::Tab => (col / tab + 1) * tab,
            _ => col + t.len(),
        });
    let tabs = width.div_ceil(tab);
    let at = gap.position(tokens);
    Some(Splice::new(gap.range, vec![Token::tab(at); tabs]))
}

/// `type<blanks>name`, the gap holding at least one space.
fn declaration_gaps(tokens: &[Token], diag: &Diagnostic) -> Vec<Gap> {
    let Some(span) = line_span(tokens, diag.line) else {
        return Vec::new();
    };
    gaps(tokens, span)
        .into_iter()
        .filter(|gap| match (gap.left, gap.right) {
            (Some(l), Some(r)) => {
                is_type_like(&tokens[l])
                    && (tokens[r].kind == TokenKind::Identifier || window::is_star(&tokens[r]))
                    && gap.contains(tokens, TokenKind::Space)
            }
            _ => false,
        })
        .collect()
}

/// Spaces in a declaration gap become tabs; existing tabs are kept.
fn tabify(tokens: &[Token], gap: Gap) -> Splice {
    let mut tabs: Vec<Token> = tokens[gap.range.clone()]
        .iter()
        .filter(|t| t.kind == TokenKind::Tab)
        .cloned()
        .collect();
    if tabs.is_empty() {
        tabs.push(Token::tab(gap.position(tokens)));
    }
    Splice::new(gap.range, tabs)
}

fn space_instead_of_tab(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let candidates = declaration_gaps(tokens, diag)
        .into_iter()
        .filter(|gap| gap.covers(tokens, diag.column));
    let gap = nearest(candidates, diag.column, |g| g.position(tokens))?;
    Some(tabify(tokens, gap))
}

fn space_before_function(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    let candidates = declaration_gaps(tokens, diag).into_iter().filter(|gap| {
        if !gap.covers(tokens, diag.column) {
            return false;
        }
        let Some(mut i) = gap.right else {
            return false;
        };
        while i < span.end && window::is_star(&tokens[i]) {
            i += 1;
        }
        if i >= span.end || tokens[i].kind != TokenKind::Identifier {
            return false;
        }
        window::next_significant(tokens, i + 1, span.end)
            .is_some_and(|j| tokens[j].kind == TokenKind::Bracket(Bracket::OpenParen))
    });
    let gap = nearest(candidates, diag.column, |g| g.position(tokens))?;
    Some(tabify(tokens, gap))
}

fn tab_instead_of_space(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    let candidates = gaps(tokens, span)
        .into_iter()
        .filter(|gap| {
            gap.is_inner()
                && gap.contains(tokens, TokenKind::Tab)
                && gap.covers(tokens, diag.column)
        });
    let gap = nearest(candidates, diag.column, |g| g.position(tokens))?;
    let at = gap.position(tokens);
    Some(Splice::new(gap.range, vec![Token::space(at)]))
}

fn consecutive_spaces(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    let candidates = gaps(tokens, span)
        .into_iter()
        .filter(|gap| {
            gap.is_inner() && gap.space_count(tokens) >= 2 && gap.covers(tokens, diag.column)
        });
    let gap = nearest(candidates, diag.column, |g| g.position(tokens))?;

    // With a tab in the run the spaces are the excess; otherwise keep one.
    let at = gap.position(tokens);
    let replacement = if gap.contains(tokens, TokenKind::Tab) {
        tokens[gap.range.clone()]
            .iter()
            .filter(|t| t.kind == TokenKind::Tab)
            .cloned()
            .collect()
    } else {
        vec![Token::space(at)]
    };
    Some(Splice::new(gap.range, replacement))
}

fn space_after_keyword(tokens: &[Token], diag: &Diagnostic, _: &Layout) -> Option<Splice> {
    let span = line_span(tokens, diag.line)?;
    let candidates = span.clone().filter(|&i| {
        let TokenKind::Keyword(kw) = tokens[i].kind else {
            return false;
        };
        let next = i + 1;
        kw.wants_trailing_space()
            && next < span.end
            && tokens[next].kind.is_significant()
            && tokens[next].kind != TokenKind::Separator(Separator::Semicolon)
            && window::covers(tokens, i..next + 1, diag.column)
    });
    let i = nearest(candidates, diag.column, |&i| tokens[i].position)?;
    Some(Splice::insert(i + 1, Token::space(after(&tokens[i]))))
}
