//! Built-in whitespace normalizer used when the external formatter is
//! unavailable.
//!
//! Works on the token stream, so comments, string and char literals and
//! preprocessor lines are never touched. Policy:
//!
//! - leading indentation becomes tabs, its visual width rounded up to a
//!   whole tab stop;
//! - blanks before a line end are removed;
//! - between two tokens a run of spaces collapses to one space, while tabs
//!   are kept (declaration alignment is tab based) and spaces mixed into a
//!   tab run are dropped;
//! - runs of empty lines collapse to one, trailing empty lines are removed
//!   and non-empty output ends with exactly one newline.

use super::{ReformatError, Reformatter};
use crate::token::{tokenize, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackNormalizer {
    tab_width: usize,
}

impl Default for FallbackNormalizer {
    fn default() -> Self {
        Self { tab_width: 4 }
    }
}

impl FallbackNormalizer {
    pub fn new(tab_width: usize) -> Self {
        Self {
            tab_width: tab_width.max(1),
        }
    }

    #[must_use]
    pub fn normalize(&self, source: &str) -> String {
        let tokens = tokenize(source);
        let mut lines: Vec<(String, Option<&str>)> = Vec::new();
        let mut current: Vec<&Token> = Vec::new();

        for token in &tokens {
            match token.kind {
                TokenKind::Newline => {
                    lines.push((self.render_line(&current), Some(token.text.as_str())));
                    current.clear();
                }
                TokenKind::Eof => {}
                _ => current.push(token),
            }
        }
        if !current.is_empty() {
            lines.push((self.render_line(&current), None));
        }

        while lines.last().is_some_and(|(content, _)| content.is_empty()) {
            lines.pop();
        }

        let default_newline = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Newline)
            .map_or("\n", |t| t.text.as_str());

        let mut out = String::with_capacity(source.len());
        let mut empty_run = 0;
        for (content, newline) in &lines {
            if content.is_empty() {
                empty_run += 1;
                if empty_run > 1 {
                    continue;
                }
            } else {
                empty_run = 0;
            }
            out.push_str(content);
            out.push_str(newline.unwrap_or(default_newline));
        }
        out
    }

    fn render_line(&self, line: &[&Token]) -> String {
        let lead = line.iter().take_while(|t| t.kind.is_blank()).count();
        let Some(last) = line.iter().rposition(|t| !t.kind.is_blank()) else {
            return String::new();
        };

        let mut out = String::new();
        let width = line[..lead].iter().fold(0, |col, t| match t.kind {
            TokenKind::Tab => (col / self.tab_width + 1) * self.tab_width,
            _ => col + t.len(),
        });
        out.extend(std::iter::repeat_n('\t', width.div_ceil(self.tab_width)));

        let mut i = lead;
        while i <= last {
            if !line[i].kind.is_blank() {
                out.push_str(&line[i].text);
                i += 1;
                continue;
            }
            let run_end = i + line[i..].iter().take_while(|t| t.kind.is_blank()).count();
            let tabs = line[i..run_end]
                .iter()
                .filter(|t| t.kind == TokenKind::Tab)
                .count();
            if tabs == 0 {
                out.push(' ');
            } else {
                out.extend(std::iter::repeat_n('\t', tabs));
            }
            i = run_end;
        }
        out
    }
}

impl Reformatter for FallbackNormalizer {
    fn name(&self) -> &str {
        "builtin-normalizer"
    }

    fn reformat(&self, source: &str) -> Result<String, ReformatError> {
        Ok(self.normalize(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(source: &str) -> String {
        FallbackNormalizer::default().normalize(source)
    }

    #[test]
    fn test_indentation_becomes_tabs() {
        assert_eq!(normalize("    return (0);\n"), "\treturn (0);\n");
        assert_eq!(normalize("      x;\n"), "\t\tx;\n");
        assert_eq!(normalize("  \t x;\n"), "\t\tx;\n");
    }

    #[test]
    fn test_trailing_blanks_and_final_newline() {
        assert_eq!(normalize("int\tx;  \t\n}"), "int\tx;\n}\n");
        assert_eq!(normalize("a;\n\n\n\nb;\n\n\n"), "a;\n\nb;\n");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\n\n"), "");
    }

    #[test]
    fn test_inner_runs() {
        assert_eq!(normalize("x  =   1;\n"), "x = 1;\n");
        assert_eq!(normalize("int\t\t  x;\n"), "int\t\tx;\n");
    }

    #[test]
    fn test_literals_comments_and_directives_untouched() {
        let source = "#define A  1   \n/*   keep    this   */\nchar\t*s = \"a    b\";\n";
        assert_eq!(
            normalize(source),
            "#define A  1   \n/*   keep    this   */\nchar\t*s = \"a    b\";\n"
        );
    }

    #[test]
    fn test_crlf_preserved() {
        assert_eq!(normalize("a;  \r\n  b;\r\n"), "a;\r\n\tb;\r\n");
    }

    #[test]
    fn test_is_idempotent() {
        let source = "int  main(void)\n{\n    int   i;  \n\n\n\treturn (0);\n}";
        let once = normalize(source);
        assert_eq!(normalize(&once), once);
    }
}
