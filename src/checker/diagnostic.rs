//! Diagnostic model and parsing of norminette's textual report.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::token::Position;

/// Error codes the repair machinery knows about.
///
/// Codes outside this set still flow through as [`Diagnostic::code`] text;
/// they are simply never claimed by a rule or structural provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCode {
    SpcBeforeNl,
    SpaceEmptyLine,
    MixedSpaceTab,
    SpaceBeforeFunc,
    SpaceReplaceTab,
    TabReplaceSpace,
    ConsecutiveSpc,
    SpcAfterPointer,
    SpcBfrPointer,
    NoSpcAfrPar,
    NoSpcBfrPar,
    SpcAfterOperator,
    SpcBfrOperator,
    NoSpcAfrOpr,
    NoSpcBfrOpr,
    SpaceAfterKw,
    InvalidHeader,
}

impl ErrorCode {
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::SpcBeforeNl,
        ErrorCode::SpaceEmptyLine,
        ErrorCode::MixedSpaceTab,
        ErrorCode::SpaceBeforeFunc,
        ErrorCode::SpaceReplaceTab,
        ErrorCode::TabReplaceSpace,
        ErrorCode::ConsecutiveSpc,
        ErrorCode::SpcAfterPointer,
        ErrorCode::SpcBfrPointer,
        ErrorCode::NoSpcAfrPar,
        ErrorCode::NoSpcBfrPar,
        ErrorCode::SpcAfterOperator,
        ErrorCode::SpcBfrOperator,
        ErrorCode::NoSpcAfrOpr,
        ErrorCode::NoSpcBfrOpr,
        ErrorCode::SpaceAfterKw,
        ErrorCode::InvalidHeader,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SpcBeforeNl => "SPC_BEFORE_NL",
            ErrorCode::SpaceEmptyLine => "SPACE_EMPTY_LINE",
            ErrorCode::MixedSpaceTab => "MIXED_SPACE_TAB",
            ErrorCode::SpaceBeforeFunc => "SPACE_BEFORE_FUNC",
            ErrorCode::SpaceReplaceTab => "SPACE_REPLACE_TAB",
            ErrorCode::TabReplaceSpace => "TAB_REPLACE_SPACE",
            ErrorCode::ConsecutiveSpc => "CONSECUTIVE_SPC",
            ErrorCode::SpcAfterPointer => "SPC_AFTER_POINTER",
            ErrorCode::SpcBfrPointer => "SPC_BFR_POINTER",
            ErrorCode::NoSpcAfrPar => "NO_SPC_AFR_PAR",
            ErrorCode::NoSpcBfrPar => "NO_SPC_BFR_PAR",
            ErrorCode::SpcAfterOperator => "SPC_AFTER_OPERATOR",
            ErrorCode::SpcBfrOperator => "SPC_BFR_OPERATOR",
            ErrorCode::NoSpcAfrOpr => "NO_SPC_AFR_OPR",
            ErrorCode::NoSpcBfrOpr => "NO_SPC_BFR_OPR",
            ErrorCode::SpaceAfterKw => "SPACE_AFTER_KW",
            ErrorCode::InvalidHeader => "INVALID_HEADER",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or(())
    }
}

/// One checker finding. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            code: code.into(),
            message: message.into(),
        }
    }

    /// The known error code, if this diagnostic carries one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code.parse().ok()
    }

    /// Check if this is a specific error code.
    pub fn is_error_code(&self, code: ErrorCode) -> bool {
        self.code == code.as_str()
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} {}",
            self.file.display(),
            self.line,
            self.column,
            self.code,
            self.message
        )
    }
}

/// Per-file verdict line from the report (`<file>: OK!` / `<file>: Error!`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVerdict {
    pub file: PathBuf,
    pub ok: bool,
}

/// Parsed checker report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckerReport {
    pub verdicts: Vec<FileVerdict>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckerReport {
    /// True when the output carried anything the parser recognised.
    pub fn is_recognised(&self) -> bool {
        !self.verdicts.is_empty() || !self.diagnostics.is_empty()
    }
}

/// Parse checker output. Lines that fit neither grammar are skipped.
pub fn parse_checker_output(output: &str) -> CheckerReport {
    let mut report = CheckerReport::default();
    let mut current_file = PathBuf::new();

    for line in output.lines() {
        let line = line.trim_end();

        if let Some(verdict) = parse_verdict(line) {
            current_file = verdict.file.clone();
            report.verdicts.push(verdict);
            continue;
        }

        if let Some(diag) = parse_error_line(line, &current_file) {
            report.diagnostics.push(diag);
        }
    }

    report
}

fn parse_verdict(line: &str) -> Option<FileVerdict> {
    let (file, ok) = if let Some(file) = line.strip_suffix(": OK!") {
        (file, true)
    } else if let Some(file) = line.strip_suffix(": Error!") {
        (file, false)
    } else {
        return None;
    };

    if file.is_empty() {
        return None;
    }

    Some(FileVerdict {
        file: PathBuf::from(file),
        ok,
    })
}

/// Parse `Error: <CODE> (line: <N>, col: <M>): <message>`.
fn parse_error_line(line: &str, file: &Path) -> Option<Diagnostic> {
    let rest = line.trim_start().strip_prefix("Error:")?.trim_start();

    let code_end = rest.find(|c: char| c.is_whitespace() || c == '(')?;
    let code = &rest[..code_end];
    if code.is_empty()
        || !code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
    {
        return None;
    }

    let rest = &rest[code_end..];
    let line_no = number_after(rest, "line:")?;
    let column = number_after(rest, "col:")?;
    let message = rest
        .find("):")
        .map(|i| rest[i + 2..].trim())
        .unwrap_or_default();

    Some(Diagnostic::new(file, line_no, column, code, message))
}

fn number_after(text: &str, key: &str) -> Option<usize> {
    let start = text.find(key)? + key.len();
    let digits: String = text[start..]
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
