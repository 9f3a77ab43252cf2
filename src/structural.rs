//! File-level edits that token rewriting cannot express.
//!
//! Providers are keyed by error code and know nothing about the pipeline;
//! the pipeline knows nothing about their internals.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::checker::{Diagnostic, ErrorCode};
use crate::edit::{read_text, EditError};

pub trait StructuralFixer: Send + Sync {
    fn name(&self) -> &str;

    fn codes(&self) -> &[ErrorCode];

    fn can_fix(&self, diagnostic: &Diagnostic, content: &str, path: &Path) -> bool;

    fn apply(&self, content: &str, path: &Path, diagnostic: &Diagnostic) -> String;
}

/// Result of one structural pass over a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralOutcome {
    pub text: String,
    /// Names of the providers that changed the text.
    pub applied: Vec<String>,
}

#[derive(Default)]
pub struct StructuralRegistry {
    fixers: Vec<Box<dyn StructuralFixer>>,
}

impl StructuralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fixer: Box<dyn StructuralFixer>) {
        self.fixers.push(fixer);
    }

    pub fn is_empty(&self) -> bool {
        self.fixers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fixers.iter().map(|f| f.name())
    }

    /// Each provider fires at most once per file, on the first diagnostic
    /// it can fix.
    pub fn run(&self, content: &str, path: &Path, diagnostics: &[Diagnostic]) -> StructuralOutcome {
        let mut text = content.to_string();
        let mut applied = Vec::new();

        for fixer in &self.fixers {
            let claimed = diagnostics.iter().find(|d| {
                d.error_code().is_some_and(|code| fixer.codes().contains(&code))
                    && fixer.can_fix(d, &text, path)
            });
            if let Some(diag) = claimed {
                let next = fixer.apply(&text, path, diag);
                if next != text {
                    debug!(fixer = fixer.name(), file = %path.display(), "structural fix applied");
                    applied.push(fixer.name().to_string());
                    text = next;
                }
            }
        }

        StructuralOutcome { text, applied }
    }
}

impl fmt::Debug for StructuralRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Prepends a fixed header read from a template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    source: PathBuf,
    header: String,
}

impl HeaderTemplate {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            source: PathBuf::new(),
            header: header.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, EditError> {
        Ok(Self {
            source: path.to_path_buf(),
            header: read_text(path)?,
        })
    }

    pub fn header(&self) -> &str {
        &self.header
    }
}

impl StructuralFixer for HeaderTemplate {
    fn name(&self) -> &str {
        "header-template"
    }

    fn codes(&self) -> &[ErrorCode] {
        &[ErrorCode::InvalidHeader]
    }

    fn can_fix(&self, _diagnostic: &Diagnostic, content: &str, _path: &Path) -> bool {
        !self.header.is_empty() && !content.starts_with(&self.header)
    }

    fn apply(&self, content: &str, _path: &Path, _diagnostic: &Diagnostic) -> String {
        if content.starts_with(&self.header) {
            return content.to_string();
        }
        format!("{}{}", self.header, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "/* header */\n";

    fn registry() -> StructuralRegistry {
        let mut registry = StructuralRegistry::new();
        registry.register(Box::new(HeaderTemplate::new(HEADER)));
        registry
    }

    fn header_diag() -> Diagnostic {
        Diagnostic::new("a.c", 1, 1, "INVALID_HEADER", "Missing or invalid 42 header")
    }

    #[test]
    fn test_header_is_prepended_once() {
        let path = Path::new("a.c");
        let out = registry().run("int\tx;\n", path, &[header_diag(), header_diag()]);
        assert_eq!(out.text, "/* header */\nint\tx;\n");
        assert_eq!(out.applied, vec!["header-template".to_string()]);

        let again = registry().run(&out.text, path, &[header_diag()]);
        assert_eq!(again.text, out.text);
        assert!(again.applied.is_empty());
    }

    #[test]
    fn test_other_codes_pass_through() {
        let diag = Diagnostic::new("a.c", 1, 4, "SPACE_REPLACE_TAB", "");
        let out = registry().run("int x;\n", Path::new("a.c"), &[diag]);
        assert_eq!(out.text, "int x;\n");
        assert!(out.applied.is_empty());
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("header.txt");
        std::fs::write(&path, HEADER).unwrap();
        assert_eq!(HeaderTemplate::from_file(&path).unwrap().header(), HEADER);
    }
}
