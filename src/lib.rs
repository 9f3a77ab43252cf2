//! Normfix: automatic repair of C sources flagged by the norminette checker
//!
//! A fixer built on a lossless tokenizer and position-addressed token
//! rewriting. The checker and clang-format are black boxes invoked
//! out-of-process; everything in between works on a flat token stream.
//!
//! # Architecture
//!
//! [`tokenize`] splits a file into tokens whose concatenation reproduces it
//! byte for byte, whitespace and comments included. Each checker
//! [`Diagnostic`] is handed to the [`rules`] that answer to its code; a rule
//! locates the offending window on the reported line and replaces its blank
//! tokens. [`reconstruct`] turns the stream back into text.
//!
//! [`RepairPipeline`] sequences the stages per file: structural edits, a
//! whole-file reformat (clang-format, or a built-in normalizer when it is
//! unavailable), token repair, then a final check.
//!
//! # Safety
//!
//! - Stage output is written only once fully computed
//! - Writes verify the file still holds the text the stage read
//! - Atomic file writes (tempfile + fsync + rename)
//! - Tokenizing never fails and never drops a character
//! - Rules are idempotent; a second pass changes nothing
//!
//! # Example
//!
//! ```
//! use normfix::{Diagnostic, TokenFormatter};
//!
//! let formatter = TokenFormatter::default();
//! let diag = Diagnostic::new("a.c", 1, 5, "SPC_AFTER_POINTER", "space after pointer");
//!
//! assert_eq!(formatter.format("char * ptr;", &[diag]), "char *ptr;");
//! ```

pub mod checker;
pub mod config;
pub mod discover;
pub mod edit;
pub mod logging;
pub mod pipeline;
pub mod process;
pub mod reformat;
pub mod rules;
pub mod structural;
pub mod token;

// Re-exports
pub use checker::{parse_checker_output, Checker, CheckerError, Diagnostic, ErrorCode, Norminette};
pub use config::{discover as discover_config, load_from_path, load_from_str, ConfigError, FixerConfig};
pub use edit::{EditError, EditResult, EditVerification, FileEdit};
pub use pipeline::{
    FileReport, PipelineError, PipelineOptions, RepairPipeline, ReportStatus, Stage, StageOutcome,
};
pub use reformat::{ClangFormat, FallbackNormalizer, ReformatError, ReformatStage, Reformatter};
pub use rules::{AppliedFix, FormatOutcome, Layout, Rule, RuleSet, TokenFormatter};
pub use structural::{HeaderTemplate, StructuralFixer, StructuralRegistry};
pub use token::{reconstruct, tokenize, Position, Token, TokenKind};
