//! Style checker integration.
//!
//! The checker is an opaque external process: it is given a path and
//! answers with a textual report that [`parse_checker_output`] turns into
//! [`Diagnostic`]s. A non-zero exit status is normal when violations exist,
//! so only a report with nothing recognisable in it counts as a failure.
//!
//! # Example
//!
//! ```no_run
//! use normfix::checker::{Checker, Norminette};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let checker = Norminette::new(vec!["norminette".into()], Duration::from_secs(30));
//! let diagnostics = checker.check(Path::new("src/main.c")).unwrap();
//!
//! for diag in &diagnostics {
//!     println!("{diag}");
//! }
//! ```

pub mod diagnostic;

pub use diagnostic::{
    parse_checker_output, CheckerReport, Diagnostic, ErrorCode, FileVerdict,
};

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::process::{Invocation, ProcessError};

#[derive(Error, Debug)]
pub enum CheckerError {
    #[error("checker command is empty")]
    EmptyCommand,

    #[error("checker unavailable: {0}")]
    Unavailable(#[from] ProcessError),

    #[error("checker produced no usable report (exit status {status}): {stderr}")]
    NoReport { status: String, stderr: String },
}

/// Anything that can produce diagnostics for a file.
pub trait Checker: Send + Sync {
    fn check(&self, path: &Path) -> Result<Vec<Diagnostic>, CheckerError>;
}

/// The norminette command-line checker.
#[derive(Debug, Clone)]
pub struct Norminette {
    /// Program followed by any fixed leading arguments.
    command: Vec<String>,
    timeout: Duration,
}

impl Norminette {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    /// Run the checker on `path` and return the whole parsed report.
    pub fn report(&self, path: &Path) -> Result<CheckerReport, CheckerError> {
        let (program, leading) = self
            .command
            .split_first()
            .ok_or(CheckerError::EmptyCommand)?;
        let target = path.to_string_lossy();

        let output = Invocation::new(program, self.timeout)
            .args(leading.iter().map(String::as_str))
            .arg(&target)
            .run()?;

        // Violations are reported through a failing exit status, and some
        // versions write part of the report to stderr.
        let mut text = output.stdout.clone();
        text.push('\n');
        text.push_str(&output.stderr);
        let report = parse_checker_output(&text);

        if !output.success() && !report.is_recognised() {
            return Err(CheckerError::NoReport {
                status: output.status.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        tracing::debug!(
            path = %path.display(),
            diagnostics = report.diagnostics.len(),
            "checker finished"
        );
        Ok(report)
    }
}

impl Checker for Norminette {
    fn check(&self, path: &Path) -> Result<Vec<Diagnostic>, CheckerError> {
        let report = self.report(path)?;
        Ok(report
            .diagnostics
            .into_iter()
            .map(|mut diag| {
                if diag.file.as_os_str().is_empty() {
                    diag.file = path.to_path_buf();
                }
                diag
            })
            .collect())
    }
}
