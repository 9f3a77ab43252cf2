//! clang-format as the external whole-file reformatter.

use semver::{Version, VersionReq};
use std::time::Duration;

use super::{ReformatError, Reformatter};
use crate::process::Invocation;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// The fixed style the checker expects, parametrised by tab width and
/// column limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleProfile {
    pub tab_width: usize,
    pub column_limit: usize,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            tab_width: 4,
            column_limit: 80,
        }
    }
}

impl StyleProfile {
    /// Inline `-style=` argument.
    pub fn to_style_arg(&self) -> String {
        let options = [
            "BasedOnStyle: LLVM".to_string(),
            "UseTab: Always".to_string(),
            format!("IndentWidth: {}", self.tab_width),
            format!("TabWidth: {}", self.tab_width),
            format!("ContinuationIndentWidth: {}", self.tab_width),
            format!("ColumnLimit: {}", self.column_limit),
            "BreakBeforeBraces: Allman".to_string(),
            "AllowShortFunctionsOnASingleLine: None".to_string(),
            "AllowShortIfStatementsOnASingleLine: Never".to_string(),
            "AllowShortLoopsOnASingleLine: false".to_string(),
            "AllowShortBlocksOnASingleLine: Never".to_string(),
            "AlignConsecutiveDeclarations: true".to_string(),
            "AlignAfterOpenBracket: DontAlign".to_string(),
            "PointerAlignment: Right".to_string(),
            "SpaceBeforeParens: ControlStatements".to_string(),
            "IndentCaseLabels: false".to_string(),
            "MaxEmptyLinesToKeep: 1".to_string(),
            "KeepEmptyLinesAtTheStartOfBlocks: false".to_string(),
            "ReflowComments: false".to_string(),
            "SortIncludes: false".to_string(),
        ];
        format!("-style={{{}}}", options.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct ClangFormat {
    program: String,
    profile: StyleProfile,
    version_req: Option<VersionReq>,
    timeout: Duration,
}

impl ClangFormat {
    pub fn new(program: impl Into<String>, profile: StyleProfile, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            profile,
            version_req: None,
            timeout,
        }
    }

    pub fn with_version_req(mut self, req: VersionReq) -> Self {
        self.version_req = Some(req);
        self
    }

    /// Check the tool answers `--version` quickly and meets the requirement.
    pub fn probe(&self) -> Result<Version, ReformatError> {
        let output = Invocation::new(&self.program, PROBE_TIMEOUT.min(self.timeout))
            .arg("--version")
            .run()?;
        if !output.success() {
            return Err(ReformatError::Failed {
                tool: self.program.clone(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        let version = parse_version(&output.stdout).ok_or_else(|| ReformatError::BadVersion {
            tool: self.program.clone(),
            output: output.stdout.trim().to_string(),
        })?;

        if let Some(req) = &self.version_req {
            if !req.matches(&version) {
                return Err(ReformatError::UnsupportedVersion {
                    tool: self.program.clone(),
                    found: version,
                    required: req.clone(),
                });
            }
        }
        Ok(version)
    }
}

impl Reformatter for ClangFormat {
    fn name(&self) -> &str {
        &self.program
    }

    fn reformat(&self, source: &str) -> Result<String, ReformatError> {
        let style = self.profile.to_style_arg();
        let output = Invocation::new(&self.program, self.timeout)
            .args([style.as_str(), "--assume-filename=source.c"])
            .stdin(source)
            .run()?;

        if !output.success() {
            return Err(ReformatError::Failed {
                tool: self.program.clone(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        if output.stdout.is_empty() && !source.trim().is_empty() {
            return Err(ReformatError::EmptyOutput(self.program.clone()));
        }
        Ok(output.stdout)
    }
}

/// Pull `MAJOR.MINOR.PATCH` out of a `--version` banner such as
/// `Ubuntu clang-format version 14.0.0-1ubuntu1`.
fn parse_version(banner: &str) -> Option<Version> {
    let after = &banner[banner.find("version")? + "version".len()..];
    let raw: String = after
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts = raw.split('.').filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}
