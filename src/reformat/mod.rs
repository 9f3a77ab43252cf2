//! Whole-file reformatting.
//!
//! Two strategies implement the same [`Reformatter`] capability: the external
//! [`ClangFormat`] and the built-in [`FallbackNormalizer`]. [`ReformatStage`]
//! prefers the external tool and degrades to the normalizer whenever the tool
//! is missing, too old, times out or fails.

mod clang;
mod fallback;

pub use clang::{ClangFormat, StyleProfile};
pub use fallback::FallbackNormalizer;

use semver::{Version, VersionReq};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::FormatterConfig;
use crate::process::ProcessError;

#[derive(Error, Debug)]
pub enum ReformatError {
    #[error("reformatter unavailable: {0}")]
    Unavailable(#[from] ProcessError),

    #[error("`{tool}` failed: {stderr}")]
    Failed { tool: String, stderr: String },

    #[error("`{0}` printed nothing for a non-empty file")]
    EmptyOutput(String),

    #[error("cannot read a version from `{tool} --version`: {output}")]
    BadVersion { tool: String, output: String },

    #[error("`{tool}` {found} does not satisfy {required}")]
    UnsupportedVersion {
        tool: String,
        found: Version,
        required: VersionReq,
    },
}

/// Whole-file text in, reformatted text out.
pub trait Reformatter: Send + Sync {
    fn name(&self) -> &str;

    fn reformat(&self, source: &str) -> Result<String, ReformatError>;
}

/// Text produced by the reformat stage and which strategy produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reformatted {
    pub text: String,
    pub strategy: String,
    /// Why the primary strategy was skipped, if it was.
    pub fallback_reason: Option<String>,
}

pub struct ReformatStage {
    primary: Option<Box<dyn Reformatter>>,
    fallback: FallbackNormalizer,
}

impl ReformatStage {
    pub fn new(primary: Option<Box<dyn Reformatter>>, fallback: FallbackNormalizer) -> Self {
        Self { primary, fallback }
    }

    /// Normalizer only.
    pub fn builtin(tab_width: usize) -> Self {
        Self::new(None, FallbackNormalizer::new(tab_width))
    }

    /// Build from configuration, probing the external formatter once.
    pub fn from_config(config: &FormatterConfig) -> Self {
        let fallback = FallbackNormalizer::new(config.tab_width);
        if !config.enabled {
            debug!("external formatter disabled by configuration");
            return Self::new(None, fallback);
        }

        let profile = StyleProfile {
            tab_width: config.tab_width,
            column_limit: config.column_limit,
        };
        let mut tool = ClangFormat::new(
            config.command.clone(),
            profile,
            Duration::from_secs(config.timeout_secs),
        );
        if let Ok(req) = VersionReq::parse(&config.version_req) {
            tool = tool.with_version_req(req);
        }

        match tool.probe() {
            Ok(version) => {
                debug!(tool = %config.command, %version, "external formatter available");
                Self::new(Some(Box::new(tool)), fallback)
            }
            Err(e) => {
                warn!("{e}; using the built-in normalizer");
                Self::new(None, fallback)
            }
        }
    }

    pub fn strategy(&self) -> &str {
        match &self.primary {
            Some(tool) => tool.name(),
            None => self.fallback.name(),
        }
    }

    /// Never fails: any error from the primary strategy selects the fallback.
    pub fn reformat(&self, source: &str) -> Reformatted {
        let Some(tool) = &self.primary else {
            return Reformatted {
                text: self.fallback.normalize(source),
                strategy: self.fallback.name().to_string(),
                fallback_reason: None,
            };
        };

        match tool.reformat(source) {
            Ok(text) => Reformatted {
                text,
                strategy: tool.name().to_string(),
                fallback_reason: None,
            },
            Err(e) => {
                warn!(tool = tool.name(), "{e}; falling back to the built-in normalizer");
                Reformatted {
                    text: self.fallback.normalize(source),
                    strategy: self.fallback.name().to_string(),
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }
}

impl std::fmt::Debug for ReformatStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReformatStage")
            .field("strategy", &self.strategy())
            .field("fallback", &self.fallback)
            .finish()
    }
}
