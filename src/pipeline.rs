//! Per-file repair as an explicit, forward-only state machine.
//!
//! ```text
//! Initial -> Structural -> Reformat -> TokenRepair -> Validated -> Reported
//!    \___________________________________________________________/
//!                         (no diagnostics)
//! ```
//!
//! The current text is carried from stage to stage as a value. A stage's
//! output reaches the disk only once it is fully computed, through
//! [`FileEdit`], so an aborted run leaves the file as the last completed stage
//! wrote it. Failures never escape a file: they end its run early and are
//! recorded as notes on its [`FileReport`].

use rayon::prelude::*;
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::checker::{Checker, CheckerError, Diagnostic, Norminette};
use crate::config::FixerConfig;
use crate::edit::{read_text, EditError, FileEdit};
use crate::reformat::ReformatStage;
use crate::rules::{AppliedFix, Layout, RuleSet, TokenFormatter};
use crate::structural::{HeaderTemplate, StructuralRegistry};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("checker failed: {0}")]
    Checker(#[from] CheckerError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("cannot prepare dry-run copy: {0}")]
    DryRun(std::io::Error),

    #[error("cannot load header template {path}: {source}")]
    Header { path: PathBuf, source: EditError },

    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Stages that may change a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Structural,
    Reformat,
    TokenRepair,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Structural => "structural",
            Stage::Reformat => "reformat",
            Stage::TokenRepair => "token-repair",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Structural,
    Reformat,
    TokenRepair,
    Validated,
    Reported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub changed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: ReportStatus,
    /// Diagnostics before any stage ran.
    pub before: Vec<Diagnostic>,
    /// Diagnostics left after the last stage.
    pub after: Vec<Diagnostic>,
    pub stages: Vec<StageOutcome>,
    pub fixes: Vec<AppliedFix>,
    pub notes: Vec<String>,
    /// The run stopped early on an error recorded in `notes`.
    pub aborted: bool,
    #[serde(skip)]
    pub original: String,
    #[serde(skip)]
    pub repaired: String,
}

impl FileReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: ReportStatus::Error,
            before: Vec::new(),
            after: Vec::new(),
            stages: Vec::new(),
            fixes: Vec::new(),
            notes: Vec::new(),
            aborted: false,
            original: String::new(),
            repaired: String::new(),
        }
    }

    pub fn status(&self) -> ReportStatus {
        if !self.aborted && self.after.is_empty() {
            ReportStatus::Ok
        } else {
            ReportStatus::Error
        }
    }

    pub fn changed(&self) -> bool {
        self.original != self.repaired
    }

    pub fn changed_stages(&self) -> impl Iterator<Item = &StageOutcome> {
        self.stages.iter().filter(|s| s.changed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Work on a temporary copy; the original file is never written.
    pub dry_run: bool,
    /// Run the whole-file reformat stage.
    pub reformat: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            reformat: true,
        }
    }
}

/// Mutable state of one file's run.
struct Run<'a> {
    /// Path the checker and writes operate on (a temp copy in dry-run mode).
    work: PathBuf,
    /// Path reported to the user.
    path: &'a Path,
    text: String,
    /// What is on disk at `work`.
    on_disk: String,
    /// Diagnostics for `text`, unless `stale`.
    diagnostics: Vec<Diagnostic>,
    stale: bool,
    report: FileReport,
}

pub struct RepairPipeline {
    checker: Box<dyn Checker>,
    structural: StructuralRegistry,
    reformat: ReformatStage,
    formatter: TokenFormatter,
    options: PipelineOptions,
}

impl RepairPipeline {
    pub fn new(
        checker: Box<dyn Checker>,
        structural: StructuralRegistry,
        reformat: ReformatStage,
        formatter: TokenFormatter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            checker,
            structural,
            reformat,
            formatter,
            options,
        }
    }

    pub fn from_config(config: &FixerConfig, options: PipelineOptions) -> Result<Self, PipelineError> {
        let checker = Norminette::new(
            config.checker.command.clone(),
            std::time::Duration::from_secs(config.checker.timeout_secs),
        );

        let mut structural = StructuralRegistry::new();
        if let Some(path) = &config.header.template {
            let template = HeaderTemplate::from_file(path).map_err(|source| PipelineError::Header {
                path: path.clone(),
                source,
            })?;
            structural.register(Box::new(template));
        }

        let reformat = if options.reformat {
            ReformatStage::from_config(&config.formatter)
        } else {
            ReformatStage::builtin(config.formatter.tab_width)
        };

        let formatter = TokenFormatter::new(RuleSet::with_disabled(&config.rules.disabled))
            .with_layout(Layout {
                tab_width: config.formatter.tab_width,
            });

        Ok(Self::new(Box::new(checker), structural, reformat, formatter, options))
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Run the checker only.
    pub fn check(&self, path: &Path) -> Result<Vec<Diagnostic>, CheckerError> {
        self.checker.check(path)
    }

    /// Repair one file. Never fails; problems end up in the report's notes.
    pub fn repair(&self, path: &Path) -> FileReport {
        let _span = info_span!("repair", file = %path.display()).entered();
        let mut report = FileReport::new(path);

        let original = match read_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("{e}");
                report.notes.push(format!("cannot read file: {e}"));
                report.aborted = true;
                report.status = report.status();
                return report;
            }
        };
        report.original = original.clone();
        report.repaired = original.clone();

        // Held until the run ends so the copy outlives every stage.
        let scratch = match self.prepare_workspace(path, &original) {
            Ok(scratch) => scratch,
            Err(e) => {
                warn!("{e}");
                report.notes.push(e.to_string());
                report.aborted = true;
                report.status = report.status();
                return report;
            }
        };
        let work = match &scratch {
            Some((_, copy)) => copy.clone(),
            None => path.to_path_buf(),
        };

        let mut run = Run {
            work,
            path,
            text: original.clone(),
            on_disk: original,
            diagnostics: Vec::new(),
            stale: true,
            report,
        };

        let mut state = State::Initial;
        while state != State::Reported {
            state = match self.step(state, &mut run) {
                Ok(next) => next,
                Err(e) => {
                    warn!(?state, "{e}");
                    run.report.notes.push(e.to_string());
                    run.report.aborted = true;
                    run.report.after = run.diagnostics.clone();
                    State::Reported
                }
            };
        }

        let mut report = run.report;
        report.repaired = run.text;
        report.status = report.status();
        info!(
            before = report.before.len(),
            after = report.after.len(),
            fixes = report.fixes.len(),
            "done"
        );
        report
    }

    /// Repair every file on a pool of `jobs` threads (0 = one per CPU).
    /// Reports come back in input order.
    pub fn repair_all(&self, paths: &[PathBuf], jobs: usize) -> Result<Vec<FileReport>, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
        Ok(pool.install(|| paths.par_iter().map(|p| self.repair(p)).collect()))
    }

    fn step(&self, state: State, run: &mut Run<'_>) -> Result<State, PipelineError> {
        Ok(match state {
            State::Initial => {
                self.refresh(run)?;
                run.report.before = run.diagnostics.clone();
                if run.diagnostics.is_empty() {
                    debug!("clean, nothing to do");
                    State::Reported
                } else {
                    State::Structural
                }
            }
            State::Structural => {
                let outcome = self.structural.run(&run.text, run.path, &run.diagnostics);
                let reason = if outcome.applied.is_empty() {
                    "no structural fix applies".to_string()
                } else {
                    format!("applied {}", outcome.applied.join(", "))
                };
                self.commit(run, Stage::Structural, outcome.text, reason)?;
                State::Reformat
            }
            State::Reformat => {
                if self.options.reformat {
                    let out = self.reformat.reformat(&run.text);
                    let reason = match &out.fallback_reason {
                        Some(why) => {
                            run.report
                                .notes
                                .push(format!("reformatter fell back to {}: {why}", out.strategy));
                            format!("reformatted with {} (fallback)", out.strategy)
                        }
                        None => format!("reformatted with {}", out.strategy),
                    };
                    self.commit(run, Stage::Reformat, out.text, reason)?;
                } else {
                    run.report.stages.push(StageOutcome {
                        stage: Stage::Reformat,
                        changed: false,
                        reason: "skipped".to_string(),
                    });
                }
                State::TokenRepair
            }
            State::TokenRepair => {
                self.refresh(run)?;
                let outcome = self.formatter.format_with_report(&run.text, &run.diagnostics);
                let reason = format!(
                    "{} fixed, {} unclaimed",
                    outcome.applied.len(),
                    outcome.unclaimed.len()
                );
                run.report.fixes = outcome.applied;
                self.commit(run, Stage::TokenRepair, outcome.text, reason)?;
                State::Validated
            }
            State::Validated => {
                self.refresh(run)?;
                run.report.after = run.diagnostics.clone();
                State::Reported
            }
            State::Reported => State::Reported,
        })
    }

    /// Re-run the checker if the text changed since it last ran.
    fn refresh(&self, run: &mut Run<'_>) -> Result<(), PipelineError> {
        if !run.stale {
            return Ok(());
        }
        let mut diagnostics = self.checker.check(&run.work)?;
        for diag in &mut diagnostics {
            diag.file = run.path.to_path_buf();
        }
        debug!(count = diagnostics.len(), "checked");
        run.diagnostics = diagnostics;
        run.stale = false;
        Ok(())
    }

    /// Record a stage result and persist its text if it differs.
    fn commit(
        &self,
        run: &mut Run<'_>,
        stage: Stage,
        text: String,
        reason: String,
    ) -> Result<(), PipelineError> {
        let changed = text != run.text;
        if changed {
            FileEdit::new(&run.work, &run.on_disk, text.as_str()).apply()?;
            info!(%stage, "{reason}");
            run.on_disk = text.clone();
            run.text = text;
            run.stale = true;
        }
        run.report.stages.push(StageOutcome {
            stage,
            changed,
            reason,
        });
        Ok(())
    }

    fn prepare_workspace(
        &self,
        path: &Path,
        text: &str,
    ) -> Result<Option<(TempDir, PathBuf)>, PipelineError> {
        if !self.options.dry_run {
            return Ok(None);
        }
        let dir = tempfile::Builder::new()
            .prefix("normfix-")
            .tempdir()
            .map_err(PipelineError::DryRun)?;
        let name = path.file_name().unwrap_or(OsStr::new("source.c"));
        let copy = dir.path().join(name);
        fs::write(&copy, text).map_err(PipelineError::DryRun)?;
        Ok(Some((dir, copy)))
    }
}

impl fmt::Debug for RepairPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepairPipeline")
            .field("structural", &self.structural)
            .field("reformat", &self.reformat)
            .field("formatter", &self.formatter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessError;
    use crate::reformat::FallbackNormalizer;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Checker whose findings are computed from the file content.
    struct FakeChecker<F> {
        find: F,
        calls: AtomicUsize,
    }

    impl<F> FakeChecker<F>
    where
        F: Fn(&str) -> Vec<(usize, usize, &'static str)> + Send + Sync,
    {
        fn new(find: F) -> Self {
            Self {
                find,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl<F> Checker for FakeChecker<F>
    where
        F: Fn(&str) -> Vec<(usize, usize, &'static str)> + Send + Sync,
    {
        fn check(&self, path: &Path) -> Result<Vec<Diagnostic>, CheckerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = fs::read_to_string(path).map_err(|source| {
                CheckerError::Unavailable(ProcessError::Io {
                    program: "fake".into(),
                    source,
                })
            })?;
            Ok((self.find)(&text)
                .into_iter()
                .map(|(line, column, code)| Diagnostic::new(path, line, column, code, ""))
                .collect())
        }
    }

    struct Unavailable;

    impl Checker for Unavailable {
        fn check(&self, _path: &Path) -> Result<Vec<Diagnostic>, CheckerError> {
            Err(CheckerError::Unavailable(ProcessError::Timeout {
                program: "norminette".into(),
                timeout: Duration::from_secs(1),
            }))
        }
    }

    /// Flags `int x;` and, always, a code no rule claims.
    fn space_and_unclaimed(text: &str) -> Vec<(usize, usize, &'static str)> {
        let mut found = vec![(1, 1, "TOO_MANY_FUNCS")];
        if text.starts_with("int x;") {
            found.push((1, 4, "SPACE_REPLACE_TAB"));
        }
        found
    }

    fn pipeline(checker: Box<dyn Checker>, options: PipelineOptions) -> RepairPipeline {
        RepairPipeline::new(
            checker,
            StructuralRegistry::new(),
            ReformatStage::new(None, FallbackNormalizer::default()),
            TokenFormatter::default(),
            options,
        )
    }

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_clean_file_is_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int  x;   \n");
        let pipeline = pipeline(Box::new(FakeChecker::new(|_| vec![])), PipelineOptions::default());

        let report = pipeline.repair(&path);

        assert_eq!(report.status(), ReportStatus::Ok);
        assert!(report.stages.is_empty());
        assert!(!report.changed());
        assert_eq!(fs::read_to_string(&path).unwrap(), "int  x;   \n");
    }

    #[test]
    fn test_claimed_fixed_unclaimed_reported() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int x;\n");
        let pipeline = pipeline(
            Box::new(FakeChecker::new(space_and_unclaimed)),
            PipelineOptions::default(),
        );

        let report = pipeline.repair(&path);

        assert_eq!(fs::read_to_string(&path).unwrap(), "int\tx;\n");
        assert_eq!(report.before.len(), 2);
        assert_eq!(report.after.len(), 1);
        assert_eq!(report.after[0].code, "TOO_MANY_FUNCS");
        assert_eq!(report.after[0].file, path);
        assert_eq!(report.fixes.len(), 1);
        assert_eq!(report.fixes[0].rule, "space-instead-of-tab");
        assert_eq!(report.status(), ReportStatus::Error);

        let stages: Vec<_> = report.stages.iter().map(|s| (s.stage, s.changed)).collect();
        assert_eq!(
            stages,
            vec![
                (Stage::Structural, false),
                (Stage::Reformat, false),
                (Stage::TokenRepair, true),
            ]
        );
    }

    #[test]
    fn test_checker_reruns_only_after_changes() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int x;\n");
        let checker = std::sync::Arc::new(FakeChecker::new(space_and_unclaimed));

        struct Shared<C>(std::sync::Arc<C>);
        impl<C: Checker> Checker for Shared<C> {
            fn check(&self, path: &Path) -> Result<Vec<Diagnostic>, CheckerError> {
                self.0.check(path)
            }
        }

        pipeline(Box::new(Shared(checker.clone())), PipelineOptions::default()).repair(&path);
        // initial, then once after the token repair changed the text
        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reformat_stage_changes_are_revalidated() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int x;   \n");
        let pipeline = pipeline(
            Box::new(FakeChecker::new(|text| {
                if text.contains("   \n") {
                    vec![(1, 7, "SPC_BEFORE_NL")]
                } else {
                    vec![]
                }
            })),
            PipelineOptions::default(),
        );

        let report = pipeline.repair(&path);

        assert_eq!(report.status(), ReportStatus::Ok);
        assert!(report.fixes.is_empty());
        assert_eq!(
            report.changed_stages().map(|s| s.stage).collect::<Vec<_>>(),
            vec![Stage::Reformat]
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "int x;\n");
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int x;\n");
        let pipeline = pipeline(
            Box::new(FakeChecker::new(space_and_unclaimed)),
            PipelineOptions {
                dry_run: true,
                reformat: true,
            },
        );

        let report = pipeline.repair(&path);

        assert_eq!(fs::read_to_string(&path).unwrap(), "int x;\n");
        assert_eq!(report.repaired, "int\tx;\n");
        assert_eq!(report.after.len(), 1);
        assert_eq!(report.after[0].file, path);
    }

    #[test]
    fn test_skipped_reformat_is_recorded() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int x;\n");
        let pipeline = pipeline(
            Box::new(FakeChecker::new(space_and_unclaimed)),
            PipelineOptions {
                dry_run: false,
                reformat: false,
            },
        );

        let report = pipeline.repair(&path);
        assert_eq!(report.stages[1].stage, Stage::Reformat);
        assert_eq!(report.stages[1].reason, "skipped");
    }

    #[test]
    fn test_rules_share_the_configured_tab_width() {
        let mut config = FixerConfig::default();
        config.formatter.tab_width = 8;
        let pipeline = RepairPipeline::from_config(&config, PipelineOptions::default()).unwrap();
        assert_eq!(pipeline.formatter.layout().tab_width, 8);

        let pipeline =
            RepairPipeline::from_config(&FixerConfig::default(), PipelineOptions::default())
                .unwrap();
        assert_eq!(pipeline.formatter.layout(), Layout::default());
    }

    #[test]
    fn test_structural_stage_runs_first() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int\tx;\n");
        let mut structural = StructuralRegistry::new();
        structural.register(Box::new(HeaderTemplate::new("/* hdr */\n")));
        let pipeline = RepairPipeline::new(
            Box::new(FakeChecker::new(|text| {
                if text.starts_with("/* hdr */") {
                    vec![]
                } else {
                    vec![(1, 1, "INVALID_HEADER")]
                }
            })),
            structural,
            ReformatStage::builtin(4),
            TokenFormatter::default(),
            PipelineOptions::default(),
        );

        let report = pipeline.repair(&path);

        assert_eq!(report.status(), ReportStatus::Ok);
        assert!(report.stages[0].changed);
        assert_eq!(report.stages[0].reason, "applied header-template");
        assert_eq!(fs::read_to_string(&path).unwrap(), "/* hdr */\nint\tx;\n");
    }

    #[test]
    fn test_failures_become_notes() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "a.c", "int x;\n");
        let report = pipeline(Box::new(Unavailable), PipelineOptions::default()).repair(&path);

        assert!(report.aborted);
        assert_eq!(report.status(), ReportStatus::Error);
        assert!(report.notes[0].contains("checker failed"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "int x;\n");

        let missing = pipeline(Box::new(Unavailable), PipelineOptions::default())
            .repair(&temp.path().join("missing.c"));
        assert!(missing.notes[0].starts_with("cannot read file"));
    }

    #[test]
    fn test_repair_all_keeps_input_order() {
        let temp = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..6)
            .map(|i| write(temp.path(), &format!("f{i}.c"), "int x;\n"))
            .collect();
        let pipeline = pipeline(
            Box::new(FakeChecker::new(space_and_unclaimed)),
            PipelineOptions::default(),
        );

        let reports = pipeline.repair_all(&paths, 3).unwrap();

        assert_eq!(
            reports.iter().map(|r| r.path.clone()).collect::<Vec<_>>(),
            paths
        );
        assert!(reports.iter().all(|r| r.fixes.len() == 1));
    }
}
