use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use normfix::checker::{Checker, Norminette};
use normfix::config::{self, FixerConfig};
use normfix::discover::source_files;
use normfix::pipeline::{FileReport, PipelineOptions, RepairPipeline, ReportStatus};
use normfix::rules::{builtin_rules, RuleSet};
use normfix::{logging, Diagnostic};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "normfix")]
#[command(about = "Repair C sources flagged by the norminette style checker", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./normfix.toml, then ~/.config/normfix/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging on stderr (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checker and print its diagnostics
    Check {
        /// File or directory to check
        path: PathBuf,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Repair every .c/.h file under a path
    Fix {
        /// File or directory to repair
        path: PathBuf,

        /// Dry run - work on a temporary copy and leave files untouched
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,

        /// Skip the whole-file reformat stage, which the pipeline otherwise always runs
        #[arg(long)]
        no_reformat: bool,

        /// Files repaired in parallel (0 = one per CPU)
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,
    },

    /// List the repair rules in application order
    Rules,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = config::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { path, json } => cmd_check(&config, &path, json),

        Commands::Fix {
            path,
            dry_run,
            diff,
            json,
            no_reformat,
            jobs,
        } => {
            let options = PipelineOptions {
                dry_run,
                reformat: !no_reformat,
            };
            cmd_fix(&config, &path, options, diff, json, jobs)
        }

        Commands::Rules => cmd_rules(&config),
    }
}

fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    let files = source_files(path).with_context(|| format!("cannot walk {}", path.display()))?;
    if files.is_empty() {
        anyhow::bail!("No .c or .h files found under {}", path.display());
    }
    Ok(files)
}

/// Helper: Show unified diff between original and repaired content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (repaired)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_diagnostic(diag: &Diagnostic) {
    println!(
        "  {} {} {}",
        format!("{}:{}", diag.line, diag.column).dimmed(),
        diag.code.yellow(),
        diag.message
    );
}

#[derive(Serialize)]
struct CheckEntry<'a> {
    path: &'a Path,
    diagnostics: Vec<Diagnostic>,
    error: Option<String>,
}

fn cmd_check(config: &FixerConfig, path: &Path, json: bool) -> Result<()> {
    let files = collect_files(path)?;
    let checker = Norminette::new(
        config.checker.command.clone(),
        Duration::from_secs(config.checker.timeout_secs),
    );

    let entries: Vec<CheckEntry> = files
        .iter()
        .map(|file| match checker.check(file) {
            Ok(diagnostics) => CheckEntry {
                path: file,
                diagnostics,
                error: None,
            },
            Err(e) => CheckEntry {
                path: file,
                diagnostics: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect();

    let failing = entries
        .iter()
        .filter(|e| e.error.is_some() || !e.diagnostics.is_empty())
        .count();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            match (&entry.error, entry.diagnostics.is_empty()) {
                (Some(error), _) => {
                    eprintln!("{} {}: {}", "✗".red(), entry.path.display(), error);
                }
                (None, true) => println!("{} {}: OK", "✓".green(), entry.path.display()),
                (None, false) => {
                    println!(
                        "{} {}: {} diagnostics",
                        "✗".red(),
                        entry.path.display(),
                        entry.diagnostics.len()
                    );
                    for diag in &entry.diagnostics {
                        print_diagnostic(diag);
                    }
                }
            }
        }

        println!();
        println!("{}", "Summary:".bold());
        println!("  {} clean", format!("{}", entries.len() - failing).green());
        println!("  {} with errors", format!("{}", failing).red());
    }

    if failing > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &FileReport, dry_run: bool, show_diff: bool) {
    let symbol = match report.status() {
        ReportStatus::Ok => "✓".green(),
        ReportStatus::Error => "✗".red(),
    };
    println!(
        "{} {}: {} -> {} diagnostics",
        symbol,
        report.path.display(),
        report.before.len(),
        report.after.len()
    );

    for stage in report.changed_stages() {
        let verb = if dry_run { "would change" } else { "changed" };
        println!("  {} {} ({})", stage.stage.to_string().cyan(), verb, stage.reason);
    }
    for fix in &report.fixes {
        println!("  {} {}", "fixed".green(), fix);
    }
    for diag in &report.after {
        print_diagnostic(diag);
    }
    for note in &report.notes {
        println!("  {} {}", "note:".yellow(), note);
    }

    if show_diff && report.changed() {
        display_diff(&report.path, &report.original, &report.repaired);
    }
}

fn cmd_fix(
    config: &FixerConfig,
    path: &Path,
    options: PipelineOptions,
    show_diff: bool,
    json: bool,
    jobs: usize,
) -> Result<()> {
    let files = collect_files(path)?;
    let pipeline = RepairPipeline::from_config(config, options)?;

    if options.dry_run && !json {
        println!("{}", "[DRY RUN - files are left untouched]".cyan());
    }

    let reports = pipeline.repair_all(&files, jobs)?;

    let remaining = reports
        .iter()
        .filter(|r| r.status() == ReportStatus::Error)
        .count();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report, options.dry_run, show_diff);
        }

        let fixes: usize = reports.iter().map(|r| r.fixes.len()).sum();
        let changed = reports.iter().filter(|r| r.changed()).count();

        println!();
        println!("{}", "Summary:".bold());
        println!("  {} files changed", format!("{}", changed).green());
        println!("  {} token fixes", format!("{}", fixes).green());
        println!("  {} clean", format!("{}", reports.len() - remaining).green());
        println!("  {} with remaining errors", format!("{}", remaining).red());
    }

    if remaining > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_rules(config: &FixerConfig) -> Result<()> {
    let enabled = RuleSet::with_disabled(&config.rules.disabled);
    let all = RuleSet::new(builtin_rules());

    println!("{}", "Repair rules (in application order):".bold());
    for rule in all.rules() {
        let codes: Vec<&str> = rule.codes.iter().map(|c| c.as_str()).collect();
        let name = if enabled.get(rule.name).is_some() {
            rule.name.green()
        } else {
            format!("{} (disabled)", rule.name).dimmed()
        };
        println!("  {:>3}  {}  {}", rule.priority, name, codes.join(", ").dimmed());
    }

    Ok(())
}
