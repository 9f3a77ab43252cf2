use semver::VersionReq;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::checker::ErrorCode;
use crate::rules::builtin_rules;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FixerConfig {
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub formatter: FormatterConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub header: HeaderConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Program and leading arguments; the file path is appended.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            command: vec!["norminette".to_string()],
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
    pub enabled: bool,
    pub command: String,
    pub version_req: String,
    pub timeout_secs: u64,
    pub column_limit: usize,
    pub tab_width: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "clang-format".to_string(),
            version_req: ">=10".to_string(),
            timeout_secs: 10,
            column_limit: 80,
            tab_width: 4,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Rule names or error codes to switch off.
    pub disabled: Vec<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderConfig {
    pub template: Option<PathBuf>,
}

impl FixerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.checker.command.first().is_none_or(|p| p.trim().is_empty()) {
            issues.push(ValidationIssue::MissingField {
                field: "checker.command",
            });
        }
        if self.checker.timeout_secs == 0 {
            issues.push(ValidationIssue::OutOfRange {
                field: "checker.timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        let formatter = &self.formatter;
        if formatter.command.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "formatter.command",
            });
        }
        if formatter.timeout_secs == 0 {
            issues.push(ValidationIssue::OutOfRange {
                field: "formatter.timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if formatter.column_limit == 0 {
            issues.push(ValidationIssue::OutOfRange {
                field: "formatter.column_limit",
                message: "must be greater than zero".to_string(),
            });
        }
        if !(1..=16).contains(&formatter.tab_width) {
            issues.push(ValidationIssue::OutOfRange {
                field: "formatter.tab_width",
                message: format!("{} is not within 1..=16", formatter.tab_width),
            });
        }
        if let Err(e) = VersionReq::parse(&formatter.version_req) {
            issues.push(ValidationIssue::InvalidRequirement {
                value: formatter.version_req.clone(),
                message: e.to_string(),
            });
        }

        let known = known_rule_names();
        for entry in &self.rules.disabled {
            if !known.iter().any(|k| k == entry) {
                issues.push(ValidationIssue::UnknownRule {
                    name: entry.clone(),
                    suggestion: closest(entry, &known),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

fn known_rule_names() -> Vec<String> {
    builtin_rules()
        .iter()
        .map(|r| r.name.to_string())
        .chain(ErrorCode::ALL.iter().map(|c| c.as_str().to_string()))
        .collect()
}

fn closest(name: &str, known: &[String]) -> Option<String> {
    known
        .iter()
        .map(|k| (strsim::levenshtein(&name.to_ascii_lowercase(), &k.to_ascii_lowercase()), k))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, k)| k.clone())
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    OutOfRange {
        field: &'static str,
        message: String,
    },
    InvalidRequirement {
        value: String,
        message: String,
    },
    UnknownRule {
        name: String,
        suggestion: Option<String>,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::OutOfRange { field, message } => write!(f, "'{field}' {message}"),
            ValidationIssue::InvalidRequirement { value, message } => {
                write!(f, "invalid formatter.version_req '{value}': {message}")
            }
            ValidationIssue::UnknownRule { name, suggestion } => match suggestion {
                Some(s) => write!(f, "unknown rule or code '{name}' (did you mean '{s}'?)"),
                None => write!(f, "unknown rule or code '{name}'"),
            },
        }
    }
}
