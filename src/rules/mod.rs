//! Position-addressed token rewriting.
//!
//! Every repair rule is plain data: a name, the error codes it answers to,
//! a priority and a `locate` function that finds the offending token window
//! on the reported line and returns the [`Splice`] that fixes it. Rules own
//! no state, touch only space and tab tokens, and report no match once the
//! window is already correct, so re-running a pass converges.
//!
//! [`TokenFormatter`] drives them: tokenize, let each rule (in priority
//! order) claim the diagnostics it knows, apply the splices, reconstruct.
//! Rewritten tokens keep their source-origin positions, so every diagnostic
//! of a pass is matched in the checker's coordinates even after earlier
//! rewrites on the same line.
//!
//! # Example
//!
//! ```
//! use normfix::checker::Diagnostic;
//! use normfix::rules::TokenFormatter;
//!
//! let formatter = TokenFormatter::default();
//! let diag = Diagnostic::new("a.c", 1, 4, "SPACE_REPLACE_TAB", "Found space when expecting tab");
//! assert_eq!(formatter.format("int x;", &[diag]), "int\tx;");
//! ```

pub mod pointer;
pub mod punct;
pub mod spacing;
pub mod window;

pub use window::Splice;

use serde::Serialize;
use std::fmt;

use crate::checker::{Diagnostic, ErrorCode};
use crate::token::{reconstruct, tokenize, Token};

/// Finds the window a diagnostic refers to and the splice that repairs it.
pub type LocateFn = fn(&[Token], &Diagnostic, &Layout) -> Option<Splice>;

/// Indentation settings the rules share with the reformat stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub tab_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self { tab_width: 4 }
    }
}

/// A single repair rule.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub codes: &'static [ErrorCode],
    /// Lower runs first.
    pub priority: u8,
    pub locate: LocateFn,
}

impl Rule {
    pub fn applies_to(&self, diag: &Diagnostic) -> bool {
        diag.error_code()
            .is_some_and(|code| self.codes.contains(&code))
    }

    /// The effective splice for `diag`, if the violation is still present.
    pub fn splice(&self, tokens: &[Token], diag: &Diagnostic, layout: &Layout) -> Option<Splice> {
        (self.locate)(tokens, diag, layout)
            .filter(|splice| !splice.is_noop(tokens) && splice.keeps_lexing(tokens))
    }

    pub fn matches(&self, tokens: &[Token], diag: &Diagnostic, layout: &Layout) -> bool {
        self.splice(tokens, diag, layout).is_some()
    }

    /// Rewrite `tokens`; returns them unchanged when the rule does not match.
    pub fn rewrite(&self, tokens: &[Token], diag: &Diagnostic, layout: &Layout) -> Vec<Token> {
        match self.splice(tokens, diag, layout) {
            Some(splice) => splice.apply(tokens),
            None => tokens.to_vec(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("codes", &self.codes)
            .field("priority", &self.priority)
            .finish()
    }
}

/// The built-in rule set, unordered.
pub fn builtin_rules() -> Vec<Rule> {
    let mut rules = Vec::new();
    rules.extend_from_slice(spacing::RULES);
    rules.extend_from_slice(pointer::RULES);
    rules.extend_from_slice(punct::RULES);
    rules
}

/// Ordered rule registry, built once at start-up.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(mut rules: Vec<Rule>) -> Self {
        // Stable: equal priorities keep registration order.
        rules.sort_by_key(|rule| rule.priority);
        Self { rules }
    }

    /// Built-in rules minus those disabled by rule name or error code.
    pub fn with_disabled(disabled: &[String]) -> Self {
        let rules = builtin_rules()
            .into_iter()
            .filter(|rule| {
                !disabled.iter().any(|entry| {
                    entry == rule.name || rule.codes.iter().any(|code| code.as_str() == entry)
                })
            })
            .collect();
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// True when some rule answers to this diagnostic's code.
    pub fn claims(&self, diag: &Diagnostic) -> bool {
        self.rules.iter().any(|rule| rule.applies_to(diag))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(builtin_rules())
    }
}

/// One rewrite performed by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    pub rule: &'static str,
    pub code: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for AppliedFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at {}:{}",
            self.rule, self.code, self.line, self.column
        )
    }
}

/// Result of a formatting pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    pub text: String,
    pub applied: Vec<AppliedFix>,
    /// Diagnostics no rule repaired.
    pub unclaimed: Vec<Diagnostic>,
}

impl FormatOutcome {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Applies a [`RuleSet`] to source text for a set of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct TokenFormatter {
    rules: RuleSet,
    layout: Layout,
}

impl TokenFormatter {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            layout: Layout::default(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Repair `source` and return the new text.
    #[must_use]
    pub fn format(&self, source: &str, diagnostics: &[Diagnostic]) -> String {
        self.format_with_report(source, diagnostics).text
    }

    /// Repair `source`, recording which rule fixed which diagnostic.
    pub fn format_with_report(&self, source: &str, diagnostics: &[Diagnostic]) -> FormatOutcome {
        let mut tokens = tokenize(source);
        let mut fixed = vec![false; diagnostics.len()];
        let mut applied = Vec::new();

        for rule in self.rules.rules() {
            for (idx, diag) in diagnostics.iter().enumerate() {
                if fixed[idx] || !rule.applies_to(diag) {
                    continue;
                }
                let Some(splice) = rule.splice(&tokens, diag, &self.layout) else {
                    continue;
                };

                tracing::debug!(
                    rule = rule.name,
                    code = %diag.code,
                    line = diag.line,
                    column = diag.column,
                    "rule fired"
                );
                tokens = splice.apply(&tokens);
                fixed[idx] = true;
                applied.push(AppliedFix {
                    rule: rule.name,
                    code: diag.code.clone(),
                    line: diag.line,
                    column: diag.column,
                });
            }
        }

        let unclaimed = diagnostics
            .iter()
            .zip(&fixed)
            .filter(|(_, done)| !**done)
            .map(|(diag, _)| diag.clone())
            .collect();

        FormatOutcome {
            text: reconstruct(&tokens),
            applied,
            unclaimed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn diag(line: usize, column: usize, code: &str) -> Diagnostic {
        Diagnostic::new("t.c", line, column, code, "")
    }

    #[test]
    fn test_scenario_space_replace_tab() {
        let formatter = TokenFormatter::default();
        assert_eq!(
            formatter.format("int x;", &[diag(1, 4, "SPACE_REPLACE_TAB")]),
            "int\tx;"
        );
    }

    #[test]
    fn test_scenario_space_before_func() {
        let formatter = TokenFormatter::default();
        assert_eq!(
            formatter.format("int main(void)", &[diag(1, 4, "SPACE_BEFORE_FUNC")]),
            "int\tmain(void)"
        );
    }

    #[test]
    fn test_scenario_space_after_pointer() {
        let formatter = TokenFormatter::default();
        assert_eq!(
            formatter.format("char * ptr;", &[diag(1, 5, "SPC_AFTER_POINTER")]),
            "char *ptr;"
        );
    }

    #[test]
    fn test_no_diagnostics_is_identity() {
        let formatter = TokenFormatter::default();
        let source = "int  main(void)\n{\n\treturn(0) ;\n}\n";
        let outcome = formatter.format_with_report(source, &[]);
        assert_eq!(outcome.text, source);
        assert!(!outcome.changed());
    }

    #[test]
    fn test_unclaimed_diagnostic_is_reported() {
        let formatter = TokenFormatter::default();
        let source = "int x;\n";
        let diags = [diag(1, 4, "SPACE_REPLACE_TAB"), diag(1, 1, "TOO_MANY_FUNCS")];
        let outcome = formatter.format_with_report(source, &diags);
        assert_eq!(outcome.text, "int\tx;\n");
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.unclaimed, vec![diags[1].clone()]);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let formatter = TokenFormatter::default();
        let diags = [diag(1, 4, "SPACE_BEFORE_FUNC"), diag(1, 11, "NO_SPC_AFR_PAR")];
        let once = formatter.format("int   main( void)\n", &diags);
        let twice = formatter.format_with_report(&once, &diags);
        assert_eq!(once, "int\tmain(void)\n");
        assert_eq!(twice.text, once);
        assert!(twice.applied.is_empty());
    }

    #[test]
    fn test_several_fixes_on_one_line_use_origin_columns() {
        let formatter = TokenFormatter::default();
        // Fixing the first gap shortens the line; the later diagnostics
        // still carry the checker's original columns.
        let source = "int  a = b+c;\n";
        let diags = [
            diag(1, 11, "SPC_BFR_OPERATOR"),
            diag(1, 11, "SPC_AFTER_OPERATOR"),
            diag(1, 4, "SPACE_REPLACE_TAB"),
        ];
        assert_eq!(formatter.format(source, &diags), "int\ta = b + c;\n");
    }

    #[test]
    fn test_disabled_rules_by_name_and_code() {
        let set = RuleSet::with_disabled(&[
            "space-instead-of-tab".to_string(),
            "SPC_AFTER_POINTER".to_string(),
        ]);
        assert!(set.get("space-instead-of-tab").is_none());
        assert!(set.get("space-after-pointer").is_none());
        assert!(set.get("space-before-function").is_some());

        let formatter = TokenFormatter::new(set);
        assert_eq!(formatter.format("int x;", &[diag(1, 4, "SPACE_REPLACE_TAB")]), "int x;");
    }

    #[test]
    fn test_rules_are_sorted_by_priority() {
        let set = RuleSet::default();
        let priorities: Vec<u8> = set.rules().iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_rule_names_are_unique() {
        let rules = builtin_rules();
        for (i, rule) in rules.iter().enumerate() {
            assert!(rules[i + 1..].iter().all(|other| other.name != rule.name));
        }
    }
}
