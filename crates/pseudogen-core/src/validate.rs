//! # Rule File Validation
//!
//! Structural checks on a `RuleFile`. Validation reports; it never repairs.
//! A reorder list with a duplicate stays a reorder list with a duplicate
//! until the user fixes it.
//!
//! Errors describe jobs the generator cannot run as written. Warnings
//! describe settings that will be ignored or references that no longer point
//! anywhere, typically after a column was deleted.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::graph::{format_positions, ReferenceGraph};
use crate::ini::{column_section_name, rule_section_name, REC_SECTION, REORDER_SECTION};
use crate::model::{AppendAction, ColumnSource, GeneratedSource, Operator, RuleFile};
use crate::weights::{self, WeightedOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Section the issue belongs to, e.g. `c3`, `a1`, `rec`, `reorder`.
    pub section: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.section, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return "Rule file is valid.".to_string();
        }

        let errors = self.errors().count();
        let warnings = self.warnings().count();
        let mut lines = vec![format!(
            "Found {} error(s) and {} warning(s):",
            errors, warnings
        )];
        for issue in self.errors().chain(self.warnings()) {
            let marker = match issue.severity {
                Severity::Error => "x",
                Severity::Warning => "!",
            };
            lines.push(format!("  {} [{}] {}", marker, issue.section, issue.message));
        }
        lines.join("\n")
    }

    fn error(&mut self, section: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, section.into(), message.into());
    }

    fn warning(&mut self, section: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, section.into(), message.into());
    }

    fn push(&mut self, severity: Severity, section: String, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            section,
            message,
        });
    }
}

/// Run every check against `rule_file`.
pub fn validate(rule_file: &RuleFile) -> ValidationReport {
    let mut report = ValidationReport::default();

    if rule_file.settings.record_count == 0 {
        report.error(REC_SECTION, "num must be at least 1");
    }
    if rule_file.columns.is_empty() {
        report.warning(REC_SECTION, "no columns are defined");
    }

    check_names(rule_file, &mut report);
    for (idx, column) in rule_file.columns.iter().enumerate() {
        check_column(&column_section_name(idx + 1), &column.source, &mut report);
    }
    check_references(rule_file, &mut report);
    check_append_rules(rule_file, &mut report);
    check_reorder(rule_file, &mut report);

    report
}

fn check_names(rule_file: &RuleFile, report: &mut ValidationReport) {
    let mut seen: HashMap<&str, String> = HashMap::new();

    for (idx, column) in rule_file.columns.iter().enumerate() {
        let section = column_section_name(idx + 1);
        let name = column.name.trim();
        if name.is_empty() {
            report.error(section.as_str(), "column name is empty");
            continue;
        }
        if let Some(first) = seen.get(name) {
            report.error(
                section.as_str(),
                format!("column name '{}' is already used by [{}]", name, first),
            );
        } else {
            seen.insert(name, section);
        }
    }

    for (idx, rule) in rule_file.append_rules.iter().enumerate() {
        let Some(name) = rule.generated_column().map(str::trim) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let section = rule_section_name(idx + 1);
        if let Some(first) = seen.get(name) {
            report.error(
                section.as_str(),
                format!("new_col '{}' is already used by [{}]", name, first),
            );
        } else {
            seen.insert(name, section);
        }
    }
}

fn check_options(section: &str, pairs: &[WeightedOption], report: &mut ValidationReport) {
    let (options, _) = weights::encode(pairs);
    if options.is_empty() {
        report.error(section, "random data needs at least one option");
    } else {
        let total = weights::total_weight(pairs);
        if total == 0.0 {
            report.warning(section, "all weights are 0; options will be drawn uniformly");
        } else if !total.is_finite() {
            report.warning(
                section,
                "weights add up to more than a float can hold; they will be scaled down",
            );
        }
    }
}

fn check_column(section: &str, source: &ColumnSource, report: &mut ValidationReport) {
    if let Some(data) = required_source_column(source) {
        report.error(section, format!("{} needs a source column (cols)", data));
    }

    match source {
        ColumnSource::Random { pairs } => check_options(section, pairs, report),
        ColumnSource::Faker { method } => {
            if method.trim().is_empty() {
                report.error(section, "faker_method is empty");
            }
        }
        ColumnSource::CompanyId => {}
        ColumnSource::Increment { interval, .. } => {
            if *interval == Some(0) {
                report.warning(section, "interval is 0; every row gets the same value");
            }
        }
        ColumnSource::Reference {
            source_values,
            mapped_values,
            ..
        } => {
            if source_values.is_empty() {
                report.error(section, "reference needs at least one value to match");
            }
            if source_values.len() != mapped_values.len() {
                report.error(
                    section,
                    format!(
                        "value has {} entries but range has {}; they are matched by position",
                        source_values.len(),
                        mapped_values.len()
                    ),
                );
            }
        }
        ColumnSource::ReferenceRange {
            values,
            upper_bounds,
            ..
        } => {
            if upper_bounds.is_empty() {
                report.error(section, "reference_range needs at least one bound in range");
            }
            if values.len() != upper_bounds.len() {
                report.error(
                    section,
                    format!(
                        "value has {} entries but range has {}; they are matched by position",
                        values.len(),
                        upper_bounds.len()
                    ),
                );
            }
            if upper_bounds.windows(2).any(|w| w[0] > w[1]) {
                report.warning(section, "range bounds are not in ascending order");
            }
        }
        ColumnSource::ReferenceBoolean {
            condition, values, ..
        } => {
            if values.len() != 2 {
                report.error(
                    section,
                    format!(
                        "reference_boolean needs exactly two values (when true, when false), got {}",
                        values.len()
                    ),
                );
            }
            if condition.is_none() {
                report.warning(section, "no condition set; it only matches empty values");
            }
        }
        ColumnSource::ReferenceBoolean2 {
            condition, values, ..
        } => {
            if values.is_empty() {
                report.error(section, "reference_boolean2 needs at least one value");
            }
            if condition.is_none() {
                report.warning(section, "no condition set; it only matches empty values");
            }
        }
        ColumnSource::Total {
            operation,
            operands,
        } => {
            match operation {
                None => report.error(section, "total needs an operation (+ or *)"),
                Some(Operator::Minus) => {
                    report.error(section, "total supports + and *, not -")
                }
                Some(_) => {}
            }
            if operands.is_empty() {
                report.error(section, "total needs at least one operand");
            }
        }
        ColumnSource::Discount {
            operation, percent, ..
        } => {
            match operation {
                None => report.error(section, "discount needs an operation (- or +)"),
                Some(Operator::Times) => {
                    report.error(section, "discount supports - and +, not *")
                }
                Some(_) => {}
            }
            match percent {
                None => report.error(section, "discount needs a percentage in value"),
                Some(p) if *p < 0.0 => report.warning(section, "discount percentage is negative"),
                Some(_) => {}
            }
        }
    }
}

/// Name of the data source when it reads another column but `cols` is unset.
fn required_source_column(source: &ColumnSource) -> Option<&'static str> {
    match source {
        ColumnSource::Reference { .. }
        | ColumnSource::ReferenceRange { .. }
        | ColumnSource::ReferenceBoolean { .. }
        | ColumnSource::ReferenceBoolean2 { .. }
        | ColumnSource::Discount { .. }
            if source.source_column().is_none() =>
        {
            Some(source.data_source().as_str())
        }
        _ => None,
    }
}

fn check_references(rule_file: &RuleFile, report: &mut ValidationReport) {
    let graph = ReferenceGraph::from_rule_file(rule_file);

    for dangling in graph.dangling() {
        report.warning(
            column_section_name(dangling.column),
            format!(
                "references column {} but only {} column(s) exist",
                dangling.target,
                graph.column_count()
            ),
        );
    }

    for cycle in graph.cycles() {
        let section = column_section_name(cycle[0]);
        if cycle.len() == 1 {
            report.error(section, "column references itself");
        } else {
            report.error(
                section,
                format!(
                    "columns {} reference each other in a cycle",
                    format_positions(&cycle)
                ),
            );
        }
    }
}

fn check_append_rules(rule_file: &RuleFile, report: &mut ValidationReport) {
    if rule_file.append_rules.is_empty() {
        return;
    }
    if !rule_file.settings.mode.allows_append() {
        report.warning(
            REC_SECTION,
            format!(
                "{} append rule(s) are ignored in mode 1; set mode = 2 or 3 to apply them",
                rule_file.append_rules.len()
            ),
        );
    }

    let column_count = rule_file.columns.len();
    for (idx, rule) in rule_file.append_rules.iter().enumerate() {
        let section = rule_section_name(idx + 1);
        match &rule.action {
            AppendAction::Replace {
                target_column,
                rename_to,
                find,
                ..
            } => match target_column {
                None => report.error(section.as_str(), "replace needs a target column (cols)"),
                Some(target) if *target > column_count => report.error(
                    section.as_str(),
                    format!(
                        "target column {} is out of range (1-{})",
                        target, column_count
                    ),
                ),
                Some(_) => {
                    if find.is_none() && rename_to.is_none() {
                        report.warning(section.as_str(), "replace has neither find nor col_name; it does nothing");
                    }
                }
            },
            AppendAction::Generate {
                new_column, source, ..
            } => {
                if new_column.trim().is_empty() {
                    report.error(section.as_str(), "generate needs a new column name (new_col)");
                }
                match source {
                    GeneratedSource::Random { pairs } => {
                        check_options(section.as_str(), pairs, report)
                    }
                    GeneratedSource::Faker { method } => {
                        if method.trim().is_empty() {
                            report.error(section.as_str(), "faker_method is empty");
                        }
                    }
                }
            }
        }
    }
}

fn check_reorder(rule_file: &RuleFile, report: &mut ValidationReport) {
    let order = &rule_file.reorder.order;
    if order.is_empty() {
        return;
    }
    if !rule_file.settings.mode.allows_reorder() {
        report.warning(
            REORDER_SECTION,
            "reorder is ignored unless mode = 3",
        );
        return;
    }

    let total = rule_file.total_column_count();
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &index in order {
        *counts.entry(index).or_default() += 1;
    }

    let mut out_of_range: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&i| i == 0 || i > total)
        .collect();
    out_of_range.dedup();
    if !out_of_range.is_empty() {
        report.error(
            REORDER_SECTION,
            format!(
                "indices {:?} are out of range (1-{})",
                out_of_range, total
            ),
        );
    }

    let mut duplicates: Vec<usize> = counts
        .iter()
        .filter(|(_, &n)| n > 1)
        .map(|(&i, _)| i)
        .collect();
    duplicates.sort_unstable();
    if !duplicates.is_empty() {
        report.error(
            REORDER_SECTION,
            format!("indices {:?} appear more than once", duplicates),
        );
    }

    let missing: Vec<usize> = (1..=total).filter(|i| !counts.contains_key(i)).collect();
    if !missing.is_empty() {
        report.error(
            REORDER_SECTION,
            format!("indices {:?} are missing from the order", missing),
        );
    }
}
