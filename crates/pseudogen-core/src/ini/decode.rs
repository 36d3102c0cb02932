use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::document::{Document, Section};
use super::{
    relevant_column_keys, relevant_rule_keys, COLUMN_KEYS, REC_KEYS, REC_SECTION, REORDER_KEYS,
    REORDER_SECTION, RULE_KEYS,
};
use crate::error::ParseIssue;
use crate::model::{
    AppendAction, AppendOperation, AppendRule, ColumnSource, ColumnSpec, DType, DataSource,
    GeneratedSource, GlobalSettings, Mode, Operator, ReorderSpec, RuleFile, DEFAULT_FAKER_METHOD,
    DEFAULT_RECORD_COUNT,
};
use crate::weights;

static POSITIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ca])(\d+)$").expect("positional section regex is valid"));

/// Which logical entity a section describes.
enum SectionKind {
    Rec,
    Reorder,
    Column(usize),
    Rule(usize),
    Unknown,
}

fn classify(name: &str) -> SectionKind {
    match name {
        REC_SECTION => SectionKind::Rec,
        REORDER_SECTION => SectionKind::Reorder,
        _ => match POSITIONAL_RE.captures(name) {
            Some(caps) => {
                // Digits only, so the parse can only fail on overflow.
                let n = caps[2].parse::<usize>().unwrap_or(0);
                if &caps[1] == "c" {
                    SectionKind::Column(n)
                } else {
                    SectionKind::Rule(n)
                }
            }
            None => SectionKind::Unknown,
        },
    }
}

/// Build a rule file from a parsed document, pushing every problem found
/// into `issues`. The returned value is only meaningful when `issues` stays
/// empty.
pub(crate) fn decode(doc: &Document, issues: &mut Vec<ParseIssue>) -> RuleFile {
    let mut settings = None;
    let mut reorder = ReorderSpec::default();
    let mut columns: BTreeMap<usize, (String, ColumnSpec)> = BTreeMap::new();
    let mut rules: BTreeMap<usize, (String, AppendRule)> = BTreeMap::new();
    let mut declared_cols = None;

    for section in &doc.sections {
        match classify(&section.name) {
            SectionKind::Rec => {
                let mut r = SectionReader::new(section, issues);
                let record_count = r.number::<u64>("num").unwrap_or(DEFAULT_RECORD_COUNT);
                let mode = match r.number::<u8>("mode") {
                    Some(n) => Mode::from_number(n).unwrap_or_else(|| {
                        r.issue("mode", format!("mode must be 1, 2 or 3 (got {})", n));
                        Mode::default()
                    }),
                    None => Mode::default(),
                };
                declared_cols = r.number::<usize>("cols");
                let description = r.raw("description");
                r.finish(REC_KEYS, REC_KEYS);
                settings = Some(GlobalSettings {
                    record_count,
                    mode,
                    description,
                });
            }
            SectionKind::Reorder => {
                let mut r = SectionReader::new(section, issues);
                reorder.order = r
                    .list("order")
                    .iter()
                    .filter_map(|item| r.parse_item::<usize>("order", item))
                    .collect();
                reorder.description = r.raw("description");
                r.finish(REORDER_KEYS, REORDER_KEYS);
            }
            SectionKind::Column(position) => {
                let column = decode_column(section, issues);
                insert_positional(&mut columns, position, section, column, issues);
            }
            SectionKind::Rule(position) => {
                let rule = decode_rule(section, issues);
                insert_positional(&mut rules, position, section, rule, issues);
            }
            SectionKind::Unknown => {
                tracing::warn!(
                    "Ignoring unknown section [{}] at line {}",
                    section.name,
                    section.line
                );
            }
        }
    }

    let settings = settings.unwrap_or_else(|| {
        issues.push(ParseIssue::new(
            None,
            None,
            "missing [rec] section with global settings",
        ));
        GlobalSettings::default()
    });

    let columns = into_contiguous(columns, "c", issues);
    let append_rules = into_contiguous(rules, "a", issues);

    if let Some(declared) = declared_cols {
        if declared != columns.len() {
            tracing::warn!(
                "[rec] declares cols = {} but {} column section(s) were found",
                declared,
                columns.len()
            );
        }
    }

    RuleFile {
        settings,
        columns,
        append_rules,
        reorder,
    }
}

fn insert_positional<T>(
    map: &mut BTreeMap<usize, (String, T)>,
    position: usize,
    section: &Section,
    value: T,
    issues: &mut Vec<ParseIssue>,
) {
    if position == 0 {
        issues.push(ParseIssue::new(
            Some(&section.name),
            Some(section.line),
            "section numbering starts at 1",
        ));
        return;
    }
    if let Some((existing, _)) = map.get(&position) {
        issues.push(ParseIssue::new(
            Some(&section.name),
            Some(section.line),
            format!("same position as [{}]", existing),
        ));
        return;
    }
    map.insert(position, (section.name.clone(), value));
}

/// Order by declared position and require `1..=n` without gaps, since a
/// gap would shift every positional reference after it.
fn into_contiguous<T>(
    map: BTreeMap<usize, (String, T)>,
    prefix: &str,
    issues: &mut Vec<ParseIssue>,
) -> Vec<T> {
    let mut out = Vec::with_capacity(map.len());
    let mut expected = 1;
    for (position, (_, value)) in map {
        if expected < position {
            issues.push(gap_issue(prefix, expected, position - 1));
        }
        out.push(value);
        expected = position + 1;
    }
    out
}

/// One issue per gap, however wide it is.
fn gap_issue(prefix: &str, first: usize, last: usize) -> ParseIssue {
    let first_name = format!("{}{}", prefix, first);
    let missing = if first == last {
        format!("missing section [{}]", first_name)
    } else {
        format!("missing sections [{}] to [{}{}]", first_name, prefix, last)
    };
    ParseIssue::new(
        Some(first_name.as_str()),
        None,
        format!("{}; sections must be numbered 1, 2, 3, ... without gaps", missing),
    )
}

pub(crate) fn decode_column(section: &Section, issues: &mut Vec<ParseIssue>) -> ColumnSpec {
    let mut r = SectionReader::new(section, issues);

    let name = r.text("name").unwrap_or_default();
    let dtype = match r.text("dtype") {
        Some(raw) => DType::parse(&raw).unwrap_or_else(|| {
            r.issue(
                "dtype",
                format!("unknown dtype '{}'; expected str, int, float or decimal", raw),
            );
            DType::default()
        }),
        None => DType::default(),
    };
    let data_source = match r.text("data") {
        Some(raw) => DataSource::parse(&raw).unwrap_or_else(|| {
            r.issue("data", format!("unknown data source '{}'", raw));
            DataSource::Random
        }),
        None => DataSource::Random,
    };

    let source = match data_source {
        DataSource::Random => ColumnSource::Random {
            pairs: r.pairs(),
        },
        DataSource::Faker => ColumnSource::Faker {
            method: r
                .raw("faker_method")
                .unwrap_or_else(|| DEFAULT_FAKER_METHOD.to_string()),
        },
        DataSource::CompanyId => ColumnSource::CompanyId,
        DataSource::Increment => ColumnSource::Increment {
            start: r.number("start"),
            interval: r.number("interval"),
        },
        DataSource::Reference => ColumnSource::Reference {
            source_column: r.column_ref("cols"),
            source_values: r.list("value"),
            mapped_values: r.list("range"),
        },
        DataSource::ReferenceRange => {
            let source_column = r.column_ref("cols");
            let values = r.list("value");
            let upper_bounds = r
                .list("range")
                .iter()
                .filter_map(|item| r.parse_item::<f64>("range", item))
                .collect();
            ColumnSource::ReferenceRange {
                source_column,
                values,
                upper_bounds,
            }
        }
        DataSource::ReferenceBoolean => ColumnSource::ReferenceBoolean {
            source_column: r.column_ref("cols"),
            condition: r.raw("condition"),
            values: r.list("value"),
        },
        DataSource::ReferenceBoolean2 => ColumnSource::ReferenceBoolean2 {
            source_column: r.column_ref("cols"),
            condition: r.raw("condition"),
            values: r.list("value"),
        },
        DataSource::Total => {
            let operation = r.operator("operation");
            let operands = r
                .list("operands")
                .iter()
                .filter_map(|item| r.operand(item))
                .collect();
            ColumnSource::Total {
                operation,
                operands,
            }
        }
        DataSource::Discount => ColumnSource::Discount {
            source_column: r.column_ref("cols"),
            operation: r.operator("operation"),
            percent: r.number("value"),
        },
    };

    let description = r.raw("description");
    r.finish(COLUMN_KEYS, relevant_column_keys(data_source));

    ColumnSpec {
        name,
        dtype,
        source,
        description,
    }
}

pub(crate) fn decode_rule(section: &Section, issues: &mut Vec<ParseIssue>) -> AppendRule {
    let mut r = SectionReader::new(section, issues);

    let operation = match r.text("operation") {
        Some(raw) => AppendOperation::parse(&raw).unwrap_or_else(|| {
            r.issue(
                "operation",
                format!("unknown operation '{}'; expected replace or generate", raw),
            );
            AppendOperation::Replace
        }),
        None => AppendOperation::Replace,
    };

    let (action, relevant) = match operation {
        AppendOperation::Replace => (
            AppendAction::Replace {
                target_column: r.column_ref("cols"),
                rename_to: r.raw("col_name"),
                find: r.raw("find"),
                replace_with: r.raw("replace"),
            },
            relevant_rule_keys(AppendOperation::Replace, None),
        ),
        AppendOperation::Generate => {
            let new_column = r.text("new_col").unwrap_or_default();
            let source = match r.text("data").as_deref().map(str::to_ascii_lowercase) {
                None => GeneratedSource::Random { pairs: r.pairs() },
                Some(data) if data == "random" => GeneratedSource::Random { pairs: r.pairs() },
                Some(data) if data == "faker" => GeneratedSource::Faker {
                    method: r
                        .raw("faker_method")
                        .unwrap_or_else(|| DEFAULT_FAKER_METHOD.to_string()),
                },
                Some(other) => {
                    r.issue(
                        "data",
                        format!("generate rules support random or faker, not '{}'", other),
                    );
                    GeneratedSource::default()
                }
            };
            let nullable_rate = match r.number::<f64>("nullable") {
                Some(rate) if (0.0..=1.0).contains(&rate) => rate,
                Some(rate) => {
                    r.issue(
                        "nullable",
                        format!("nullable must be between 0 and 1 (got {})", rate),
                    );
                    0.0
                }
                None => 0.0,
            };
            let relevant = relevant_rule_keys(AppendOperation::Generate, Some(&source));
            (
                AppendAction::Generate {
                    new_column,
                    source,
                    nullable_rate,
                },
                relevant,
            )
        }
    };

    let description = r.raw("description");
    r.finish(RULE_KEYS, relevant);

    AppendRule {
        action,
        description,
    }
}

/// Typed access to one section's entries with issue collection.
struct SectionReader<'a> {
    section: &'a Section,
    issues: &'a mut Vec<ParseIssue>,
}

impl<'a> SectionReader<'a> {
    fn new(section: &'a Section, issues: &'a mut Vec<ParseIssue>) -> Self {
        Self { section, issues }
    }

    fn issue(&mut self, key: &str, message: impl Into<String>) {
        let line = self
            .section
            .get(key)
            .map(|e| e.line)
            .unwrap_or(self.section.line);
        // Sections built in memory (service payloads) have no source lines.
        self.issues.push(ParseIssue::new(
            Some(&self.section.name),
            Some(line).filter(|l| *l > 0),
            message,
        ));
    }

    /// Trimmed value, `None` when absent or blank.
    fn text(&self, key: &str) -> Option<String> {
        self.section
            .get(key)
            .map(|e| e.value.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Trimmed value of a key that is present, blank or not. A present but
    /// blank key is how an empty optional value is written.
    fn raw(&self, key: &str) -> Option<String> {
        self.section.get(key).map(|e| e.value.trim().to_string())
    }

    /// Comma-split value with segments trimmed and empty segments dropped.
    fn list(&self, key: &str) -> Vec<String> {
        self.text(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn number<T: FromStr>(&mut self, key: &str) -> Option<T> {
        let raw = self.text(key)?;
        match raw.parse::<T>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.issue(key, format!("{} = '{}' is not a valid number", key, raw));
                None
            }
        }
    }

    fn parse_item<T: FromStr>(&mut self, key: &str, item: &str) -> Option<T> {
        match item.parse::<T>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.issue(key, format!("'{}' in {} is not a valid number", item, key));
                None
            }
        }
    }

    /// 1-based column reference. `0` is kept as written and reported by
    /// validation as a reference to a column that does not exist.
    fn column_ref(&mut self, key: &str) -> Option<usize> {
        self.number::<usize>(key)
    }

    /// `c8` (or bare `8`) in an operands list.
    fn operand(&mut self, item: &str) -> Option<usize> {
        let digits = item.strip_prefix(['c', 'C']).unwrap_or(item);
        match digits.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.issue(
                    "operands",
                    format!("operand '{}' is not a column reference like c3", item),
                );
                None
            }
        }
    }

    fn operator(&mut self, key: &str) -> Option<Operator> {
        let raw = self.text(key)?;
        let op = Operator::parse(&raw);
        if op.is_none() {
            self.issue(key, format!("unknown operation '{}'; expected +, - or *", raw));
        }
        op
    }

    fn pairs(&self) -> Vec<weights::WeightedOption> {
        weights::decode(&self.list("options"), &self.list("weights"))
    }

    /// Log keys that were present but not used.
    fn finish(self, known: &[&str], relevant: &[&str]) {
        for entry in &self.section.entries {
            if !known.contains(&entry.key.as_str()) {
                tracing::warn!(
                    "Ignoring unknown key '{}' in [{}] at line {}",
                    entry.key,
                    self.section.name,
                    entry.line
                );
            } else if !relevant.contains(&entry.key.as_str()) {
                tracing::debug!(
                    "Skipping '{}' in [{}]: not used by this data source",
                    entry.key,
                    self.section.name
                );
            }
        }
    }
}
