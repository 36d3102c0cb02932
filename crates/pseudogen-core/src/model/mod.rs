//! # Rule File Model
//!
//! In-memory form of a generation job: global settings, ordered columns,
//! ordered append rules and an optional output column order. A `RuleFile`
//! is plain data. It knows nothing about how it is edited or displayed, which
//! keeps it safe to serialize at any moment.
//!
//! Columns are identified by position. Every cross reference (`cols`,
//! `operands`, reorder indices) is a 1-based index into the column list, so
//! removing or moving a column silently changes what those numbers mean.
//! `validate` reports references that no longer resolve.

pub mod append;
pub mod column;

use serde::{Deserialize, Serialize};

pub use append::{AppendAction, AppendOperation, AppendRule, GeneratedSource};
pub use column::{ColumnSource, ColumnSpec, DType, DataSource, Operator, DEFAULT_FAKER_METHOD};

use crate::error::Result;

/// Record count used when none is given.
pub const DEFAULT_RECORD_COUNT: u64 = 100;

/// Which stages of the job are enabled. Each mode unlocks the previous ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Mode {
    /// Base columns only.
    #[default]
    BaseOnly = 1,
    /// Base columns plus append rules.
    BasePlusAppend = 2,
    /// Base columns, append rules and reordering.
    FullWithReorder = 3,
}

impl Mode {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Mode::BaseOnly),
            2 => Some(Mode::BasePlusAppend),
            3 => Some(Mode::FullWithReorder),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn allows_append(&self) -> bool {
        *self >= Mode::BasePlusAppend
    }

    pub fn allows_reorder(&self) -> bool {
        *self >= Mode::FullWithReorder
    }
}

impl TryFrom<u8> for Mode {
    type Error = String;

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        Mode::from_number(n).ok_or_else(|| format!("mode must be 1, 2 or 3 (got {})", n))
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        mode.number()
    }
}

/// The `[rec]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Number of rows the generator should produce.
    pub record_count: u64,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            record_count: DEFAULT_RECORD_COUNT,
            mode: Mode::BaseOnly,
            description: None,
        }
    }
}

/// Final column order, as 1-based positions over base columns followed by
/// columns added by `generate` rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReorderSpec {
    pub order: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReorderSpec {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty() && self.description.is_none()
    }
}

/// A complete generation job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    pub settings: GlobalSettings,
    pub columns: Vec<ColumnSpec>,
    pub append_rules: Vec<AppendRule>,
    #[serde(default)]
    pub reorder: ReorderSpec,
}

impl RuleFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a column by its 1-based position.
    pub fn column(&self, position: usize) -> Option<&ColumnSpec> {
        position.checked_sub(1).and_then(|i| self.columns.get(i))
    }

    /// Names of every output column before reordering: base columns, then
    /// one per `generate` rule in declaration order.
    pub fn output_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.name.clone())
            .chain(
                self.append_rules
                    .iter()
                    .filter_map(|r| r.generated_column().map(str::to_string)),
            )
            .collect()
    }

    /// Number of columns a reorder spec has to cover.
    pub fn total_column_count(&self) -> usize {
        self.columns.len()
            + self
                .append_rules
                .iter()
                .filter(|r| r.generated_column().is_some())
                .count()
    }

    /// Parse `rules.ini` text into a new rule file.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        crate::ini::from_ini_str(text)
    }

    /// Render this rule file as `rules.ini` text.
    pub fn to_ini_string(&self) -> String {
        crate::ini::to_ini_string(self)
    }

    /// Replace the contents of `self` with the parsed text.
    ///
    /// On a parse error `self` is left exactly as it was.
    pub fn reload_from_str(&mut self, text: &str) -> Result<()> {
        let parsed = Self::from_ini_str(text)?;
        *self = parsed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightedOption;

    fn sample() -> RuleFile {
        let mut rf = RuleFile::new();
        rf.settings.mode = Mode::FullWithReorder;
        rf.columns.push(ColumnSpec::random(
            "color",
            vec![WeightedOption::new("Red", 1.0)],
        ));
        rf.columns.push(ColumnSpec::faker("owner", "name"));
        rf.append_rules.push(AppendRule::replace(1, "Red", "Crimson"));
        rf.append_rules.push(AppendRule::generate(
            "notes",
            GeneratedSource::Faker {
                method: "sentence".to_string(),
            },
            0.1,
        ));
        rf
    }

    #[test]
    fn test_mode_gates() {
        assert!(!Mode::BaseOnly.allows_append());
        assert!(Mode::BasePlusAppend.allows_append());
        assert!(!Mode::BasePlusAppend.allows_reorder());
        assert!(Mode::FullWithReorder.allows_reorder());
        assert_eq!(Mode::from_number(4), None);
    }

    #[test]
    fn test_output_column_names_include_generated() {
        let rf = sample();
        assert_eq!(rf.output_column_names(), vec!["color", "owner", "notes"]);
        assert_eq!(rf.total_column_count(), 3);
    }

    #[test]
    fn test_column_lookup_is_one_based() {
        let rf = sample();
        assert_eq!(rf.column(1).map(|c| c.name.as_str()), Some("color"));
        assert!(rf.column(0).is_none());
        assert!(rf.column(3).is_none());
    }

    #[test]
    fn test_reload_failure_leaves_model_untouched() {
        let mut rf = sample();
        let before = rf.clone();
        let err = rf.reload_from_str("[rec]\nnum = lots\n");
        assert!(err.is_err());
        assert_eq!(rf, before);
    }

    #[test]
    fn test_reload_success_replaces_model() {
        let mut rf = sample();
        rf.reload_from_str("[rec]\nnum = 5\nmode = 1\n").unwrap();
        assert_eq!(rf.settings.record_count, 5);
        assert!(rf.columns.is_empty());
    }

    #[test]
    fn test_json_snapshot_shape() {
        let rf = sample();
        let json = serde_json::to_value(&rf).unwrap();
        assert_eq!(json["settings"]["mode"], 3);
        assert_eq!(json["columns"][0]["source"]["data"], "random");
        assert_eq!(json["append_rules"][1]["action"]["operation"], "generate");
        let back: RuleFile = serde_json::from_value(json).unwrap();
        assert_eq!(back, rf);
    }
}
