use std::fmt;

use serde::{Deserialize, Serialize};

use super::column::DEFAULT_FAKER_METHOD;
use crate::weights::WeightedOption;

/// Kind of an append rule, as written in its `operation` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOperation {
    Replace,
    Generate,
}

impl AppendOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppendOperation::Replace => "replace",
            AppendOperation::Generate => "generate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Some(AppendOperation::Replace),
            "generate" => Some(AppendOperation::Generate),
            _ => None,
        }
    }
}

impl fmt::Display for AppendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data source of a column added by a `generate` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data", rename_all = "snake_case")]
pub enum GeneratedSource {
    Random { pairs: Vec<WeightedOption> },
    Faker { method: String },
}

impl Default for GeneratedSource {
    fn default() -> Self {
        GeneratedSource::Random { pairs: Vec::new() }
    }
}

impl GeneratedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratedSource::Random { .. } => "random",
            GeneratedSource::Faker { .. } => "faker",
        }
    }
}

/// What an append rule does once the base columns exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum AppendAction {
    /// Rewrite values of an existing column, optionally renaming it.
    ///
    /// `target_column` is 1-based over the base columns followed by columns
    /// added by earlier `generate` rules.
    Replace {
        target_column: Option<usize>,
        rename_to: Option<String>,
        find: Option<String>,
        replace_with: Option<String>,
    },
    /// Add a new column at the end of the table.
    Generate {
        new_column: String,
        source: GeneratedSource,
        /// Fraction of generated values replaced with null, in `[0, 1]`.
        nullable_rate: f64,
    },
}

impl AppendAction {
    pub fn operation(&self) -> AppendOperation {
        match self {
            AppendAction::Replace { .. } => AppendOperation::Replace,
            AppendAction::Generate { .. } => AppendOperation::Generate,
        }
    }
}

/// A post-processing step applied after base rows are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendRule {
    pub action: AppendAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for AppendRule {
    /// A new rule starts as an empty replace, like the "Add Rule" button.
    fn default() -> Self {
        Self::new(AppendAction::Replace {
            target_column: None,
            rename_to: None,
            find: None,
            replace_with: None,
        })
    }
}

impl AppendRule {
    pub fn new(action: AppendAction) -> Self {
        Self {
            action,
            description: None,
        }
    }

    pub fn replace(target_column: usize, find: impl Into<String>, replace_with: impl Into<String>) -> Self {
        Self::new(AppendAction::Replace {
            target_column: Some(target_column),
            rename_to: None,
            find: Some(find.into()),
            replace_with: Some(replace_with.into()),
        })
    }

    pub fn generate(new_column: impl Into<String>, source: GeneratedSource, nullable_rate: f64) -> Self {
        Self::new(AppendAction::Generate {
            new_column: new_column.into(),
            source,
            nullable_rate,
        })
    }

    pub fn operation(&self) -> AppendOperation {
        self.action.operation()
    }

    /// Name of the column this rule adds, if it adds one.
    pub fn generated_column(&self) -> Option<&str> {
        match &self.action {
            AppendAction::Generate { new_column, .. } => Some(new_column),
            AppendAction::Replace { .. } => None,
        }
    }

    /// Switch between replace and generate, resetting the payload.
    pub fn set_operation(&mut self, operation: AppendOperation) {
        if self.operation() == operation {
            return;
        }
        self.action = match operation {
            AppendOperation::Replace => AppendRule::default().action,
            AppendOperation::Generate => AppendAction::Generate {
                new_column: String::new(),
                source: GeneratedSource::Faker {
                    method: DEFAULT_FAKER_METHOD.to_string(),
                },
                nullable_rate: 0.0,
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_column_only_for_generate() {
        let rule = AppendRule::replace(7, "20", "Pendrive");
        assert_eq!(rule.generated_column(), None);

        let rule = AppendRule::generate("Notes", GeneratedSource::default(), 0.2);
        assert_eq!(rule.generated_column(), Some("Notes"));
    }

    #[test]
    fn test_set_operation_resets_payload() {
        let mut rule = AppendRule::replace(3, "a", "b");
        rule.set_operation(AppendOperation::Generate);
        match &rule.action {
            AppendAction::Generate {
                source,
                nullable_rate,
                ..
            } => {
                assert_eq!(source.as_str(), "faker");
                assert_eq!(*nullable_rate, 0.0);
            }
            other => panic!("expected generate, got {:?}", other),
        }
    }
}
