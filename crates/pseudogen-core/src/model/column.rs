use std::fmt;

use serde::{Deserialize, Serialize};

use crate::weights::WeightedOption;

/// Faker method used when none is given.
pub const DEFAULT_FAKER_METHOD: &str = "name";

/// Output type of a column. Spelled `str|int|float|decimal` in `rules.ini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    #[default]
    Str,
    Int,
    Float,
    Decimal,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Str => "str",
            DType::Int => "int",
            DType::Float => "float",
            DType::Decimal => "decimal",
        }
    }

    /// Accepts the short spellings used in rule files and the long ones the
    /// editor shows (`string`, `integer`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Some(DType::Str),
            "int" | "integer" => Some(DType::Int),
            "float" => Some(DType::Float),
            "decimal" => Some(DType::Decimal),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy a column uses to produce values, as written in the `data` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Random,
    Faker,
    CompanyId,
    Increment,
    Reference,
    ReferenceRange,
    ReferenceBoolean,
    ReferenceBoolean2,
    Total,
    Discount,
}

impl DataSource {
    pub const ALL: [DataSource; 10] = [
        DataSource::Random,
        DataSource::Faker,
        DataSource::CompanyId,
        DataSource::Increment,
        DataSource::Reference,
        DataSource::ReferenceRange,
        DataSource::ReferenceBoolean,
        DataSource::ReferenceBoolean2,
        DataSource::Total,
        DataSource::Discount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Random => "random",
            DataSource::Faker => "faker",
            DataSource::CompanyId => "company",
            DataSource::Increment => "increment",
            DataSource::Reference => "reference",
            DataSource::ReferenceRange => "reference_range",
            DataSource::ReferenceBoolean => "reference_boolean",
            DataSource::ReferenceBoolean2 => "reference_boolean2",
            DataSource::Total => "total",
            DataSource::Discount => "discount",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|d| d.as_str() == key)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic used by `total` and `discount` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "*")]
    Times,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Times => "*",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "+" => Some(Operator::Plus),
            "-" => Some(Operator::Minus),
            "*" => Some(Operator::Times),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Value-generation rule of a column together with its payload.
///
/// Column references (`source_column`, `operands`) are 1-based positions in
/// the column list, exactly as written in the `cols` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data", rename_all = "snake_case")]
pub enum ColumnSource {
    Random {
        pairs: Vec<WeightedOption>,
    },
    Faker {
        method: String,
    },
    #[serde(rename = "company")]
    CompanyId,
    Increment {
        start: Option<i64>,
        interval: Option<i64>,
    },
    /// Exact mapping `source_values[i] -> mapped_values[i]` of another column.
    Reference {
        source_column: Option<usize>,
        source_values: Vec<String>,
        mapped_values: Vec<String>,
    },
    /// Picks `values[i]` for the first `upper_bounds[i]` not below the source value.
    ReferenceRange {
        source_column: Option<usize>,
        values: Vec<String>,
        upper_bounds: Vec<f64>,
    },
    /// `values[0]` when the source equals `condition`, otherwise `values[1]`.
    ReferenceBoolean {
        source_column: Option<usize>,
        condition: Option<String>,
        values: Vec<String>,
    },
    /// A random pick from `values` when the source equals `condition`, otherwise `0`.
    #[serde(rename = "reference_boolean2")]
    ReferenceBoolean2 {
        source_column: Option<usize>,
        condition: Option<String>,
        values: Vec<String>,
    },
    Total {
        operation: Option<Operator>,
        operands: Vec<usize>,
    },
    Discount {
        source_column: Option<usize>,
        operation: Option<Operator>,
        percent: Option<f64>,
    },
}

impl Default for ColumnSource {
    fn default() -> Self {
        ColumnSource::default_for(DataSource::Random)
    }
}

impl ColumnSource {
    /// The payload a freshly switched column starts with.
    pub fn default_for(source: DataSource) -> Self {
        match source {
            DataSource::Random => ColumnSource::Random {
                pairs: vec![WeightedOption::blank()],
            },
            DataSource::Faker => ColumnSource::Faker {
                method: DEFAULT_FAKER_METHOD.to_string(),
            },
            DataSource::CompanyId => ColumnSource::CompanyId,
            DataSource::Increment => ColumnSource::Increment {
                start: None,
                interval: None,
            },
            DataSource::Reference => ColumnSource::Reference {
                source_column: None,
                source_values: Vec::new(),
                mapped_values: Vec::new(),
            },
            DataSource::ReferenceRange => ColumnSource::ReferenceRange {
                source_column: None,
                values: Vec::new(),
                upper_bounds: Vec::new(),
            },
            DataSource::ReferenceBoolean => ColumnSource::ReferenceBoolean {
                source_column: None,
                condition: None,
                values: Vec::new(),
            },
            DataSource::ReferenceBoolean2 => ColumnSource::ReferenceBoolean2 {
                source_column: None,
                condition: None,
                values: Vec::new(),
            },
            DataSource::Total => ColumnSource::Total {
                operation: None,
                operands: Vec::new(),
            },
            DataSource::Discount => ColumnSource::Discount {
                source_column: None,
                operation: None,
                percent: None,
            },
        }
    }

    pub fn data_source(&self) -> DataSource {
        match self {
            ColumnSource::Random { .. } => DataSource::Random,
            ColumnSource::Faker { .. } => DataSource::Faker,
            ColumnSource::CompanyId => DataSource::CompanyId,
            ColumnSource::Increment { .. } => DataSource::Increment,
            ColumnSource::Reference { .. } => DataSource::Reference,
            ColumnSource::ReferenceRange { .. } => DataSource::ReferenceRange,
            ColumnSource::ReferenceBoolean { .. } => DataSource::ReferenceBoolean,
            ColumnSource::ReferenceBoolean2 { .. } => DataSource::ReferenceBoolean2,
            ColumnSource::Total { .. } => DataSource::Total,
            ColumnSource::Discount { .. } => DataSource::Discount,
        }
    }

    /// The `cols` reference, for sources that read another column.
    pub fn source_column(&self) -> Option<usize> {
        match self {
            ColumnSource::Reference { source_column, .. }
            | ColumnSource::ReferenceRange { source_column, .. }
            | ColumnSource::ReferenceBoolean { source_column, .. }
            | ColumnSource::ReferenceBoolean2 { source_column, .. }
            | ColumnSource::Discount { source_column, .. } => *source_column,
            _ => None,
        }
    }

    /// Every 1-based column this source reads from.
    pub fn references(&self) -> Vec<usize> {
        match self {
            ColumnSource::Total { operands, .. } => operands.clone(),
            other => other.source_column().into_iter().collect(),
        }
    }
}

/// One declared field of the generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: DType,
    pub source: ColumnSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            dtype: DType::Str,
            source: ColumnSource::default(),
            description: None,
        }
    }
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, dtype: DType, source: ColumnSource) -> Self {
        Self {
            name: name.into(),
            dtype,
            source,
            description: None,
        }
    }

    /// A string column drawing from weighted options.
    pub fn random(name: impl Into<String>, pairs: Vec<WeightedOption>) -> Self {
        Self::new(name, DType::Str, ColumnSource::Random { pairs })
    }

    /// A string column filled by a faker method.
    pub fn faker(name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(
            name,
            DType::Str,
            ColumnSource::Faker {
                method: method.into(),
            },
        )
    }

    pub fn data_source(&self) -> DataSource {
        self.source.data_source()
    }

    /// Switch the data source, resetting the payload unless it already matches.
    pub fn set_data_source(&mut self, source: DataSource) {
        if self.source.data_source() != source {
            self.source = ColumnSource::default_for(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_spellings_round_trip() {
        for source in DataSource::ALL {
            assert_eq!(DataSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(DataSource::parse(" Reference_Range "), Some(DataSource::ReferenceRange));
        assert_eq!(DataSource::parse("companyId"), None);
    }

    #[test]
    fn test_dtype_accepts_long_names() {
        assert_eq!(DType::parse("string"), Some(DType::Str));
        assert_eq!(DType::parse("INTEGER"), Some(DType::Int));
        assert_eq!(DType::parse("money"), None);
    }

    #[test]
    fn test_default_for_matches_source() {
        for source in DataSource::ALL {
            assert_eq!(ColumnSource::default_for(source).data_source(), source);
        }
    }

    #[test]
    fn test_set_data_source_keeps_matching_payload() {
        let mut col = ColumnSpec::faker("email", "email");
        col.set_data_source(DataSource::Faker);
        assert_eq!(
            col.source,
            ColumnSource::Faker {
                method: "email".to_string()
            }
        );

        col.set_data_source(DataSource::Random);
        assert_eq!(
            col.source,
            ColumnSource::Random {
                pairs: vec![WeightedOption::blank()]
            }
        );
    }

    #[test]
    fn test_references() {
        let total = ColumnSource::Total {
            operation: Some(Operator::Times),
            operands: vec![8, 9],
        };
        assert_eq!(total.references(), vec![8, 9]);

        let discount = ColumnSource::Discount {
            source_column: Some(10),
            operation: Some(Operator::Minus),
            percent: Some(10.0),
        };
        assert_eq!(discount.references(), vec![10]);
        assert!(ColumnSource::CompanyId.references().is_empty());
    }
}
