use serde::{Deserialize, Serialize};

use crate::model::DType;

/// A single generated cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Convert to a CSV-friendly string. Nulls become empty cells.
    pub fn to_csv_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Strings are parsed; nulls have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
        }
    }

    /// Whether this cell equals a literal written in `rules.ini`. Numbers
    /// compare numerically, so `5`, `5.0` and `"5"` all match `5`.
    pub fn matches_literal(&self, literal: &str) -> bool {
        if let (Some(a), Ok(b)) = (self.as_f64(), literal.trim().parse::<f64>()) {
            return a == b;
        }
        self.to_csv_string() == literal
    }

    /// Convert to the declared column type.
    ///
    /// Nulls become `0` for numeric types and `""` for strings. Floats and
    /// decimals are rounded to two places. A value that is not a number
    /// cannot become an `int` or `float` column; its text is returned as the
    /// error so the caller can decide what to store instead.
    pub fn coerce(self, dtype: DType) -> Result<Value, String> {
        match dtype {
            DType::Str => Ok(Value::String(self.to_csv_string())),
            DType::Int => match self {
                Value::Null => Ok(Value::Int(0)),
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Float(f) => Ok(Value::Int(f.trunc() as i64)),
                Value::String(s) => {
                    let trimmed = s.trim();
                    trimmed
                        .parse::<i64>()
                        .ok()
                        .or_else(|| trimmed.parse::<f64>().ok().map(|f| f.trunc() as i64))
                        .map(Value::Int)
                        .ok_or(s)
                }
            },
            DType::Float | DType::Decimal => match self {
                Value::Null => Ok(Value::Float(0.0)),
                other => match other.as_f64() {
                    Some(f) => Ok(Value::Float(round2(f))),
                    None => Err(other.to_csv_string()),
                },
            },
        }
    }

    /// The value a numeric column stores when it has nothing usable.
    pub fn zero(dtype: DType) -> Value {
        match dtype {
            DType::Str => Value::String(String::new()),
            DType::Int => Value::Int(0),
            DType::Float | DType::Decimal => Value::Float(0.0),
        }
    }
}

pub(crate) fn round2(f: f64) -> f64 {
    (f * 100.0).round() / 100.0
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}
