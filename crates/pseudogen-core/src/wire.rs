//! # Generator Service Wire Format
//!
//! JSON bodies exchanged with the generator service. The request body mirrors
//! the `rules.ini` keys (`num_records`, `columns[].data`, `append_rules[].new_col`,
//! ...). Responses from `/parse-ini` are loosely typed: lists may arrive as
//! comma-joined strings or arrays, numbers as strings. Those are normalized by
//! routing each entry through the same section decoder `rules.ini` uses, so
//! defaults and error messages are identical for both paths.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::{ParseIssue, PseudoGenError, Result};
use crate::ini::decode::{decode_column, decode_rule};
use crate::ini::document::Section;
use crate::model::{
    AppendAction, AppendRule, ColumnSource, ColumnSpec, GeneratedSource, GlobalSettings, Mode,
    ReorderSpec, RuleFile, DEFAULT_FAKER_METHOD,
};
use crate::weights;

/// Request body for `/generate-ini` and `/preview-data`, and the `data`
/// payload of a `/parse-ini` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRuleFile {
    #[serde(default = "default_num_records", deserialize_with = "de_u64")]
    pub num_records: u64,
    #[serde(default = "default_mode", deserialize_with = "de_u8")]
    pub mode: u8,
    #[serde(default)]
    pub columns: Vec<WireColumn>,
    #[serde(default)]
    pub append_rules: Vec<WireAppendRule>,
    #[serde(default, deserialize_with = "de_index_list")]
    pub reorder: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireColumn {
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(default = "default_dtype", deserialize_with = "de_string")]
    pub dtype: String,
    #[serde(default = "default_data", deserialize_with = "de_string")]
    pub data: String,
    #[serde(default, deserialize_with = "de_string_list")]
    pub options: Vec<String>,
    #[serde(default, deserialize_with = "de_string_list", serialize_with = "ser_weights")]
    pub weights: Vec<String>,
    #[serde(default = "default_faker_method", deserialize_with = "de_string")]
    pub faker_method: String,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_int")]
    pub cols: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub value: Vec<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub range: Vec<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub operands: Vec<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_int")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_int")]
    pub interval: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Section number reported by `/parse-ini`; never sent.
    #[serde(default, deserialize_with = "de_opt_usize", skip_serializing)]
    pub column_position: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireAppendRule {
    #[serde(default = "default_operation", deserialize_with = "de_string")]
    pub operation: String,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_int")]
    pub cols: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub col_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub find: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub replace: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub new_col: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub options: Vec<String>,
    #[serde(default, deserialize_with = "de_string_list", serialize_with = "ser_weights")]
    pub weights: Vec<String>,
    #[serde(default = "default_faker_method", deserialize_with = "de_string")]
    pub faker_method: String,
    #[serde(default, deserialize_with = "de_f64")]
    pub nullable: f64,
    #[serde(default, deserialize_with = "de_opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Envelope returned by `/parse-ini`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParseIniResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<WireRuleFile>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Rows and columns of a preview table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Shape {
    pub rows: usize,
    pub columns: usize,
}

impl From<(usize, usize)> for Shape {
    fn from((rows, columns): (usize, usize)) -> Self {
        Self { rows, columns }
    }
}

impl From<Shape> for (usize, usize) {
    fn from(shape: Shape) -> Self {
        (shape.rows, shape.columns)
    }
}

/// Response of `/preview-data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    /// Sample rows keyed by column name, in column order.
    #[serde(rename = "preview_data", default)]
    pub rows: Vec<IndexMap<String, JsonValue>>,
    #[serde(rename = "columns", default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewResult {
    /// What the caller shows when the preview request itself failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            message: "Error generating preview".to_string(),
            ..Self::default()
        }
    }

    /// Preview of a rule file that has no columns yet.
    pub fn no_columns() -> Self {
        Self {
            message: "Add columns to see preview".to_string(),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&RuleFile> for WireRuleFile {
    fn from(rule_file: &RuleFile) -> Self {
        Self {
            num_records: rule_file.settings.record_count,
            mode: rule_file.settings.mode.number(),
            columns: rule_file.columns.iter().map(WireColumn::from).collect(),
            append_rules: rule_file
                .append_rules
                .iter()
                .map(WireAppendRule::from)
                .collect(),
            reorder: rule_file.reorder.order.clone(),
        }
    }
}

fn stringify<T: ToString>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.to_string()).collect()
}

impl From<&ColumnSpec> for WireColumn {
    fn from(column: &ColumnSpec) -> Self {
        let mut wire = WireColumn {
            name: column.name.clone(),
            dtype: column.dtype.as_str().to_string(),
            data: column.data_source().as_str().to_string(),
            faker_method: DEFAULT_FAKER_METHOD.to_string(),
            description: column.description.clone(),
            ..WireColumn::default()
        };
        wire.cols = column.source.source_column().map(|n| n.to_string());

        match &column.source {
            ColumnSource::Random { pairs } => {
                let (options, weights) = weights::encode(pairs);
                wire.options = options;
                wire.weights = stringify(&weights);
            }
            ColumnSource::Faker { method } => wire.faker_method = method.clone(),
            ColumnSource::CompanyId => {}
            ColumnSource::Increment { start, interval } => {
                wire.start = start.map(|n| n.to_string());
                wire.interval = interval.map(|n| n.to_string());
            }
            ColumnSource::Reference {
                source_values,
                mapped_values,
                ..
            } => {
                wire.value = source_values.clone();
                wire.range = mapped_values.clone();
            }
            ColumnSource::ReferenceRange {
                values,
                upper_bounds,
                ..
            } => {
                wire.value = values.clone();
                wire.range = stringify(upper_bounds);
            }
            ColumnSource::ReferenceBoolean {
                condition, values, ..
            }
            | ColumnSource::ReferenceBoolean2 {
                condition, values, ..
            } => {
                wire.condition = condition.clone();
                wire.value = values.clone();
            }
            ColumnSource::Total {
                operation,
                operands,
            } => {
                wire.operation = operation.map(|op| op.symbol().to_string());
                wire.operands = operands.iter().map(|n| format!("c{}", n)).collect();
            }
            ColumnSource::Discount {
                operation, percent, ..
            } => {
                wire.operation = operation.map(|op| op.symbol().to_string());
                wire.value = percent.iter().map(|p| p.to_string()).collect();
            }
        }
        wire
    }
}

impl From<&AppendRule> for WireAppendRule {
    fn from(rule: &AppendRule) -> Self {
        let mut wire = WireAppendRule {
            operation: rule.operation().as_str().to_string(),
            faker_method: DEFAULT_FAKER_METHOD.to_string(),
            description: rule.description.clone(),
            ..WireAppendRule::default()
        };
        match &rule.action {
            AppendAction::Replace {
                target_column,
                rename_to,
                find,
                replace_with,
            } => {
                wire.cols = target_column.map(|n| n.to_string());
                wire.col_name = rename_to.clone();
                wire.find = find.clone();
                wire.replace = replace_with.clone();
            }
            AppendAction::Generate {
                new_column,
                source,
                nullable_rate,
            } => {
                wire.new_col = Some(new_column.clone());
                wire.data = Some(source.as_str().to_string());
                wire.nullable = *nullable_rate;
                match source {
                    GeneratedSource::Random { pairs } => {
                        let (options, weights) = weights::encode(pairs);
                        wire.options = options;
                        wire.weights = stringify(&weights);
                    }
                    GeneratedSource::Faker { method } => wire.faker_method = method.clone(),
                }
            }
        }
        wire
    }
}

impl WireColumn {
    fn to_section(&self, position: usize) -> Section {
        let mut s = Section::new(format!("c{}", position));
        s.set("name", self.name.as_str());
        s.set("dtype", self.dtype.as_str());
        s.set("data", self.data.as_str());
        s.set_list("options", &self.options);
        s.set_list("weights", &self.weights);
        s.set("faker_method", self.faker_method.as_str());
        s.set_opt("cols", unset_if_zero(self.cols.as_deref()));
        s.set_list("value", &self.value);
        s.set_list("range", &self.range);
        s.set_opt("condition", self.condition.as_deref());
        s.set_opt("operation", self.operation.as_deref());
        s.set_list("operands", &self.operands);
        s.set_opt("start", self.start.as_deref());
        s.set_opt("interval", self.interval.as_deref());
        s.set_opt("description", self.description.as_deref());
        s
    }
}

impl WireAppendRule {
    fn to_section(&self, position: usize) -> Section {
        let mut s = Section::new(format!("a{}", position));
        s.set("operation", self.operation.as_str());
        s.set_opt("cols", unset_if_zero(self.cols.as_deref()));
        s.set_opt("col_name", self.col_name.as_deref());
        s.set_opt("find", self.find.as_deref());
        s.set_opt("replace", self.replace.as_deref());
        s.set_opt("new_col", self.new_col.as_deref());
        s.set_opt("data", self.data.as_deref());
        s.set_list("options", &self.options);
        s.set_list("weights", &self.weights);
        s.set("faker_method", self.faker_method.as_str());
        if self.nullable != 0.0 {
            s.set("nullable", self.nullable.to_string());
        }
        s.set_opt("description", self.description.as_deref());
        s
    }
}

impl TryFrom<WireRuleFile> for RuleFile {
    type Error = PseudoGenError;

    /// Convert a service payload into a rule file.
    ///
    /// Columns are ordered by `column_position` when the service reports it.
    /// All problems are collected into a single parse error.
    fn try_from(mut wire: WireRuleFile) -> Result<Self> {
        let mut issues = Vec::new();

        let mode = Mode::from_number(wire.mode).unwrap_or_else(|| {
            issues.push(ParseIssue::new(
                Some("rec"),
                None,
                format!("mode must be 1, 2 or 3 (got {})", wire.mode),
            ));
            Mode::default()
        });

        // Stable, so unnumbered columns keep their payload order after the
        // numbered ones.
        wire.columns
            .sort_by_key(|c| (c.column_position.is_none(), c.column_position));

        let columns = wire
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| decode_column(&c.to_section(i + 1), &mut issues))
            .collect();
        let append_rules = wire
            .append_rules
            .iter()
            .enumerate()
            .map(|(i, r)| decode_rule(&r.to_section(i + 1), &mut issues))
            .collect();

        if !issues.is_empty() {
            return Err(PseudoGenError::Parse { issues });
        }

        Ok(RuleFile {
            settings: GlobalSettings {
                record_count: wire.num_records,
                mode,
                description: None,
            },
            columns,
            append_rules,
            reorder: ReorderSpec {
                order: wire.reorder,
                description: None,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Defaults and lenient field parsing
// ---------------------------------------------------------------------------

fn default_num_records() -> u64 {
    crate::model::DEFAULT_RECORD_COUNT
}

fn default_mode() -> u8 {
    1
}

fn default_dtype() -> String {
    "str".to_string()
}

fn default_data() -> String {
    "random".to_string()
}

fn default_operation() -> String {
    "replace".to_string()
}

fn default_faker_method() -> String {
    DEFAULT_FAKER_METHOD.to_string()
}

/// The service reports an unset `cols` as `0`.
fn unset_if_zero(cols: Option<&str>) -> Option<&str> {
    cols.filter(|c| c.trim() != "0")
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn de_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(scalar_to_string(&JsonValue::deserialize(d)?).unwrap_or_default())
}

fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(scalar_to_string(&JsonValue::deserialize(d)?).filter(|s| !s.is_empty()))
}

/// Accepts `"a,b"`, `["a", "b"]`, `[1, 2]` or null.
fn de_string_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    let items = match JsonValue::deserialize(d)? {
        JsonValue::Array(values) => values.iter().filter_map(scalar_to_string).collect(),
        JsonValue::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        JsonValue::Null => Vec::new(),
        other => scalar_to_string(&other).into_iter().collect(),
    };
    Ok(items.into_iter().filter(|s: &String| !s.is_empty()).collect())
}

fn de_index_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<usize>, D::Error> {
    let raw = de_string_list(d)?;
    raw.iter()
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| serde::de::Error::custom(format!("'{}' is not a column index", s)))
        })
        .collect()
}

fn de_opt_usize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<usize>, D::Error> {
    Ok(de_opt_string(d)?.and_then(|s| s.parse().ok()))
}

fn de_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    let raw = de_string(d)?;
    raw.parse()
        .map_err(|_| serde::de::Error::custom(format!("'{}' is not a record count", raw)))
}

fn de_u8<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u8, D::Error> {
    let raw = de_string(d)?;
    raw.parse()
        .map_err(|_| serde::de::Error::custom(format!("'{}' is not a mode", raw)))
}

fn de_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(de_opt_string(d)?
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0))
}

/// The service declares weights as integers; whole numbers are sent as JSON
/// integers and anything else as floats.
fn ser_weights<S: Serializer>(weights: &[String], s: S) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = s.serialize_seq(Some(weights.len()))?;
    for raw in weights {
        let w = raw.parse::<f64>().unwrap_or(weights::DEFAULT_WEIGHT);
        if w.fract() == 0.0 && w.abs() < i64::MAX as f64 {
            seq.serialize_element(&(w as i64))?;
        } else {
            seq.serialize_element(&w)?;
        }
    }
    seq.end()
}

fn ser_opt_int<S: Serializer>(value: &Option<String>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match value.as_deref().map(|v| v.parse::<i64>()) {
        Some(Ok(n)) => s.serialize_i64(n),
        Some(Err(_)) => s.serialize_str(value.as_deref().unwrap_or_default()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DType, Operator};
    use crate::weights::WeightedOption;

    fn rule_file() -> RuleFile {
        let mut rf = RuleFile::new();
        rf.settings.record_count = 1000;
        rf.settings.mode = Mode::BasePlusAppend;
        rf.columns.push(ColumnSpec::random(
            "color",
            vec![
                WeightedOption::new("Red", 1.0),
                WeightedOption::new("", 9.0),
                WeightedOption::new("Blue", 0.5),
            ],
        ));
        rf.columns.push(ColumnSpec::new(
            "total",
            DType::Decimal,
            ColumnSource::Total {
                operation: Some(Operator::Plus),
                operands: vec![1, 1],
            },
        ));
        rf.append_rules.push(AppendRule::replace(1, "Red", "Crimson"));
        rf
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(WireRuleFile::from(&rule_file())).unwrap();
        assert_eq!(body["num_records"], 1000);
        assert_eq!(body["mode"], 2);
        assert_eq!(body["columns"][0]["data"], "random");
        assert_eq!(body["columns"][0]["options"], serde_json::json!(["Red", "Blue"]));
        assert_eq!(body["columns"][0]["weights"], serde_json::json!([1, 0.5]));
        assert_eq!(body["columns"][1]["operands"], serde_json::json!(["c1", "c1"]));
        assert_eq!(body["columns"][1]["operation"], "+");
        assert_eq!(body["append_rules"][0]["cols"], 1);
        assert_eq!(body["append_rules"][0]["replace"], "Crimson");
        assert!(body["columns"][0].get("column_position").is_none());
    }

    #[test]
    fn test_wire_round_trip() {
        let mut rf = rule_file();
        if let ColumnSource::Random { pairs } = &mut rf.columns[0].source {
            pairs.retain(|p| !p.option.is_empty());
        }
        let json = serde_json::to_string(&WireRuleFile::from(&rf)).unwrap();
        let wire: WireRuleFile = serde_json::from_str(&json).unwrap();
        assert_eq!(RuleFile::try_from(wire).unwrap(), rf);
    }

    #[test]
    fn test_parse_ini_payload_is_lenient() {
        let payload = serde_json::json!({
            "num_records": "150",
            "mode": 2,
            "columns": [
                {"name": "Second", "data": "faker", "faker_method": "email", "column_position": 2},
                {"name": "First", "dtype": "int", "data": "random",
                 "options": "1, 0", "weights": "50,x", "column_position": 1}
            ],
            "append_rules": [
                {"operation": "generate", "new_col": "Region", "data": "random",
                 "options": ["EU", "US"], "weights": [3, 1], "nullable": "0.2"}
            ],
            "reorder": "2,1,3"
        });
        let wire: WireRuleFile = serde_json::from_value(payload).unwrap();
        let rf = RuleFile::try_from(wire).unwrap();

        assert_eq!(rf.settings.record_count, 150);
        assert_eq!(rf.columns[0].name, "First");
        assert_eq!(rf.columns[0].dtype, DType::Int);
        assert_eq!(
            rf.columns[0].source,
            ColumnSource::Random {
                pairs: vec![WeightedOption::new("1", 50.0), WeightedOption::new("0", 1.0)]
            }
        );
        assert_eq!(rf.columns[1].name, "Second");
        match &rf.append_rules[0].action {
            AppendAction::Generate { nullable_rate, .. } => assert_eq!(*nullable_rate, 0.2),
            other => panic!("expected generate, got {:?}", other),
        }
        assert_eq!(rf.reorder.order, vec![2, 1, 3]);
    }

    #[test]
    fn test_unnumbered_columns_follow_numbered_ones() {
        let payload = serde_json::json!({
            "num_records": 5,
            "mode": 1,
            "columns": [
                {"name": "Loose", "data": "faker"},
                {"name": "Second", "data": "company", "column_position": 2},
                {"name": "Extra", "data": "reference", "cols": 0},
                {"name": "First", "data": "company", "column_position": 1}
            ]
        });
        let wire: WireRuleFile = serde_json::from_value(payload).unwrap();
        let rf = RuleFile::try_from(wire).unwrap();

        let names: Vec<&str> = rf.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Loose", "Extra"]);
        assert_eq!(rf.columns[3].source.source_column(), None);
    }

    #[test]
    fn test_bad_payload_reports_sections() {
        let payload = serde_json::json!({
            "num_records": 10,
            "mode": 5,
            "columns": [{"name": "x", "data": "lottery"}]
        });
        let wire: WireRuleFile = serde_json::from_value(payload).unwrap();
        let err = RuleFile::try_from(wire).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mode must be 1, 2 or 3"), "{}", msg);
        assert!(msg.contains("[c1]"), "{}", msg);
        assert!(msg.contains("lottery"), "{}", msg);
    }

    #[test]
    fn test_preview_result_deserializes_service_shape() {
        let body = r#"{
            "preview_data": [{"color": "Red", "n": 1}, {"color": "Blue", "n": null}],
            "columns": ["color", "n"],
            "shape": [25, 2],
            "message": "Preview of 2 rows"
        }"#;
        let preview: PreviewResult = serde_json::from_str(body).unwrap();
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.rows[0].keys().collect::<Vec<_>>(), vec!["color", "n"]);
        assert_eq!(preview.shape, Shape { rows: 25, columns: 2 });
        assert!(!preview.is_error());
    }

    #[test]
    fn test_failed_preview() {
        let preview = PreviewResult::failed("connection refused");
        assert!(preview.rows.is_empty());
        assert_eq!(preview.error.as_deref(), Some("connection refused"));
        assert_eq!(preview.message, "Error generating preview");
    }
}
