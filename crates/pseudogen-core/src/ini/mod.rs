//! # rules.ini Codec
//!
//! Converts a [`RuleFile`] to and from the sectioned `rules.ini` text that the
//! generator service consumes:
//!
//! ```ini
//! [rec]
//! num = 150
//! mode = 2
//! cols = 2
//!
//! [c1]
//! name = Lead_Source
//! dtype = str
//! data = random
//! options = Website,Call,Tradeshow
//! weights = 25,25,50
//!
//! [c2]
//! name = Owner
//! dtype = str
//! data = faker
//! faker_method = name
//!
//! [a1]
//! operation = replace
//! cols = 1
//! find = Call
//! replace = Phone
//! ```
//!
//! Lists are comma-joined with no escaping, so a value containing a comma
//! cannot survive a round trip. Columns and rules are ordered by the number
//! in their section name, never by where the section appears in the file.

pub(crate) mod decode;
pub mod document;
mod encode;

use std::path::Path;

use crate::error::{PseudoGenError, Result};
use crate::model::{AppendOperation, DataSource, GeneratedSource, RuleFile};

use self::document::Document;

/// Default name for exported rule files.
pub const RULES_FILE_NAME: &str = "rules.ini";

pub const REC_SECTION: &str = "rec";
pub const REORDER_SECTION: &str = "reorder";

/// Keys understood in `[rec]`.
pub const REC_KEYS: &[&str] = &["num", "mode", "cols", "description"];

/// Keys understood in `[reorder]`.
pub const REORDER_KEYS: &[&str] = &["order", "description"];

/// Keys understood in a `[cN]` section.
pub const COLUMN_KEYS: &[&str] = &[
    "name",
    "dtype",
    "data",
    "options",
    "weights",
    "cols",
    "operation",
    "operands",
    "condition",
    "faker_method",
    "value",
    "range",
    "start",
    "interval",
    "description",
];

/// Keys understood in an `[aN]` section.
pub const RULE_KEYS: &[&str] = &[
    "operation",
    "cols",
    "col_name",
    "find",
    "replace",
    "new_col",
    "data",
    "options",
    "weights",
    "faker_method",
    "nullable",
    "description",
];

/// Keys a column section may carry for its data source.
pub fn relevant_column_keys(source: DataSource) -> &'static [&'static str] {
    match source {
        DataSource::Random => &["name", "dtype", "data", "options", "weights", "description"],
        DataSource::Faker => &["name", "dtype", "data", "faker_method", "description"],
        DataSource::CompanyId => &["name", "dtype", "data", "description"],
        DataSource::Increment => &["name", "dtype", "data", "start", "interval", "description"],
        DataSource::Reference | DataSource::ReferenceRange => {
            &["name", "dtype", "data", "cols", "value", "range", "description"]
        }
        DataSource::ReferenceBoolean | DataSource::ReferenceBoolean2 => {
            &["name", "dtype", "data", "cols", "condition", "value", "description"]
        }
        DataSource::Total => &["name", "dtype", "data", "operation", "operands", "description"],
        DataSource::Discount => &["name", "dtype", "data", "cols", "operation", "value", "description"],
    }
}

/// Keys a rule section may carry for its operation (and, for generate
/// rules, its data source).
pub fn relevant_rule_keys(
    operation: AppendOperation,
    source: Option<&GeneratedSource>,
) -> &'static [&'static str] {
    match (operation, source) {
        (AppendOperation::Replace, _) => {
            &["operation", "cols", "col_name", "find", "replace", "description"]
        }
        (AppendOperation::Generate, Some(GeneratedSource::Faker { .. })) => &[
            "operation",
            "new_col",
            "data",
            "faker_method",
            "nullable",
            "description",
        ],
        (AppendOperation::Generate, _) => &[
            "operation",
            "new_col",
            "data",
            "options",
            "weights",
            "nullable",
            "description",
        ],
    }
}

pub(crate) fn column_section_name(position: usize) -> String {
    format!("c{}", position)
}

pub(crate) fn rule_section_name(position: usize) -> String {
    format!("a{}", position)
}

/// Render a rule file as `rules.ini` text.
///
/// `[reorder]` is written only when it has an order or a description; mode
/// gating is left to validation so that nothing the user entered is lost.
pub fn to_ini_string(rule_file: &RuleFile) -> String {
    encode::encode(rule_file).render()
}

/// Parse `rules.ini` text.
///
/// Every problem in the text is reported together in one
/// [`PseudoGenError::Parse`]. Nothing is returned unless the whole document
/// is valid.
pub fn from_ini_str(text: &str) -> Result<RuleFile> {
    let (doc, mut issues) = Document::parse(text);
    let rule_file = decode::decode(&doc, &mut issues);
    if issues.is_empty() {
        Ok(rule_file)
    } else {
        Err(PseudoGenError::Parse { issues })
    }
}

/// Reject anything that is not a `.ini` path before it is opened or sent.
pub fn ensure_ini_extension(path: &Path) -> Result<()> {
    let is_ini = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("ini"))
        .unwrap_or(false);
    if is_ini {
        Ok(())
    } else {
        Err(PseudoGenError::InvalidFileExtension {
            path: path.display().to_string(),
        })
    }
}

/// Read and parse a rules file from disk.
pub fn read_rules_file(path: &Path) -> Result<RuleFile> {
    ensure_ini_extension(path)?;
    let text = std::fs::read_to_string(path).map_err(|e| PseudoGenError::Output {
        message: format!("Failed to read {}", path.display()),
        source: e,
    })?;
    from_ini_str(&text)
}

/// Write a rules file atomically.
///
/// The text goes to a temporary file in the same directory first and is then
/// renamed into place, so an interrupted write never leaves half a file.
pub fn write_rules_file(rule_file: &RuleFile, path: &Path) -> Result<()> {
    use std::io::Write;

    let text = to_ini_string(rule_file);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| RULES_FILE_NAME.to_string());
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let write_result = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();

    write_result.map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        PseudoGenError::Output {
            message: format!("Failed to write {}", path.display()),
            source: e,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AppendAction, AppendRule, ColumnSource, ColumnSpec, DType, Mode, Operator, ReorderSpec,
    };
    use crate::weights::WeightedOption;

    const COLOR_EXAMPLE: &str = "\
[rec]
num = 10
mode = 1
cols = 1

[c1]
name = color
dtype = str
data = random
options = Red,Green,Blue
weights = 1,2,1
";

    fn full_rule_file() -> RuleFile {
        let mut rf = RuleFile::new();
        rf.settings.record_count = 150;
        rf.settings.mode = Mode::FullWithReorder;
        rf.settings.description = Some("sales pipeline".to_string());
        rf.columns = vec![
            ColumnSpec::new("Company_ID", DType::Int, ColumnSource::CompanyId),
            ColumnSpec::random(
                "Lead_Source",
                vec![
                    WeightedOption::new("Website", 25.0),
                    WeightedOption::new("Call", 0.5),
                ],
            ),
            ColumnSpec::faker("Owner", "email"),
            ColumnSpec::new(
                "Serial",
                DType::Int,
                ColumnSource::Increment {
                    start: Some(1000),
                    interval: Some(-5),
                },
            ),
            ColumnSpec::new(
                "Manager",
                DType::Str,
                ColumnSource::Reference {
                    source_column: Some(2),
                    source_values: vec!["Website".into(), "Call".into()],
                    mapped_values: vec!["Ann".into(), "Bo".into()],
                },
            ),
            ColumnSpec::new(
                "Tier",
                DType::Int,
                ColumnSource::ReferenceRange {
                    source_column: Some(4),
                    values: vec!["1".into(), "2".into()],
                    upper_bounds: vec![3.0, 6.5],
                },
            ),
            ColumnSpec::new(
                "Offer",
                DType::Int,
                ColumnSource::ReferenceBoolean {
                    source_column: Some(6),
                    condition: Some("1".into()),
                    values: vec!["1".into(), "0".into()],
                },
            ),
            ColumnSpec::new(
                "Quantity",
                DType::Int,
                ColumnSource::ReferenceBoolean2 {
                    source_column: Some(7),
                    condition: Some("1".into()),
                    values: vec!["1".into(), "2".into(), "3".into()],
                },
            ),
            ColumnSpec::new(
                "Total",
                DType::Decimal,
                ColumnSource::Total {
                    operation: Some(Operator::Times),
                    operands: vec![4, 8],
                },
            ),
            ColumnSpec::new(
                "Price",
                DType::Decimal,
                ColumnSource::Discount {
                    source_column: Some(9),
                    operation: Some(Operator::Minus),
                    percent: Some(12.5),
                },
            ),
        ];
        rf.columns[2].description = Some("contact email".to_string());
        let mut rename = AppendRule::replace(2, "Call", "Phone");
        if let AppendAction::Replace { rename_to, .. } = &mut rename.action {
            *rename_to = Some("Channel".to_string());
        }
        rf.append_rules = vec![
            rename,
            AppendRule::generate(
                "Region",
                GeneratedSource::Random {
                    pairs: vec![WeightedOption::new("EU", 3.0), WeightedOption::new("US", 1.0)],
                },
                0.25,
            ),
            AppendRule::generate(
                "Notes",
                GeneratedSource::Faker {
                    method: "sentence".into(),
                },
                0.0,
            ),
        ];
        rf.reorder = ReorderSpec {
            order: (1..=12).rev().collect(),
            description: None,
        };
        rf
    }

    #[test]
    fn test_color_example_parses() {
        let rf = from_ini_str(COLOR_EXAMPLE).unwrap();
        assert_eq!(rf.settings.record_count, 10);
        assert_eq!(rf.settings.mode, Mode::BaseOnly);
        assert_eq!(rf.columns.len(), 1);
        let col = &rf.columns[0];
        assert_eq!(col.name, "color");
        assert_eq!(col.dtype, DType::Str);
        assert_eq!(
            col.source,
            ColumnSource::Random {
                pairs: vec![
                    WeightedOption::new("Red", 1.0),
                    WeightedOption::new("Green", 2.0),
                    WeightedOption::new("Blue", 1.0),
                ]
            }
        );
    }

    #[test]
    fn test_color_example_reserializes_equivalently() {
        let rf = from_ini_str(COLOR_EXAMPLE).unwrap();
        let text = to_ini_string(&rf);
        assert_eq!(text, COLOR_EXAMPLE);
    }

    #[test]
    fn test_full_round_trip() {
        let rf = full_rule_file();
        let text = to_ini_string(&rf);
        let parsed = from_ini_str(&text).unwrap();
        assert_eq!(parsed, rf, "serialized text:\n{}", text);
    }

    #[test]
    fn test_only_relevant_keys_are_written() {
        let rf = full_rule_file();
        let (doc, issues) = Document::parse(&to_ini_string(&rf));
        assert!(issues.is_empty());

        for (idx, column) in rf.columns.iter().enumerate() {
            let section = doc
                .sections
                .iter()
                .find(|s| s.name == column_section_name(idx + 1))
                .unwrap();
            let allowed = relevant_column_keys(column.data_source());
            for entry in &section.entries {
                assert!(
                    allowed.contains(&entry.key.as_str()),
                    "[{}] ({}) wrote irrelevant key '{}'",
                    section.name,
                    column.data_source(),
                    entry.key
                );
            }
        }
    }

    #[test]
    fn test_reference_column_never_writes_faker_method() {
        let text = to_ini_string(&full_rule_file());
        let c5 = text.split("[c5]").nth(1).unwrap().split("\n\n").next().unwrap();
        assert!(c5.contains("data = reference"));
        assert!(!c5.contains("faker_method"));
        assert!(!c5.contains("options"));
    }

    #[test]
    fn test_section_number_decides_order() {
        let text = "[c3]\nname = third\n\n[rec]\nnum = 1\n\n[c1]\nname = first\n\n[c2]\nname = second\n";
        let rf = from_ini_str(text).unwrap();
        let names: Vec<&str> = rf.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_ten_or_more_columns_keep_numeric_order() {
        let mut text = String::from("[rec]\nnum = 1\n");
        for n in (1..=12).rev() {
            text.push_str(&format!("\n[c{}]\nname = col{}\n", n, n));
        }
        let rf = from_ini_str(&text).unwrap();
        assert_eq!(rf.columns[1].name, "col2");
        assert_eq!(rf.columns[9].name, "col10");
        assert_eq!(rf.columns[11].name, "col12");
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let text = "[rec]\n\n[c1]\n\n[c2]\ndata = faker\n\n[a1]\noperation = generate\n";
        let rf = from_ini_str(text).unwrap();
        assert_eq!(rf.settings.record_count, 100);
        assert_eq!(rf.settings.mode, Mode::BaseOnly);
        assert_eq!(rf.columns[0].name, "");
        assert_eq!(rf.columns[0].dtype, DType::Str);
        assert_eq!(rf.columns[0].source, ColumnSource::Random { pairs: vec![] });
        assert_eq!(
            rf.columns[1].source,
            ColumnSource::Faker {
                method: "name".into()
            }
        );
        match &rf.append_rules[0].action {
            AppendAction::Generate { nullable_rate, .. } => assert_eq!(*nullable_rate, 0.0),
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_irrelevant_keys_are_skipped() {
        let text = "[rec]\nnum = 1\n\n[c1]\nname = who\ndata = faker\noptions = a,b\nweights = x\n";
        let rf = from_ini_str(text).unwrap();
        assert_eq!(rf.columns[0].source, ColumnSource::Faker { method: "name".into() });
    }

    #[test]
    fn test_lists_are_trimmed_and_empty_segments_dropped() {
        let text = "[rec]\nnum = 1\n\n[c1]\noptions = a, ,b ,, c\nweights = 1,,2\n";
        let rf = from_ini_str(text).unwrap();
        match &rf.columns[0].source {
            ColumnSource::Random { pairs } => {
                let opts: Vec<&str> = pairs.iter().map(|p| p.option.as_str()).collect();
                assert_eq!(opts, vec!["a", "b", "c"]);
                let weights: Vec<f64> = pairs.iter().map(|p| p.weight).collect();
                assert_eq!(weights, vec![1.0, 2.0, 1.0]);
            }
            other => panic!("expected random, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_numbers_are_aggregated() {
        let text = "[rec]\nnum = many\nmode = 7\n\n[c1]\ndata = increment\nstart = one\n\n[c2]\ndata = total\noperands = c1,x9\noperation = /\n";
        let err = from_ini_str(text).unwrap_err();
        match err {
            PseudoGenError::Parse { issues } => {
                assert_eq!(issues.len(), 5, "{:?}", issues);
                let sections: Vec<&str> = issues.iter().filter_map(|i| i.section.as_deref()).collect();
                assert!(sections.contains(&"rec"));
                assert!(sections.contains(&"c1"));
                assert!(sections.contains(&"c2"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_rec_is_an_error() {
        let err = from_ini_str("[c1]\nname = x\n").unwrap_err();
        assert!(err.to_string().contains("missing [rec]"));
    }

    #[test]
    fn test_gap_in_column_numbers_is_an_error() {
        let err = from_ini_str("[rec]\nnum = 1\n\n[c1]\nname = a\n\n[c3]\nname = c\n").unwrap_err();
        assert!(err.to_string().contains("missing section [c2]"), "{}", err);
    }

    #[test]
    fn test_same_position_twice_is_an_error() {
        let err = from_ini_str("[rec]\n\n[c1]\nname = a\n\n[c01]\nname = b\n").unwrap_err();
        assert!(err.to_string().contains("same position as [c1]"), "{}", err);
    }

    #[test]
    fn test_nullable_out_of_range() {
        let text = "[rec]\nmode = 2\n\n[a1]\noperation = generate\nnew_col = x\nnullable = 1.5\n";
        let err = from_ini_str(text).unwrap_err();
        assert!(err.to_string().contains("between 0 and 1"));
    }

    #[test]
    fn test_unknown_sections_and_keys_are_ignored() {
        let text = "[rec]\nnum = 3\nauthor = me\n\n[meta]\nfoo = bar\n";
        let rf = from_ini_str(text).unwrap();
        assert_eq!(rf.settings.record_count, 3);
    }

    #[test]
    fn test_zero_reference_is_kept() {
        let text = "[rec]\n\n[c1]\ndata = reference\ncols = 0\n\n[c2]\ndata = total\noperation = +\noperands = c0,c1\n";
        let rf = from_ini_str(text).unwrap();
        assert_eq!(rf.columns[0].source.source_column(), Some(0));
        assert_eq!(
            rf.columns[1].source,
            ColumnSource::Total {
                operation: Some(Operator::Plus),
                operands: vec![0, 1],
            }
        );
    }

    #[test]
    fn test_huge_section_number_is_one_issue() {
        let text = "[rec]\nnum = 1\n\n[c20000000]\nname = x\noptions = a\n\n[a4000000000]\noperation = replace\n";
        match from_ini_str(text).unwrap_err() {
            PseudoGenError::Parse { issues } => {
                assert_eq!(issues.len(), 2, "{:?}", issues);
                assert!(issues[0].message.contains("missing sections [c1] to [c19999999]"));
                assert!(issues[1].message.contains("missing sections [a1] to [a3999999999]"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_edge_values_round_trip() {
        let mut rf = RuleFile::new();
        rf.settings.mode = Mode::FullWithReorder;
        rf.settings.description = Some(String::new());
        rf.columns = vec![
            ColumnSpec::new("", DType::Str, ColumnSource::Random { pairs: vec![] }),
            ColumnSpec::faker("blank_method", ""),
            ColumnSpec::new(
                "count",
                DType::Float,
                ColumnSource::Increment {
                    start: None,
                    interval: None,
                },
            ),
            ColumnSpec::new(
                "empty_map",
                DType::Str,
                ColumnSource::Reference {
                    source_column: Some(0),
                    source_values: vec![],
                    mapped_values: vec![],
                },
            ),
            ColumnSpec::new(
                "bands",
                DType::Int,
                ColumnSource::ReferenceRange {
                    source_column: None,
                    values: vec![],
                    upper_bounds: vec![],
                },
            ),
            ColumnSpec::new(
                "flag",
                DType::Str,
                ColumnSource::ReferenceBoolean {
                    source_column: Some(3),
                    condition: Some(String::new()),
                    values: vec!["y".into(), "n".into()],
                },
            ),
            ColumnSpec::new(
                "pick",
                DType::Str,
                ColumnSource::ReferenceBoolean2 {
                    source_column: Some(6),
                    condition: None,
                    values: vec![],
                },
            ),
            ColumnSpec::new(
                "sum",
                DType::Decimal,
                ColumnSource::Total {
                    operation: None,
                    operands: vec![0, 3],
                },
            ),
            ColumnSpec::new(
                "net",
                DType::Decimal,
                ColumnSource::Discount {
                    source_column: None,
                    operation: None,
                    percent: None,
                },
            ),
            ColumnSpec::new("id", DType::Int, ColumnSource::CompanyId),
        ];
        rf.columns[9].description = Some(String::new());

        let mut strip = AppendRule::replace(1, "a", "");
        strip.description = Some(String::new());
        rf.append_rules = vec![
            strip,
            AppendRule::new(AppendAction::Replace {
                target_column: Some(0),
                rename_to: None,
                find: None,
                replace_with: None,
            }),
            AppendRule::generate("", GeneratedSource::Random { pairs: vec![] }, 0.0),
            AppendRule::generate("extra", GeneratedSource::Faker { method: String::new() }, 1.0),
        ];
        rf.reorder = ReorderSpec {
            order: vec![],
            description: Some(String::new()),
        };

        let text = to_ini_string(&rf);
        let parsed = from_ini_str(&text).unwrap();
        assert_eq!(parsed, rf, "serialized text:\n{}", text);
    }

    #[test]
    fn test_reorder_written_only_when_present() {
        let mut rf = full_rule_file();
        assert!(to_ini_string(&rf).contains("[reorder]\norder = 12,11,10"));
        rf.reorder = ReorderSpec::default();
        assert!(!to_ini_string(&rf).contains("[reorder]"));
    }

    #[test]
    fn test_extension_check() {
        assert!(ensure_ini_extension(Path::new("rules.ini")).is_ok());
        assert!(ensure_ini_extension(Path::new("RULES.INI")).is_ok());
        assert!(ensure_ini_extension(Path::new("rules.txt")).is_err());
        assert!(ensure_ini_extension(Path::new("rules")).is_err());
    }

    #[test]
    fn test_read_rejects_non_ini_without_opening() {
        let err = read_rules_file(Path::new("/nonexistent/rules.cfg")).unwrap_err();
        assert!(matches!(err, PseudoGenError::InvalidFileExtension { .. }));
    }

    #[test]
    fn test_write_then_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RULES_FILE_NAME);
        let rf = full_rule_file();
        write_rules_file(&rf, &path).unwrap();
        assert!(!dir.path().join(".rules.ini.tmp").exists());
        assert_eq!(read_rules_file(&path).unwrap(), rf);
    }
}
