use super::document::{Document, Section};
use super::{column_section_name, rule_section_name, REC_SECTION, REORDER_SECTION};
use crate::model::{AppendAction, AppendRule, ColumnSource, ColumnSpec, GeneratedSource, RuleFile};
use crate::weights;

/// Build the document for a rule file. Only keys that mean something for a
/// section's declared data source or operation are written.
pub(crate) fn encode(rule_file: &RuleFile) -> Document {
    let mut doc = Document::default();

    let mut rec = Section::new(REC_SECTION);
    rec.set("num", rule_file.settings.record_count.to_string());
    rec.set("mode", rule_file.settings.mode.number().to_string());
    rec.set("cols", rule_file.columns.len().to_string());
    rec.set_opt("description", rule_file.settings.description.as_deref());
    doc.sections.push(rec);

    for (idx, column) in rule_file.columns.iter().enumerate() {
        doc.sections.push(encode_column(idx + 1, column));
    }

    for (idx, rule) in rule_file.append_rules.iter().enumerate() {
        doc.sections.push(encode_rule(idx + 1, rule));
    }

    if !rule_file.reorder.is_empty() {
        let mut reorder = Section::new(REORDER_SECTION);
        reorder.set_list("order", &rule_file.reorder.order);
        reorder.set_opt("description", rule_file.reorder.description.as_deref());
        doc.sections.push(reorder);
    }

    doc
}

fn encode_column(position: usize, column: &ColumnSpec) -> Section {
    let mut s = Section::new(column_section_name(position));
    s.set("name", column.name.as_str());
    s.set("dtype", column.dtype.as_str());
    s.set("data", column.data_source().as_str());

    match &column.source {
        ColumnSource::Random { pairs } => {
            let (options, weights) = weights::encode(pairs);
            s.set_list("options", &options);
            s.set_list("weights", &weights);
        }
        ColumnSource::Faker { method } => {
            s.set_opt("faker_method", Some(method.as_str()));
        }
        ColumnSource::CompanyId => {}
        ColumnSource::Increment { start, interval } => {
            s.set_opt("start", *start);
            s.set_opt("interval", *interval);
        }
        ColumnSource::Reference {
            source_column,
            source_values,
            mapped_values,
        } => {
            s.set_opt("cols", *source_column);
            s.set_list("value", source_values);
            s.set_list("range", mapped_values);
        }
        ColumnSource::ReferenceRange {
            source_column,
            values,
            upper_bounds,
        } => {
            s.set_opt("cols", *source_column);
            s.set_list("value", values);
            s.set_list("range", upper_bounds);
        }
        ColumnSource::ReferenceBoolean {
            source_column,
            condition,
            values,
        }
        | ColumnSource::ReferenceBoolean2 {
            source_column,
            condition,
            values,
        } => {
            s.set_opt("cols", *source_column);
            s.set_opt("condition", condition.as_deref());
            s.set_list("value", values);
        }
        ColumnSource::Total {
            operation,
            operands,
        } => {
            s.set_opt("operation", *operation);
            let refs: Vec<String> = operands.iter().map(|n| format!("c{}", n)).collect();
            s.set_list("operands", &refs);
        }
        ColumnSource::Discount {
            source_column,
            operation,
            percent,
        } => {
            s.set_opt("cols", *source_column);
            s.set_opt("operation", *operation);
            s.set_opt("value", *percent);
        }
    }

    s.set_opt("description", column.description.as_deref());
    s
}

fn encode_rule(position: usize, rule: &AppendRule) -> Section {
    let mut s = Section::new(rule_section_name(position));
    s.set("operation", rule.operation().as_str());

    match &rule.action {
        AppendAction::Replace {
            target_column,
            rename_to,
            find,
            replace_with,
        } => {
            s.set_opt("cols", *target_column);
            s.set_opt("col_name", rename_to.as_deref());
            s.set_opt("find", find.as_deref());
            s.set_opt("replace", replace_with.as_deref());
        }
        AppendAction::Generate {
            new_column,
            source,
            nullable_rate,
        } => {
            s.set("new_col", new_column.as_str());
            s.set("data", source.as_str());
            match source {
                GeneratedSource::Random { pairs } => {
                    let (options, weights) = weights::encode(pairs);
                    s.set_list("options", &options);
                    s.set_list("weights", &weights);
                }
                GeneratedSource::Faker { method } => {
                    s.set_opt("faker_method", Some(method.as_str()));
                }
            }
            if *nullable_rate != 0.0 {
                s.set("nullable", nullable_rate.to_string());
            }
        }
    }

    s.set_opt("description", rule.description.as_deref());
    s
}
