use anyhow::Result;
use comfy_table::Table as ComfyTable;

use pseudogen_core::model::{AppendAction, ColumnSource, GeneratedSource};
use pseudogen_core::session::EditorSession;
use pseudogen_core::weights::WeightedOption;

use crate::args::ShowArgs;
use crate::commands::load_rules;

pub fn run(args: &ShowArgs) -> Result<()> {
    let session = EditorSession::from_rule_file(load_rules(&args.file)?);
    let rf = session.rule_file();

    println!("━━━ {} ━━━", args.file.display());
    println!(
        "Records: {}  Mode: {}{}",
        rf.settings.record_count,
        rf.settings.mode.number(),
        rf.settings
            .description
            .as_deref()
            .map(|d| format!("  ({})", d))
            .unwrap_or_default()
    );

    let mut columns = ComfyTable::new();
    columns.set_header(vec!["#", "Name", "Type", "Data", "Details"]);
    for (i, column) in rf.columns.iter().enumerate() {
        columns.add_row(vec![
            (i + 1).to_string(),
            column.name.clone(),
            column.dtype.to_string(),
            column.data_source().as_str().to_string(),
            describe_source(&column.source),
        ]);
    }
    println!("\nColumns\n{}", columns);

    if !rf.append_rules.is_empty() {
        let mut rules = ComfyTable::new();
        rules.set_header(vec!["#", "Operation", "Details"]);
        for (i, rule) in rf.append_rules.iter().enumerate() {
            rules.add_row(vec![
                (i + 1).to_string(),
                rule.operation().as_str().to_string(),
                describe_action(&rule.action),
            ]);
        }
        let note = if rf.settings.mode.allows_append() {
            ""
        } else {
            " (ignored in mode 1)"
        };
        println!("\nAppend rules{}\n{}", note, rules);
    }

    if !rf.reorder.order.is_empty() {
        let available = session.available_columns();
        let names: Vec<String> = rf
            .reorder
            .order
            .iter()
            .map(|&i| {
                available
                    .get(i.wrapping_sub(1))
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| format!("<missing {}>", i))
            })
            .collect();
        let note = if rf.settings.mode.allows_reorder() {
            ""
        } else {
            " (ignored below mode 3)"
        };
        println!("\nOutput order{}: {}", note, names.join(", "));
    }

    Ok(())
}

fn describe_pairs(pairs: &[WeightedOption]) -> String {
    pairs
        .iter()
        .filter(|p| !p.option.trim().is_empty())
        .map(|p| format!("{} ({})", p.option, p.weight))
        .collect::<Vec<_>>()
        .join(", ")
}

fn col_ref(column: Option<usize>) -> String {
    column.map(|c| format!("c{}", c)).unwrap_or_else(|| "?".to_string())
}

fn describe_source(source: &ColumnSource) -> String {
    match source {
        ColumnSource::Random { pairs } => describe_pairs(pairs),
        ColumnSource::Faker { method } => method.clone(),
        ColumnSource::CompanyId => "1..n".to_string(),
        ColumnSource::Increment { start, interval } => format!(
            "start {} step {}",
            start.unwrap_or(1),
            interval.unwrap_or(1)
        ),
        ColumnSource::Reference {
            source_column,
            source_values,
            mapped_values,
        } => {
            let pairs: Vec<String> = source_values
                .iter()
                .zip(mapped_values)
                .map(|(from, to)| format!("{} -> {}", from, to))
                .collect();
            format!("{}: {}", col_ref(*source_column), pairs.join(", "))
        }
        ColumnSource::ReferenceRange {
            source_column,
            values,
            upper_bounds,
        } => {
            let bands: Vec<String> = upper_bounds
                .iter()
                .zip(values)
                .map(|(bound, value)| format!("<= {}: {}", bound, value))
                .collect();
            format!("{}: {}", col_ref(*source_column), bands.join(", "))
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
        } => format!(
            "{} == {}: {}",
            col_ref(*source_column),
            condition.as_deref().unwrap_or("?"),
            values.join(" / ")
        ),
        ColumnSource::Total {
            operation,
            operands,
        } => {
            let op = operation.as_ref().map(|o| o.symbol()).unwrap_or("?");
            operands
                .iter()
                .map(|&o| col_ref(Some(o)))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op))
        }
        ColumnSource::Discount {
            source_column,
            operation,
            percent,
        } => format!(
            "{} {} {}%",
            col_ref(*source_column),
            operation.as_ref().map(|o| o.symbol()).unwrap_or("?"),
            percent.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
        ),
    }
}

fn describe_action(action: &AppendAction) -> String {
    match action {
        AppendAction::Replace {
            target_column,
            rename_to,
            find,
            replace_with,
        } => {
            let mut out = format!(
                "{}: '{}' -> '{}'",
                col_ref(*target_column),
                find.as_deref().unwrap_or_default(),
                replace_with.as_deref().unwrap_or_default()
            );
            if let Some(name) = rename_to {
                out.push_str(&format!(", rename to {}", name));
            }
            out
        }
        AppendAction::Generate {
            new_column,
            source,
            nullable_rate,
        } => {
            let what = match source {
                GeneratedSource::Random { pairs } => describe_pairs(pairs),
                GeneratedSource::Faker { method } => format!("faker {}", method),
            };
            format!("{} = {}, {}% null", new_column, what, nullable_rate * 100.0)
        }
    }
}
