use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::error::{PseudoGenError, Result};
use crate::generate::providers;
use crate::generate::value::Value;
use crate::graph::ReferenceGraph;
use crate::ini::rule_section_name;
use crate::model::{
    AppendAction, ColumnSource, ColumnSpec, GeneratedSource, Operator, RuleFile,
};
use crate::weights::{self, WeightedOption};

/// One output column and its cells.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedColumn {
    pub name: String,
    pub values: Vec<Value>,
}

/// Rows produced by the sample engine, stored column by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedTable {
    pub columns: Vec<GeneratedColumn>,
    pub row_count: usize,
}

impl GeneratedTable {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&GeneratedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cells of row `index` in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(index))
            .collect()
    }

    /// Keep only the first `n` rows.
    pub fn truncate(&mut self, n: usize) {
        for column in &mut self.columns {
            column.values.truncate(n);
        }
        self.row_count = self.row_count.min(n);
    }
}

/// Generate `rule_file.settings.record_count` rows locally.
///
/// Base columns are evaluated in reference order, so a derived column always
/// sees the finished values of the columns it reads. Append rules run in
/// mode 2 and above, reordering only in mode 3. The same seed always gives
/// the same table.
pub fn execute(rule_file: &RuleFile, seed: u64) -> Result<GeneratedTable> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = usize::try_from(rule_file.settings.record_count).map_err(|_| {
        PseudoGenError::Generation {
            message: format!("{} records is too many", rule_file.settings.record_count),
        }
    })?;

    let graph = ReferenceGraph::from_rule_file(rule_file);
    if let Some(d) = graph.dangling().first() {
        return Err(PseudoGenError::Generation {
            message: format!(
                "column c{} references column {}, which does not exist",
                d.column, d.target
            ),
        });
    }
    let order = graph.evaluation_order()?;

    let mut evaluated: Vec<Option<Vec<Value>>> = vec![None; rule_file.columns.len()];
    for position in order {
        let column = &rule_file.columns[position - 1];
        let raw = evaluate_column(position, column, &evaluated, n, &mut rng)?;
        evaluated[position - 1] = Some(coerce_column(raw, column, position));
    }

    let mut table = GeneratedTable {
        columns: rule_file
            .columns
            .iter()
            .enumerate()
            .zip(evaluated)
            .map(|((idx, column), values)| GeneratedColumn {
                name: display_name(column, idx + 1),
                values: values.unwrap_or_default(),
            })
            .collect(),
        row_count: n,
    };

    if rule_file.settings.mode.allows_append() {
        apply_append_rules(rule_file, &mut table, &mut rng)?;
    }
    if rule_file.settings.mode.allows_reorder() && !rule_file.reorder.order.is_empty() {
        apply_reorder(&rule_file.reorder.order, &mut table);
    }

    Ok(table)
}

/// Convert a column to its declared type. Values that are not numbers in a
/// numeric column are stored as zero.
fn coerce_column(raw: Vec<Value>, column: &ColumnSpec, position: usize) -> Vec<Value> {
    let mut rejected = 0usize;
    let mut first_rejected = None;
    let values = raw
        .into_iter()
        .map(|v| {
            v.coerce(column.dtype).unwrap_or_else(|unparsed| {
                rejected += 1;
                if first_rejected.is_none() {
                    first_rejected = Some(unparsed);
                }
                Value::zero(column.dtype)
            })
        })
        .collect();
    if let Some(example) = first_rejected {
        warn!(
            "Column c{} ({}): {} value(s) such as '{}' are not {} and were stored as 0",
            position,
            display_name(column, position),
            rejected,
            example,
            column.dtype
        );
    }
    values
}

fn display_name(column: &ColumnSpec, position: usize) -> String {
    if column.name.trim().is_empty() {
        format!("c{}", position)
    } else {
        column.name.clone()
    }
}

fn source_values<'a>(
    evaluated: &'a [Option<Vec<Value>>],
    position: usize,
    source: Option<usize>,
) -> Result<&'a [Value]> {
    let target = source.ok_or_else(|| PseudoGenError::Generation {
        message: format!("column c{} has no source column (cols)", position),
    })?;
    evaluated
        .get(target.wrapping_sub(1))
        .and_then(|v| v.as_deref())
        .ok_or_else(|| PseudoGenError::Generation {
            message: format!("column c{} reads c{} before it was generated", position, target),
        })
}

fn numeric(value: &Value, position: usize) -> Result<f64> {
    match value {
        Value::Null => Ok(0.0),
        other => other.as_f64().ok_or_else(|| PseudoGenError::Generation {
            message: format!(
                "column c{} needs numbers but found '{}'",
                position,
                other.to_csv_string()
            ),
        }),
    }
}

fn evaluate_column(
    position: usize,
    column: &ColumnSpec,
    evaluated: &[Option<Vec<Value>>],
    n: usize,
    rng: &mut StdRng,
) -> Result<Vec<Value>> {
    let values = match &column.source {
        ColumnSource::CompanyId => (1..=n as i64).map(Value::Int).collect(),

        ColumnSource::Random { pairs } => {
            let options = weighted_options(pairs).ok_or_else(|| PseudoGenError::Generation {
                message: format!("column c{} has no options to draw from", position),
            })?;
            (0..n).map(|_| choose(&options, rng)).collect()
        }

        ColumnSource::Faker { method } => {
            if !providers::is_supported(method) {
                warn!("Unknown faker method '{}' in c{}, using name", method, position);
            }
            (0..n)
                .map(|i| providers::fake_value(method, rng, i))
                .collect()
        }

        ColumnSource::Increment { start, interval } => {
            let start = start.unwrap_or(1);
            let interval = interval.unwrap_or(1);
            (0..n as i64)
                .map(|i| {
                    i.checked_mul(interval)
                        .and_then(|step| start.checked_add(step))
                        .map(Value::Int)
                        .ok_or_else(|| PseudoGenError::Generation {
                            message: format!(
                                "column c{} ({}) overflows a 64-bit integer at row {}",
                                position,
                                display_name(column, position),
                                i + 1
                            ),
                        })
                })
                .collect::<Result<Vec<_>>>()?
        }

        ColumnSource::Reference {
            source_column,
            source_values: keys,
            mapped_values,
        } => {
            let source = source_values(evaluated, position, *source_column)?;
            let fallback = mapped_values.last();
            source
                .iter()
                .map(|v| {
                    let text = v.to_csv_string();
                    keys.iter()
                        .zip(mapped_values)
                        .find(|(key, _)| **key == text)
                        .map(|(_, mapped)| mapped)
                        .or(fallback)
                        .map(|m| Value::String(m.clone()))
                        .unwrap_or(Value::Null)
                })
                .collect()
        }

        ColumnSource::ReferenceRange {
            source_column,
            values,
            upper_bounds,
        } => {
            let source = source_values(evaluated, position, *source_column)?;
            let fallback = values.last();
            source
                .iter()
                .map(|v| {
                    let x = numeric(v, position)?;
                    Ok(upper_bounds
                        .iter()
                        .zip(values)
                        .find(|(bound, _)| x <= **bound)
                        .map(|(_, value)| value)
                        .or(fallback)
                        .map(|m| Value::String(m.clone()))
                        .unwrap_or(Value::Null))
                })
                .collect::<Result<Vec<_>>>()?
        }

        ColumnSource::ReferenceBoolean {
            source_column,
            condition,
            values,
        } => {
            let source = source_values(evaluated, position, *source_column)?;
            let [when_true, when_false] = values.as_slice() else {
                return Err(PseudoGenError::Generation {
                    message: format!(
                        "column c{} needs two values (when true, when false)",
                        position
                    ),
                });
            };
            let condition = condition.as_deref().unwrap_or_default();
            source
                .iter()
                .map(|v| {
                    let picked = if v.matches_literal(condition) {
                        when_true
                    } else {
                        when_false
                    };
                    Value::String(picked.clone())
                })
                .collect()
        }

        ColumnSource::ReferenceBoolean2 {
            source_column,
            condition,
            values,
        } => {
            let source = source_values(evaluated, position, *source_column)?;
            if values.is_empty() {
                return Err(PseudoGenError::Generation {
                    message: format!("column c{} has no values to draw from", position),
                });
            }
            let condition = condition.as_deref().unwrap_or_default();
            source
                .iter()
                .map(|v| {
                    if v.matches_literal(condition) {
                        Value::String(values[rng.random_range(0..values.len())].clone())
                    } else {
                        Value::Int(0)
                    }
                })
                .collect()
        }

        ColumnSource::Total {
            operation,
            operands,
        } => {
            let inputs = operands
                .iter()
                .map(|&o| source_values(evaluated, position, Some(o)))
                .collect::<Result<Vec<_>>>()?;
            match operation {
                Some(op @ (Operator::Plus | Operator::Times)) => (0..n)
                    .map(|row| {
                        let mut acc = if *op == Operator::Plus { 0.0 } else { 1.0 };
                        for input in &inputs {
                            let x = numeric(&input[row], position)?;
                            if *op == Operator::Plus {
                                acc += x;
                            } else {
                                acc *= x;
                            }
                        }
                        Ok(Value::Float(acc))
                    })
                    .collect::<Result<Vec<_>>>()?,
                other => {
                    warn!(
                        "Column c{} has total operation {:?}; leaving it empty",
                        position,
                        other.as_ref().map(|o| o.symbol())
                    );
                    vec![Value::Null; n]
                }
            }
        }

        ColumnSource::Discount {
            source_column,
            operation,
            percent,
        } => {
            let source = source_values(evaluated, position, *source_column)?;
            let factor = match (operation, percent) {
                (Some(Operator::Minus), Some(p)) => Some(1.0 - p / 100.0),
                (Some(Operator::Plus), Some(p)) => Some(1.0 + p / 100.0),
                _ => None,
            };
            match factor {
                Some(factor) => source
                    .iter()
                    .map(|v| Ok(Value::Float(numeric(v, position)? * factor)))
                    .collect::<Result<Vec<_>>>()?,
                None => {
                    warn!(
                        "Column c{} needs operation - or + and a percentage; leaving it empty",
                        position
                    );
                    vec![Value::Null; n]
                }
            }
        }
    };
    Ok(values)
}

/// Non-blank options with usable weights, or `None` if there are none.
///
/// Weights whose sum is not a finite number are divided by the largest one,
/// which keeps their ratios.
fn weighted_options(pairs: &[WeightedOption]) -> Option<Vec<WeightedOption>> {
    let (options, weights) = weights::encode(pairs);
    if options.is_empty() {
        return None;
    }
    let mut options = weights::decode_numeric(&options, &weights);
    if !weights::total_weight(&options).is_finite() {
        let largest = options.iter().map(|o| o.weight).fold(0.0, f64::max);
        for option in &mut options {
            option.weight /= largest;
        }
    }
    Some(options)
}

/// Draw one option by weight. All-zero weights draw uniformly.
fn choose(options: &[WeightedOption], rng: &mut StdRng) -> Value {
    let total = weights::total_weight(options);
    let picked = if total > 0.0 {
        let mut target = rng.random_range(0.0..total);
        options
            .iter()
            .find(|o| {
                if target < o.weight {
                    true
                } else {
                    target -= o.weight;
                    false
                }
            })
            .unwrap_or(&options[options.len() - 1])
    } else {
        &options[rng.random_range(0..options.len())]
    };
    Value::String(picked.option.clone())
}

fn apply_append_rules(
    rule_file: &RuleFile,
    table: &mut GeneratedTable,
    rng: &mut StdRng,
) -> Result<()> {
    let n = table.row_count;
    for (idx, rule) in rule_file.append_rules.iter().enumerate() {
        let section = rule_section_name(idx + 1);
        match &rule.action {
            AppendAction::Replace {
                target_column,
                rename_to,
                find,
                replace_with,
            } => {
                let Some(column) = target_column
                    .and_then(|t| t.checked_sub(1))
                    .and_then(|i| table.columns.get_mut(i))
                else {
                    warn!("Skipping [{}]: target column {:?} does not exist", section, target_column);
                    continue;
                };
                if let Some(new_name) = rename_to {
                    column.name = new_name.clone();
                }
                if let Some(find) = find {
                    let replacement = replace_with.clone().unwrap_or_default();
                    for value in column.values.iter_mut() {
                        if value.to_csv_string() == *find {
                            *value = Value::String(replacement.clone());
                        }
                    }
                }
            }
            AppendAction::Generate {
                new_column,
                source,
                nullable_rate,
            } => {
                let name = if new_column.trim().is_empty() {
                    format!("generated_{}", section)
                } else {
                    new_column.clone()
                };
                let mut values: Vec<Value> = match source {
                    GeneratedSource::Random { pairs } => {
                        let options =
                            weighted_options(pairs).ok_or_else(|| PseudoGenError::Generation {
                                message: format!("[{}] has no options to draw from", section),
                            })?;
                        (0..n).map(|_| choose(&options, rng)).collect()
                    }
                    GeneratedSource::Faker { method } => (0..n)
                        .map(|i| providers::fake_value(method, rng, i))
                        .collect(),
                };
                if *nullable_rate > 0.0 {
                    for value in values.iter_mut() {
                        if rng.random::<f64>() < *nullable_rate {
                            *value = Value::Null;
                        }
                    }
                }

                // A name that already exists overwrites that column in place.
                match table.columns.iter_mut().find(|c| c.name == name) {
                    Some(existing) => existing.values = values,
                    None => table.columns.push(GeneratedColumn { name, values }),
                }
            }
        }
    }
    Ok(())
}

fn apply_reorder(order: &[usize], table: &mut GeneratedTable) {
    let count = table.columns.len();
    if let Some(bad) = order.iter().find(|&&i| i == 0 || i > count) {
        warn!(
            "Reorder index {} is out of range (1-{}); keeping the original column order",
            bad, count
        );
        return;
    }
    table.columns = order
        .iter()
        .map(|&i| table.columns[i - 1].clone())
        .collect();
}
