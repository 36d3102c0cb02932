use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use pseudogen_core::generate;
use pseudogen_core::output::{csv, json};
use pseudogen_core::session::EditorSession;

use crate::args::{OutputFormat, SampleArgs};
use crate::commands::{load_config, load_rules};

/// Generate the dataset locally and write it as CSV or JSON.
pub fn run(args: &SampleArgs) -> Result<()> {
    let config = load_config()?;
    let mut session = EditorSession::from_rule_file(load_rules(&args.file)?);
    if let Some(rows) = args.rows {
        session.set_record_count(rows)?;
    }
    let rule_file = session.into_rule_file();

    let seed = args.seed.or(config.sample.seed).unwrap_or_else(rand_seed);
    tracing::debug!("Sampling with seed {}", seed);

    let table = generate::execute(&rule_file, seed)
        .with_context(|| format!("Failed to sample {}", args.file.display()))?;

    let format = args.output_format();
    let output = args.output.clone().unwrap_or_else(|| {
        let ext = match format {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        };
        PathBuf::from(format!(
            "output_{}.{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            ext
        ))
    });

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Csv => csv::write_csv(&mut writer, &table)?,
        OutputFormat::Json => json::write_json(&mut writer, &table)?,
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} rows x {} columns to {} (seed {})",
        table.row_count,
        table.columns.len(),
        output.display(),
        seed
    );
    Ok(())
}

/// A seed from the clock, printed so the run can be repeated.
fn rand_seed() -> u64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
}
