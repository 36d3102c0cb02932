use anyhow::{Context, Result};

use pseudogen_core::ini::write_rules_file;
use pseudogen_core::validate::validate;

use crate::args::UploadArgs;
use crate::commands::{connect, load_config, spinner};

/// Have the service parse an existing rules file and report its reading.
pub async fn run(args: &UploadArgs, server: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let client = connect(server, &config)?;

    let pb = spinner(&format!("Uploading {}...", args.file.display()));
    let result = client.parse_ini(&args.file).await;
    pb.finish_and_clear();
    let rule_file =
        result.with_context(|| format!("Failed to upload {}", args.file.display()))?;

    println!(
        "Parsed {}: {} records, mode {}, {} column(s), {} append rule(s)",
        args.file.display(),
        rule_file.settings.record_count,
        rule_file.settings.mode.number(),
        rule_file.columns.len(),
        rule_file.append_rules.len()
    );

    let report = validate(&rule_file);
    if !report.is_clean() {
        println!("{}", report.summary());
    }

    if let Some(output) = &args.output {
        write_rules_file(&rule_file, output)?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}
