use std::process;

use anyhow::{Context, Result};

use pseudogen_core::validate::validate;

use crate::args::{CheckArgs, CheckFormat};
use crate::commands::load_rules;

/// Parse and validate a rules file.
///
/// Exit codes:
///   0 - valid, possibly with warnings
///   1 - parse failure or validation errors
pub fn run(args: &CheckArgs) -> Result<()> {
    let rule_file = load_rules(&args.file)?;
    let report = validate(&rule_file);

    match args.format {
        CheckFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize validation report")?;
            println!("{}", json);
        }
        CheckFormat::Text => {
            println!("{}: {}", args.file.display(), report.summary());
        }
    }

    if report.has_errors() {
        process::exit(1);
    }
    Ok(())
}
