use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pseudogen_core::validate::validate;

use crate::args::GenerateArgs;
use crate::commands::{connect, load_config, load_rules, spinner};

/// Send the rule file to the service and save the rules.ini it builds.
pub async fn run(args: &GenerateArgs, server: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let rule_file = load_rules(&args.file)?;

    let report = validate(&rule_file);
    if report.has_errors() {
        bail!(
            "{} has problems the generator cannot handle.\n{}",
            args.file.display(),
            report.summary()
        );
    }
    for warning in report.warnings() {
        tracing::warn!("{}", warning);
    }

    let client = connect(server, &config)?;
    let pb = spinner("Generating rules file...");
    let result = client.generate(&rule_file).await;
    pb.finish_and_clear();
    let bytes = result.context("Failed to generate rules file")?;

    let output = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "rules_{}.ini",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ))
    });
    std::fs::write(&output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}
