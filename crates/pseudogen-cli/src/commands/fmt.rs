use std::process;

use anyhow::{Context, Result};

use pseudogen_core::ini::write_rules_file;

use crate::args::FmtArgs;
use crate::commands::load_rules;

pub fn run(args: &FmtArgs) -> Result<()> {
    let original = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let rule_file = load_rules(&args.file)?;
    let formatted = rule_file.to_ini_string();

    if args.check {
        if formatted == original {
            println!("{} is formatted", args.file.display());
            return Ok(());
        }
        println!("{} would be reformatted", args.file.display());
        process::exit(1);
    }

    let target = args.output.as_deref().unwrap_or(&args.file);
    write_rules_file(&rule_file, target)?;
    println!("Wrote {}", target.display());
    Ok(())
}
