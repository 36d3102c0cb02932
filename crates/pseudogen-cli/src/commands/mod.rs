pub mod check;
pub mod fmt;
pub mod generate;
pub mod preview;
pub mod sample;
pub mod show;
pub mod upload;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;
use indicatif::{ProgressBar, ProgressStyle};

use pseudogen_core::client::GeneratorClient;
use pseudogen_core::config::{read_config, PseudoGenConfig};
use pseudogen_core::ini::read_rules_file;
use pseudogen_core::wire::PreviewResult;
use pseudogen_core::RuleFile;

/// pseudogen.toml from the working directory, or defaults when absent.
pub fn load_config() -> Result<PseudoGenConfig> {
    Ok(read_config(Path::new("."))?.unwrap_or_default())
}

pub fn load_rules(path: &Path) -> Result<RuleFile> {
    read_rules_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Build a service client from `--server`/env, then pseudogen.toml.
pub fn connect(server: Option<&str>, config: &PseudoGenConfig) -> Result<GeneratorClient> {
    let url = config.server_url(server);
    tracing::debug!("Using generator service at {}", url);
    GeneratorClient::new(&url, config.timeout())
        .with_context(|| format!("Cannot use generator service URL '{}'", url))
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a preview the way the service shapes it: a table of rows, the
/// service message underneath, or the error if the preview failed.
pub fn print_preview(result: &PreviewResult) {
    if let Some(error) = &result.error {
        eprintln!("{}: {}", result.message, error);
        return;
    }
    if result.rows.is_empty() {
        println!("{}", result.message);
        return;
    }

    let mut table = ComfyTable::new();
    table.set_header(result.column_names.iter().map(String::as_str).collect::<Vec<_>>());
    for row in &result.rows {
        let cells: Vec<String> = result
            .column_names
            .iter()
            .map(|name| match row.get(name) {
                None | Some(serde_json::Value::Null) => "NULL".to_string(),
                Some(serde_json::Value::String(s)) => clip(s, 40),
                Some(other) => clip(&other.to_string(), 40),
            })
            .collect();
        table.add_row(cells);
    }

    println!("{}", table);
    println!(
        "{} ({} rows x {} columns)",
        result.message, result.shape.rows, result.shape.columns
    );
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 40), "short");
        assert_eq!(clip(&"é".repeat(50), 10), format!("{}...", "é".repeat(7)));
    }
}
