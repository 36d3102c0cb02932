use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};

use pseudogen_core::config::PseudoGenConfig;
use pseudogen_core::generate;
use pseudogen_core::output::preview_result;
use pseudogen_core::preview::PreviewSession;

use crate::args::PreviewArgs;
use crate::commands::{connect, load_config, load_rules, print_preview, spinner};

/// Fixed seed so repeated local previews show the same rows.
const LOCAL_PREVIEW_SEED: u64 = 42;

pub async fn run(args: &PreviewArgs, server: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let rows = args.rows.unwrap_or_else(|| config.preview_rows());

    if args.watch {
        return watch(args, server, &config, rows).await;
    }

    let rule_file = load_rules(&args.file)?;

    if args.local {
        let seed = args.seed.or(config.sample.seed).unwrap_or(LOCAL_PREVIEW_SEED);
        let mut capped = rule_file;
        capped.settings.record_count = capped.settings.record_count.min(rows);
        let table = generate::execute(&capped, seed).context("Local preview failed")?;
        print_preview(&preview_result(&table, rows as usize));
        return Ok(());
    }

    let client = connect(server, &config)?;
    let pb = spinner("Requesting preview...");
    let result = client.preview(&rule_file, rows).await;
    pb.finish_and_clear();
    print_preview(&result);
    Ok(())
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Poll the rule file and request a debounced preview after every change.
/// A preview superseded by a newer edit is dropped without printing.
async fn watch(
    args: &PreviewArgs,
    server: Option<&str>,
    config: &PseudoGenConfig,
    rows: u64,
) -> Result<()> {
    let client = connect(server, config)?;
    let session = Arc::new(PreviewSession::new(client, config.debounce()).with_row_cap(rows));
    let mut interval = tokio::time::interval(config.poll_interval());
    let mut last_seen: Option<SystemTime> = None;

    println!(
        "Watching {} (Ctrl-C to stop)...",
        args.file.display()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            _ = interval.tick() => {}
        }

        let stamp = modified(&args.file);
        if stamp.is_none() || stamp == last_seen {
            continue;
        }
        last_seen = stamp;

        let rule_file = match load_rules(&args.file) {
            Ok(rf) => rf,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                continue;
            }
        };

        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if let Some(result) = session.request(&rule_file).await {
                print_preview(&result);
            }
        });
    }
}
