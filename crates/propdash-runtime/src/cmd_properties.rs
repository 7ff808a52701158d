//! Listing commands: `properties`, `export`, `browse`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use propdash_client::{FilterDebouncer, TokioScheduler};
use propdash_core::FilterCriteria;
use propdash_core::types::{PropertyStats, export_filename};
use tokio::io::AsyncBufReadExt;

use crate::cli::{BrowseOpts, ExportOpts, PropertiesOpts};
use crate::context::AppContext;
use crate::render;

pub async fn cmd_properties(ctx: &AppContext, opts: &PropertiesOpts) -> anyhow::Result<()> {
    let criteria = opts.filters.to_criteria()?;
    let resp = ctx.client.query_properties(&criteria).await?;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        print_page(&criteria, &resp.data);
    }
    Ok(())
}

fn print_page(criteria: &FilterCriteria, properties: &[propdash_core::Property]) {
    let stats = PropertyStats::from_properties(properties);
    let active = criteria.active_count();
    if active > 0 {
        println!("{} ({active} filter(s) active)", render::format_stats(&stats));
    } else {
        println!("{}", render::format_stats(&stats));
    }
    println!("{}", render::format_properties_table(properties));
}

pub async fn cmd_export(ctx: &AppContext, opts: &ExportOpts) -> anyhow::Result<()> {
    let criteria = opts.filters.to_criteria()?;
    let csv = ctx.client.export_properties_csv(&criteria).await?;
    let path = opts
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(export_filename(chrono::Local::now().date_naive())));
    tokio::fs::write(&path, &csv)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {} bytes to {}", csv.len(), path.display());
    Ok(())
}

// ─── browse ──────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BrowseInput<'a> {
    Set(&'a str),
    Clear,
    Show,
    Quit,
    Blank,
}

pub(crate) fn parse_browse_line(line: &str) -> BrowseInput<'_> {
    match line.trim() {
        "" => BrowseInput::Blank,
        "clear" | "reset" => BrowseInput::Clear,
        "show" | "?" => BrowseInput::Show,
        "quit" | "exit" | "q" => BrowseInput::Quit,
        pair => BrowseInput::Set(pair),
    }
}

async fn run_query(ctx: &AppContext, criteria: &FilterCriteria) {
    match ctx.client.query_properties(criteria).await {
        Ok(resp) => print_page(criteria, &resp.data),
        Err(e) => eprintln!("{}", render::api_error_line(&e)),
    }
}

pub async fn cmd_browse(ctx: &AppContext, opts: &BrowseOpts) -> anyhow::Result<()> {
    let (tx, mut commits) = tokio::sync::mpsc::unbounded_channel::<FilterCriteria>();
    let debouncer = FilterDebouncer::mount(
        Arc::new(TokioScheduler::new()),
        Duration::from_millis(opts.debounce_ms),
        move |criteria| {
            // Receiver gone means the session is ending.
            let _ = tx.send(criteria);
        },
    );

    eprintln!("enter key=value to filter (e.g. location=Mumbai), `clear`, `show` or `quit`");
    run_query(ctx, &debouncer.criteria()).await;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_browse_line(&line) {
                    BrowseInput::Blank => {}
                    BrowseInput::Quit => break,
                    BrowseInput::Clear => debouncer.clear(),
                    BrowseInput::Show => {
                        let pairs = debouncer.criteria().to_query_pairs();
                        let shown: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
                        println!("{}", shown.join(" "));
                    }
                    BrowseInput::Set(pair) => {
                        if let Err(e) = debouncer.apply_pair(pair) {
                            eprintln!("{e}");
                        }
                    }
                }
            }
            Some(criteria) = commits.recv() => {
                tracing::debug!(filters = criteria.active_count(), "filters committed");
                run_query(ctx, &criteria).await;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    debouncer.unmount();
    Ok(())
}
