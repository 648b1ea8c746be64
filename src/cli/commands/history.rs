//! History command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::history::HistoryStore;
use crate::source::{Source, SourceKind};
use anyhow::Result;

/// Print the exchanges recorded for one source, or list every source.
pub fn run_history(
    video: Option<&str>,
    documents: Option<&str>,
    json: bool,
    settings: &Settings,
) -> Result<()> {
    let db_path = settings.sqlite_path();
    if !db_path.exists() {
        if json {
            println!("[]");
        } else {
            Output::info("No chat history yet.");
        }
        return Ok(());
    }

    let store = HistoryStore::open(&db_path)?;

    let source = match (video, documents) {
        (Some(url), _) => Some(Source::new(url.trim(), SourceKind::Video)),
        (None, Some(id)) => Some(Source::new(id, SourceKind::Document)),
        (None, None) => None,
    };

    match source {
        Some(source) => show_source(&store, &source, json),
        None => list_sources(&store, json),
    }
}

fn show_source(store: &HistoryStore, source: &Source, json: bool) -> Result<()> {
    let records = store.load_records(&source.id, source.kind)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        Output::info(&format!("No exchanges recorded for {}.", source));
        return Ok(());
    }

    Output::header(&source.to_string());
    println!();
    for message in crate::history::transcript_from_records(&records) {
        Output::message(&message);
    }

    Ok(())
}

fn list_sources(store: &HistoryStore, json: bool) -> Result<()> {
    let sources = store.list_sources()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        Output::info("No chat history yet.");
        return Ok(());
    }

    Output::header("Sources");
    for summary in &sources {
        Output::list_item(&format!(
            "{} ({}, {} exchange(s), last {})",
            summary.source_id,
            summary.source_kind,
            summary.exchanges,
            summary.last_activity.format("%Y-%m-%d %H:%M")
        ));
    }
    println!();
    Output::kv("Total exchanges", &store.count()?.to_string());

    Ok(())
}
