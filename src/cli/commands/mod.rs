//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod history;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use history::run_history;

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::session::{LoadResult, Session};
use crate::source::SourceRef;

/// Load a source into the session behind a spinner and report the result.
pub(crate) async fn load_source(
    session: &mut Session,
    reference: &SourceRef,
    settings: &Settings,
) -> Result<LoadResult> {
    if matches!(reference, SourceRef::Video { .. }) {
        preflight::check(Operation::LoadVideo, &settings.llm)?;
    }

    let spinner = Output::spinner(match reference {
        SourceRef::Video { .. } => "Fetching captions and indexing...",
        SourceRef::Documents { .. } => "Reading documents and indexing...",
    });

    let result = session.load_source(reference).await;
    spinner.finish_and_clear();

    let loaded = result?;
    if loaded.skipped {
        Output::info(&format!("{} is already loaded.", loaded.source));
    } else {
        Output::success(&format!(
            "Loaded {} ({} document(s), {} chunk(s))",
            loaded.source, loaded.documents, loaded.chunks
        ));
        if loaded.exchanges > 0 {
            Output::info(&format!(
                "Restored {} earlier exchange(s). Type ':history' to see them.",
                loaded.exchanges
            ));
        }
    }

    Ok(loaded)
}
