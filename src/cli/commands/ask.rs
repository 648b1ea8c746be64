//! Ask command implementation.

use super::load_source;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SourceArgs};
use crate::config::Settings;
use crate::session::Session;
use anyhow::Result;

/// Run the ask command: load the source, answer one question, print it.
pub async fn run_ask(source: &SourceArgs, question: &str, settings: Settings) -> Result<()> {
    let Some(reference) = source.source_ref() else {
        Output::error("Nothing to ask about. Pass --video <url> or --file <path>.");
        anyhow::bail!("no source given");
    };

    if let Err(e) = preflight::check(Operation::Ask, &settings.llm) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut session = Session::new(&settings)?;
    load_source(&mut session, &reference, &settings).await?;

    let spinner = Output::spinner("Generating answer...");

    match session.ask(question).await {
        Ok(answer) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.answer);

            if !answer.sources.is_empty() {
                Output::header("Context");
                for result in &answer.sources {
                    Output::search_result(result);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
