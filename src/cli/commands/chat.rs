//! Interactive chat command.

use super::load_source;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, SourceArgs};
use crate::config::Settings;
use crate::session::Session;
use crate::source::SourceRef;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq)]
enum Input {
    Exit,
    History,
    Load(SourceRef),
    Question(String),
    Usage(&'static str),
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();

    if line.is_empty() {
        return Input::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Input::Exit;
    }

    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        ":history" => Input::History,
        ":load" if rest.is_empty() => Input::Usage(":load <youtube-url>"),
        ":load" => Input::Load(SourceRef::video(rest)),
        ":files" if rest.is_empty() => Input::Usage(":files <path> [path...]"),
        ":files" => Input::Load(SourceRef::documents(split_paths(rest))),
        _ => Input::Question(line.to_string()),
    }
}

/// Split on whitespace, keeping single- or double-quoted runs together.
fn split_paths(rest: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for c in rest.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    paths.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        paths.push(current);
    }

    paths
}

/// Run the interactive chat command.
pub async fn run_chat(source: &SourceArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings.llm) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut session = Session::new(&settings)?;

    println!("\n{}", style("Spor Chat").bold().cyan());
    println!(
        "{}\n",
        style(
            "Load a source with ':load <youtube-url>' or ':files <path>...' (quote paths \
             with spaces), then ask away. ':history' shows the conversation, 'exit' quits."
        )
        .dim()
    );

    if let Some(reference) = source.source_ref() {
        if let Err(e) = load_source(&mut session, &reference, &settings).await {
            Output::error(&format!("{}", e));
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => {
                Output::info("Goodbye!");
                break;
            }
            Input::Usage(usage) => Output::warning(&format!("Usage: {}", usage)),
            Input::History => {
                if session.transcript().is_empty() {
                    Output::info("No exchanges yet.");
                }
                for message in session.transcript() {
                    Output::message(message);
                }
            }
            Input::Load(reference) => {
                if let Err(e) = load_source(&mut session, &reference, &settings).await {
                    Output::error(&format!("{}", e));
                }
            }
            Input::Question(question) => {
                debug!("Asking in state {}", session.state());
                let spinner = Output::spinner("Thinking...");
                let result = session.ask(&question).await;
                spinner.finish_and_clear();

                match result {
                    Ok(answer) => {
                        println!("\n{} {}\n", style("Spor:").cyan().bold(), answer.answer);
                    }
                    Err(e) => Output::error(&format!("{}", e)),
                }
            }
        }
    }

    Ok(())
}
