//! Line-oriented session over all four modes, one active at a time.

use std::path::PathBuf;

use anyhow::Result;
use client_core::{ClassifyOutcome, SessionController, Submitter, UploadFile, Workbench};
use shared::domain::{Arity, Mode};
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::render::{render_snapshot, Render};

const HELP: &str = "\
commands:
  mode <image|audio|batch-image|batch-audio>  switch tab (resets every session)
  add <path>...                               select files without submitting
  submit                                      submit the selected files
  classify <path>...                          select and submit in one step
  retry                                       resubmit the held files
  remove <index>                              drop one file (batch modes)
  reset                                       clear the active session
  status                                      show the active session
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Mode(Mode),
    Add(Vec<PathBuf>),
    Submit,
    Classify(Vec<PathBuf>),
    Retry,
    Remove(usize),
    Reset,
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let paths = || -> Result<Vec<PathBuf>, String> {
        if rest.is_empty() {
            Err(format!("'{verb}' needs at least one path"))
        } else {
            Ok(rest.iter().map(PathBuf::from).collect())
        }
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "mode" | "tab" => {
            let name = rest.first().ok_or("'mode' needs a mode name")?;
            ReplCommand::Mode(name.parse::<Mode>().map_err(|err| format!("{err}"))?)
        }
        "add" | "select" => ReplCommand::Add(paths()?),
        "submit" | "confirm" => ReplCommand::Submit,
        "classify" => ReplCommand::Classify(paths()?),
        "retry" => ReplCommand::Retry,
        "remove" | "rm" => {
            let index = rest.first().ok_or("'remove' needs an index")?;
            ReplCommand::Remove(
                index
                    .parse::<usize>()
                    .map_err(|_| format!("'{index}' is not a file index"))?,
            )
        }
        "reset" | "clear" => ReplCommand::Reset,
        "status" | "ls" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(Some(command))
}

/// Loads `paths`, leaving files over `max_bytes` unread for validation to refuse.
pub async fn load_all(paths: &[PathBuf], max_bytes: u64) -> Result<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(UploadFile::from_path_within(path, max_bytes).await?);
    }
    Ok(files)
}

fn describe_outcome<O: Render>(outcome: ClassifyOutcome<O>) -> String {
    match outcome {
        ClassifyOutcome::Completed(output) => output.render(),
        ClassifyOutcome::Failed(message) => format!("Request failed: {message}\n"),
        ClassifyOutcome::Abandoned => "Request abandoned.\n".to_string(),
        ClassifyOutcome::Ignored => "Nothing to submit.\n".to_string(),
    }
}

async fn apply<S>(controller: &SessionController<S>, command: ReplCommand) -> Result<String>
where
    S: Submitter,
    S::Output: Render,
{
    let max_bytes = controller.limits().max_bytes;
    let text = match command {
        ReplCommand::Add(paths) => {
            let count = controller.select(load_all(&paths, max_bytes).await?).await?;
            format!("{count} file(s) selected; type 'submit' to classify.\n")
        }
        ReplCommand::Submit => describe_outcome(controller.confirm().await),
        ReplCommand::Classify(paths) => {
            describe_outcome(controller.classify(load_all(&paths, max_bytes).await?).await?)
        }
        ReplCommand::Retry => describe_outcome(controller.retry().await),
        ReplCommand::Remove(index) => {
            let left = controller.remove_file(index).await?;
            format!("{left} file(s) left.\n")
        }
        ReplCommand::Reset => {
            controller.reset().await;
            "Session cleared.\n".to_string()
        }
        ReplCommand::Status => render_snapshot(&controller.snapshot().await),
        ReplCommand::Mode(_) | ReplCommand::Help | ReplCommand::Quit => String::new(),
    };
    Ok(text)
}

async fn dispatch(bench: &Workbench, command: ReplCommand) -> Result<String> {
    let mode = bench.active_mode().await;
    match mode.arity() {
        Arity::Single => apply(bench.single(mode.media()), command).await,
        Arity::Batch => apply(bench.batch(mode.media()), command).await,
    }
}

pub async fn run(bench: &Workbench) -> Result<()> {
    println!("{HELP}");
    println!("active mode: {}", bench.active_mode().await);

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Mode(mode) => {
                let change = bench.switch_mode(mode).await;
                println!("switched {} -> {}; all sessions reset", change.from, change.to);
            }
            other => match dispatch(bench, other).await {
                Ok(text) => print!("{text}"),
                Err(err) => eprintln!("error: {err:#}"),
            },
        }
    }
    Ok(())
}
