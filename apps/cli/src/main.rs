use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings, ClassifyOutcome, HttpPredictionGateway, Notification,
    NotificationLevel, Notifier, TempFilePreviews, Workbench,
};
use shared::domain::Mode;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod interactive;
mod render;

use render::Render;

#[derive(Parser, Debug)]
#[command(
    name = "instrument-classifier",
    about = "Identify musical instruments in images and audio clips"
)]
struct Args {
    /// Base URL of the prediction API (overrides config file and environment).
    #[arg(long)]
    api_url: Option<String>,
    /// Settings file; defaults to ./classifier.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print results as JSON instead of text.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a single image (.png .jpg .jpeg .webp).
    Image { file: PathBuf },
    /// Classify a single audio clip (.wav .mp3 .ogg).
    Audio { file: PathBuf },
    /// Classify up to 50 images in one request.
    BatchImage {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Classify up to 50 audio clips in one request.
    BatchAudio {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Work with all four modes from a prompt.
    Interactive,
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => eprintln!("[ok] {}", notification.message),
            NotificationLevel::Error => eprintln!("[error] {}", notification.message),
        }
    }
}

fn print_outcome<O>(outcome: ClassifyOutcome<O>, json: bool) -> Result<()>
where
    O: Render + serde::Serialize,
{
    match outcome {
        ClassifyOutcome::Completed(output) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print!("{}", output.render());
            }
            Ok(())
        }
        // The notifier has already printed the reason.
        ClassifyOutcome::Failed(_) => bail!("classification failed"),
        ClassifyOutcome::Abandoned | ClassifyOutcome::Ignored => bail!("request was not completed"),
    }
}

async fn run_once(bench: &Workbench, mode: Mode, paths: &[PathBuf], json: bool) -> Result<()> {
    bench.switch_mode(mode).await;
    info!(%mode, files = paths.len(), "classifying");
    match mode {
        Mode::Image | Mode::Audio => {
            let controller = bench.single(mode.media());
            let files = interactive::load_all(paths, controller.limits().max_bytes).await?;
            print_outcome(controller.classify(files).await?, json)
        }
        Mode::BatchImage | Mode::BatchAudio => {
            let controller = bench.batch(mode.media());
            let files = interactive::load_all(paths, controller.limits().max_bytes).await?;
            print_outcome(controller.classify(files).await?, json)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    let gateway = HttpPredictionGateway::new(&settings).context("invalid prediction api url")?;
    info!(api_url = %gateway.server_url(), "using prediction api");

    let bench = Workbench::new(
        Arc::new(gateway),
        &settings,
        Arc::new(TempFilePreviews::default()),
        Arc::new(ConsoleNotifier),
    );

    match args.command {
        Command::Image { file } => run_once(&bench, Mode::Image, &[file], args.json).await,
        Command::Audio { file } => run_once(&bench, Mode::Audio, &[file], args.json).await,
        Command::BatchImage { files } => {
            run_once(&bench, Mode::BatchImage, &files, args.json).await
        }
        Command::BatchAudio { files } => {
            run_once(&bench, Mode::BatchAudio, &files, args.json).await
        }
        Command::Interactive => interactive::run(&bench).await,
    }
}
