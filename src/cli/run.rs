use anyhow::{anyhow, Result};
use clap::Args;
use std::{
    io::{self, Read, Write},
    path::PathBuf,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    app::{App, ChatEvent, TurnOutcome, STREAMING_CURSOR},
    config::Config,
    llm::default_engine,
    provision::Upload,
    utils::text::{format::format_elapsed, string::truncate},
};

/// Session id used for one-shot prompts
const RUN_SESSION: &str = "run";

/// Run a single prompt non-interactively
#[derive(Args)]
pub struct RunCommand {
    /// The prompt to run. If not provided, will read from stdin
    pub prompt: Vec<String>,

    /// GGUF file to import and load; defaults to the first stored model
    #[arg(short = 'm', long = "model")]
    pub model: Option<PathBuf>,

    /// Suppress progress messages on stderr
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl RunCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        debug!("Executing run command");

        // Get the prompt either from arguments or stdin
        let prompt = self.get_prompt()?;

        if prompt.trim().is_empty() {
            return Err(anyhow!("No prompt provided. Use arguments or pipe input via stdin."));
        }

        info!("Running prompt: {}", truncate(&prompt, 50));

        let engine = default_engine(config.verbose)?;
        let app = App::new(config.clone(), engine).await?;

        if let Some(model_path) = self.resolve_model(&app).await? {
            self.progress(&format!("Loading model {}...", model_path.display()));
            let info = app
                .load_model(RUN_SESSION, &model_path, &config.generation_settings())
                .await?;
            self.progress(&format!("Model loaded in {}", format_elapsed(info.elapsed)));
        }

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            let mut stdout = io::stdout();
            let mut delta = DeltaPrinter::default();
            while let Some(event) = events_rx.recv().await {
                match event {
                    ChatEvent::AssistantPartial { text } => {
                        let _ = write!(stdout, "{}", delta.next(&text));
                        let _ = stdout.flush();
                    }
                    ChatEvent::AssistantFinished { content } => {
                        let _ = writeln!(stdout, "{}", delta.next(&content));
                    }
                    ChatEvent::Warning { message } => eprintln!("{}", message),
                    ChatEvent::UserMessage { .. } | ChatEvent::AssistantStarted => {}
                }
            }
        });

        let outcome = app
            .submit(RUN_SESSION, prompt, config.temperature, &events_tx)
            .await;
        drop(events_tx);
        printer.await?;

        match outcome? {
            TurnOutcome::Responded { .. } => Ok(()),
            TurnOutcome::SkippedNoModel => Err(anyhow!("No model loaded")),
        }
    }

    /// Import `--model` into the store, or fall back to the first stored model
    async fn resolve_model(&self, app: &App) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.model {
            let upload = Upload::from_path(path).await?;
            let (stored, _) = app.upload(&upload).await?;
            return Ok(Some(stored.path));
        }

        let stored = app.store().list().await?;
        match stored.into_iter().next() {
            Some(model) => {
                self.progress(&format!("Using stored model {}", model.name));
                Ok(Some(model.path))
            }
            None => Ok(None),
        }
    }

    fn progress(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }

    fn get_prompt(&self) -> Result<String> {
        if !self.prompt.is_empty() {
            // Join all arguments into a single prompt
            Ok(self.prompt.join(" "))
        } else {
            // Read from stdin
            debug!("Reading prompt from stdin");
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| anyhow!("Failed to read from stdin: {}", e))?;
            Ok(buffer)
        }
    }
}

/// Turns the accumulated response snapshots into the newly added text
#[derive(Debug, Default)]
struct DeltaPrinter {
    printed: usize,
}

impl DeltaPrinter {
    fn next<'a>(&mut self, snapshot: &'a str) -> &'a str {
        let text = snapshot.strip_suffix(STREAMING_CURSOR).unwrap_or(snapshot);
        let new = text.get(self.printed..).unwrap_or("");
        self.printed = text.len();
        new
    }
}
