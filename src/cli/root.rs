use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};

use super::{models::ModelsCommand, run::RunCommand};
use crate::{app::App, config::Config, init_logging, llm::default_engine, tui};

/// gguf-chat - chat with local GGUF models in your terminal
#[derive(Parser)]
#[command(
    name = "gguf-chat",
    version,
    about = "Chat with local GGUF models in your terminal",
    long_about = r#"gguf-chat loads GGUF model files with llama.cpp and chats with them locally.
Import a model file, pick a context size and temperature, load it, and talk.

Examples:
  gguf-chat                                   # Start interactive mode
  gguf-chat models import ~/Downloads/m.gguf  # Copy a model into the store
  gguf-chat run --model m.gguf "hello"        # Run a single prompt"#
)]
pub struct Cli {
    /// Current working directory
    #[arg(short = 'c', long = "cwd", global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    /// Directory model files are stored in
    #[arg(long = "models-dir", global = true)]
    pub models_dir: Option<PathBuf>,

    /// Context window used when loading a model
    #[arg(long = "n-ctx", global = true)]
    pub n_ctx: Option<u32>,

    /// Sampling temperature
    #[arg(long = "temperature", global = true)]
    pub temperature: Option<f32>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single prompt non-interactively
    Run(RunCommand),

    /// Manage stored model files
    Models(ModelsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        // Change working directory if specified
        if let Some(cwd) = &self.cwd {
            std::env::set_current_dir(cwd)
                .map_err(|e| anyhow::anyhow!("Failed to change directory to {}: {}", cwd.display(), e))?;
        }

        // Initialize configuration
        let mut config = Config::init().await?;
        self.apply_overrides(&mut config);
        config.validate()?;

        let log_file = config.log_file();
        let interactive = self.command.is_none();
        init_logging(self.debug, interactive.then_some(log_file.as_path()))?;
        if let Some(cwd) = &self.cwd {
            info!("Changed working directory to: {}", cwd.display());
        }
        debug!("Configuration initialized: {:?}", config);

        match self.command {
            Some(Commands::Run(run_cmd)) => run_cmd.execute(&config).await,
            Some(Commands::Models(models_cmd)) => models_cmd.execute(&config).await,
            None => start_interactive_mode(config).await,
        }
    }

    /// Command-line flags take precedence over file and environment values
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.models_dir {
            config.models_dir = dir.clone();
        }
        if let Some(n_ctx) = self.n_ctx {
            config.n_ctx = n_ctx;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
    }
}

async fn start_interactive_mode(config: Config) -> Result<()> {
    info!("Starting interactive mode");

    let engine = default_engine(config.verbose)?;
    let app = Arc::new(App::new(config, engine).await?);
    tui::run(app).await?;

    info!("Application finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_overrides() {
        let cli = Cli::try_parse_from([
            "gguf-chat",
            "--n-ctx",
            "1024",
            "--temperature",
            "0.2",
            "models",
            "list",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.n_ctx, 1024);
        assert!((config.temperature - 0.2).abs() < 1e-6);
        assert!(matches!(cli.command, Some(Commands::Models(_))));
    }

    #[test]
    fn test_no_command_means_interactive() {
        let cli = Cli::try_parse_from(["gguf-chat", "-d"]).unwrap();
        assert!(cli.debug);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_collects_prompt_words() {
        let cli = Cli::try_parse_from(["gguf-chat", "run", "-m", "a.gguf", "hello", "world"]).unwrap();
        match cli.command {
            Some(Commands::Run(run)) => {
                assert_eq!(run.prompt, vec!["hello", "world"]);
                assert_eq!(run.model, Some(PathBuf::from("a.gguf")));
            }
            _ => panic!("expected run command"),
        }
    }
}
