use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::{
    config::Config,
    provision::{ModelStore, StoreOutcome, Upload},
    utils::text::format::format_file_size,
};

/// Manage stored model files
#[derive(Args)]
pub struct ModelsCommand {
    #[command(subcommand)]
    pub action: ModelsAction,
}

#[derive(Subcommand)]
pub enum ModelsAction {
    /// List model files in the store
    List,

    /// Copy a local GGUF file into the store
    Import {
        /// Path of the .gguf file
        file: PathBuf,
    },
}

impl ModelsCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let store = ModelStore::new(&config.models_dir);

        match &self.action {
            ModelsAction::List => {
                let models = store.list().await?;
                if models.is_empty() {
                    println!("No models in {}", store.dir().display());
                    return Ok(());
                }
                for line in list_lines(&models) {
                    println!("{}", line);
                }
            }
            ModelsAction::Import { file } => {
                debug!("Importing {}", file.display());
                store.ensure_dir().await?;
                let upload = Upload::from_path(file).await?;
                let (stored, outcome) = store.store(&upload).await?;
                match outcome {
                    StoreOutcome::Saved => println!("Saved: {}", stored.path.display()),
                    StoreOutcome::AlreadyPresent => {
                        println!("Already present, kept existing file: {}", stored.path.display())
                    }
                }
            }
        }

        Ok(())
    }
}

fn list_lines(models: &[crate::provision::StoredModel]) -> Vec<String> {
    let width = models.iter().map(|m| m.name.chars().count()).max().unwrap_or(0);
    models
        .iter()
        .map(|m| format!("{:<width$}  {:>9}", m.name, format_file_size(m.size), width = width))
        .collect()
}
