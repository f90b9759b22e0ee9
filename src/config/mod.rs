mod params;

pub use params::*;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Default system prompt placed at the start of every session
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory uploaded model files are stored in
    pub models_dir: PathBuf,

    /// Directory for logs
    pub data_dir: PathBuf,

    /// Initial context window size
    pub n_ctx: u32,

    /// Initial sampling temperature
    pub temperature: f32,

    /// Let the inference library print its own logs
    pub verbose: bool,

    /// System message for conversations
    pub system_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            data_dir: PathBuf::from("./data"),
            n_ctx: CONTEXT_SIZE.default as u32,
            temperature: TEMPERATURE.default as f32,
            verbose: false,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Initialize configuration from various sources
    pub async fn init() -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = match Self::load_from_file().await {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Ignoring configuration file: {}", e);
                Self::default()
            }
        };

        config.load_from_env();

        if !config.data_dir.exists() {
            std::fs::create_dir_all(&config.data_dir)?;
        }

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        if let Ok(dir) = std::env::var("GGUF_CHAT_MODELS_DIR") {
            self.models_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("GGUF_CHAT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(n_ctx) = std::env::var("GGUF_CHAT_N_CTX") {
            match n_ctx.parse() {
                Ok(n_ctx) => self.n_ctx = n_ctx,
                Err(_) => warn!("Ignoring GGUF_CHAT_N_CTX={}", n_ctx),
            }
        }

        if let Ok(temperature) = std::env::var("GGUF_CHAT_TEMPERATURE") {
            match temperature.parse() {
                Ok(temperature) => self.temperature = temperature,
                Err(_) => warn!("Ignoring GGUF_CHAT_TEMPERATURE={}", temperature),
            }
        }

        if let Ok(verbose) = std::env::var("GGUF_CHAT_VERBOSE") {
            self.verbose = matches!(verbose.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(system_prompt) = std::env::var("GGUF_CHAT_SYSTEM_PROMPT") {
            self.system_prompt = system_prompt;
        }
    }

    /// Candidate configuration files, highest priority first
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("./.gguf-chat.json"),
            PathBuf::from("./gguf-chat.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("gguf-chat").join("config.json"));
        }

        paths
    }

    /// Load the first configuration file found
    pub async fn load_from_file() -> Result<Option<Self>> {
        for path in Self::config_paths() {
            if path.exists() {
                debug!("Loading configuration from: {}", path.display());
                let content = tokio::fs::read_to_string(&path).await?;
                let config: Self = serde_json::from_str(&content)?;
                return Ok(Some(config));
            }
        }

        Ok(None)
    }

    /// Settings the sliders start from
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            n_ctx: self.n_ctx,
            temperature: self.temperature,
        }
    }

    /// Path of the log file written in interactive mode
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("gguf-chat.log")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !CONTEXT_SIZE.accepts(self.n_ctx as f64) {
            return Err(anyhow::anyhow!(
                "n_ctx must be between {} and {} in steps of {}, got {}",
                CONTEXT_SIZE.min,
                CONTEXT_SIZE.max,
                CONTEXT_SIZE.step,
                self.n_ctx
            ));
        }

        if !(TEMPERATURE.min..=TEMPERATURE.max).contains(&(self.temperature as f64)) {
            return Err(anyhow::anyhow!(
                "temperature must be between {:.1} and {:.1}, got {}",
                TEMPERATURE.min,
                TEMPERATURE.max,
                self.temperature
            ));
        }

        if self.models_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("models_dir must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.n_ctx, 2048);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let config = Config {
            n_ctx: 8192,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            n_ctx: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            temperature: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"n_ctx": 1024}"#).unwrap();
        assert_eq!(config.n_ctx, 1024);
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert!((config.temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_gpu_layers_in_file_are_ignored() {
        let config: Config =
            serde_json::from_str(r#"{"n_ctx": 1024, "n_gpu_layers": 8}"#).unwrap();
        assert_eq!(config.n_ctx, 1024);
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("n_gpu_layers").is_none());
    }
}
