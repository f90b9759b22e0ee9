//! Model loading into a session

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{error, info};

use crate::{
    config::GenerationSettings,
    llm::{InferenceEngine, LlmResult, LoadParams},
    session::SessionState,
    utils::text::format::format_elapsed,
};

/// Summary of a successful load
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub path: PathBuf,
    pub n_ctx: u32,
    pub elapsed: Duration,
}

/// Models always load on the CPU
const CPU_ONLY: u32 = 0;

/// Options fixed for the lifetime of the process
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub verbose: bool,
}

/// Replace the session's model with one loaded from `path`.
///
/// The previous handle is dropped before the new load starts, so a failed
/// reload leaves the session without any model. The temperature in
/// `settings` is not used here; it only applies at generation time.
pub async fn load_model(
    engine: &dyn InferenceEngine,
    session: &mut SessionState,
    path: &Path,
    settings: &GenerationSettings,
    options: LoadOptions,
) -> LlmResult<ModelInfo> {
    if session.clear_model() {
        info!("Released previous model for session {}", session.id());
    }

    let params = LoadParams {
        model_path: path.to_path_buf(),
        n_ctx: settings.n_ctx,
        n_gpu_layers: CPU_ONLY,
        verbose: options.verbose,
    };

    let started = Instant::now();
    match engine.load(params).await {
        Ok(handle) => {
            let elapsed = started.elapsed();
            info!(
                "Loaded {} with {} in {}",
                path.display(),
                engine.name(),
                format_elapsed(elapsed)
            );
            session.install_model(handle);
            Ok(ModelInfo {
                path: path.to_path_buf(),
                n_ctx: settings.n_ctx,
                elapsed,
            })
        }
        Err(e) => {
            error!("Model load failed for session {}: {}", session.id(), e);
            Err(e)
        }
    }
}
