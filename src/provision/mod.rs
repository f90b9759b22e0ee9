//! Model file storage
//!
//! Uploaded GGUF files are written once into a flat directory under their
//! original file name. A second upload with the same name is a no-op: the
//! bytes already on disk are kept and the existing path is returned.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

/// Extension accepted at the upload boundary
pub const MODEL_EXTENSION: &str = "gguf";

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Only .gguf files can be uploaded: {0}")]
    InvalidExtension(String),

    #[error("Invalid model file name: {0:?}")]
    InvalidFileName(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// An uploaded model: its declared file name and raw bytes
#[derive(Debug, Clone)]
pub struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

impl Upload {
    /// Validate the declared file name and wrap the bytes
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> ProvisionResult<Self> {
        let file_name = file_name.into();
        validate_file_name(&file_name)?;
        Ok(Self { file_name, bytes })
    }

    /// Read a local file as if it had been uploaded under its own name
    pub async fn from_path(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ProvisionError::InvalidFileName(path.display().to_string()))?;
        validate_file_name(&file_name)?;

        debug!("Reading upload from {}", path.display());
        let bytes = fs::read(path)
            .await
            .map_err(|e| ProvisionError::io(path, e))?;

        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn validate_file_name(name: &str) -> ProvisionResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(ProvisionError::InvalidFileName(name.to_string()));
    }

    let has_extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION));
    if !has_extension {
        return Err(ProvisionError::InvalidExtension(name.to_string()));
    }

    Ok(())
}

/// Whether a store call wrote bytes or found the name already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Saved,
    AlreadyPresent,
}

/// A model file living in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredModel {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Flat directory of model files
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if missing
    pub async fn ensure_dir(&self) -> ProvisionResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ProvisionError::io(&self.dir, e))
    }

    /// Path a model with this name is (or would be) stored at
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Persist an upload unless a file with the same name already exists
    pub async fn store(&self, upload: &Upload) -> ProvisionResult<(StoredModel, StoreOutcome)> {
        self.ensure_dir().await?;
        let path = self.path_for(upload.file_name());

        let open = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        let outcome = match open {
            Ok(mut file) => {
                info!("Saving {} ({} bytes)", path.display(), upload.len());
                if let Err(e) = write_all(&mut file, &upload.bytes).await {
                    warn!("Write to {} failed, removing partial file", path.display());
                    drop(file);
                    let _ = fs::remove_file(&path).await;
                    return Err(ProvisionError::io(&path, e));
                }
                StoreOutcome::Saved
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} already stored, keeping existing file", path.display());
                StoreOutcome::AlreadyPresent
            }
            Err(e) => return Err(ProvisionError::io(&path, e)),
        };

        let size = fs::metadata(&path)
            .await
            .map_err(|e| ProvisionError::io(&path, e))?
            .len();

        Ok((
            StoredModel {
                name: upload.file_name().to_string(),
                path,
                size,
            },
            outcome,
        ))
    }

    /// Stored model files sorted by name
    pub async fn list(&self) -> ProvisionResult<Vec<StoredModel>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ProvisionError::io(&self.dir, e)),
        };

        let mut models = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ProvisionError::io(&self.dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if validate_file_name(&name).is_err() {
                continue;
            }
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| ProvisionError::io(&entry.path(), e))?;
            if !metadata.is_file() {
                continue;
            }
            models.push(StoredModel {
                name,
                path: entry.path(),
                size: metadata.len(),
            });
        }

        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
