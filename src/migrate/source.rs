use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load `file_name` from `dir`, or `T::default()` if the file does not exist.
/// An empty `[]`/`{}` file and a missing file give the same result.
pub fn read_json<T>(dir: &Path, file_name: &str) -> Result<T, SourceError>
where
    T: DeserializeOwned + Default,
{
    let path = dir.join(file_name);
    if !path.exists() {
        tracing::info!("{} not found, nothing to migrate", path.display());
        return Ok(T::default());
    }

    let raw = std::fs::read_to_string(&path).map_err(|source| SourceError::Read {
        path: path.clone(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| SourceError::Parse { path, source })
}
