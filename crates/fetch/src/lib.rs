//! Model file downloads shared by the speech and embedding crates.
//!
//! A download streams into a sibling `<name>.part` file, is fsynced, and is
//! renamed over the target only once the whole body has arrived. An
//! interrupted download never leaves a truncated model at the real path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure, non-success status, or a broken body stream.
    #[error("download {url}: {message}")]
    Http { url: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    fn http(url: &str, message: impl ToString) -> Self {
        FetchError::Http {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Downloads `url` into `target`, creating parent directories as needed.
pub async fn download_to_path(target: &Path, url: &str) -> Result<(), FetchError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut response = reqwest::get(url)
        .await
        .map_err(|e| FetchError::http(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::http(url, format!("unexpected status {status}")));
    }

    let partial = partial_path(target);
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut written = 0usize;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchError::http(url, e))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&partial, target).await?;
    debug!(%url, target = %target.display(), bytes = written, "download complete");
    Ok(())
}

/// `model.onnx` -> `model.onnx.part`, in the same directory.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}
