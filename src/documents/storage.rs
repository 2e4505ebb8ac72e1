use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found")]
    NotFound,
    #[error("invalid storage key")]
    InvalidKey,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Allocates a fresh storage key for a document on `case_id`.
pub fn new_key(case_id: &str) -> String {
    format!("{case_id}/{}", Uuid::new_v4())
}

/// Blob storage collaborator for document bytes. Whole values in and out;
/// streaming is deliberately not part of this interface. The core never
/// inspects blob contents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;
    /// Ok(false) when the blob was already gone.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Filesystem-backed blob store under `<data_dir>/documents/<key>`.
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("documents"),
        }
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let (case_id, blob_id) = validate_key(key)?;
        Ok(self.base_path.join(case_id).join(blob_id))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let final_path = self.blob_path(key)?;

        // Write to a temp file and rename so a crash never leaves a
        // half-written blob at the final key.
        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(&data).await?;
        temp_file.sync_all().await?;

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&temp_path, &final_path).await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.blob_path(key)?;
        let data = fs::read(&path).await.map_err(StorageError::from_io)?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.blob_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.blob_path(key)?;
        Ok(path.exists())
    }
}

/// Keys are `<case_id>/<blob_id>`, both UUID-shaped. Anything else is
/// rejected before it can touch the filesystem.
fn validate_key(key: &str) -> Result<(&str, &str), StorageError> {
    let Some((case_id, blob_id)) = key.split_once('/') else {
        return Err(StorageError::InvalidKey);
    };

    for segment in [case_id, blob_id] {
        if segment.is_empty()
            || !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(StorageError::InvalidKey);
        }
    }

    Ok((case_id, blob_id))
}
