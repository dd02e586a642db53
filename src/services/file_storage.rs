use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::services::{
    encryption::{CipherError, PathCipher},
    metrics::FILE_OPERATIONS_COUNTER,
};

pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("File handle resolves outside the storage root")]
    EscapesRoot,

    #[error("File not found")]
    NotFound,

    #[error("Invalid file handle: {0}")]
    Cipher(#[from] CipherError),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores uploads under random names and hands out only the encrypted name.
#[derive(Debug, Clone)]
pub struct SecureFileStore {
    root: PathBuf,
    cipher: PathCipher,
}

impl SecureFileStore {
    /// Creates the storage root if needed.
    pub async fn open(root: impl AsRef<Path>, cipher: PathCipher) -> Result<Self, FileStoreError> {
        tokio::fs::create_dir_all(root.as_ref()).await?;
        let root = tokio::fs::canonicalize(root.as_ref()).await?;
        Ok(Self { root, cipher })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under a fresh random name that keeps only the original
    /// extension, and returns the encrypted handle.
    pub async fn store(&self, bytes: &[u8], original_name: &str) -> Result<String, FileStoreError> {
        if original_name.contains("..") {
            count("store", "rejected");
            return Err(FileStoreError::InvalidPath(
                "filename contains invalid path sequence".into(),
            ));
        }

        let generated = match extension(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let target = self.root.join(&generated);

        if let Err(e) = tokio::fs::write(&target, bytes).await {
            tracing::error!(error = %e, "Failed to write uploaded file");
            count("store", "failure");
            return Err(e.into());
        }

        count("store", "success");
        Ok(self.cipher.encrypt(&generated))
    }

    pub async fn read(&self, handle: &str) -> Result<Vec<u8>, FileStoreError> {
        let path = self.resolve(handle)?;
        let result = tokio::fs::read(&path).await.map_err(not_found_or_io);
        count("load", status(&result));
        result
    }

    /// Returns whether a file was actually removed.
    pub async fn delete(&self, handle: &str) -> Result<bool, FileStoreError> {
        let path = self.resolve(handle)?;
        let result = match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FileStoreError::Io(e)),
        };
        count("delete", status(&result));
        result
    }

    pub async fn size(&self, handle: &str) -> Result<u64, FileStoreError> {
        let path = self.resolve(handle)?;
        let meta = tokio::fs::metadata(&path).await.map_err(not_found_or_io)?;
        Ok(meta.len())
    }

    /// Guesses from the stored name's extension, falling back to octet-stream.
    pub async fn content_type(&self, handle: &str) -> Result<String, FileStoreError> {
        let path = self.resolve(handle)?;
        tokio::fs::metadata(&path).await.map_err(not_found_or_io)?;
        Ok(mime_guess::from_path(&path)
            .first_raw()
            .unwrap_or(OCTET_STREAM)
            .to_string())
    }

    /// Decrypts a handle into a path directly under the storage root.
    fn resolve(&self, handle: &str) -> Result<PathBuf, FileStoreError> {
        let name = self.cipher.decrypt(handle).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected undecryptable file handle");
        })?;

        let mut components = Path::new(&name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(&name)),
            _ => {
                tracing::warn!("File handle decrypted to a path outside the storage root");
                count("resolve", "rejected");
                Err(FileStoreError::EscapesRoot)
            }
        }
    }
}

/// The original extension, kept only when it is plain ASCII alphanumerics.
fn extension(original_name: &str) -> Option<&str> {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn not_found_or_io(err: std::io::Error) -> FileStoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        FileStoreError::NotFound
    } else {
        FileStoreError::Io(err)
    }
}

fn status<T>(result: &Result<T, FileStoreError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(FileStoreError::NotFound) => "not_found",
        Err(_) => "failure",
    }
}

fn count(op: &str, status: &str) {
    FILE_OPERATIONS_COUNTER.with_label_values(&[op, status]).inc();
}
