//! Blob storage seam for document contents.

use async_trait::async_trait;
use service_core::error::AppError;
use std::path::PathBuf;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Filesystem-backed storage. Keys are server-generated
/// (`<uuid>/<uuid>.<ext>`), but path traversal is still rejected in case a
/// stored key is ever tampered with.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: &str) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(root).await?;
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "invalid storage key '{}'",
                key
            )));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
                anyhow::anyhow!("stored file not found for key '{}'", key),
            )),
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_under_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap()).await.unwrap();

        storage
            .upload("a1/b2.pdf", b"deal deck".to_vec())
            .await
            .unwrap();
        let data = storage.download("a1/b2.pdf").await.unwrap();
        assert_eq!(data, b"deal deck");

        storage.delete("a1/b2.pdf").await.unwrap();
        assert!(matches!(
            storage.download("a1/b2.pdf").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap()).await.unwrap();

        assert!(storage.download("../etc/passwd").await.is_err());
        assert!(storage.upload("/absolute", vec![]).await.is_err());
        assert!(storage.delete("a//b").await.is_err());
    }
}
