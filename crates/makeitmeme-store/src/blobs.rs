use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use tracing::debug;

use makeitmeme_shared::constants::MAX_UPLOAD_SIZE;
use makeitmeme_shared::{FileStorage, UploadError};

const URL_SCHEME: &str = "mem://";

/// Reject empty segments and any `.`/`..` component.
fn validate_blob_path(path: &str) -> Result<(), UploadError> {
    let bad = path.is_empty()
        || path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\'));
    if bad {
        return Err(UploadError::Rejected {
            path: path.to_string(),
            reason: "invalid path".to_string(),
        });
    }
    Ok(())
}

/// In-process blob storage. Download URLs have the form `mem://<path>`.
pub struct MemoryFiles {
    blobs: Mutex<BTreeMap<String, Bytes>>,
    max_size: usize,
}

impl MemoryFiles {
    pub fn new(max_size: usize) -> Self {
        Self {
            blobs: Mutex::new(BTreeMap::new()),
            max_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Bytes>> {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch a blob by download URL or by storage path.
    pub fn get(&self, url_or_path: &str) -> Option<Bytes> {
        let path = url_or_path.strip_prefix(URL_SCHEME).unwrap_or(url_or_path);
        self.lock().get(path).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

impl Default for MemoryFiles {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_SIZE)
    }
}

impl FileStorage for MemoryFiles {
    async fn upload(&self, path: &str, data: Bytes) -> Result<String, UploadError> {
        if data.is_empty() {
            return Err(UploadError::Empty);
        }
        if data.len() > self.max_size {
            return Err(UploadError::TooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }
        validate_blob_path(path)?;

        debug!(path, size = data.len(), "Stored blob");
        self.lock().insert(path.to_string(), data);
        Ok(format!("{URL_SCHEME}{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_get() {
        let files = MemoryFiles::default();
        let url = files
            .upload("memes/a.jpg", Bytes::from_static(b"jpeg-bytes"))
            .await
            .unwrap();

        assert_eq!(url, "mem://memes/a.jpg");
        assert_eq!(files.get(&url).unwrap(), Bytes::from_static(b"jpeg-bytes"));
        assert_eq!(files.list(), ["memes/a.jpg"]);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let files = MemoryFiles::default();
        assert_eq!(
            files.upload("memes/a.jpg", Bytes::new()).await.unwrap_err(),
            UploadError::Empty
        );
    }

    #[tokio::test]
    async fn test_too_large_rejected() {
        let files = MemoryFiles::new(4);
        assert!(matches!(
            files.upload("a", Bytes::from_static(b"12345")).await,
            Err(UploadError::TooLarge { size: 5, max: 4 })
        ));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let files = MemoryFiles::default();
        for bad in ["../etc/passwd", "memes//a", "memes/./a", ""] {
            assert!(files.upload(bad, Bytes::from_static(b"x")).await.is_err());
        }
    }
}
