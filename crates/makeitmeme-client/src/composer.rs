//! Meme composer on the Primary screen.
//!
//! Publishing is two writes run by the caller: the image upload, then the
//! append of the meme record that points at it.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use makeitmeme_shared::constants::{DEFAULT_BOTTOM_TEXT, DEFAULT_TOP_TEXT};
use makeitmeme_shared::{FileStorage, MemeRecord, RemoteStore, UploadError};

use crate::error::{ClientError, Result};
use crate::sync::CollectionView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionSlot {
    Top,
    Bottom,
}

impl std::str::FromStr for CaptionSlot {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(CaptionSlot::Top),
            "bottom" => Ok(CaptionSlot::Bottom),
            other => Err(ClientError::UnknownCommand(format!("caption {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemeComposer {
    /// Storage folder for uploaded images
    upload_prefix: String,
    /// Caption above the image
    top_text: String,
    /// Caption below the image
    bottom_text: String,
    /// Attached image, dropped once uploaded
    image: Option<Bytes>,
    /// An upload started and its outcome not yet reported
    uploading: bool,
    /// Last upload failure, worded for the user
    error: Option<String>,
}

impl MemeComposer {
    pub fn new(upload_prefix: impl Into<String>) -> Self {
        Self {
            upload_prefix: upload_prefix.into(),
            top_text: DEFAULT_TOP_TEXT.to_string(),
            bottom_text: DEFAULT_BOTTOM_TEXT.to_string(),
            image: None,
            uploading: false,
            error: None,
        }
    }

    /// Set a caption. A blank caption falls back to the default text.
    pub fn set_caption(&mut self, slot: CaptionSlot, text: &str) {
        let text = text.trim();
        let (field, default) = match slot {
            CaptionSlot::Top => (&mut self.top_text, DEFAULT_TOP_TEXT),
            CaptionSlot::Bottom => (&mut self.bottom_text, DEFAULT_BOTTOM_TEXT),
        };
        *field = if text.is_empty() { default } else { text }.to_string();
    }

    pub fn attach(&mut self, image: Bytes) {
        self.image = Some(image);
    }

    pub fn top_text(&self) -> &str {
        &self.top_text
    }

    pub fn bottom_text(&self) -> &str {
        &self.bottom_text
    }

    pub fn image_size(&self) -> Option<usize> {
        self.image.as_ref().map(Bytes::len)
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start uploading the attached image and return the upload to run.
    ///
    /// Refused while a previous upload or meme append is still out.
    pub fn start_upload<F, S>(
        &mut self,
        files: Arc<F>,
        memes: &CollectionView<S, MemeRecord>,
    ) -> Result<impl Future<Output = std::result::Result<String, UploadError>> + Send + 'static>
    where
        F: FileStorage,
        S: RemoteStore,
    {
        if self.uploading || memes.in_flight() {
            return Err(ClientError::WriteInFlight);
        }
        let image = self.image.clone().ok_or(ClientError::InputRequired("Image"))?;

        let path = format!("{}/{}.jpg", self.upload_prefix, Uuid::new_v4());
        self.uploading = true;
        self.error = None;
        Ok(async move { files.upload(&path, image).await })
    }

    /// Apply the upload outcome. On success the attached image is released
    /// and the record to append is returned; nothing is appended on failure.
    pub fn finish_upload(
        &mut self,
        outcome: std::result::Result<String, UploadError>,
        author: &str,
    ) -> Option<MemeRecord> {
        self.uploading = false;
        let image_url = match outcome {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Image upload failed");
                self.error = Some(format!("Upload failed: {e}"));
                return None;
            }
        };
        info!(url = %image_url, "Image uploaded");

        self.image = None;
        Some(MemeRecord {
            author: author.to_string(),
            image_url,
            top_text: self.top_text.clone(),
            bottom_text: self.bottom_text.clone(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use makeitmeme_shared::StorePath;
    use makeitmeme_store::{MemoryFiles, MemoryStore};
    use tokio::sync::mpsc;

    fn memes_view(store: &Arc<MemoryStore>) -> CollectionView<MemoryStore, MemeRecord> {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut view = CollectionView::new(store.clone(), StorePath::parse("memes/u1").unwrap(), None);
        view.subscribe(tx);
        view
    }

    async fn save(
        composer: &mut MemeComposer,
        files: &Arc<MemoryFiles>,
        memes: &mut CollectionView<MemoryStore, MemeRecord>,
    ) -> Result<Option<String>> {
        let upload = composer.start_upload(files.clone(), memes)?;
        let outcome = upload.await;
        let Some(record) = composer.finish_upload(outcome, "ana") else {
            return Ok(None);
        };
        let push = memes.start_append(record)?;
        let outcome = push.await;
        Ok(memes.finish_append(outcome))
    }

    #[test]
    fn test_blank_caption_restores_default() {
        let mut composer = MemeComposer::new("memes");
        composer.set_caption(CaptionSlot::Top, "when the build passes");
        assert_eq!(composer.top_text(), "when the build passes");
        composer.set_caption(CaptionSlot::Top, "  ");
        assert_eq!(composer.top_text(), "TOP TEXT");
        assert_eq!(composer.bottom_text(), "BOTTOM TEXT");
    }

    #[test]
    fn test_caption_slot_parse() {
        assert_eq!("Top".parse::<CaptionSlot>().unwrap(), CaptionSlot::Top);
        assert!("middle".parse::<CaptionSlot>().is_err());
    }

    #[tokio::test]
    async fn test_save_requires_image() {
        let store = Arc::new(MemoryStore::new());
        let files = Arc::new(MemoryFiles::default());
        let mut memes = memes_view(&store);
        let mut composer = MemeComposer::new("memes");

        let err = save(&mut composer, &files, &mut memes).await.unwrap_err();
        assert!(matches!(err, ClientError::InputRequired("Image")));
        assert!(!composer.is_uploading());
        assert!(files.list().is_empty());
    }

    #[tokio::test]
    async fn test_save_uploads_then_appends() {
        let store = Arc::new(MemoryStore::new());
        let files = Arc::new(MemoryFiles::default());
        let mut memes = memes_view(&store);
        let mut composer = MemeComposer::new("memes");
        composer.set_caption(CaptionSlot::Bottom, "ship it");
        composer.attach(Bytes::from_static(b"\xff\xd8jpeg"));

        let key = save(&mut composer, &files, &mut memes).await.unwrap().unwrap();

        let record = memes.records().last().unwrap().clone();
        assert_eq!(record.bottom_text, "ship it");
        assert_eq!(record.top_text, "TOP TEXT");
        assert!(record.image_url.starts_with("mem://memes/"));
        assert!(files.get(&record.image_url).is_some());

        let stored = store
            .value_at(&StorePath::parse("memes/u1").unwrap().child(&key).unwrap())
            .unwrap();
        assert_eq!(stored["imageUrl"], record.image_url.as_str());
        assert!(composer.image_size().is_none());
    }

    #[tokio::test]
    async fn test_failed_upload_appends_nothing() {
        let store = Arc::new(MemoryStore::new());
        let files = Arc::new(MemoryFiles::new(4));
        let mut memes = memes_view(&store);
        let mut composer = MemeComposer::new("memes");
        composer.attach(Bytes::from_static(b"far too large"));

        assert_eq!(save(&mut composer, &files, &mut memes).await.unwrap(), None);
        assert!(!composer.is_uploading());
        assert!(memes.is_empty());
        assert!(composer.error().unwrap().starts_with("Upload failed"));
        assert_eq!(composer.image_size(), Some(13));
    }

    #[tokio::test]
    async fn test_upload_in_progress_refuses_publish() {
        let store = Arc::new(MemoryStore::new());
        let files = Arc::new(MemoryFiles::default());
        let memes = memes_view(&store);
        let mut composer = MemeComposer::new("memes");
        composer.attach(Bytes::from_static(b"jpeg"));

        let upload = composer.start_upload(files.clone(), &memes).unwrap();
        assert!(composer.is_uploading());
        assert!(matches!(
            composer.start_upload(files.clone(), &memes),
            Err(ClientError::WriteInFlight)
        ));

        let record = composer.finish_upload(upload.await, "ana").unwrap();
        assert_eq!(record.author, "ana");
        assert!(composer.image_size().is_none());
    }
}
