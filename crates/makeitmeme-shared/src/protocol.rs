//! Records exchanged through the realtime store.
//!
//! Records are immutable once written. They are stored as JSON objects
//! under server generated keys, using the field names the backend expects.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A value that can live in a synchronized collection.
pub trait Record: Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + 'static {
    /// Label of the identity that wrote the record.
    fn author(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;
}

/// A chat line in the shared chat collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

impl Record for ChatMessage {
    fn author(&self) -> &str {
        &self.author
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Metadata of a saved meme. The image itself lives in file storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemeRecord {
    pub author: String,
    pub image_url: String,
    pub top_text: String,
    pub bottom_text: String,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Record for MemeRecord {
    fn author(&self) -> &str {
        &self.author
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meme_record_field_names() {
        let value = json!({
            "author": "a@b.io",
            "imageUrl": "mem://memes/x.jpg",
            "topText": "TOP",
            "bottomText": "BOTTOM",
            "timestamp": 1_700_000_000_000_i64,
        });
        let meme: MemeRecord = serde_json::from_value(value).unwrap();
        assert_eq!(meme.image_url, "mem://memes/x.jpg");
        assert_eq!(meme.created_at.timestamp_millis(), 1_700_000_000_000);

        let back = serde_json::to_value(&meme).unwrap();
        assert!(back.get("timestamp").is_some());
        assert!(back.get("createdAt").is_none());
    }

    #[test]
    fn test_chat_message_rejects_missing_text() {
        let value = json!({ "author": "a", "createdAt": 1 });
        assert!(serde_json::from_value::<ChatMessage>(value).is_err());
    }
}
