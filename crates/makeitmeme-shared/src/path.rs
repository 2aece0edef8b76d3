//! Hierarchical key paths into the realtime store.
//!
//! A path is a sequence of non-empty segments written `a/b/c`. The root is
//! the empty sequence. Segments may not contain `.`, `#`, `$`, `[` or `]`.

use crate::constants::UID_PLACEHOLDER;
use crate::error::PathError;
use crate::types::UserId;

const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash separated path. Leading and trailing slashes are ignored.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            validate_segment(raw, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Expand a template such as `users/{uid}/message` for one identity.
    pub fn from_template(template: &str, uid: &UserId) -> Result<Self, PathError> {
        Self::parse(&template.replace(UID_PLACEHOLDER, uid.as_str()))
    }

    pub fn child(&self, segment: &str) -> Result<Self, PathError> {
        validate_segment(segment, segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// True if `other` is this path or lies below it.
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// True if a write at one path can change the value seen at the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

fn validate_segment(raw: &str, segment: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment(raw.to_string()));
    }
    if let Some(ch) = segment.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(PathError::ForbiddenChar {
            path: raw.to_string(),
            ch,
        });
    }
    Ok(())
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        f.write_str(&self.segments.join("/"))
    }
}

impl std::str::FromStr for StorePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_slashes() {
        let path = StorePath::parse("/users/abc/message/").unwrap();
        assert_eq!(path.segments(), ["users", "abc", "message"]);
        assert_eq!(path.to_string(), "users/abc/message");
        assert_eq!(path.last(), Some("message"));
    }

    #[test]
    fn test_parse_root() {
        assert!(StorePath::parse("").unwrap().is_root());
        assert!(StorePath::parse("/").unwrap().is_root());
        assert_eq!(StorePath::root().to_string(), "/");
    }

    #[test]
    fn test_parse_rejects_bad_segments() {
        assert!(matches!(
            StorePath::parse("a//b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            StorePath::parse("users/a.b"),
            Err(PathError::ForbiddenChar { ch: '.', .. })
        ));
    }

    #[test]
    fn test_template_expansion() {
        let uid = UserId::from("u42");
        let path = StorePath::from_template("users/{uid}/message", &uid).unwrap();
        assert_eq!(path.to_string(), "users/u42/message");
    }

    #[test]
    fn test_contains_and_overlaps() {
        let chat = StorePath::parse("chat").unwrap();
        let msg = chat.child("k1").unwrap();
        let other = StorePath::parse("memes").unwrap();

        assert!(chat.contains(&msg));
        assert!(!msg.contains(&chat));
        assert!(msg.overlaps(&chat));
        assert!(StorePath::root().contains(&chat));
        assert!(!chat.overlaps(&other));
    }
}
