//! # makeitmeme-store
//!
//! In-process implementation of the hosted backend the client talks to: a
//! realtime JSON store with value listeners, an email/password auth
//! provider, and blob storage for meme images.
//!
//! It stands in for the hosted service in tests and in the console shell.
//! Every type implements one of the capability traits from
//! `makeitmeme-shared`, so the client cannot tell it apart from a remote
//! backend.

pub mod auth;
pub mod blobs;
pub mod push_id;
pub mod realtime;
pub mod tree;

use std::sync::Arc;

pub use auth::MemoryAuth;
pub use blobs::MemoryFiles;
pub use realtime::MemoryStore;

/// The three services, shared behind `Arc`s.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub auth: Arc<MemoryAuth>,
    pub store: Arc<MemoryStore>,
    pub files: Arc<MemoryFiles>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}
