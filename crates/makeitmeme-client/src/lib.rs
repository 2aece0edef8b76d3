//! # makeitmeme-client
//!
//! Client core of Make It Meme: the session controller, the screen state
//! machine, and the views that keep local state in sync with the realtime
//! store.
//!
//! - [`session::SessionController`] mirrors the auth provider's identity.
//! - [`navigation::Navigator`] derives the active screen from it.
//! - [`sync::CollectionView`] and [`sync::ScalarView`] mirror remote data
//!   while their screen is mounted.
//! - [`app::App`] owns all of the above and applies backend notifications
//!   and user commands one at a time.
//!
//! The backend is injected as capability traits from `makeitmeme-shared`.

pub mod app;
pub mod auth_form;
pub mod commands;
pub mod composer;
pub mod config;
pub mod error;
pub mod events;
pub mod navigation;
pub mod render;
pub mod session;
pub mod state;
pub mod subscription;
pub mod sync;

pub use app::App;
pub use config::{ClientConfig, NavLayout};
pub use error::{ClientError, Result};
