//! Per-screen view state.
//!
//! A screen's views exist only while the screen is mounted. Mounting opens
//! their subscriptions; unmounting (or dropping) closes them.

use std::sync::Arc;

use tracing::debug;

use makeitmeme_shared::{ChatMessage, MemeRecord, PathError, RemoteStore, Screen, StoreEvent, StoreSink, UserId};

use crate::composer::MemeComposer;
use crate::config::ClientConfig;
use crate::sync::{CollectionView, ScalarView};

/// Shared chat plus the caller's saved message.
pub struct ChatScreen<S: RemoteStore> {
    pub messages: CollectionView<S, ChatMessage>,
    pub saved: ScalarView<S, String>,
}

impl<S: RemoteStore> ChatScreen<S> {
    pub fn mount(
        store: &Arc<S>,
        config: &ClientConfig,
        uid: &UserId,
        sink: &StoreSink,
    ) -> Result<Self, PathError> {
        let mut messages =
            CollectionView::new(store.clone(), config.chat_path()?, config.write_timeout);
        let mut saved =
            ScalarView::new(store.clone(), config.message_path_for(uid)?, config.write_timeout);
        messages.subscribe(sink.clone());
        saved.subscribe(sink.clone());
        Ok(Self { messages, saved })
    }

    fn apply(&mut self, event: StoreEvent) -> bool {
        if self.messages.owns(event.listener) {
            self.messages.apply(event)
        } else {
            self.saved.apply(event)
        }
    }

    fn unmount(&mut self) {
        self.messages.unsubscribe();
        self.saved.unsubscribe();
    }
}

/// The caller's memes and the composer.
pub struct PrimaryScreen<S: RemoteStore> {
    pub memes: CollectionView<S, MemeRecord>,
    pub composer: MemeComposer,
}

impl<S: RemoteStore> PrimaryScreen<S> {
    pub fn mount(
        store: &Arc<S>,
        config: &ClientConfig,
        uid: &UserId,
        sink: &StoreSink,
    ) -> Result<Self, PathError> {
        let mut memes =
            CollectionView::new(store.clone(), config.memes_path_for(uid)?, config.write_timeout);
        memes.subscribe(sink.clone());
        Ok(Self {
            memes,
            composer: MemeComposer::new(config.upload_prefix.clone()),
        })
    }
}

/// Views of the active screen, tagged with the identity they belong to.
pub enum Mounted<S: RemoteStore> {
    Nothing,
    Chat { owner: UserId, screen: ChatScreen<S> },
    Primary { owner: UserId, screen: PrimaryScreen<S> },
}

impl<S: RemoteStore> Mounted<S> {
    pub fn screen(&self) -> Option<Screen> {
        match self {
            Mounted::Nothing => None,
            Mounted::Chat { .. } => Some(Screen::Chat),
            Mounted::Primary { .. } => Some(Screen::Primary),
        }
    }

    pub fn owner(&self) -> Option<&UserId> {
        match self {
            Mounted::Nothing => None,
            Mounted::Chat { owner, .. } | Mounted::Primary { owner, .. } => Some(owner),
        }
    }

    /// `true` if these are the views `screen` needs for `uid`.
    pub fn matches(&self, screen: Screen, uid: Option<&UserId>) -> bool {
        match self.screen() {
            None => !needs_views(screen) || uid.is_none(),
            Some(mounted) => mounted == screen && self.owner() == uid,
        }
    }

    /// Route a store notification. Returns `false` if no mounted view owns it.
    pub fn apply(&mut self, event: StoreEvent) -> bool {
        match self {
            Mounted::Nothing => false,
            Mounted::Chat { screen, .. } => screen.apply(event),
            Mounted::Primary { screen, .. } => screen.memes.apply(event),
        }
    }

    pub fn unmount(&mut self) {
        match std::mem::replace(self, Mounted::Nothing) {
            Mounted::Nothing => {}
            Mounted::Chat { mut screen, .. } => {
                screen.unmount();
                debug!("Chat views unmounted");
            }
            Mounted::Primary { mut screen, .. } => {
                screen.memes.unsubscribe();
                debug!("Primary views unmounted");
            }
        }
    }
}

/// Screens that own synchronized views.
pub fn needs_views(screen: Screen) -> bool {
    matches!(screen, Screen::Chat | Screen::Primary)
}
