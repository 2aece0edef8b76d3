use makeitmeme_shared::{
    AuthError, AuthEvent, Identity, ListenerId, RemoteWriteError, StoreEvent, UploadError,
};

/// A notification waiting to be applied by the app loop.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Auth(AuthEvent),
    Store(StoreEvent),
    Write(WriteDone),
}

impl AppEvent {
    pub fn listener(&self) -> Option<ListenerId> {
        match self {
            AppEvent::Auth(e) => Some(e.listener),
            AppEvent::Store(e) => Some(e.listener),
            AppEvent::Write(done) => done.view,
        }
    }
}

/// A write that ran on its own task and has an answer.
#[derive(Debug, Clone)]
pub struct WriteDone {
    /// Subscription of the view that started the write, if any. A view
    /// mounted since then has a different one and ignores the outcome.
    pub view: Option<ListenerId>,
    pub outcome: WriteOutcome,
}

#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Auth(Result<Identity, AuthError>),
    SignOut,
    /// Chat message push
    Message(Result<String, RemoteWriteError>),
    /// Saved message write
    SavedMessage(Result<(), RemoteWriteError>),
    /// Meme image upload
    Upload(Result<String, UploadError>),
    /// Meme record push
    Meme(Result<String, RemoteWriteError>),
}

impl From<AuthEvent> for AppEvent {
    fn from(e: AuthEvent) -> Self {
        AppEvent::Auth(e)
    }
}

impl From<StoreEvent> for AppEvent {
    fn from(e: StoreEvent) -> Self {
        AppEvent::Store(e)
    }
}

impl From<WriteDone> for AppEvent {
    fn from(done: WriteDone) -> Self {
        AppEvent::Write(done)
    }
}
