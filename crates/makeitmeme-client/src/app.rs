//! The app orchestrator.
//!
//! Owns the session, the navigator and the views of the active screen, and
//! applies backend notifications and user commands one at a time. After
//! every change the active screen is re-derived from the latest identity
//! and the mounted views are brought in line with it.
//!
//! Remote writes never run on the loop itself. Each one is spawned on its
//! own task and reports back as [`AppEvent::Write`], so notifications and
//! commands keep flowing while a write is pending.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use makeitmeme_shared::{
    AuthEvent, AuthProvider, ChatMessage, FileStorage, Identity, ListenerId, RemoteStore, Screen,
    StoreEvent,
};

use crate::auth_form::AuthForm;
use crate::commands::UiCommand;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{AppEvent, WriteDone, WriteOutcome};
use crate::navigation::{NavEffect, Navigator, UserAction};
use crate::session::SessionController;
use crate::state::{needs_views, ChatScreen, Mounted, PrimaryScreen};

/// Writes running on their own tasks.
struct Writes {
    /// Cloned into every write task
    done_tx: UnboundedSender<WriteDone>,
    /// Outcomes waiting to be applied
    done_rx: UnboundedReceiver<WriteDone>,
    /// Spawned and not yet applied
    pending: usize,
}

impl Writes {
    fn new() -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            done_tx,
            done_rx,
            pending: 0,
        }
    }

    fn spawn<T, W>(&mut self, view: Option<ListenerId>, write: W, outcome: fn(T) -> WriteOutcome)
    where
        W: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let done = self.done_tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let outcome = outcome(write.await);
            // The app is gone if nobody listens anymore.
            let _ = done.send(WriteDone { view, outcome });
        });
    }
}

pub struct App<A: AuthProvider, S: RemoteStore, F: FileStorage> {
    /// Paths, layout and write timeout
    config: ClientConfig,
    /// Provider identity and its listener
    session: SessionController<A>,
    /// Identity as published by the session
    identity: watch::Receiver<Option<Identity>>,
    /// Requested and active screen
    nav: Navigator,
    /// Realtime store shared with the mounted views
    store: Arc<S>,
    /// Blob storage for meme images
    files: Arc<F>,
    /// Form state of the Auth screen
    auth_form: AuthForm,
    /// Views of the active screen
    mounted: Mounted<S>,
    /// Failure of the last command, shown under the screen
    notice: Option<String>,
    /// Sink handed to the auth listener
    auth_tx: UnboundedSender<AuthEvent>,
    /// Auth notifications waiting to be applied
    auth_rx: UnboundedReceiver<AuthEvent>,
    /// Sink handed to every view subscription
    store_tx: UnboundedSender<StoreEvent>,
    /// Store notifications waiting to be applied
    store_rx: UnboundedReceiver<StoreEvent>,
    /// Outstanding remote writes and their completion channel
    writes: Writes,
}

impl<A: AuthProvider, S: RemoteStore, F: FileStorage> App<A, S, F> {
    pub fn new(config: ClientConfig, auth: Arc<A>, store: Arc<S>, files: Arc<F>) -> Self {
        let session = SessionController::new(auth);
        let identity = session.watch();
        let nav = Navigator::new(config.layout, session.is_signed_in());
        let (auth_tx, auth_rx) = mpsc::unbounded_channel();
        let (store_tx, store_rx) = mpsc::unbounded_channel();

        Self {
            config,
            session,
            identity,
            nav,
            store,
            files,
            auth_form: AuthForm::new(),
            mounted: Mounted::Nothing,
            notice: None,
            auth_tx,
            auth_rx,
            store_tx,
            store_rx,
            writes: Writes::new(),
        }
    }

    /// Register the auth listener and mount the views of the first screen.
    pub fn start(&mut self) {
        self.session.mount(self.auth_tx.clone());
        self.reconcile();
        info!(screen = %self.nav.active(), "App started");
    }

    /// Release every listener. Writes still pending keep running but their
    /// outcome is dropped.
    pub fn shutdown(&mut self) {
        self.mounted.unmount();
        self.session.unmount();
        info!(pending = self.writes.pending, "App stopped");
    }

    /// Wait for the next notification or write outcome.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        tokio::select! {
            biased;
            Some(event) = self.auth_rx.recv() => Some(event.into()),
            Some(event) = self.store_rx.recv() => Some(event.into()),
            Some(done) = self.writes.done_rx.recv() => Some(done.into()),
            else => None,
        }
    }

    pub fn apply(&mut self, event: AppEvent) {
        let listener = event.listener();
        match event {
            AppEvent::Auth(event) => {
                if self.session.apply(event) {
                    self.auth_form = AuthForm::new();
                }
                self.reconcile();
            }
            AppEvent::Store(event) => {
                if !self.mounted.apply(event) {
                    debug!(?listener, "Dropping notification for unmounted view");
                }
            }
            AppEvent::Write(done) => {
                self.writes.pending = self.writes.pending.saturating_sub(1);
                self.finish_write(done);
            }
        }
    }

    /// Apply every event already queued. Returns how many were applied.
    pub fn settle(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let event = if let Ok(event) = self.auth_rx.try_recv() {
                AppEvent::Auth(event)
            } else if let Ok(event) = self.store_rx.try_recv() {
                AppEvent::Store(event)
            } else if let Ok(done) = self.writes.done_rx.try_recv() {
                AppEvent::Write(done)
            } else {
                return applied;
            };
            self.apply(event);
            applied += 1;
        }
    }

    /// Apply events until every write started so far has reported back,
    /// including writes started along the way.
    pub async fn drain_writes(&mut self) {
        self.settle();
        while self.writes.pending > 0 {
            let Some(event) = self.next_event().await else {
                break;
            };
            self.apply(event);
            self.settle();
        }
    }

    /// Writes started and not yet applied.
    pub fn pending_writes(&self) -> usize {
        self.writes.pending
    }

    /// Run a user command, then apply whatever it caused so far.
    ///
    /// Writes the command starts are left running; their outcome arrives
    /// later through [`App::next_event`]. The error is also kept as the
    /// notice shown under the screen.
    pub async fn handle(&mut self, command: UiCommand) -> Result<()> {
        self.notice = None;
        let result = self.execute(command).await;
        self.settle();
        if let Err(e) = &result {
            warn!(error = %e, "Command failed");
            self.notice = Some(e.to_string());
        }
        result
    }

    async fn execute(&mut self, command: UiCommand) -> Result<()> {
        match command {
            UiCommand::Authenticate {
                mode,
                email,
                password,
            } => {
                if self.nav.active() != Screen::Auth {
                    return Err(ClientError::NotMounted(Screen::Auth));
                }
                if self.auth_form.is_loading() {
                    return Err(ClientError::WriteInFlight);
                }
                self.auth_form.fill(mode, &email, &password);
                // Navigation follows the listener notification, not this result.
                if let Some(credentials) = self.auth_form.begin() {
                    let auth = self.session.auth().clone();
                    self.writes
                        .spawn(None, credentials.send(auth), WriteOutcome::Auth);
                }
                Ok(())
            }
            UiCommand::Navigate(action) => self.navigate(action),
            UiCommand::Send(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(ClientError::InputRequired("Message"));
                }
                let author = self.author()?;
                let Mounted::Chat { screen, .. } = &mut self.mounted else {
                    return Err(ClientError::NotMounted(Screen::Chat));
                };
                let push = screen.messages.start_append(ChatMessage::new(author, text))?;
                self.writes
                    .spawn(screen.messages.listener(), push, WriteOutcome::Message);
                Ok(())
            }
            UiCommand::Save(text) => {
                let Mounted::Chat { screen, .. } = &mut self.mounted else {
                    return Err(ClientError::NotMounted(Screen::Chat));
                };
                if screen.saved.saving() {
                    return Err(ClientError::WriteInFlight);
                }
                screen.saved.set_draft(text);
                let write = screen.saved.start_submit()?;
                self.writes
                    .spawn(screen.saved.listener(), write, WriteOutcome::SavedMessage);
                Ok(())
            }
            UiCommand::Caption { slot, text } => {
                let Mounted::Primary { screen, .. } = &mut self.mounted else {
                    return Err(ClientError::NotMounted(Screen::Primary));
                };
                screen.composer.set_caption(slot, &text);
                Ok(())
            }
            UiCommand::Attach(path) => {
                if !matches!(self.mounted, Mounted::Primary { .. }) {
                    return Err(ClientError::NotMounted(Screen::Primary));
                }
                let data = tokio::fs::read(&path).await?;
                debug!(path = %path.display(), size = data.len(), "Image attached");
                if let Mounted::Primary { screen, .. } = &mut self.mounted {
                    screen.composer.attach(Bytes::from(data));
                }
                Ok(())
            }
            UiCommand::Publish => {
                let Mounted::Primary { screen, .. } = &mut self.mounted else {
                    return Err(ClientError::NotMounted(Screen::Primary));
                };
                let upload = screen
                    .composer
                    .start_upload(self.files.clone(), &screen.memes)?;
                self.writes
                    .spawn(screen.memes.listener(), upload, WriteOutcome::Upload);
                Ok(())
            }
            UiCommand::Help | UiCommand::Quit => Ok(()),
        }
    }

    fn navigate(&mut self, action: UserAction) -> Result<()> {
        let effect = self.nav.apply(action, self.session.is_signed_in())?;
        self.reconcile();
        if effect == NavEffect::SignOut {
            let auth = self.session.auth().clone();
            self.writes.spawn(
                None,
                async move { auth.sign_out().await },
                |()| WriteOutcome::SignOut,
            );
        }
        Ok(())
    }

    /// Hand a write outcome to the view that started it. Outcomes for views
    /// unmounted in the meantime are dropped.
    fn finish_write(&mut self, done: WriteDone) {
        let WriteDone { view, outcome } = done;
        let author = self.author().ok();

        match (outcome, &mut self.mounted) {
            (WriteOutcome::Auth(outcome), _) => {
                self.auth_form.finish(outcome);
            }
            (WriteOutcome::SignOut, _) => debug!("Sign-out finished"),
            (WriteOutcome::Message(outcome), Mounted::Chat { screen, .. })
                if screen.messages.listener() == view =>
            {
                screen.messages.finish_append(outcome);
            }
            (WriteOutcome::SavedMessage(outcome), Mounted::Chat { screen, .. })
                if screen.saved.listener() == view =>
            {
                screen.saved.finish_write(outcome);
            }
            (WriteOutcome::Upload(outcome), Mounted::Primary { screen, .. })
                if screen.memes.listener() == view =>
            {
                // Primary is only mounted with an identity.
                let author = author.unwrap_or_default();
                let Some(record) = screen.composer.finish_upload(outcome, &author) else {
                    return;
                };
                match screen.memes.start_append(record) {
                    Ok(push) => self
                        .writes
                        .spawn(screen.memes.listener(), push, WriteOutcome::Meme),
                    Err(e) => {
                        warn!(error = %e, "Meme not recorded");
                        self.notice = Some(e.to_string());
                    }
                }
            }
            (WriteOutcome::Meme(outcome), Mounted::Primary { screen, .. })
                if screen.memes.listener() == view =>
            {
                screen.memes.finish_append(outcome);
            }
            (outcome, _) => {
                debug!(?view, ?outcome, "Dropping write outcome for unmounted view");
            }
        }
    }

    fn author(&self) -> Result<String> {
        self.session
            .identity()
            .map(|identity| identity.label().to_string())
            .ok_or(ClientError::NotMounted(Screen::Auth))
    }

    /// Re-derive the active screen and swap the mounted views if needed.
    fn reconcile(&mut self) {
        let identity = self.identity.borrow_and_update().clone();
        self.nav.sync(identity.is_some());
        let active = self.nav.active();
        let uid = identity.as_ref().map(|i| &i.uid);

        if self.mounted.matches(active, uid) {
            return;
        }
        self.mounted.unmount();

        let Some(Identity { uid, .. }) = identity else {
            return;
        };
        if !needs_views(active) {
            return;
        }

        let mounted = match active {
            Screen::Chat => ChatScreen::mount(&self.store, &self.config, &uid, &self.store_tx)
                .map(|screen| Mounted::Chat { owner: uid.clone(), screen }),
            _ => PrimaryScreen::mount(&self.store, &self.config, &uid, &self.store_tx)
                .map(|screen| Mounted::Primary { owner: uid.clone(), screen }),
        };
        match mounted {
            Ok(mounted) => {
                debug!(screen = %active, uid = %uid, "Views mounted");
                self.mounted = mounted;
            }
            Err(e) => {
                let e = ClientError::from(e);
                warn!(screen = %active, error = %e, "Cannot mount views");
                self.notice = Some(e.to_string());
            }
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn active_screen(&self) -> Screen {
        self.nav.active()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    pub fn auth_form(&self) -> &AuthForm {
        &self.auth_form
    }

    pub fn mounted(&self) -> &Mounted<S> {
        &self.mounted
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

impl<A: AuthProvider, S: RemoteStore, F: FileStorage> Drop for App<A, S, F> {
    fn drop(&mut self) {
        self.mounted.unmount();
    }
}
