//! Plain-text rendering of the active screen for the console shell.

use std::fmt::Write;

use makeitmeme_shared::constants::{APP_NAME, LOADING_LABEL};
use makeitmeme_shared::{AuthProvider, FileStorage, Record, RemoteStore, Screen};

use crate::app::App;
use crate::state::Mounted;
use crate::sync::{CollectionView, MirrorEntry};

const RULE: &str = "----------------------------------------";

impl<A: AuthProvider, S: RemoteStore, F: FileStorage> App<A, S, F> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let who = self
            .identity()
            .map(|identity| identity.label().to_string())
            .unwrap_or_else(|| "signed out".to_string());
        let _ = writeln!(out, "{RULE}\n{APP_NAME} :: {} ({who})", self.active_screen());

        match (self.active_screen(), self.mounted()) {
            (Screen::Auth, _) => self.render_auth(&mut out),
            (Screen::Menu, _) => {
                let _ = writeln!(out, "  play     make a meme");
                let _ = writeln!(out, "  chat     talk to everyone");
                let _ = writeln!(out, "  logout");
            }
            (Screen::Chat, Mounted::Chat { screen, .. }) => {
                render_collection(&mut out, &screen.messages, |m| m.text.clone());
                let _ = writeln!(out, "{RULE}");
                let saving = if screen.saved.saving() { " (saving...)" } else { "" };
                let _ = writeln!(out, "My message: {}{saving}", screen.saved.display());
                if let Some(banner) = screen.saved.error_banner() {
                    let _ = writeln!(out, "! {banner}");
                }
            }
            (Screen::Primary, Mounted::Primary { screen, .. }) => {
                render_collection(&mut out, &screen.memes, |m| {
                    format!("[{} / {}] {}", m.top_text, m.bottom_text, m.image_url)
                });
                let composer = &screen.composer;
                let _ = writeln!(out, "{RULE}");
                let _ = writeln!(out, "  top:    {}", composer.top_text());
                let _ = writeln!(out, "  bottom: {}", composer.bottom_text());
                match composer.image_size() {
                    Some(size) => {
                        let _ = writeln!(out, "  image:  {size} bytes");
                    }
                    None => {
                        let _ = writeln!(out, "  image:  none (attach <file>)");
                    }
                }
                if composer.is_uploading() {
                    let _ = writeln!(out, "  uploading...");
                }
                if let Some(error) = composer.error() {
                    let _ = writeln!(out, "! {error}");
                }
            }
            (screen, _) => {
                let _ = writeln!(out, "({screen} is not available)");
            }
        }

        if let Some(notice) = self.notice() {
            let _ = writeln!(out, "! {notice}");
        }
        out
    }

    fn render_auth(&self, out: &mut String) {
        let form = self.auth_form();
        if !form.email.is_empty() {
            let _ = writeln!(out, "  email: {}", form.email);
        }
        if form.is_loading() {
            let _ = writeln!(out, "  {LOADING_LABEL}");
        }
        if let Some(message) = form.message() {
            let _ = writeln!(out, "! {message}");
        }
        let _ = writeln!(out, "  signin <email> <password> | signup <email> <password>");
    }
}

fn render_collection<S, R>(
    out: &mut String,
    view: &CollectionView<S, R>,
    line: impl Fn(&R) -> String,
) where
    S: RemoteStore,
    R: Record,
{
    if !view.is_loaded() && view.is_empty() {
        let _ = writeln!(out, "  {LOADING_LABEL}");
    } else if view.is_empty() {
        let _ = writeln!(out, "  (empty)");
    }
    for entry in view.entries() {
        let record = &entry.record;
        let _ = writeln!(
            out,
            "  {} {}: {}{}",
            record.created_at().format("%H:%M"),
            record.author(),
            line(record),
            pending_mark(entry)
        );
    }
    if view.in_flight() {
        let _ = writeln!(out, "  sending...");
    }
    if let Some(banner) = view.error_banner() {
        let _ = writeln!(out, "! {banner}");
    }
}

fn pending_mark<R>(entry: &MirrorEntry<R>) -> &'static str {
    if entry.is_pending() {
        " (unconfirmed)"
    } else {
        ""
    }
}
