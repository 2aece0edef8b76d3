//! Screen state machine.
//!
//! The screen the user asked for is only a request. The active screen is
//! derived from it and from the latest identity on every update: without an
//! identity the active screen is always `Auth`, whatever was requested.

use tracing::{info, warn};

use makeitmeme_shared::Screen;

use crate::config::NavLayout;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Play,
    Chat,
    Back,
    Logout,
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UserAction::Play => "play",
            UserAction::Chat => "chat",
            UserAction::Back => "go back",
            UserAction::Logout => "log out",
        };
        f.write_str(name)
    }
}

/// Side effect the caller must carry out after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEffect {
    None,
    /// Ask the auth provider to sign out. The screen only moves to `Auth`
    /// once the provider reports the identity gone.
    SignOut,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    layout: NavLayout,
    requested: Screen,
    active: Screen,
}

impl Navigator {
    pub fn new(layout: NavLayout, signed_in: bool) -> Self {
        let mut nav = Self {
            layout,
            requested: Self::home(layout),
            active: Screen::Auth,
        };
        nav.sync(signed_in);
        nav
    }

    fn home(layout: NavLayout) -> Screen {
        match layout {
            NavLayout::Full => Screen::Menu,
            NavLayout::Reduced => Screen::Primary,
        }
    }

    /// First screen shown after signing in.
    pub fn default_screen(&self) -> Screen {
        Self::home(self.layout)
    }

    pub fn layout(&self) -> NavLayout {
        self.layout
    }

    pub fn active(&self) -> Screen {
        self.active
    }

    fn allowed(&self, screen: Screen) -> bool {
        match self.layout {
            NavLayout::Full => screen.is_authenticated(),
            NavLayout::Reduced => screen == Screen::Primary,
        }
    }

    /// Recompute the active screen from the latest identity presence.
    /// Returns the `(from, to)` pair if the active screen changed.
    pub fn sync(&mut self, signed_in: bool) -> Option<(Screen, Screen)> {
        let next = if !signed_in {
            // The next sign-in starts from the home screen.
            self.requested = self.default_screen();
            Screen::Auth
        } else if self.allowed(self.requested) {
            self.requested
        } else {
            self.default_screen()
        };

        if next == self.active {
            return None;
        }
        let from = self.active;
        self.active = next;
        info!(%from, to = %next, "Screen changed");
        Some((from, next))
    }

    /// Apply a user action, then re-derive the active screen.
    pub fn apply(&mut self, action: UserAction, signed_in: bool) -> Result<NavEffect> {
        let from = self.active;
        let full = self.layout == NavLayout::Full;

        let (target, effect) = match (action, from) {
            (_, Screen::Auth) => return Err(self.reject(action)),
            (UserAction::Play, Screen::Menu) if full => (Screen::Primary, NavEffect::None),
            (UserAction::Chat, Screen::Menu) if full => (Screen::Chat, NavEffect::None),
            (UserAction::Back, Screen::Primary | Screen::Chat) if full => {
                (Screen::Menu, NavEffect::None)
            }
            (UserAction::Logout, _) => (self.default_screen(), NavEffect::SignOut),
            _ => return Err(self.reject(action)),
        };

        self.requested = target;
        self.sync(signed_in);
        Ok(effect)
    }

    fn reject(&self, action: UserAction) -> ClientError {
        warn!(from = %self.active, %action, "Transition rejected");
        ClientError::InvalidTransition {
            from: self.active,
            action,
        }
    }
}
