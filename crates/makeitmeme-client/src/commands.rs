//! Console shell commands.

use std::path::PathBuf;

use crate::auth_form::AuthMode;
use crate::composer::CaptionSlot;
use crate::error::ClientError;
use crate::navigation::UserAction;

pub const HELP: &str = "\
Commands:
  signup <email> <password>     create an account
  signin <email> <password>     sign in
  play | chat | back | logout   navigate
  send <text>                   post to the chat
  save <text>                   replace your saved message
  caption top|bottom <text>     set a meme caption
  attach <file>                 attach an image to the meme
  publish                       upload the meme
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Authenticate {
        mode: AuthMode,
        email: String,
        password: String,
    },
    Navigate(UserAction),
    Send(String),
    Save(String),
    Caption { slot: CaptionSlot, text: String },
    Attach(PathBuf),
    Publish,
    Help,
    Quit,
}

impl std::str::FromStr for UiCommand {
    type Err = ClientError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "signup" | "signin" => {
                let mut args = rest.split_whitespace();
                let (Some(email), Some(password)) = (args.next(), args.next()) else {
                    return Err(ClientError::InputRequired("Email and password"));
                };
                let mode = if verb.eq_ignore_ascii_case("signup") {
                    AuthMode::SignUp
                } else {
                    AuthMode::SignIn
                };
                UiCommand::Authenticate {
                    mode,
                    email: email.to_string(),
                    password: password.to_string(),
                }
            }
            "play" => UiCommand::Navigate(UserAction::Play),
            "chat" => UiCommand::Navigate(UserAction::Chat),
            "back" => UiCommand::Navigate(UserAction::Back),
            "logout" => UiCommand::Navigate(UserAction::Logout),
            "send" => UiCommand::Send(rest.to_string()),
            "save" => UiCommand::Save(rest.to_string()),
            "caption" => {
                let (slot, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                UiCommand::Caption {
                    slot: slot.parse()?,
                    text: text.trim().to_string(),
                }
            }
            "attach" if !rest.is_empty() => UiCommand::Attach(PathBuf::from(rest)),
            "attach" => return Err(ClientError::InputRequired("File path")),
            "publish" => UiCommand::Publish,
            "help" | "?" => UiCommand::Help,
            "quit" | "exit" => UiCommand::Quit,
            _ => return Err(ClientError::UnknownCommand(line.to_string())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_commands() {
        let cmd: UiCommand = "signup ana@example.com secret1".parse().unwrap();
        assert_eq!(
            cmd,
            UiCommand::Authenticate {
                mode: AuthMode::SignUp,
                email: "ana@example.com".into(),
                password: "secret1".into(),
            }
        );
        assert!(matches!(
            "signin ana@example.com".parse::<UiCommand>(),
            Err(ClientError::InputRequired(_))
        ));
    }

    #[test]
    fn test_parse_text_keeps_spaces() {
        let cmd: UiCommand = "send  hello   there ".parse().unwrap();
        assert_eq!(cmd, UiCommand::Send("hello   there".into()));

        let cmd: UiCommand = "caption bottom much wow".parse().unwrap();
        assert_eq!(
            cmd,
            UiCommand::Caption {
                slot: CaptionSlot::Bottom,
                text: "much wow".into()
            }
        );
    }

    #[test]
    fn test_parse_navigation() {
        assert_eq!(
            "BACK".parse::<UiCommand>().unwrap(),
            UiCommand::Navigate(UserAction::Back)
        );
        assert!(matches!(
            "dance".parse::<UiCommand>(),
            Err(ClientError::UnknownCommand(_))
        ));
    }
}
