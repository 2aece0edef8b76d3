/// Application name
pub const APP_NAME: &str = "Make It Meme";

/// Shared chat collection path
pub const DEFAULT_CHAT_PATH: &str = "chat";

/// Root of the per-identity meme collections (`memes/<uid>`)
pub const DEFAULT_MEMES_PATH: &str = "memes";

/// Per-identity saved message slot. `{uid}` is replaced by the user id.
pub const DEFAULT_MESSAGE_PATH: &str = "users/{uid}/message";

/// Placeholder substituted in path templates
pub const UID_PLACEHOLDER: &str = "{uid}";

/// Storage prefix for uploaded meme images
pub const DEFAULT_UPLOAD_PREFIX: &str = "memes";

/// Minimum password length accepted by the auth provider
pub const MIN_PASSWORD_LEN: usize = 6;

/// Maximum uploaded image size in bytes (10 MiB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Default meme captions
pub const DEFAULT_TOP_TEXT: &str = "TOP TEXT";
pub const DEFAULT_BOTTOM_TEXT: &str = "BOTTOM TEXT";

/// Shown when a scalar slot holds no value
pub const NO_MESSAGE_LABEL: &str = "(no message)";

/// Shown when a scalar slot could not be read
pub const UNKNOWN_VALUE_LABEL: &str = "(unknown)";

/// Shown until the first notification arrives
pub const LOADING_LABEL: &str = "Loading...";
