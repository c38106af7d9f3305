pub mod message;
pub mod notifier;

pub use message::{escape_html, render_message, MAX_NAME_CHARS};
pub use notifier::{build_notifier, TelegramInitError, TelegramNotifier};
