//! Typed data model for the widget protocol.

pub mod json;
pub mod notification;
pub mod user;

pub use json::JsonValue;
pub use notification::{ChatNotification, ConversationMessage};
pub use user::UserData;
