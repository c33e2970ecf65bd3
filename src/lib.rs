//! Embeddable SDK for Assembled's web chat widget.
//!
//! The host application supplies the platform webview behind the
//! [`webview`] traits; this crate supplies the session controller, the
//! embedded surface with its pending-operation queue, and the message
//! bridge that translates between native calls and the widget page's
//! message protocol.

mod bridge;
mod config;
mod error;
mod listener;
mod manager;
mod model;
mod session;
mod surface;
mod webview;


pub use bridge::{ChatEvent, OutboundMessage};
pub use config::{ChatConfiguration, TRUSTED_ORIGIN};
pub use error::{ChatError, Result};
pub use listener::ChatListener;
pub use manager::ChatManager;
pub use model::{ChatNotification, ConversationMessage, JsonValue, UserData};
pub use session::AssembledChat;
pub use surface::ChatSurface;
pub use webview::{HostSurfaceProvider, MessageHandler, WebViewSurface, BRIDGE_BOOTSTRAP_SCRIPT};

/// Initialize logging for embedding applications that do not install
/// their own subscriber. Safe to call more than once.
pub fn init_tracing(debug: bool) {
    let directive = if debug {
        "assembled_chat=debug"
    } else {
        "assembled_chat=info"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .try_init();
}
