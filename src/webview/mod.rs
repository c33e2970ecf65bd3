//! Platform webview abstraction.
//!
//! The SDK never talks to a concrete webview directly. The embedding
//! application implements [`WebViewSurface`] over its platform web renderer
//! and [`HostSurfaceProvider`] over its window lookup, and the session
//! controller drives both through trait objects. Tests substitute fakes.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Script the platform layer injects at document start. It forwards every
/// `window` message carrying a `type` field into the native message handler
/// and seeds the `window.Assembled` namespace the widget expects.
pub const BRIDGE_BOOTSTRAP_SCRIPT: &str = r#"(function() {
    window.addEventListener('message', function(event) {
        if (event.data && event.data.type) {
            window.__assembledNative.postMessage(event.data);
        }
    });

    if (typeof window.Assembled === 'undefined') {
        window.Assembled = {};
    }
})();"#;

/// Handler invoked for each page-originated message object.
pub type MessageHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// An in-process web rendering area hosting the widget document.
///
/// # Contract
/// - `navigate` starts loading the given document; failures map to
///   [`ChatError::Network`](crate::ChatError::Network).
/// - `post_message` posts a JSON payload into the page's script context
///   (`window.postMessage(<payload>, '*')`); failures map to
///   [`ChatError::Bridge`](crate::ChatError::Bridge).
/// - Implementations inject [`BRIDGE_BOOTSTRAP_SCRIPT`] at document start
///   and call the registered handler once per forwarded message. At most
///   one handler is registered at a time; `set_message_handler` replaces
///   any previous registration.
pub trait WebViewSurface: Send + Sync + 'static {
    /// Navigate the webview to the given document URL.
    fn navigate(&self, url: &Url) -> Result<()>;

    /// Post a serialized JSON message into the page's script context.
    fn post_message(&self, payload: &str) -> Result<()>;

    /// Show or hide the native webview widget.
    fn set_visible(&self, visible: bool);

    /// Register the handler for page-originated messages.
    fn set_message_handler(&self, handler: MessageHandler);

    /// Drop the registered handler so no further messages are delivered.
    fn clear_message_handler(&self);
}

/// Resolves the host window and attaches webview surfaces to it.
///
/// This is the injectable seam over platform window lookup: the production
/// implementation finds the key window and mounts a webview into its view
/// hierarchy; test doubles return a canned surface or `None`.
#[async_trait]
pub trait HostSurfaceProvider: Send + Sync + 'static {
    /// Attach a fresh webview surface to the host window.
    ///
    /// Returns `None` when no attachment point is available, which fails
    /// the current `initialize()` attempt (and only that attempt).
    async fn attach(&self) -> Option<Arc<dyn WebViewSurface>>;

    /// Detach a previously attached surface from the host window.
    fn detach(&self, surface: &Arc<dyn WebViewSurface>);
}
