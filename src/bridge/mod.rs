//! Message bridge between native operations and the widget page.
//!
//! The bridge is the sole translator across the script boundary: outbound
//! commands are serialized into `type`-tagged JSON and posted into the
//! page; page-originated messages are classified into typed [`ChatEvent`]s
//! and forwarded to the single registered listener.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::model::{ChatNotification, JsonValue, UserData};
use crate::webview::WebViewSurface;

/// Typed events decoded from page-originated messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// The widget document finished loading.
    Loaded,
    /// The widget became visible.
    Opened,
    /// The widget was hidden.
    Closed,
    /// The page delivered its settings payload.
    SettingsLoaded(JsonValue),
    /// The page pushed notifications (possibly none).
    NotificationsReceived(Vec<ChatNotification>),
}

/// What the bridge hands to its listener: a classified event or a
/// bridge-level error.
#[derive(Debug)]
pub enum BridgeSignal {
    Event(ChatEvent),
    Error(ChatError),
}

/// Commands sent into the page, discriminated by `type` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "SET_VISIBILITY", rename_all = "camelCase")]
    SetVisibility { is_visible: bool },

    #[serde(rename = "SET_LAUNCHER_VISIBILITY", rename_all = "camelCase")]
    SetLauncherVisibility { is_visible: bool },

    #[serde(rename = "SET_DEBUG")]
    SetDebug { debug: bool },

    #[serde(rename = "USER_DATA_UPDATE", rename_all = "camelCase")]
    UserDataUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        jwt_token: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_data: Option<UserData>,
    },
}

type SignalSender = mpsc::UnboundedSender<BridgeSignal>;

/// Owns the inbound/outbound channel to one webview surface.
///
/// At most one listener receives signals; the last [`subscribe`] wins.
/// [`cleanup`] deregisters from the webview so a torn-down owner is never
/// called back.
///
/// [`subscribe`]: MessageBridge::subscribe
/// [`cleanup`]: MessageBridge::cleanup
pub struct MessageBridge {
    webview: Arc<dyn WebViewSurface>,
    listener: Arc<Mutex<Option<SignalSender>>>,
}

impl MessageBridge {
    /// Create a bridge over the given webview and register for its
    /// page-originated messages.
    pub fn new(webview: Arc<dyn WebViewSurface>) -> Self {
        let listener: Arc<Mutex<Option<SignalSender>>> = Arc::new(Mutex::new(None));

        let sink = listener.clone();
        webview.set_message_handler(Arc::new(move |raw| {
            if let Some(signal) = classify(&raw) {
                deliver(&sink, signal);
            }
        }));

        Self { webview, listener }
    }

    /// Register the inbound listener, replacing any previous registration.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<BridgeSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.listener.lock() = Some(tx);
        rx
    }

    /// Deregister from the webview and drop the listener. No further
    /// signals are delivered after this returns.
    pub fn cleanup(&self) {
        self.webview.clear_message_handler();
        *self.listener.lock() = None;
    }

    /// Serialize a command and post it into the page.
    ///
    /// Failures are reported through the listener as
    /// [`ChatError::Bridge`]; the command is dropped, not retried.
    pub fn send(&self, message: &OutboundMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                deliver(
                    &self.listener,
                    BridgeSignal::Error(ChatError::Bridge(format!(
                        "failed to serialize message: {e}"
                    ))),
                );
                return;
            }
        };

        tracing::debug!(%payload, "posting message to page");
        if let Err(e) = self.webview.post_message(&payload) {
            deliver(&self.listener, BridgeSignal::Error(e));
        }
    }

    pub fn set_visibility(&self, is_visible: bool) {
        self.send(&OutboundMessage::SetVisibility { is_visible });
    }

    pub fn set_launcher_visibility(&self, is_visible: bool) {
        self.send(&OutboundMessage::SetLauncherVisibility { is_visible });
    }

    pub fn set_debug(&self, debug: bool) {
        self.send(&OutboundMessage::SetDebug { debug });
    }

    pub fn authenticate_user(&self, jwt_token: String, user_data: Option<UserData>) {
        self.send(&OutboundMessage::UserDataUpdate {
            jwt_token: Some(jwt_token),
            user_data,
        });
    }

    pub fn update_user_data(&self, user_data: UserData) {
        self.send(&OutboundMessage::UserDataUpdate {
            jwt_token: None,
            user_data: Some(user_data),
        });
    }
}

impl Drop for MessageBridge {
    fn drop(&mut self) {
        self.webview.clear_message_handler();
    }
}

fn deliver(listener: &Mutex<Option<SignalSender>>, signal: BridgeSignal) {
    if let Some(tx) = listener.lock().as_ref() {
        // The receiver may already be gone during teardown.
        let _ = tx.send(signal);
    }
}

/// Classify a page-originated message by its `type` discriminator.
///
/// Messages without a recognized `type` are silently ignored.
fn classify(raw: &Value) -> Option<BridgeSignal> {
    let message_type = raw.get("type").and_then(Value::as_str)?;

    let event = match message_type {
        "ASSEMBLED_LOADED" => ChatEvent::Loaded,
        "ASSEMBLED_ACTIVE" | "ASSEMBLED_OPEN" => ChatEvent::Opened,
        "ASSEMBLED_INACTIVE" | "ASSEMBLED_CLOSE" => ChatEvent::Closed,
        "ASSEMBLED_LOADED_SETTINGS" => {
            let settings = raw
                .get("settings_and_activation")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(JsonValue::empty_object);
            ChatEvent::SettingsLoaded(settings)
        }
        "ASSEMBLED_NOTIFICATIONS" => {
            // Entries that fail to decode are skipped, never fatal.
            let notifications = raw
                .get("notifications")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            serde_json::from_value::<ChatNotification>(item.clone()).ok()
                        })
                        .collect()
                })
                .unwrap_or_default();
            ChatEvent::NotificationsReceived(notifications)
        }
        "ASSEMBLED_ERROR" => {
            let message = raw
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Some(BridgeSignal::Error(ChatError::Bridge(message.to_string())));
        }
        _ => {
            tracing::debug!(message_type, "ignoring unrecognized page message");
            return None;
        }
    };

    Some(BridgeSignal::Event(event))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::webview::MessageHandler;

    #[derive(Default)]
    struct RecordingWebView {
        posted: Mutex<Vec<Value>>,
        handler: Mutex<Option<MessageHandler>>,
    }

    impl RecordingWebView {
        fn emit(&self, raw: Value) {
            let handler = self.handler.lock().clone();
            if let Some(handler) = handler {
                handler(raw);
            }
        }
    }

    impl WebViewSurface for RecordingWebView {
        fn navigate(&self, _url: &url::Url) -> crate::Result<()> {
            Ok(())
        }

        fn post_message(&self, payload: &str) -> crate::Result<()> {
            self.posted.lock().push(serde_json::from_str(payload).unwrap());
            Ok(())
        }

        fn set_visible(&self, _visible: bool) {}

        fn set_message_handler(&self, handler: MessageHandler) {
            *self.handler.lock() = Some(handler);
        }

        fn clear_message_handler(&self) {
            *self.handler.lock() = None;
        }
    }

    #[test]
    fn test_outbound_wire_shapes() {
        let visibility =
            serde_json::to_value(OutboundMessage::SetVisibility { is_visible: true }).unwrap();
        assert_eq!(visibility, json!({"type": "SET_VISIBILITY", "isVisible": true}));

        let launcher =
            serde_json::to_value(OutboundMessage::SetLauncherVisibility { is_visible: false })
                .unwrap();
        assert_eq!(
            launcher,
            json!({"type": "SET_LAUNCHER_VISIBILITY", "isVisible": false})
        );

        let debug = serde_json::to_value(OutboundMessage::SetDebug { debug: true }).unwrap();
        assert_eq!(debug, json!({"type": "SET_DEBUG", "debug": true}));
    }

    #[test]
    fn test_user_data_update_omits_absent_fields() {
        let message = serde_json::to_value(OutboundMessage::UserDataUpdate {
            jwt_token: Some("jwt-1".into()),
            user_data: None,
        })
        .unwrap();
        assert_eq!(message, json!({"type": "USER_DATA_UPDATE", "jwtToken": "jwt-1"}));

        let message = serde_json::to_value(OutboundMessage::UserDataUpdate {
            jwt_token: None,
            user_data: Some(UserData::new().with_user_id("u-1")),
        })
        .unwrap();
        assert_eq!(
            message,
            json!({"type": "USER_DATA_UPDATE", "userData": {"user_id": "u-1"}})
        );
    }

    #[test]
    fn test_classify_lifecycle_events() {
        let classify_event = |ty: &str| match classify(&json!({ "type": ty })) {
            Some(BridgeSignal::Event(event)) => event,
            other => panic!("expected event for {ty}, got {other:?}"),
        };

        assert_eq!(classify_event("ASSEMBLED_LOADED"), ChatEvent::Loaded);
        assert_eq!(classify_event("ASSEMBLED_ACTIVE"), ChatEvent::Opened);
        assert_eq!(classify_event("ASSEMBLED_OPEN"), ChatEvent::Opened);
        assert_eq!(classify_event("ASSEMBLED_INACTIVE"), ChatEvent::Closed);
        assert_eq!(classify_event("ASSEMBLED_CLOSE"), ChatEvent::Closed);
    }

    #[test]
    fn test_classify_settings_defaults_to_empty_object() {
        let signal = classify(&json!({"type": "ASSEMBLED_LOADED_SETTINGS"})).unwrap();
        match signal {
            BridgeSignal::Event(ChatEvent::SettingsLoaded(settings)) => {
                assert_eq!(settings, JsonValue::empty_object());
            }
            other => panic!("unexpected signal: {other:?}"),
        }

        let signal = classify(&json!({
            "type": "ASSEMBLED_LOADED_SETTINGS",
            "settings_and_activation": {"activated": true}
        }))
        .unwrap();
        match signal {
            BridgeSignal::Event(ChatEvent::SettingsLoaded(JsonValue::Object(map))) => {
                assert_eq!(map["activated"], JsonValue::Bool(true));
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn test_classify_notifications() {
        let signal = classify(&json!({
            "type": "ASSEMBLED_NOTIFICATIONS",
            "notifications": [
                {"external_id": "n1", "state": "unread"},
                {"bogus": true}
            ]
        }))
        .unwrap();

        match signal {
            BridgeSignal::Event(ChatEvent::NotificationsReceived(notifications)) => {
                assert_eq!(notifications.len(), 1);
                assert_eq!(notifications[0].id, "n1");
                assert_eq!(notifications[0].state, "unread");
                assert!(notifications[0].conversation_message.is_none());
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn test_classify_notifications_missing_list_is_empty() {
        let signal = classify(&json!({"type": "ASSEMBLED_NOTIFICATIONS"})).unwrap();
        match signal {
            BridgeSignal::Event(ChatEvent::NotificationsReceived(notifications)) => {
                assert!(notifications.is_empty());
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_message() {
        match classify(&json!({"type": "ASSEMBLED_ERROR", "message": "boom"})) {
            Some(BridgeSignal::Error(ChatError::Bridge(message))) => assert_eq!(message, "boom"),
            other => panic!("unexpected signal: {other:?}"),
        }

        match classify(&json!({"type": "ASSEMBLED_ERROR"})) {
            Some(BridgeSignal::Error(ChatError::Bridge(message))) => {
                assert_eq!(message, "Unknown error");
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn test_classify_ignores_unknown_and_untyped() {
        assert!(classify(&json!({"type": "SOMETHING_ELSE"})).is_none());
        assert!(classify(&json!({"payload": 1})).is_none());
        assert!(classify(&json!("not an object")).is_none());
    }

    #[tokio::test]
    async fn test_inbound_messages_reach_subscriber() {
        let webview = Arc::new(RecordingWebView::default());
        let bridge = MessageBridge::new(webview.clone());
        let mut rx = bridge.subscribe();

        webview.emit(json!({"type": "ASSEMBLED_LOADED"}));
        webview.emit(json!({"type": "ASSEMBLED_ERROR", "message": "boom"}));

        match rx.recv().await.unwrap() {
            BridgeSignal::Event(ChatEvent::Loaded) => {}
            other => panic!("unexpected signal: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            BridgeSignal::Error(ChatError::Bridge(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_last_subscription_wins() {
        let webview = Arc::new(RecordingWebView::default());
        let bridge = MessageBridge::new(webview.clone());

        let mut first = bridge.subscribe();
        let mut second = bridge.subscribe();

        webview.emit(json!({"type": "ASSEMBLED_LOADED"}));

        assert!(second.recv().await.is_some());
        // The superseded listener's channel is closed without delivery.
        assert!(first.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_stops_delivery() {
        let webview = Arc::new(RecordingWebView::default());
        let bridge = MessageBridge::new(webview.clone());
        let mut rx = bridge.subscribe();

        bridge.cleanup();
        webview.emit(json!({"type": "ASSEMBLED_LOADED"}));

        assert!(webview.handler.lock().is_none());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_convenience_senders_produce_wire_messages() {
        let webview = Arc::new(RecordingWebView::default());
        let bridge = MessageBridge::new(webview.clone());

        bridge.set_visibility(true);
        bridge.set_debug(false);
        bridge.authenticate_user("jwt-1".into(), None);

        let posted = webview.posted.lock();
        assert_eq!(posted.len(), 3);
        assert_eq!(posted[0]["type"], "SET_VISIBILITY");
        assert_eq!(posted[1]["type"], "SET_DEBUG");
        assert_eq!(posted[2]["type"], "USER_DATA_UPDATE");
        assert_eq!(posted[2]["jwtToken"], "jwt-1");
    }
}
