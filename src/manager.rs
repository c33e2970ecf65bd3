//! Observable facade over a chat session.
//!
//! [`ChatManager`] wraps an [`AssembledChat`] and mirrors its event stream
//! into queryable state, so presentation layers (floating buttons, status
//! views) can poll instead of wiring their own listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ChatConfiguration;
use crate::error::{ChatError, Result};
use crate::listener::ChatListener;
use crate::model::{ChatNotification, UserData};
use crate::session::AssembledChat;
use crate::webview::HostSurfaceProvider;

#[derive(Default)]
struct MirroredState {
    loaded: AtomicBool,
    open: AtomicBool,
    last_error: Mutex<Option<ChatError>>,
    notifications: Mutex<Vec<ChatNotification>>,
}

/// Owns one session and tracks its loaded/open/error/notification state.
pub struct ChatManager {
    chat: AssembledChat,
    state: Arc<MirroredState>,
}

impl ChatManager {
    pub fn new(configuration: ChatConfiguration, host: Arc<dyn HostSurfaceProvider>) -> Self {
        let state = Arc::new(MirroredState::default());

        let loaded_state = state.clone();
        let opened_state = state.clone();
        let closed_state = state.clone();
        let error_state = state.clone();
        let notification_state = state.clone();

        let listener = ChatListener::new()
            .on_loaded(move || {
                loaded_state.loaded.store(true, Ordering::SeqCst);
            })
            .on_open(move || {
                opened_state.open.store(true, Ordering::SeqCst);
            })
            .on_close(move || {
                closed_state.open.store(false, Ordering::SeqCst);
            })
            .on_error(move |error| {
                *error_state.last_error.lock() = Some(error.clone());
            })
            .on_notification(move |notification| {
                notification_state
                    .notifications
                    .lock()
                    .push(notification.clone());
            });

        Self {
            chat: AssembledChat::new(configuration, host, listener),
            state,
        }
    }

    pub fn with_company_id(
        company_id: impl Into<String>,
        host: Arc<dyn HostSurfaceProvider>,
    ) -> Self {
        Self::new(ChatConfiguration::new(company_id), host)
    }

    /// The wrapped session, for operations not mirrored here.
    pub fn chat(&self) -> &AssembledChat {
        &self.chat
    }

    pub async fn initialize(&self) -> Result<()> {
        self.chat.initialize().await
    }

    pub fn open(&self) {
        self.chat.open();
    }

    pub fn close(&self) {
        self.chat.close();
    }

    pub async fn authenticate_user(
        &self,
        jwt_token: &str,
        user_data: Option<UserData>,
    ) -> Result<()> {
        self.chat.authenticate_user(jwt_token, user_data).await
    }

    pub async fn set_user_data(&self, user_data: UserData) -> Result<()> {
        self.chat.set_user_data(user_data).await
    }

    pub fn set_debug(&self, debug: bool) {
        self.chat.set_debug(debug);
    }

    pub fn teardown(&self) {
        self.chat.teardown();
    }

    pub fn is_ready(&self) -> bool {
        self.chat.is_ready()
    }

    /// Whether the widget document reported itself loaded.
    pub fn is_loaded(&self) -> bool {
        self.state.loaded.load(Ordering::SeqCst)
    }

    /// Whether the widget is currently visible, native- or page-driven.
    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    /// The most recent error delivered through the listener channel.
    pub fn last_error(&self) -> Option<ChatError> {
        self.state.last_error.lock().clone()
    }

    /// Notifications received so far, oldest first.
    pub fn notifications(&self) -> Vec<ChatNotification> {
        self.state.notifications.lock().clone()
    }

    /// Drop accumulated notifications (e.g. after showing a badge).
    pub fn clear_notifications(&self) {
        self.state.notifications.lock().clear();
    }
}
