//! Listener for chat lifecycle events.

use crate::error::ChatError;
use crate::model::ChatNotification;

/// Receives chat events, errors and notifications.
///
/// Every handler slot is optional; register only the ones you need:
///
/// ```rust,ignore
/// let listener = ChatListener::new()
///     .on_loaded(|| tracing::info!("chat ready"))
///     .on_error(|e| tracing::warn!("chat error: {e}"));
/// ```
#[derive(Default)]
pub struct ChatListener {
    loaded: Option<Box<dyn Fn() + Send + Sync>>,
    opened: Option<Box<dyn Fn() + Send + Sync>>,
    closed: Option<Box<dyn Fn() + Send + Sync>>,
    error: Option<Box<dyn Fn(&ChatError) + Send + Sync>>,
    notification: Option<Box<dyn Fn(&ChatNotification) + Send + Sync>>,
}

impl ChatListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the widget has finished loading and is ready to use.
    pub fn on_loaded(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.loaded = Some(Box::new(handler));
        self
    }

    /// Called when the widget is opened and becomes visible.
    pub fn on_open(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.opened = Some(Box::new(handler));
        self
    }

    /// Called when the widget is closed and becomes hidden.
    pub fn on_close(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.closed = Some(Box::new(handler));
        self
    }

    /// Called when an error occurs in the widget or the bridge.
    pub fn on_error(mut self, handler: impl Fn(&ChatError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(handler));
        self
    }

    /// Called for each chat notification received from the page.
    pub fn on_notification(
        mut self,
        handler: impl Fn(&ChatNotification) + Send + Sync + 'static,
    ) -> Self {
        self.notification = Some(Box::new(handler));
        self
    }

    pub(crate) fn notify_loaded(&self) {
        if let Some(handler) = &self.loaded {
            handler();
        }
    }

    pub(crate) fn notify_open(&self) {
        if let Some(handler) = &self.opened {
            handler();
        }
    }

    pub(crate) fn notify_close(&self) {
        if let Some(handler) = &self.closed {
            handler();
        }
    }

    pub(crate) fn notify_error(&self, error: &ChatError) {
        tracing::warn!("chat error: {error}");
        if let Some(handler) = &self.error {
            handler(error);
        }
    }

    pub(crate) fn notify_notification(&self, notification: &ChatNotification) {
        if let Some(handler) = &self.notification {
            handler(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_registered_handlers_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let loaded_count = count.clone();
        let error_count = count.clone();

        let listener = ChatListener::new()
            .on_loaded(move || {
                loaded_count.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |_| {
                error_count.fetch_add(10, Ordering::SeqCst);
            });

        listener.notify_loaded();
        listener.notify_error(&ChatError::NotReady);
        assert_eq!(count.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_unregistered_handlers_are_noops() {
        let listener = ChatListener::new();
        listener.notify_loaded();
        listener.notify_open();
        listener.notify_close();
        listener.notify_error(&ChatError::Timeout);
    }
}
