//! Top-level chat session controller.
//!
//! [`AssembledChat`] drives the initialization state machine
//! (`Uninitialized → Initializing → Ready`, back to `Uninitialized` via
//! [`teardown`](AssembledChat::teardown)) and guards the operation set
//! behind the Ready phase. Construction is cheap; nothing touches the
//! platform until [`initialize`](AssembledChat::initialize).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::ChatConfiguration;
use crate::error::{ChatError, Result};
use crate::listener::ChatListener;
use crate::model::UserData;
use crate::surface::ChatSurface;
use crate::webview::HostSurfaceProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    /// An initialize() attempt is in flight, identified by its request
    /// token. A token observed stale means the attempt was superseded or
    /// torn down and its completion must be discarded.
    Initializing(Uuid),
    Ready,
}

struct SessionState {
    phase: Phase,
    surface: Option<Arc<ChatSurface>>,
}

/// A chat session over one embedded widget surface.
///
/// ```rust,ignore
/// let chat = AssembledChat::new(
///     ChatConfiguration::new("your-company-id"),
///     host_provider,
///     ChatListener::new().on_loaded(|| tracing::info!("ready")),
/// );
/// chat.initialize().await?;
/// chat.open();
/// ```
pub struct AssembledChat {
    configuration: ChatConfiguration,
    host: Arc<dyn HostSurfaceProvider>,
    listener: Arc<ChatListener>,
    state: Mutex<SessionState>,
    /// Serializes concurrent initialize() attempts so the loser observes
    /// the winner's Ready state instead of attaching a second surface.
    init_lock: AsyncMutex<()>,
    /// Debug preference recorded before any surface exists.
    pending_debug: Mutex<Option<bool>>,
}

impl AssembledChat {
    pub const DEFAULT_INITIALIZATION_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        configuration: ChatConfiguration,
        host: Arc<dyn HostSurfaceProvider>,
        listener: ChatListener,
    ) -> Self {
        Self {
            configuration,
            host,
            listener: Arc::new(listener),
            state: Mutex::new(SessionState {
                phase: Phase::Uninitialized,
                surface: None,
            }),
            init_lock: AsyncMutex::new(()),
            pending_debug: Mutex::new(None),
        }
    }

    /// Construct a session with default configuration for a company id.
    pub fn with_company_id(
        company_id: impl Into<String>,
        host: Arc<dyn HostSurfaceProvider>,
        listener: ChatListener,
    ) -> Self {
        Self::new(ChatConfiguration::new(company_id), host, listener)
    }

    pub fn configuration(&self) -> &ChatConfiguration {
        &self.configuration
    }

    /// Whether the session reached Ready and operations may be issued.
    pub fn is_ready(&self) -> bool {
        self.state.lock().phase == Phase::Ready
    }

    /// Initialize with [`Self::DEFAULT_INITIALIZATION_TIMEOUT`].
    pub async fn initialize(&self) -> Result<()> {
        self.initialize_with_timeout(Self::DEFAULT_INITIALIZATION_TIMEOUT)
            .await
    }

    /// Attach the widget surface to the host window, load the remote
    /// document and wait for its first Loaded signal.
    ///
    /// Returns immediately when already Ready. Fails with
    /// [`ChatError::InitializationFailed`] when no host window is
    /// available and with [`ChatError::Timeout`] when the Loaded signal
    /// does not arrive within `timeout`; the partial surface is torn down
    /// and the session returns to Uninitialized.
    pub async fn initialize_with_timeout(&self, timeout: Duration) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        if self.is_ready() {
            return Ok(());
        }

        let token = Uuid::new_v4();
        self.state.lock().phase = Phase::Initializing(token);
        tracing::info!(%token, company_id = %self.configuration.company_id, "initializing chat session");

        match tokio::time::timeout(timeout, self.attach_and_load(token)).await {
            Ok(Ok(())) => {
                tracing::info!("chat session ready");
                Ok(())
            }
            Ok(Err(e)) => {
                self.abandon_attempt(token);
                Err(e)
            }
            Err(_) => {
                tracing::warn!(?timeout, "chat initialization timed out");
                self.abandon_attempt(token);
                Err(ChatError::Timeout)
            }
        }
    }

    async fn attach_and_load(&self, token: Uuid) -> Result<()> {
        let Some(webview) = self.host.attach().await else {
            return Err(ChatError::InitializationFailed(
                "no host window available".to_string(),
            ));
        };

        let surface = ChatSurface::new(
            self.configuration.clone(),
            webview.clone(),
            self.listener.clone(),
        );

        // Register the surface while still Initializing so a concurrent
        // teardown (or this attempt's timeout) can reach it.
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Initializing(token) {
                drop(state);
                surface.teardown();
                self.host.detach(&webview);
                return Err(Self::cancelled());
            }
            state.surface = Some(surface.clone());
        }

        if let Some(debug) = *self.pending_debug.lock() {
            surface.set_debug(debug);
        }

        surface.load()?;
        surface.wait_loaded().await?;

        let mut state = self.state.lock();
        if state.phase == Phase::Initializing(token) {
            state.phase = Phase::Ready;
            Ok(())
        } else {
            Err(Self::cancelled())
        }
    }

    /// Roll back a failed or timed-out attempt, unless the token already
    /// belongs to someone else.
    fn abandon_attempt(&self, token: Uuid) {
        let surface = {
            let mut state = self.state.lock();
            if state.phase != Phase::Initializing(token) {
                return;
            }
            state.phase = Phase::Uninitialized;
            state.surface.take()
        };

        if let Some(surface) = surface {
            surface.teardown();
            self.host.detach(surface.webview());
        }
    }

    fn cancelled() -> ChatError {
        ChatError::InitializationFailed("initialization attempt was cancelled".to_string())
    }

    fn ready_surface(&self) -> Option<Arc<ChatSurface>> {
        let state = self.state.lock();
        match state.phase {
            Phase::Ready => state.surface.clone(),
            _ => None,
        }
    }

    /// Open the chat widget. Reports [`ChatError::NotReady`] through the
    /// listener when the session is not initialized.
    pub fn open(&self) {
        match self.ready_surface() {
            Some(surface) => surface.open(),
            None => self.listener.notify_error(&ChatError::NotReady),
        }
    }

    /// Close the chat widget. Reports [`ChatError::NotReady`] through the
    /// listener when the session is not initialized.
    pub fn close(&self) {
        match self.ready_surface() {
            Some(surface) => surface.close(),
            None => self.listener.notify_error(&ChatError::NotReady),
        }
    }

    pub fn show_launcher(&self) {
        match self.ready_surface() {
            Some(surface) => surface.show_launcher(),
            None => self.listener.notify_error(&ChatError::NotReady),
        }
    }

    pub fn hide_launcher(&self) {
        match self.ready_surface() {
            Some(surface) => surface.hide_launcher(),
            None => self.listener.notify_error(&ChatError::NotReady),
        }
    }

    /// Authenticate the current user with a JWT token, optionally
    /// replacing the session user data.
    pub async fn authenticate_user(
        &self,
        jwt_token: &str,
        user_data: Option<UserData>,
    ) -> Result<()> {
        let Some(surface) = self.ready_surface() else {
            return Err(ChatError::NotReady);
        };
        if jwt_token.is_empty() {
            return Err(ChatError::AuthenticationFailed(
                "JWT token must not be empty".to_string(),
            ));
        }
        surface.authenticate_user(jwt_token.to_string(), user_data);
        Ok(())
    }

    /// Replace the user data associated with the chat session. The whole
    /// record is re-sent; the page receives no diffs.
    pub async fn set_user_data(&self, user_data: UserData) -> Result<()> {
        let Some(surface) = self.ready_surface() else {
            return Err(ChatError::NotReady);
        };
        surface.set_user_data(user_data);
        Ok(())
    }

    /// Enable or disable widget debug mode.
    ///
    /// Exempt from the readiness guard: the preference is remembered and
    /// forwarded to whichever surface exists now or is created later.
    pub fn set_debug(&self, debug: bool) {
        *self.pending_debug.lock() = Some(debug);
        let surface = self.state.lock().surface.clone();
        if let Some(surface) = surface {
            surface.set_debug(debug);
        }
    }

    /// Destroy the surface and return to Uninitialized. A subsequent
    /// `initialize()` performs the full attach sequence on a new surface.
    pub fn teardown(&self) {
        let surface = {
            let mut state = self.state.lock();
            state.phase = Phase::Uninitialized;
            state.surface.take()
        };

        if let Some(surface) = surface {
            tracing::info!("tearing down chat session");
            surface.teardown();
            self.host.detach(surface.webview());
        }
    }
}
