//! Embedded surface controller.
//!
//! [`ChatSurface`] owns one webview instance, the message bridge over it, a
//! readiness flag and the FIFO queue of operations issued before the page
//! signaled `Loaded`. All state lives behind one mutex; bridge signals are
//! consumed by a single spawned task, so queue drains and event delivery
//! never interleave.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::bridge::{BridgeSignal, ChatEvent, MessageBridge};
use crate::config::ChatConfiguration;
use crate::error::{ChatError, Result};
use crate::listener::ChatListener;
use crate::model::UserData;
use crate::webview::WebViewSurface;

/// Load phase of the surface, published to the session controller.
///
/// A surface moves `Pending → Loaded` at most once and never back; a fresh
/// `initialize()` after teardown creates a new surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Pending,
    Loaded,
    TornDown,
}

/// Operations deferred until the page is loaded.
#[derive(Debug, Clone)]
enum SurfaceCommand {
    Open,
    Close,
    ShowLauncher,
    HideLauncher,
    Authenticate {
        jwt_token: String,
        user_data: Option<UserData>,
    },
    SetUserData(UserData),
    SetDebug(bool),
}

struct SurfaceState {
    loaded: bool,
    open: bool,
    pending: VecDeque<SurfaceCommand>,
}

/// One embedded widget surface: webview + bridge + pending-operation queue.
pub struct ChatSurface {
    configuration: ChatConfiguration,
    webview: Arc<dyn WebViewSurface>,
    bridge: MessageBridge,
    listener: Arc<ChatListener>,
    state: Mutex<SurfaceState>,
    load_phase: watch::Sender<LoadPhase>,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSurface {
    pub(crate) fn new(
        configuration: ChatConfiguration,
        webview: Arc<dyn WebViewSurface>,
        listener: Arc<ChatListener>,
    ) -> Arc<Self> {
        let bridge = MessageBridge::new(webview.clone());
        let signals = bridge.subscribe();
        let (load_phase, _) = watch::channel(LoadPhase::Pending);

        let surface = Arc::new(Self {
            configuration,
            webview,
            bridge,
            listener,
            state: Mutex::new(SurfaceState {
                loaded: false,
                open: false,
                pending: VecDeque::new(),
            }),
            load_phase,
            event_task: Mutex::new(None),
        });

        let task = tokio::spawn(Self::run_event_loop(Arc::downgrade(&surface), signals));
        *surface.event_task.lock() = Some(task);

        surface
    }

    /// Consume bridge signals on the owning task. Holding only a weak
    /// reference lets a dropped surface end the loop.
    async fn run_event_loop(
        surface: Weak<ChatSurface>,
        mut signals: mpsc::UnboundedReceiver<BridgeSignal>,
    ) {
        while let Some(signal) = signals.recv().await {
            let Some(surface) = surface.upgrade() else {
                break;
            };
            surface.handle_signal(signal);
        }
    }

    fn handle_signal(&self, signal: BridgeSignal) {
        match signal {
            BridgeSignal::Event(ChatEvent::Loaded) => self.mark_loaded(),
            BridgeSignal::Event(ChatEvent::Opened) => {
                self.state.lock().open = true;
                self.webview.set_visible(true);
                self.listener.notify_open();
            }
            BridgeSignal::Event(ChatEvent::Closed) => {
                self.state.lock().open = false;
                self.webview.set_visible(false);
                self.listener.notify_close();
            }
            BridgeSignal::Event(ChatEvent::SettingsLoaded(_)) => {
                tracing::debug!("settings payload received");
            }
            BridgeSignal::Event(ChatEvent::NotificationsReceived(notifications)) => {
                for notification in &notifications {
                    self.listener.notify_notification(notification);
                }
            }
            BridgeSignal::Error(error) => self.listener.notify_error(&error),
        }
    }

    /// Transition to Loaded, drain the queue exactly once in FIFO order,
    /// then notify the owner.
    fn mark_loaded(&self) {
        let drained = {
            let mut state = self.state.lock();
            if state.loaded {
                // The page re-announced itself; the queue is already gone.
                return;
            }
            state.loaded = true;
            std::mem::take(&mut state.pending)
        };

        tracing::info!(queued = drained.len(), "widget document loaded");
        for command in drained {
            self.run(command);
        }

        self.listener.notify_loaded();
        self.load_phase.send_replace(LoadPhase::Loaded);
    }

    /// Run a command now, or queue it until the page is loaded.
    fn execute_when_ready(&self, command: SurfaceCommand) {
        {
            let mut state = self.state.lock();
            if !state.loaded {
                state.pending.push_back(command);
                return;
            }
        }
        self.run(command);
    }

    fn run(&self, command: SurfaceCommand) {
        match command {
            SurfaceCommand::Open => {
                {
                    let mut state = self.state.lock();
                    if state.open {
                        return;
                    }
                    state.open = true;
                }
                self.webview.set_visible(true);
                self.bridge.set_visibility(true);
            }
            SurfaceCommand::Close => {
                {
                    let mut state = self.state.lock();
                    if !state.open {
                        return;
                    }
                    state.open = false;
                }
                self.webview.set_visible(false);
                self.bridge.set_visibility(false);
            }
            SurfaceCommand::ShowLauncher => self.bridge.set_launcher_visibility(true),
            SurfaceCommand::HideLauncher => self.bridge.set_launcher_visibility(false),
            SurfaceCommand::Authenticate {
                jwt_token,
                user_data,
            } => self.bridge.authenticate_user(jwt_token, user_data),
            SurfaceCommand::SetUserData(user_data) => self.bridge.update_user_data(user_data),
            SurfaceCommand::SetDebug(debug) => self.bridge.set_debug(debug),
        }
    }

    /// Navigate the webview to the widget document.
    pub fn load(&self) -> Result<()> {
        let url = self.configuration.document_url()?;
        tracing::info!(%url, "loading widget document");
        self.webview.navigate(&url)
    }

    /// Make the widget visible. A no-op while already open.
    pub fn open(&self) {
        if self.state.lock().open {
            return;
        }
        self.execute_when_ready(SurfaceCommand::Open);
    }

    /// Hide the widget. A no-op while already closed.
    pub fn close(&self) {
        if !self.state.lock().open {
            return;
        }
        self.execute_when_ready(SurfaceCommand::Close);
    }

    pub fn show_launcher(&self) {
        self.execute_when_ready(SurfaceCommand::ShowLauncher);
    }

    pub fn hide_launcher(&self) {
        self.execute_when_ready(SurfaceCommand::HideLauncher);
    }

    pub fn authenticate_user(&self, jwt_token: String, user_data: Option<UserData>) {
        self.execute_when_ready(SurfaceCommand::Authenticate {
            jwt_token,
            user_data,
        });
    }

    pub fn set_user_data(&self, user_data: UserData) {
        self.execute_when_ready(SurfaceCommand::SetUserData(user_data));
    }

    pub fn set_debug(&self, debug: bool) {
        self.execute_when_ready(SurfaceCommand::SetDebug(debug));
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub(crate) fn webview(&self) -> &Arc<dyn WebViewSurface> {
        &self.webview
    }

    /// Wait for the page's first Loaded signal.
    ///
    /// Resolves immediately when already loaded; fails when the surface is
    /// torn down before the signal arrives.
    pub(crate) async fn wait_loaded(&self) -> Result<()> {
        let torn_down =
            || ChatError::InitializationFailed("surface was torn down while loading".to_string());

        let mut phase = self.load_phase.subscribe();
        loop {
            match *phase.borrow_and_update() {
                LoadPhase::Loaded => return Ok(()),
                LoadPhase::TornDown => return Err(torn_down()),
                LoadPhase::Pending => {}
            }
            if phase.changed().await.is_err() {
                return Err(torn_down());
            }
        }
    }

    /// Deregister from the webview, stop the event task and drop any queued
    /// operations. The surface is inert afterwards; a fresh `initialize()`
    /// creates a new one.
    pub(crate) fn teardown(&self) {
        self.bridge.cleanup();
        if let Some(task) = self.event_task.lock().take() {
            task.abort();
        }
        self.state.lock().pending.clear();
        self.load_phase.send_replace(LoadPhase::TornDown);
    }
}
