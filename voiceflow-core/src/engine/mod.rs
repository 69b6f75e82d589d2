//! `VoiceflowEngine`: lifecycle controller and dispatch actor.
//!
//! ## Lifecycle
//!
//! ```text
//! VoiceflowEngine::new()
//!     └─► start()     → dispatch task spawned, status = Running
//!         └─► stop()  → Shutdown queued, status = Stopped
//! ```
//!
//! `start()`/`stop()` return an error in the wrong state rather than
//! panicking. The engine may be restarted after `stop()`; a restart begins
//! with fresh utterance and session state.
//!
//! ## Threading
//!
//! All recognition state lives in one `TurnDispatcher` owned by a single
//! tokio task. Provider events, force-end requests and mode changes reach it
//! through an unbounded channel; deferred work is driven by sleeping until
//! the dispatcher's next deadline. Nothing else touches dispatcher state, so
//! no locks are held across decisions.

pub mod dispatcher;
pub mod resolver;
pub mod scheduler;
pub mod session;

pub use dispatcher::{DiagnosticsSnapshot, DispatchDiagnostics, DispatcherContext, TurnDispatcher};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::{
    automation::AutomationHandle,
    config::SettingsHandle,
    error::{Result, VoiceflowError},
    ipc::events::{
        EngineEvent, EngineStatus, EngineStatusEvent, ListeningMode, ProviderEvent,
        TranscriptTurn,
    },
    provider::ProviderHandle,
};

/// Broadcast channel capacity: 256 engine events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Messages accepted by the dispatch task.
#[derive(Debug)]
pub enum EngineInput {
    Provider(ProviderEvent),
    ForceEnd { submit: bool },
    SetMode(ListeningMode),
    ClearSession,
    Shutdown,
}

/// Shared status cell plus its broadcast sender.
#[derive(Clone)]
struct StatusReporter {
    status: Arc<Mutex<EngineStatus>>,
    tx: broadcast::Sender<EngineStatusEvent>,
}

impl StatusReporter {
    fn set(&self, new_status: EngineStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.tx.send(EngineStatusEvent {
            status: new_status,
            detail,
        });
    }
}

/// The top-level engine handle.
///
/// `VoiceflowEngine` is `Send + Sync`; wrap it in an `Arc` to share it with
/// provider adapters and UI forwarding tasks.
pub struct VoiceflowEngine {
    settings: SettingsHandle,
    automation: AutomationHandle,
    provider: Option<ProviderHandle>,
    /// `true` while the dispatch task is alive.
    running: Arc<AtomicBool>,
    status: StatusReporter,
    event_tx: broadcast::Sender<EngineEvent>,
    input_tx: Mutex<Option<mpsc::UnboundedSender<EngineInput>>>,
    diagnostics: Arc<DispatchDiagnostics>,
}

impl VoiceflowEngine {
    /// Create an engine. Nothing runs until `start()`.
    pub fn new(
        settings: SettingsHandle,
        automation: AutomationHandle,
        provider: Option<ProviderHandle>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            settings,
            automation,
            provider,
            running: Arc::new(AtomicBool::new(false)),
            status: StatusReporter {
                status: Arc::new(Mutex::new(EngineStatus::Idle)),
                tx: status_tx,
            },
            event_tx,
            input_tx: Mutex::new(None),
            diagnostics: Arc::new(DispatchDiagnostics::default()),
        }
    }

    /// Spawn the dispatch task on the current tokio runtime.
    ///
    /// # Errors
    /// - `VoiceflowError::AlreadyRunning` if already started.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(VoiceflowError::AlreadyRunning);
        }
        self.diagnostics.reset();

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        *self.input_tx.lock() = Some(input_tx);

        let dispatcher = TurnDispatcher::new(DispatcherContext {
            settings: self.settings.clone(),
            automation: self.automation.clone(),
            provider: self.provider.clone(),
            event_tx: self.event_tx.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
        });
        let running = Arc::clone(&self.running);
        let status = self.status.clone();
        let event_tx = self.event_tx.clone();

        self.status.set(EngineStatus::Running, None);
        tokio::spawn(async move {
            run(dispatcher, input_rx, status, event_tx).await;
            running.store(false, Ordering::SeqCst);
            debug!("dispatch task exited");
        });
        info!("engine started");
        Ok(())
    }

    /// Stop the dispatch task. Queued inputs ahead of the stop are still
    /// processed; pending timers are dropped.
    ///
    /// # Errors
    /// - `VoiceflowError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        let Some(tx) = self.input_tx.lock().take() else {
            return Err(VoiceflowError::NotRunning);
        };
        if !self.running.load(Ordering::SeqCst) {
            return Err(VoiceflowError::NotRunning);
        }
        let _ = tx.send(EngineInput::Shutdown);
        self.status.set(EngineStatus::Stopped, None);
        info!("engine stop requested");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> EngineStatus {
        *self.status.status.lock()
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Queue an input for the dispatch task.
    ///
    /// # Errors
    /// - `VoiceflowError::NotRunning` before `start()` or after `stop()`.
    /// - `VoiceflowError::EngineGone` if the task has exited on its own.
    pub fn send(&self, input: EngineInput) -> Result<()> {
        let guard = self.input_tx.lock();
        let tx = guard.as_ref().ok_or(VoiceflowError::NotRunning)?;
        tx.send(input).map_err(|_| VoiceflowError::EngineGone)
    }

    pub fn push_provider_event(&self, event: ProviderEvent) -> Result<()> {
        self.send(EngineInput::Provider(event))
    }

    pub fn push_turn(&self, turn: TranscriptTurn) -> Result<()> {
        self.push_provider_event(ProviderEvent::Turn(turn))
    }

    /// End the current utterance now. With `submit`, Enter follows the flush.
    pub fn force_end(&self, submit: bool) -> Result<()> {
        self.send(EngineInput::ForceEnd { submit })
    }

    pub fn set_mode(&self, mode: ListeningMode) -> Result<()> {
        self.send(EngineInput::SetMode(mode))
    }

    pub fn clear_session(&self) -> Result<()> {
        self.send(EngineInput::ClearSession)
    }

    /// Forward captured audio to the provider. Pass-through only; the engine
    /// never inspects samples.
    pub fn push_audio(&self, samples: &[f32]) -> Result<()> {
        match &self.provider {
            Some(provider) => provider.0.lock().push_audio(samples),
            None => Ok(()),
        }
    }

    /// Subscribe to engine decisions (typed dictation, commands, modes).
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Subscribe to live status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatusEvent> {
        self.status.tx.subscribe()
    }

    /// Snapshot of dispatch counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}

/// Dispatch loop. Returns on `Shutdown` or when every sender is gone.
async fn run(
    mut dispatcher: TurnDispatcher,
    mut input_rx: mpsc::UnboundedReceiver<EngineInput>,
    status: StatusReporter,
    event_tx: broadcast::Sender<EngineEvent>,
) {
    loop {
        let deadline = dispatcher.next_deadline();
        tokio::select! {
            input = input_rx.recv() => {
                let Some(input) = input else { break };
                let now = Instant::now();
                match input {
                    EngineInput::Shutdown => break,
                    EngineInput::Provider(event) => {
                        handle_provider_event(&mut dispatcher, event, now, &status, &event_tx)
                    }
                    EngineInput::ForceEnd { submit } => dispatcher.force_end(submit, now),
                    EngineInput::SetMode(mode) => dispatcher.set_mode(mode),
                    EngineInput::ClearSession => dispatcher.clear_session(),
                }
            }
            at = wait_until(deadline) => {
                dispatcher.fire_due(Instant::now().max(at));
            }
        }
    }
}

fn handle_provider_event(
    dispatcher: &mut TurnDispatcher,
    event: ProviderEvent,
    now: Instant,
    status: &StatusReporter,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    match event {
        ProviderEvent::Turn(turn) => dispatcher.handle_turn(&turn, now),
        ProviderEvent::Connected => {
            info!("provider connected");
            if *status.status.lock() == EngineStatus::Error {
                status.set(EngineStatus::Running, None);
            }
        }
        ProviderEvent::Disconnected { reason } => {
            warn!(reason = reason.as_deref().unwrap_or("none"), "provider disconnected");
        }
        ProviderEvent::Error { message } => {
            error!("provider error: {message}");
            let _ = event_tx.send(EngineEvent::ProviderError {
                message: message.clone(),
            });
            status.set(EngineStatus::Error, Some(message));
        }
    }
}

async fn wait_until(deadline: Option<Instant>) -> Instant {
    match deadline {
        Some(at) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await;
            at
        }
        None => std::future::pending().await,
    }
}
