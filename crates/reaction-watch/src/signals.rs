//! Signal bridge — turns OS signals into logical reaction events.
//!
//! # Architecture
//!
//! ```text
//! SIGUSR1                       ─┐
//! SIGHUP / SIGINT / SIGTERM /    ├─ SignalBridge ─ mpsc ─▶ dispatch() ─▶ ReactionEngine
//! SIGQUIT                       ─┘
//! ```
//!
//! [`SignalBridge`] owns the OS registration and emits [`SignalEvent`]s.
//! [`dispatch`] consumes them and calls into the engine. The two halves only
//! share the channel, so the engine never sees a raw signal.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::ReactionEngine;

/// Logical events delivered to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// Run the next action now (`SIGUSR1`).
    ForceAction,
    /// Stop gracefully (`SIGHUP`, `SIGINT`, `SIGTERM`, `SIGQUIT`).
    Shutdown,
}

/// OS signal registrations.
#[cfg(unix)]
pub struct SignalBridge {
    force: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalBridge {
    /// Register handlers. Must be called from within a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            force: signal(SignalKind::user_defined1())?,
            hangup: signal(SignalKind::hangup())?,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    /// Wait for the next signal of interest.
    pub async fn next(&mut self) -> Option<SignalEvent> {
        tokio::select! {
            Some(()) = self.force.recv() => Some(SignalEvent::ForceAction),
            Some(()) = self.hangup.recv() => Some(SignalEvent::Shutdown),
            Some(()) = self.interrupt.recv() => Some(SignalEvent::Shutdown),
            Some(()) = self.terminate.recv() => Some(SignalEvent::Shutdown),
            Some(()) = self.quit.recv() => Some(SignalEvent::Shutdown),
            else => None,
        }
    }
}

/// Ctrl-C only; there is no force-action signal off unix.
#[cfg(not(unix))]
pub struct SignalBridge {
    _private: (),
}

#[cfg(not(unix))]
impl SignalBridge {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self { _private: () })
    }

    pub async fn next(&mut self) -> Option<SignalEvent> {
        tokio::signal::ctrl_c().await.ok()?;
        Some(SignalEvent::Shutdown)
    }
}

impl SignalBridge {
    /// Forward events until the receiver goes away or signals stop.
    pub async fn forward(mut self, events: mpsc::Sender<SignalEvent>) {
        while let Some(event) = self.next().await {
            debug!(?event, "signal received");
            if events.send(event).await.is_err() {
                break;
            }
        }
    }
}

/// Route events to the engine until a shutdown event arrives.
///
/// Each force event runs on its own task so the dispatcher stays responsive
/// to shutdown while an action executes. A closed channel is treated as a
/// shutdown. Returns once the engine has stopped.
pub async fn dispatch(engine: Arc<ReactionEngine>, mut events: mpsc::Receiver<SignalEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SignalEvent::ForceAction => {
                info!("next action due to signal");
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine.force_action().await;
                });
            }
            SignalEvent::Shutdown => {
                info!("reaction service exiting gracefully");
                break;
            }
        }
    }

    engine.shutdown().await;
}
