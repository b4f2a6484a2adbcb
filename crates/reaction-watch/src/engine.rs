//! Reaction engine — the busy-guarded state machine behind every trigger.
//!
//! ```text
//!            check_and_react (probe fails)
//!   Idle ──────────────────────────────────▶ Running
//!    ▲       force_action                       │
//!    └──────────────────────────────────────────┘ action completes
//!
//!   shutdown: Idle|Running ─▶ ShuttingDown ─▶ Stopped (after in-flight action)
//! ```
//!
//! The rotator lives behind a single `tokio::sync::Mutex`. Triggers take
//! it with `try_lock`, so a trigger that arrives while an action is in
//! flight is dropped rather than queued. Only `shutdown` waits on it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use reaction_core::ReactionConfig;

use crate::error::ActionError;
use crate::probe::{Reachability, TcpProbe};
use crate::rotator::{ActionRotator, ExecutionResult};

/// Lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for a trigger.
    Idle,
    /// An action is executing; new triggers are dropped.
    Running,
    /// Shutdown requested; waiting for the in-flight action.
    ShuttingDown,
    /// Terminal. No trigger is processed.
    Stopped,
}

impl EngineState {
    /// Whether triggers can still start an action.
    pub fn is_accepting(self) -> bool {
        matches!(self, EngineState::Idle | EngineState::Running)
    }
}

/// What a trigger did.
#[derive(Debug)]
pub enum Reaction {
    /// The probe succeeded; nothing ran.
    Healthy,
    /// An action ran (successfully or not).
    Executed(ExecutionResult),
    /// Another action was in flight; the trigger was discarded.
    Dropped,
    /// The engine is shutting down or stopped.
    Stopped,
}

/// Invoked with every completed action, after it has been logged.
pub type ActionObserver = Arc<dyn Fn(&ExecutionResult) + Send + Sync>;

/// Coordinates the probe, the rotator, and the busy state.
///
/// Safe to share behind an `Arc` between the timer task and the signal
/// dispatcher.
pub struct ReactionEngine {
    probe: TcpProbe,
    rotator: Mutex<ActionRotator>,
    state: watch::Sender<EngineState>,
    observer: Option<ActionObserver>,
}

impl ReactionEngine {
    pub fn new(probe: TcpProbe, rotator: ActionRotator) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            probe,
            rotator: Mutex::new(rotator),
            state,
            observer: None,
        }
    }

    pub fn from_config(config: &ReactionConfig) -> Result<Self, ActionError> {
        Ok(Self::new(
            TcpProbe::from_target(&config.target, config.probe_timeout),
            ActionRotator::from_target(&config.target)?,
        ))
    }

    /// Set a callback for completed actions.
    pub fn with_observer(mut self, observer: ActionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Index of the last action run. Waits for any in-flight action.
    pub async fn current_index(&self) -> Option<usize> {
        self.rotator.lock().await.current()
    }

    /// Timer path: probe the target and run the next action if it is down.
    ///
    /// Returns without probing while an action is in flight.
    pub async fn check_and_react(&self) -> Reaction {
        match self.state() {
            EngineState::Idle => {}
            EngineState::Running => {
                debug!("action in flight, skipping probe");
                return Reaction::Dropped;
            }
            EngineState::ShuttingDown | EngineState::Stopped => return Reaction::Stopped,
        }

        match self.probe.check().await {
            Reachability::Reachable => {
                debug!(endpoint = %self.probe.endpoint(), "target reachable");
                Reaction::Healthy
            }
            Reachability::Unreachable => {
                warn!(endpoint = %self.probe.endpoint(), "target unreachable");
                self.react("probe").await
            }
        }
    }

    /// Signal path: run the next action without probing.
    pub async fn force_action(&self) -> Reaction {
        self.react("forced").await
    }

    /// Stop accepting triggers and wait for any in-flight action.
    ///
    /// Never interrupts a running action. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let mut draining = false;
        self.state.send_if_modified(|state| match *state {
            EngineState::Idle => {
                *state = EngineState::ShuttingDown;
                true
            }
            EngineState::Running => {
                draining = true;
                *state = EngineState::ShuttingDown;
                true
            }
            EngineState::ShuttingDown | EngineState::Stopped => false,
        });

        if draining {
            info!("waiting for in-flight action to finish");
        }

        let _rotator = self.rotator.lock().await;
        let stopped = self.state.send_if_modified(|state| {
            if *state == EngineState::Stopped {
                false
            } else {
                *state = EngineState::Stopped;
                true
            }
        });

        if stopped {
            info!("reaction engine stopped");
        }
    }

    /// Run `check_and_react` now and then every `interval` until shutdown.
    ///
    /// Ticks missed while an action runs are delayed, not replayed.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = self.subscribe();
        let stopping = async move {
            let _ = state.wait_for(|s| !s.is_accepting()).await;
        };
        tokio::pin!(stopping);

        info!(
            endpoint = %self.probe.endpoint(),
            interval_secs = interval.as_secs_f64(),
            "watching target"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_and_react().await;
                }
                () = &mut stopping => {
                    debug!("timer loop shutting down");
                    break;
                }
            }
        }
    }

    async fn react(&self, cause: &'static str) -> Reaction {
        let Ok(mut rotator) = self.rotator.try_lock() else {
            return self.refuse(cause);
        };

        let claimed = self.state.send_if_modified(|state| {
            if *state == EngineState::Idle {
                *state = EngineState::Running;
                true
            } else {
                false
            }
        });
        if !claimed {
            return self.refuse(cause);
        }
        let _episode = Episode { state: &self.state };

        let result = rotator.run_next().await;
        match &result.error {
            None => info!(
                cause,
                index = result.index,
                command = %result.command_line,
                stdout = %result.stdout.trim_end(),
                "action completed"
            ),
            Some(e) => error!(
                cause,
                index = result.index,
                command = %result.command_line,
                error = %e,
                stdout = %result.stdout.trim_end(),
                "action failed"
            ),
        }

        if let Some(observer) = &self.observer {
            observer(&result);
        }

        Reaction::Executed(result)
    }

    fn refuse(&self, cause: &'static str) -> Reaction {
        if self.state().is_accepting() {
            debug!(cause, "action in flight, trigger dropped");
            Reaction::Dropped
        } else {
            debug!(cause, "engine stopped, trigger ignored");
            Reaction::Stopped
        }
    }
}

/// Returns the engine to `Idle` when an action episode ends, unless
/// shutdown has taken over the state in the meantime.
struct Episode<'a> {
    state: &'a watch::Sender<EngineState>,
}

impl Drop for Episode<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if *state == EngineState::Running {
                *state = EngineState::Idle;
                true
            } else {
                false
            }
        });
    }
}
