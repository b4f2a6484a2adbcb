//! reaction-watch — the watchdog core.
//!
//! Probes a single TCP endpoint and, when it is unreachable, runs the next
//! command from a round-robin list of remediation actions. A forced-action
//! signal runs the next command without probing.
//!
//! # Architecture
//!
//! ```text
//! ReactionEngine
//!   ├── run(interval)      timer task → check_and_react()
//!   │   └── TcpProbe::check() → Reachability
//!   ├── force_action()     signal dispatcher → next action, no probe
//!   ├── shutdown()         stop triggers, drain in-flight action
//!   └── Mutex<ActionRotator>
//!       └── run_next() → ExecutionResult
//! ```
//!
//! # Busy policy
//!
//! At most one action runs at a time. A trigger that arrives while an
//! action is in flight is dropped, not queued, so a burst of failures
//! produces one action rather than a backlog.

pub mod engine;
pub mod error;
pub mod probe;
pub mod rotator;
pub mod signals;

pub use engine::{ActionObserver, EngineState, Reaction, ReactionEngine};
pub use error::ActionError;
pub use probe::{Reachability, TcpProbe};
pub use rotator::{ActionRotator, ExecutionResult};
pub use signals::{SignalBridge, SignalEvent, dispatch};
