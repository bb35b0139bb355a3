//! Driver-facing callback bridges.
//!
//! ```text
//! driver thread ──► bridge callback ──► converter (all payloads) ──► handler method
//!                        │                    └─► failure: abort, handler not called
//!                        └─► handler Err / panic / timeout: abort (error callback: log only)
//! ```
//!
//! Every event is delivered at most once. A failed delivery tears the session
//! down instead of retrying.

mod binding;
mod event;
mod executor;
mod scheduler;

pub use binding::{HandlerBinding, InvocationPolicy};
pub use event::{CallbackEvent, ExecutorEvent, SchedulerEvent};
pub use executor::{ExecutorCallbacks, ExecutorEventBridge};
pub use scheduler::{SchedulerCallbacks, SchedulerEventBridge};

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Registered,
    Reregistered,
    Disconnected,
    ResourceOffers,
    OfferRescinded,
    StatusUpdate,
    FrameworkMessage,
    SlaveLost,
    ExecutorLost,
    LaunchTask,
    KillTask,
    Shutdown,
    Error,
}

impl EventKind {
    /// Name of the handler method this event is dispatched to.
    pub fn callback_name(&self) -> &'static str {
        match self {
            EventKind::Registered => "registered",
            EventKind::Reregistered => "reregistered",
            EventKind::Disconnected => "disconnected",
            EventKind::ResourceOffers => "resource_offers",
            EventKind::OfferRescinded => "offer_rescinded",
            EventKind::StatusUpdate => "status_update",
            EventKind::FrameworkMessage => "framework_message",
            EventKind::SlaveLost => "slave_lost",
            EventKind::ExecutorLost => "executor_lost",
            EventKind::LaunchTask => "launch_task",
            EventKind::KillTask => "kill_task",
            EventKind::Shutdown => "shutdown",
            EventKind::Error => "error",
        }
    }

    /// Aborting from the error callback would report the abort through the
    /// same callback again, so its failures are only logged.
    pub fn aborts_on_handler_failure(&self) -> bool {
        !matches!(self, EventKind::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.callback_name())
    }
}

/// What happened to a single driver callback.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The handler ran and returned successfully.
    Delivered,
    /// Conversion or the handler failed; the session abort was requested.
    Aborted(BridgeError),
    /// The error callback's handler failed; logged, session left alone.
    Logged(BridgeError),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    pub fn aborted_session(&self) -> bool {
        matches!(self, DeliveryOutcome::Aborted(_))
    }

    pub fn error(&self) -> Option<&BridgeError> {
        match self {
            DeliveryOutcome::Delivered => None,
            DeliveryOutcome::Aborted(err) | DeliveryOutcome::Logged(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_error_is_exempt_from_abort() {
        let kinds = [
            EventKind::Registered,
            EventKind::Reregistered,
            EventKind::Disconnected,
            EventKind::ResourceOffers,
            EventKind::OfferRescinded,
            EventKind::StatusUpdate,
            EventKind::FrameworkMessage,
            EventKind::SlaveLost,
            EventKind::ExecutorLost,
            EventKind::LaunchTask,
            EventKind::KillTask,
            EventKind::Shutdown,
        ];
        assert!(kinds.iter().all(EventKind::aborts_on_handler_failure));
        assert!(!EventKind::Error.aborts_on_handler_failure());
    }

    #[test]
    fn callback_names_match_serde_names() {
        for kind in [EventKind::ResourceOffers, EventKind::LaunchTask, EventKind::Error] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.callback_name().to_string()));
        }
    }
}
