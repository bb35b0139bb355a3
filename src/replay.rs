//! Replays recorded driver callbacks through a bridge.
//!
//! A transcript is a JSON document naming the role it was recorded for and
//! the callbacks in delivery order:
//!
//! ```json
//! {
//!   "role": "executor",
//!   "events": [
//!     {"callback": "launch_task", "task": {"name": "t", "task_id": {"value": "t-1"}, "slave_id": {"value": "s-1"}}},
//!     {"callback": "shutdown"}
//!   ]
//! }
//! ```
//!
//! Events are fed to a local driver session first, so it sees the same state
//! changes a real driver would, and then to the bridge. Once the session is
//! aborted or stopped nothing further is delivered.

use crate::bridge::{
    DeliveryOutcome, EventKind, ExecutorCallbacks, ExecutorEvent, SchedulerCallbacks,
    SchedulerEvent,
};
use crate::driver::{DriverStatus, LocalSession, SessionState};
use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ReplayTranscript {
    Scheduler { events: Vec<SchedulerEvent> },
    Executor { events: Vec<ExecutorEvent> },
}

impl ReplayTranscript {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> BridgeResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::SessionError(format!(
                "Transcript not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)?;
        Self::load_from_string(&content)
    }

    pub fn load_from_string(json_str: &str) -> BridgeResult<Self> {
        let transcript: ReplayTranscript = serde_json::from_str(json_str)?;
        debug!(
            "Loaded {} transcript with {} events",
            transcript.role(),
            transcript.len()
        );
        Ok(transcript)
    }

    pub fn role(&self) -> &'static str {
        match self {
            ReplayTranscript::Scheduler { .. } => "scheduler",
            ReplayTranscript::Executor { .. } => "executor",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReplayTranscript::Scheduler { events } => events.len(),
            ReplayTranscript::Executor { events } => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A failed delivery, by position in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFailure {
    pub index: usize,
    pub callback: &'static str,
    pub error_code: String,
    pub message: String,
    pub aborted_session: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub role: &'static str,
    pub total: usize,
    pub delivered: usize,
    /// Events never handed to the bridge because the session had ended.
    pub skipped: usize,
    /// Index of the event after which the session was found aborted.
    pub aborted_at: Option<usize>,
    pub failures: Vec<ReplayFailure>,
    pub status: DriverStatus,
    pub state: SessionState,
}

impl ReplayReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Replayed {} transcript: {}/{} delivered, {} skipped, driver {:?}, session {:?}",
            self.role, self.delivered, self.total, self.skipped, self.status, self.state
        );
        if let Some(index) = self.aborted_at {
            summary.push_str(&format!(", aborted at event {}", index));
        }
        summary
    }
}

pub fn replay_scheduler<B>(
    bridge: &B,
    session: &LocalSession,
    events: &[SchedulerEvent],
) -> ReplayReport
where
    B: SchedulerCallbacks + ?Sized,
{
    replay("scheduler", session, events, SchedulerEvent::kind, |event| {
        bridge.dispatch(event)
    })
}

pub fn replay_executor<B>(
    bridge: &B,
    session: &LocalSession,
    events: &[ExecutorEvent],
) -> ReplayReport
where
    B: ExecutorCallbacks + ?Sized,
{
    replay("executor", session, events, ExecutorEvent::kind, |event| {
        bridge.dispatch(event)
    })
}

fn replay<E, K, F>(
    role: &'static str,
    session: &LocalSession,
    events: &[E],
    kind: K,
    deliver: F,
) -> ReplayReport
where
    K: Fn(&E) -> EventKind,
    F: Fn(&E) -> DeliveryOutcome,
{
    session.start();

    let mut delivered = 0;
    let mut aborted_at = None;
    let mut failures = Vec::new();
    let mut handed = 0;

    for (index, event) in events.iter().enumerate() {
        if session.state().is_terminal() {
            warn!(
                "Session ended, skipping {} remaining events",
                events.len() - index
            );
            break;
        }
        handed += 1;

        let kind = kind(event);
        session.observe(kind);

        let outcome = deliver(event);
        match outcome.error() {
            None => delivered += 1,
            Some(err) => failures.push(ReplayFailure {
                index,
                callback: kind.callback_name(),
                error_code: err.diagnostic().error_code,
                message: err.to_string(),
                aborted_session: outcome.aborted_session(),
            }),
        }

        if aborted_at.is_none() && session.state() == SessionState::Aborted {
            aborted_at = Some(index);
        }
    }

    let report = ReplayReport {
        role,
        total: events.len(),
        delivered,
        skipped: events.len() - handed,
        aborted_at,
        failures,
        status: session.status(),
        state: session.state(),
    };
    info!("{}", report.summary());
    report
}
