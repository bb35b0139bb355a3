//! Driver-side collaborator interfaces.
//!
//! The driver owns the connection to the master and the session lifecycle.
//! Bridges only observe the session and may force it into
//! [`SessionState::Aborted`] through [`SessionControl::abort`]. Handlers get
//! the full driver trait so they can reply (launch tasks, send status
//! updates) from inside a callback.

mod local;

pub use local::{LocalExecutorDriver, LocalSchedulerDriver, LocalSession, OutboundCall};

use crate::protocol::{
    ExecutorId, Filters, OfferId, Request, SlaveId, TaskId, TaskInfo, TaskStatus,
};
use serde::{Deserialize, Serialize};

/// Status returned by every driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    #[serde(rename = "DRIVER_NOT_STARTED")]
    NotStarted,
    #[serde(rename = "DRIVER_RUNNING")]
    Running,
    #[serde(rename = "DRIVER_ABORTED")]
    Aborted,
    #[serde(rename = "DRIVER_STOPPED")]
    Stopped,
}

/// Registration state of a driver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unregistered,
    Registered,
    Disconnected,
    Aborted,
    Stopped,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Aborted | SessionState::Stopped)
    }
}

/// The part of a driver session a bridge needs.
pub trait SessionControl: Send + Sync {
    /// Requests termination of the session. No further callbacks should be
    /// delivered once this returns.
    fn abort(&self) -> DriverStatus;

    fn status(&self) -> DriverStatus;

    fn session_state(&self) -> SessionState;
}

pub trait SchedulerDriver: SessionControl {
    fn start(&self) -> DriverStatus;

    /// Stops the driver. With `failover` the framework's executors and tasks
    /// keep running so a new scheduler can reconnect.
    fn stop(&self, failover: bool) -> DriverStatus;

    /// Blocks until the driver is stopped or aborted.
    fn join(&self) -> DriverStatus;

    fn run(&self) -> DriverStatus {
        let status = self.start();
        if status != DriverStatus::Running {
            return status;
        }
        self.join()
    }

    fn request_resources(&self, requests: &[Request]) -> DriverStatus;

    /// Launches tasks on an offer. Unused resources are declined with `filters`.
    fn launch_tasks(
        &self,
        offer_id: &OfferId,
        tasks: Vec<TaskInfo>,
        filters: Option<Filters>,
    ) -> DriverStatus;

    fn kill_task(&self, task_id: &TaskId) -> DriverStatus;

    fn decline_offer(&self, offer_id: &OfferId, filters: Option<Filters>) -> DriverStatus;

    fn revive_offers(&self) -> DriverStatus;

    fn send_framework_message(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        data: &[u8],
    ) -> DriverStatus;
}

pub trait ExecutorDriver: SessionControl {
    fn start(&self) -> DriverStatus;

    fn stop(&self) -> DriverStatus;

    fn join(&self) -> DriverStatus;

    fn run(&self) -> DriverStatus {
        let status = self.start();
        if status != DriverStatus::Running {
            return status;
        }
        self.join()
    }

    fn send_status_update(&self, status: TaskStatus) -> DriverStatus;

    fn send_framework_message(&self, data: &[u8]) -> DriverStatus;
}
