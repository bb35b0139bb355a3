use super::{DriverStatus, ExecutorDriver, SchedulerDriver, SessionControl, SessionState};
use crate::bridge::EventKind;
use crate::protocol::{
    ExecutorId, Filters, OfferId, Request, SlaveId, TaskId, TaskInfo, TaskStatus,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A driver call made by a handler against a local session.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCall {
    RequestResources(Vec<Request>),
    LaunchTasks {
        offer_id: OfferId,
        tasks: Vec<TaskInfo>,
        filters: Option<Filters>,
    },
    KillTask(TaskId),
    DeclineOffer {
        offer_id: OfferId,
        filters: Option<Filters>,
    },
    ReviveOffers,
    SchedulerMessage {
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    },
    StatusUpdate(TaskStatus),
    ExecutorMessage(Vec<u8>),
}

#[derive(Debug)]
struct SessionInner {
    status: DriverStatus,
    state: SessionState,
    outbox: Vec<(DateTime<Utc>, OutboundCall)>,
    aborts: usize,
}

/// In-process driver session with no master behind it.
///
/// Tracks status and registration state, records every outbound call, and
/// wakes `join` waiters when the session stops or aborts.
#[derive(Debug)]
pub struct LocalSession {
    id: Uuid,
    inner: Mutex<SessionInner>,
    changed: Condvar,
}

impl LocalSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Mutex::new(SessionInner {
                status: DriverStatus::NotStarted,
                state: SessionState::Unregistered,
                outbox: Vec::new(),
                aborts: 0,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // a panicking handler must not wedge the session
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start(&self) -> DriverStatus {
        let mut inner = self.lock();
        if inner.status != DriverStatus::NotStarted {
            return inner.status;
        }
        inner.status = DriverStatus::Running;
        info!(session = %self.id, "Local driver session started");
        inner.status
    }

    pub fn stop(&self) -> DriverStatus {
        let mut inner = self.lock();
        if inner.status != DriverStatus::Running {
            return inner.status;
        }
        inner.status = DriverStatus::Stopped;
        inner.state = SessionState::Stopped;
        self.changed.notify_all();
        info!(session = %self.id, "Local driver session stopped");
        DriverStatus::Stopped
    }

    pub fn abort(&self) -> DriverStatus {
        let mut inner = self.lock();
        inner.aborts += 1;
        if inner.status != DriverStatus::Running {
            return inner.status;
        }
        inner.status = DriverStatus::Aborted;
        inner.state = SessionState::Aborted;
        self.changed.notify_all();
        warn!(session = %self.id, "Local driver session aborted");
        DriverStatus::Aborted
    }

    pub fn join(&self) -> DriverStatus {
        let mut inner = self.lock();
        while inner.status == DriverStatus::Running {
            inner = self
                .changed
                .wait(inner)
                .unwrap_or_else(|e| e.into_inner());
        }
        inner.status
    }

    pub fn status(&self) -> DriverStatus {
        self.lock().status
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// How many times abort was requested, including redundant requests.
    pub fn abort_requests(&self) -> usize {
        self.lock().aborts
    }

    /// Applies the state change a driver makes before delivering `kind`.
    ///
    /// The driver aborts itself before reporting an error to the handler.
    pub fn observe(&self, kind: EventKind) {
        match kind {
            EventKind::Registered | EventKind::Reregistered => {
                let mut inner = self.lock();
                if !inner.state.is_terminal() {
                    inner.state = SessionState::Registered;
                }
            }
            EventKind::Disconnected => {
                let mut inner = self.lock();
                if !inner.state.is_terminal() {
                    inner.state = SessionState::Disconnected;
                }
            }
            EventKind::Error => {
                self.abort();
            }
            _ => {}
        }
    }

    pub fn outbound(&self) -> Vec<OutboundCall> {
        self.lock()
            .outbox
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    fn record(&self, call: OutboundCall) -> DriverStatus {
        let mut inner = self.lock();
        if inner.status != DriverStatus::Running {
            return inner.status;
        }
        debug!(session = %self.id, "Outbound driver call: {:?}", call);
        inner.outbox.push((Utc::now(), call));
        inner.status
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct LocalSchedulerDriver {
    session: Arc<LocalSession>,
}

impl LocalSchedulerDriver {
    pub fn new(session: Arc<LocalSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<LocalSession> {
        &self.session
    }
}

impl SessionControl for LocalSchedulerDriver {
    fn abort(&self) -> DriverStatus {
        self.session.abort()
    }

    fn status(&self) -> DriverStatus {
        self.session.status()
    }

    fn session_state(&self) -> SessionState {
        self.session.state()
    }
}

impl SchedulerDriver for LocalSchedulerDriver {
    fn start(&self) -> DriverStatus {
        self.session.start()
    }

    fn stop(&self, failover: bool) -> DriverStatus {
        debug!(session = %self.session.id(), failover, "Stopping scheduler driver");
        self.session.stop()
    }

    fn join(&self) -> DriverStatus {
        self.session.join()
    }

    fn request_resources(&self, requests: &[Request]) -> DriverStatus {
        self.session
            .record(OutboundCall::RequestResources(requests.to_vec()))
    }

    fn launch_tasks(
        &self,
        offer_id: &OfferId,
        tasks: Vec<TaskInfo>,
        filters: Option<Filters>,
    ) -> DriverStatus {
        self.session.record(OutboundCall::LaunchTasks {
            offer_id: offer_id.clone(),
            tasks,
            filters,
        })
    }

    fn kill_task(&self, task_id: &TaskId) -> DriverStatus {
        self.session.record(OutboundCall::KillTask(task_id.clone()))
    }

    fn decline_offer(&self, offer_id: &OfferId, filters: Option<Filters>) -> DriverStatus {
        self.session.record(OutboundCall::DeclineOffer {
            offer_id: offer_id.clone(),
            filters,
        })
    }

    fn revive_offers(&self) -> DriverStatus {
        self.session.record(OutboundCall::ReviveOffers)
    }

    fn send_framework_message(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        data: &[u8],
    ) -> DriverStatus {
        self.session.record(OutboundCall::SchedulerMessage {
            executor_id: executor_id.clone(),
            slave_id: slave_id.clone(),
            data: data.to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LocalExecutorDriver {
    session: Arc<LocalSession>,
}

impl LocalExecutorDriver {
    pub fn new(session: Arc<LocalSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<LocalSession> {
        &self.session
    }
}

impl SessionControl for LocalExecutorDriver {
    fn abort(&self) -> DriverStatus {
        self.session.abort()
    }

    fn status(&self) -> DriverStatus {
        self.session.status()
    }

    fn session_state(&self) -> SessionState {
        self.session.state()
    }
}

impl ExecutorDriver for LocalExecutorDriver {
    fn start(&self) -> DriverStatus {
        self.session.start()
    }

    fn stop(&self) -> DriverStatus {
        self.session.stop()
    }

    fn join(&self) -> DriverStatus {
        self.session.join()
    }

    fn send_status_update(&self, status: TaskStatus) -> DriverStatus {
        self.session.record(OutboundCall::StatusUpdate(status))
    }

    fn send_framework_message(&self, data: &[u8]) -> DriverStatus {
        self.session
            .record(OutboundCall::ExecutorMessage(data.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TaskState;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn calls_before_start_are_not_recorded() {
        let driver = LocalSchedulerDriver::new(Arc::new(LocalSession::new()));
        assert_eq!(driver.revive_offers(), DriverStatus::NotStarted);
        assert!(driver.session().outbound().is_empty());

        assert_eq!(driver.start(), DriverStatus::Running);
        assert_eq!(driver.revive_offers(), DriverStatus::Running);
        assert_eq!(driver.session().outbound(), vec![OutboundCall::ReviveOffers]);
    }

    #[test]
    fn abort_is_terminal() {
        let driver = LocalExecutorDriver::new(Arc::new(LocalSession::new()));
        driver.start();
        assert_eq!(SessionControl::abort(&driver), DriverStatus::Aborted);
        assert_eq!(driver.session_state(), SessionState::Aborted);

        // a second abort or a stop does not resurrect the session
        assert_eq!(SessionControl::abort(&driver), DriverStatus::Aborted);
        assert_eq!(ExecutorDriver::stop(&driver), DriverStatus::Aborted);
        assert_eq!(driver.session().abort_requests(), 2);

        let status = TaskStatus::new(TaskId::new("t"), TaskState::Running);
        assert_eq!(driver.send_status_update(status), DriverStatus::Aborted);
        assert!(driver.session().outbound().is_empty());
    }

    #[test]
    fn join_returns_once_stopped() {
        let session = Arc::new(LocalSession::new());
        let driver = LocalSchedulerDriver::new(session.clone());
        driver.start();

        let waiter = thread::spawn(move || driver.join());
        thread::sleep(Duration::from_millis(20));
        session.stop();

        assert_eq!(waiter.join().unwrap(), DriverStatus::Stopped);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn observe_tracks_registration() {
        let session = LocalSession::new();
        session.start();
        assert_eq!(session.state(), SessionState::Unregistered);

        session.observe(EventKind::Registered);
        assert_eq!(session.state(), SessionState::Registered);
        session.observe(EventKind::Disconnected);
        assert_eq!(session.state(), SessionState::Disconnected);
        session.observe(EventKind::Reregistered);
        assert_eq!(session.state(), SessionState::Registered);

        session.observe(EventKind::Error);
        assert_eq!(session.state(), SessionState::Aborted);
        session.observe(EventKind::Registered);
        assert_eq!(session.state(), SessionState::Aborted);
    }
}
