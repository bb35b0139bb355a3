use super::EventKind;
use crate::protocol::{
    ExecutorId, ExecutorInfo, FrameworkId, FrameworkInfo, MasterInfo, Offer, OfferId, SlaveId,
    SlaveInfo, TaskId, TaskInfo, TaskStatus,
};
use serde::{Deserialize, Serialize};

/// A driver-to-scheduler callback with its payloads, in handler order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum SchedulerEvent {
    Registered {
        framework_id: FrameworkId,
        master_info: MasterInfo,
    },
    Reregistered {
        master_info: MasterInfo,
    },
    Disconnected,
    ResourceOffers {
        offers: Vec<Offer>,
    },
    OfferRescinded {
        offer_id: OfferId,
    },
    StatusUpdate {
        status: TaskStatus,
    },
    FrameworkMessage {
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    },
    SlaveLost {
        slave_id: SlaveId,
    },
    ExecutorLost {
        executor_id: ExecutorId,
        slave_id: SlaveId,
        status: i32,
    },
    Error {
        message: String,
    },
}

impl SchedulerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SchedulerEvent::Registered { .. } => EventKind::Registered,
            SchedulerEvent::Reregistered { .. } => EventKind::Reregistered,
            SchedulerEvent::Disconnected => EventKind::Disconnected,
            SchedulerEvent::ResourceOffers { .. } => EventKind::ResourceOffers,
            SchedulerEvent::OfferRescinded { .. } => EventKind::OfferRescinded,
            SchedulerEvent::StatusUpdate { .. } => EventKind::StatusUpdate,
            SchedulerEvent::FrameworkMessage { .. } => EventKind::FrameworkMessage,
            SchedulerEvent::SlaveLost { .. } => EventKind::SlaveLost,
            SchedulerEvent::ExecutorLost { .. } => EventKind::ExecutorLost,
            SchedulerEvent::Error { .. } => EventKind::Error,
        }
    }
}

/// A driver-to-executor callback with its payloads, in handler order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum ExecutorEvent {
    Registered {
        executor_info: ExecutorInfo,
        framework_info: FrameworkInfo,
        slave_info: SlaveInfo,
    },
    Reregistered {
        slave_info: SlaveInfo,
    },
    Disconnected,
    LaunchTask {
        task: TaskInfo,
    },
    KillTask {
        task_id: TaskId,
    },
    FrameworkMessage {
        data: Vec<u8>,
    },
    Shutdown,
    Error {
        message: String,
    },
}

impl ExecutorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ExecutorEvent::Registered { .. } => EventKind::Registered,
            ExecutorEvent::Reregistered { .. } => EventKind::Reregistered,
            ExecutorEvent::Disconnected => EventKind::Disconnected,
            ExecutorEvent::LaunchTask { .. } => EventKind::LaunchTask,
            ExecutorEvent::KillTask { .. } => EventKind::KillTask,
            ExecutorEvent::FrameworkMessage { .. } => EventKind::FrameworkMessage,
            ExecutorEvent::Shutdown => EventKind::Shutdown,
            ExecutorEvent::Error { .. } => EventKind::Error,
        }
    }
}

/// Any callback a driver can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "event", rename_all = "snake_case")]
pub enum CallbackEvent {
    Scheduler(SchedulerEvent),
    Executor(ExecutorEvent),
}

impl CallbackEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CallbackEvent::Scheduler(event) => event.kind(),
            CallbackEvent::Executor(event) => event.kind(),
        }
    }
}

impl From<SchedulerEvent> for CallbackEvent {
    fn from(event: SchedulerEvent) -> Self {
        CallbackEvent::Scheduler(event)
    }
}

impl From<ExecutorEvent> for CallbackEvent {
    fn from(event: ExecutorEvent) -> Self {
        CallbackEvent::Executor(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_callback_name() {
        let event: SchedulerEvent = serde_json::from_str(
            r#"{"callback": "executor_lost", "executor_id": {"value": "e"},
                "slave_id": {"value": "s"}, "status": -1}"#,
        )
        .unwrap();
        assert_eq!(event.kind(), EventKind::ExecutorLost);
        assert_eq!(
            event,
            SchedulerEvent::ExecutorLost {
                executor_id: ExecutorId::new("e"),
                slave_id: SlaveId::new("s"),
                status: -1,
            }
        );

        let event: ExecutorEvent = serde_json::from_str(r#"{"callback": "shutdown"}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Shutdown);
    }

    #[test]
    fn kind_matches_serde_tag() {
        let event = SchedulerEvent::OfferRescinded {
            offer_id: OfferId::new("o1"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["callback"], event.kind().callback_name());

        let wrapped = CallbackEvent::from(ExecutorEvent::KillTask {
            task_id: TaskId::new("t"),
        });
        assert_eq!(wrapped.kind(), EventKind::KillTask);
    }
}
