use super::{DeliveryOutcome, EventKind, HandlerBinding, InvocationPolicy, SchedulerEvent};
use crate::converter::{HandlerValue, ProtocolValueConverter};
use crate::driver::SchedulerDriver;
use crate::handlers::Scheduler;
use crate::protocol::{
    ExecutorId, FrameworkId, MasterInfo, Offer, OfferId, ProtocolRecord, SlaveId, TaskStatus,
};
use std::sync::{Arc, Mutex};

/// Callbacks a scheduler driver delivers.
pub trait SchedulerCallbacks: Send + Sync {
    fn registered(&self, framework_id: &FrameworkId, master_info: &MasterInfo)
        -> DeliveryOutcome;

    fn reregistered(&self, master_info: &MasterInfo) -> DeliveryOutcome;

    fn disconnected(&self) -> DeliveryOutcome;

    fn resource_offers(&self, offers: &[Offer]) -> DeliveryOutcome;

    fn offer_rescinded(&self, offer_id: &OfferId) -> DeliveryOutcome;

    fn status_update(&self, status: &TaskStatus) -> DeliveryOutcome;

    fn framework_message(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        data: &[u8],
    ) -> DeliveryOutcome;

    fn slave_lost(&self, slave_id: &SlaveId) -> DeliveryOutcome;

    fn executor_lost(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        status: i32,
    ) -> DeliveryOutcome;

    fn error(&self, message: &str) -> DeliveryOutcome;

    /// Routes a recorded event to its callback.
    fn dispatch(&self, event: &SchedulerEvent) -> DeliveryOutcome {
        match event {
            SchedulerEvent::Registered {
                framework_id,
                master_info,
            } => self.registered(framework_id, master_info),
            SchedulerEvent::Reregistered { master_info } => self.reregistered(master_info),
            SchedulerEvent::Disconnected => self.disconnected(),
            SchedulerEvent::ResourceOffers { offers } => self.resource_offers(offers),
            SchedulerEvent::OfferRescinded { offer_id } => self.offer_rescinded(offer_id),
            SchedulerEvent::StatusUpdate { status } => self.status_update(status),
            SchedulerEvent::FrameworkMessage {
                executor_id,
                slave_id,
                data,
            } => self.framework_message(executor_id, slave_id, data),
            SchedulerEvent::SlaveLost { slave_id } => self.slave_lost(slave_id),
            SchedulerEvent::ExecutorLost {
                executor_id,
                slave_id,
                status,
            } => self.executor_lost(executor_id, slave_id, *status),
            SchedulerEvent::Error { message } => self.error(message),
        }
    }
}

/// Forwards scheduler driver callbacks to a [`Scheduler`] handler.
pub struct SchedulerEventBridge {
    binding: HandlerBinding<dyn Scheduler, dyn SchedulerDriver>,
    converter: Arc<ProtocolValueConverter>,
}

impl SchedulerEventBridge {
    pub fn new(scheduler: Arc<dyn Scheduler>, driver: Arc<dyn SchedulerDriver>) -> Self {
        Self {
            binding: HandlerBinding::new("scheduler", scheduler, driver),
            converter: Arc::new(ProtocolValueConverter::default()),
        }
    }

    pub fn with_policy(mut self, policy: InvocationPolicy) -> Self {
        self.binding = self.binding.with_policy(policy);
        self
    }

    pub fn with_execution_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.binding = self.binding.with_execution_lock(lock);
        self
    }

    pub fn with_converter(mut self, converter: Arc<ProtocolValueConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn binding(&self) -> &HandlerBinding<dyn Scheduler, dyn SchedulerDriver> {
        &self.binding
    }

    pub fn converter(&self) -> &Arc<ProtocolValueConverter> {
        &self.converter
    }
}

impl SchedulerCallbacks for SchedulerEventBridge {
    fn registered(
        &self,
        framework_id: &FrameworkId,
        master_info: &MasterInfo,
    ) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Registered,
            |c| {
                Ok((
                    c.to_handler_value(framework_id, FrameworkId::SCHEMA)?,
                    c.to_handler_value(master_info, MasterInfo::SCHEMA)?,
                ))
            },
            |scheduler, driver, (framework_id, master_info)| {
                scheduler.registered(driver, framework_id, master_info)
            },
        )
    }

    fn reregistered(&self, master_info: &MasterInfo) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Reregistered,
            |c| c.to_handler_value(master_info, MasterInfo::SCHEMA),
            |scheduler, driver, master_info| scheduler.reregistered(driver, master_info),
        )
    }

    fn disconnected(&self) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Disconnected,
            |_| Ok(()),
            |scheduler, driver, ()| scheduler.disconnected(driver),
        )
    }

    fn resource_offers(&self, offers: &[Offer]) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::ResourceOffers,
            |c| c.to_handler_sequence(offers, Offer::SCHEMA),
            |scheduler, driver, offers| scheduler.resource_offers(driver, offers),
        )
    }

    fn offer_rescinded(&self, offer_id: &OfferId) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::OfferRescinded,
            |c| c.to_handler_value(offer_id, OfferId::SCHEMA),
            |scheduler, driver, offer_id| scheduler.offer_rescinded(driver, offer_id),
        )
    }

    fn status_update(&self, status: &TaskStatus) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::StatusUpdate,
            |c| c.to_handler_value(status, TaskStatus::SCHEMA),
            |scheduler, driver, status| scheduler.status_update(driver, status),
        )
    }

    fn framework_message(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        data: &[u8],
    ) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::FrameworkMessage,
            |c| {
                Ok((
                    c.to_handler_value(executor_id, ExecutorId::SCHEMA)?,
                    c.to_handler_value(slave_id, SlaveId::SCHEMA)?,
                    c.bytes(data),
                ))
            },
            |scheduler, driver, (executor_id, slave_id, data)| {
                scheduler.framework_message(driver, executor_id, slave_id, data)
            },
        )
    }

    fn slave_lost(&self, slave_id: &SlaveId) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::SlaveLost,
            |c| c.to_handler_value(slave_id, SlaveId::SCHEMA),
            |scheduler, driver, slave_id| scheduler.slave_lost(driver, slave_id),
        )
    }

    fn executor_lost(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        status: i32,
    ) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::ExecutorLost,
            |c| {
                Ok((
                    c.to_handler_value(executor_id, ExecutorId::SCHEMA)?,
                    c.to_handler_value(slave_id, SlaveId::SCHEMA)?,
                    HandlerValue::Int(i64::from(status)),
                ))
            },
            |scheduler, driver, (executor_id, slave_id, status)| {
                scheduler.executor_lost(driver, executor_id, slave_id, status)
            },
        )
    }

    fn error(&self, message: &str) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Error,
            |c| Ok(c.bytes(message.as_bytes())),
            |scheduler, driver, message| scheduler.error(driver, message),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::SchemaRegistry;
    use crate::driver::{LocalSchedulerDriver, LocalSession, SessionState};
    use crate::error::{BridgeError, ConversionError};
    use crate::protocol::{Resource, TaskId, TaskState};
    use crate::test::{RecordedCall, RecordingScheduler};

    fn bridge_with(
        scheduler: Arc<RecordingScheduler>,
    ) -> (SchedulerEventBridge, Arc<LocalSession>) {
        let session = Arc::new(LocalSession::new());
        let driver = LocalSchedulerDriver::new(session.clone());
        SchedulerDriver::start(&driver);
        (
            SchedulerEventBridge::new(scheduler, Arc::new(driver)),
            session,
        )
    }

    fn offer(n: usize) -> Offer {
        let mut offer = Offer::new(
            OfferId::new(format!("offer-{}", n)),
            FrameworkId::new("fw-1"),
            SlaveId::new(format!("slave-{}", n)),
            format!("node-{}", n),
        );
        offer.resources.push(Resource::scalar("mem", 128.0));
        offer
    }

    fn master() -> MasterInfo {
        MasterInfo {
            id: "master-1".to_string(),
            ip: 16777343,
            port: 5050,
            ..Default::default()
        }
    }

    #[test]
    fn registered_passes_framework_id_then_master_info() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let (bridge, session) = bridge_with(scheduler.clone());

        let outcome = bridge.registered(&FrameworkId::new("fw-1"), &master());
        assert!(outcome.is_delivered());

        let calls = scheduler.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callback, "registered");
        assert_eq!(calls[0].args.len(), 2);
        assert_eq!(calls[0].args[0].schema(), Some("FrameworkID"));
        assert_eq!(calls[0].args[1].schema(), Some("MasterInfo"));
        assert_eq!(session.state(), SessionState::Unregistered);
    }

    #[test]
    fn resource_offers_keep_count_and_order() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let (bridge, _session) = bridge_with(scheduler.clone());
        let offers: Vec<Offer> = (0..8).map(offer).collect();

        assert!(bridge.resource_offers(&offers).is_delivered());

        let calls = scheduler.calls();
        assert_eq!(calls.len(), 1);
        let delivered = calls[0].args[0].as_list().unwrap();
        assert_eq!(delivered.len(), 8);
        for (n, value) in delivered.iter().enumerate() {
            assert_eq!(
                value.path("id.value").and_then(HandlerValue::as_text),
                Some(format!("offer-{}", n).as_str())
            );
        }
    }

    #[test]
    fn malformed_offer_aborts_without_partial_delivery() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let (bridge, session) = bridge_with(scheduler.clone());
        let mut offers: Vec<Offer> = (0..8).map(offer).collect();
        offers[4].id = OfferId::new("");

        let outcome = bridge.resource_offers(&offers);

        assert!(outcome.aborted_session());
        match outcome.error() {
            Some(BridgeError::ConversionFailed { callback, source }) => {
                assert_eq!(*callback, "resource_offers");
                assert!(matches!(
                    source,
                    ConversionError::SequenceElement { index: 4, .. }
                ));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(scheduler.calls().is_empty());
        assert_eq!(session.state(), SessionState::Aborted);
    }

    #[test]
    fn unknown_schema_aborts_before_invocation() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let (bridge, session) = bridge_with(scheduler.clone());
        let mut registry = SchemaRegistry::mesos();
        registry.unregister("MasterInfo");
        let bridge = bridge.with_converter(Arc::new(ProtocolValueConverter::new(registry)));

        let outcome = bridge.registered(&FrameworkId::new("fw-1"), &master());

        assert!(outcome.aborted_session());
        assert!(scheduler.calls().is_empty());
        assert_eq!(session.state(), SessionState::Aborted);
    }

    #[test]
    fn framework_message_keeps_binary_payload() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let (bridge, _session) = bridge_with(scheduler.clone());

        let outcome = bridge.framework_message(
            &ExecutorId::new("exec-1"),
            &SlaveId::new("slave-1"),
            b"ab\x00cd",
        );
        assert!(outcome.is_delivered());

        let calls = scheduler.calls();
        let args = &calls[0].args;
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].schema(), Some("ExecutorID"));
        assert_eq!(args[1].schema(), Some("SlaveID"));
        let data = args[2].as_bytes().unwrap();
        assert_eq!(data.len(), 5);
        assert_eq!(data[2], 0x00);
        assert_eq!(data, b"ab\x00cd");
    }

    #[test]
    fn executor_lost_passes_status_unmodified() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let (bridge, _session) = bridge_with(scheduler.clone());

        let outcome = bridge.executor_lost(&ExecutorId::new("exec-1"), &SlaveId::new("s1"), -1);
        assert!(outcome.is_delivered());

        let calls = scheduler.calls();
        assert_eq!(calls[0].callback, "executor_lost");
        assert_eq!(calls[0].args.len(), 3);
        assert_eq!(calls[0].args[2], HandlerValue::Int(-1));
    }

    #[test]
    fn failing_status_update_aborts() {
        let scheduler = Arc::new(RecordingScheduler::failing_on("status_update"));
        let (bridge, session) = bridge_with(scheduler.clone());

        let status = TaskStatus::new(TaskId::new("t1"), TaskState::Failed);
        let outcome = bridge.status_update(&status);

        assert!(outcome.aborted_session());
        assert!(matches!(
            outcome.error(),
            Some(BridgeError::HandlerError {
                callback: "status_update",
                ..
            })
        ));
        assert_eq!(scheduler.calls().len(), 1);
        assert_eq!(session.state(), SessionState::Aborted);
    }

    #[test]
    fn failing_error_handler_only_logs() {
        let scheduler = Arc::new(RecordingScheduler::failing_on("error"));
        let (bridge, session) = bridge_with(scheduler.clone());

        let outcome = bridge.error("master went away");

        assert!(matches!(outcome, DeliveryOutcome::Logged(_)));
        assert_eq!(session.abort_requests(), 0);
        assert_eq!(session.state(), SessionState::Unregistered);

        let calls = scheduler.calls();
        assert_eq!(calls[0].args[0].as_bytes(), Some(&b"master went away"[..]));
    }

    #[test]
    fn dispatch_routes_every_event() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let (bridge, _session) = bridge_with(scheduler.clone());

        let events = vec![
            SchedulerEvent::Registered {
                framework_id: FrameworkId::new("fw-1"),
                master_info: master(),
            },
            SchedulerEvent::Reregistered {
                master_info: master(),
            },
            SchedulerEvent::Disconnected,
            SchedulerEvent::ResourceOffers {
                offers: vec![offer(0)],
            },
            SchedulerEvent::OfferRescinded {
                offer_id: OfferId::new("offer-0"),
            },
            SchedulerEvent::StatusUpdate {
                status: TaskStatus::new(TaskId::new("t"), TaskState::Running),
            },
            SchedulerEvent::FrameworkMessage {
                executor_id: ExecutorId::new("e"),
                slave_id: SlaveId::new("s"),
                data: vec![1, 2],
            },
            SchedulerEvent::SlaveLost {
                slave_id: SlaveId::new("s"),
            },
            SchedulerEvent::ExecutorLost {
                executor_id: ExecutorId::new("e"),
                slave_id: SlaveId::new("s"),
                status: 137,
            },
            SchedulerEvent::Error {
                message: "bye".to_string(),
            },
        ];

        for event in &events {
            assert!(bridge.dispatch(event).is_delivered(), "{:?}", event.kind());
        }

        let calls: Vec<RecordedCall> = scheduler.calls();
        let names: Vec<&str> = calls.iter().map(|c| c.callback).collect();
        assert_eq!(
            names,
            vec![
                "registered",
                "reregistered",
                "disconnected",
                "resource_offers",
                "offer_rescinded",
                "status_update",
                "framework_message",
                "slave_lost",
                "executor_lost",
                "error"
            ]
        );
        let arity: Vec<usize> = calls.iter().map(|c| c.args.len()).collect();
        assert_eq!(arity, vec![2, 1, 0, 1, 1, 1, 3, 1, 3, 1]);
    }
}
