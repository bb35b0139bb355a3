//! Shared test handlers and cross-module tests.

use crate::converter::HandlerValue;
use crate::driver::{ExecutorDriver, SchedulerDriver};
use crate::handlers::{Executor, Scheduler};
use anyhow::anyhow;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub callback: &'static str,
    pub args: Vec<HandlerValue>,
}

#[derive(Debug, Clone, Default)]
enum Behavior {
    #[default]
    Succeed,
    Fail(&'static str),
    Panic(&'static str),
    Sleep(&'static str, Duration),
}

/// Records every call, then succeeds, fails, panics or stalls as configured.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<RecordedCall>>,
    behavior: Behavior,
}

impl Recorder {
    fn with(behavior: Behavior) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            behavior,
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, callback: &'static str, args: Vec<HandlerValue>) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall { callback, args });

        match self.behavior {
            Behavior::Fail(name) if name == callback => Err(anyhow!("{} rejected", callback)),
            Behavior::Panic(name) if name == callback => panic!("{} blew up", callback),
            Behavior::Sleep(name, delay) if name == callback => {
                thread::sleep(delay);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

macro_rules! recording_handler {
    ($name:ident) => {
        #[derive(Debug, Default)]
        pub struct $name(Recorder);

        impl $name {
            pub fn failing_on(callback: &'static str) -> Self {
                Self(Recorder::with(Behavior::Fail(callback)))
            }

            pub fn panicking_on(callback: &'static str) -> Self {
                Self(Recorder::with(Behavior::Panic(callback)))
            }

            pub fn sleeping_on(callback: &'static str, delay: Duration) -> Self {
                Self(Recorder::with(Behavior::Sleep(callback, delay)))
            }

            pub fn calls(&self) -> Vec<RecordedCall> {
                self.0.calls()
            }
        }
    };
}

recording_handler!(RecordingScheduler);
recording_handler!(RecordingExecutor);

impl Scheduler for RecordingScheduler {
    fn registered(
        &self,
        _driver: &dyn SchedulerDriver,
        framework_id: HandlerValue,
        master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record("registered", vec![framework_id, master_info])
    }

    fn reregistered(
        &self,
        _driver: &dyn SchedulerDriver,
        master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record("reregistered", vec![master_info])
    }

    fn disconnected(&self, _driver: &dyn SchedulerDriver) -> anyhow::Result<()> {
        self.0.record("disconnected", vec![])
    }

    fn resource_offers(
        &self,
        _driver: &dyn SchedulerDriver,
        offers: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record("resource_offers", vec![offers])
    }

    fn offer_rescinded(
        &self,
        _driver: &dyn SchedulerDriver,
        offer_id: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record("offer_rescinded", vec![offer_id])
    }

    fn status_update(
        &self,
        _driver: &dyn SchedulerDriver,
        status: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record("status_update", vec![status])
    }

    fn framework_message(
        &self,
        _driver: &dyn SchedulerDriver,
        executor_id: HandlerValue,
        slave_id: HandlerValue,
        data: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0
            .record("framework_message", vec![executor_id, slave_id, data])
    }

    fn slave_lost(&self, _driver: &dyn SchedulerDriver, slave_id: HandlerValue) -> anyhow::Result<()> {
        self.0.record("slave_lost", vec![slave_id])
    }

    fn executor_lost(
        &self,
        _driver: &dyn SchedulerDriver,
        executor_id: HandlerValue,
        slave_id: HandlerValue,
        status: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0
            .record("executor_lost", vec![executor_id, slave_id, status])
    }

    fn error(&self, _driver: &dyn SchedulerDriver, message: HandlerValue) -> anyhow::Result<()> {
        self.0.record("error", vec![message])
    }
}

impl Executor for RecordingExecutor {
    fn registered(
        &self,
        _driver: &dyn ExecutorDriver,
        executor_info: HandlerValue,
        framework_info: HandlerValue,
        slave_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record(
            "registered",
            vec![executor_info, framework_info, slave_info],
        )
    }

    fn reregistered(
        &self,
        _driver: &dyn ExecutorDriver,
        slave_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record("reregistered", vec![slave_info])
    }

    fn disconnected(&self, _driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        self.0.record("disconnected", vec![])
    }

    fn launch_task(&self, _driver: &dyn ExecutorDriver, task: HandlerValue) -> anyhow::Result<()> {
        self.0.record("launch_task", vec![task])
    }

    fn kill_task(&self, _driver: &dyn ExecutorDriver, task_id: HandlerValue) -> anyhow::Result<()> {
        self.0.record("kill_task", vec![task_id])
    }

    fn framework_message(
        &self,
        _driver: &dyn ExecutorDriver,
        data: HandlerValue,
    ) -> anyhow::Result<()> {
        self.0.record("framework_message", vec![data])
    }

    fn shutdown(&self, _driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        self.0.record("shutdown", vec![])
    }

    fn error(&self, _driver: &dyn ExecutorDriver, message: HandlerValue) -> anyhow::Result<()> {
        self.0.record("error", vec![message])
    }
}

mod concurrency {
    use super::*;
    use crate::bridge::{ExecutorCallbacks, ExecutorEventBridge, InvocationPolicy};
    use crate::driver::{LocalExecutorDriver, LocalSession};
    use crate::protocol::TaskId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Tracks how many calls are inside the handler at once.
    #[derive(Default)]
    struct OverlapProbe {
        inside: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Executor for OverlapProbe {
        fn kill_task(&self, _driver: &dyn ExecutorDriver, _task_id: HandlerValue) -> anyhow::Result<()> {
            let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            self.inside.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn hammer(policy: InvocationPolicy) -> Arc<OverlapProbe> {
        let probe = Arc::new(OverlapProbe::default());
        let session = Arc::new(LocalSession::new());
        let driver = LocalExecutorDriver::new(session);
        driver.start();
        let bridge = Arc::new(
            ExecutorEventBridge::new(probe.clone(), Arc::new(driver)).with_policy(policy),
        );

        let workers: Vec<_> = (0..4)
            .map(|n| {
                let bridge = bridge.clone();
                thread::spawn(move || {
                    for i in 0..5 {
                        let outcome = bridge.kill_task(&TaskId::new(format!("t-{}-{}", n, i)));
                        assert!(outcome.is_delivered());
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        probe
    }

    #[test]
    fn serialized_calls_never_overlap() {
        let probe = hammer(InvocationPolicy::default());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 20);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shared_execution_lock_spans_bridges() {
        let probe = Arc::new(OverlapProbe::default());
        let lock = Arc::new(Mutex::new(()));

        let bridges: Vec<_> = (0..2)
            .map(|_| {
                let driver = LocalExecutorDriver::new(Arc::new(LocalSession::new()));
                driver.start();
                Arc::new(
                    ExecutorEventBridge::new(probe.clone(), Arc::new(driver))
                        .with_execution_lock(lock.clone()),
                )
            })
            .collect();

        let workers: Vec<_> = bridges
            .into_iter()
            .map(|bridge| {
                thread::spawn(move || {
                    for i in 0..5 {
                        bridge.kill_task(&TaskId::new(format!("t-{}", i)));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(probe.calls.load(Ordering::SeqCst), 10);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    }
}

mod replies {
    use super::*;
    use crate::bridge::{SchedulerCallbacks, SchedulerEventBridge};
    use crate::converter::ProtocolValueConverter;
    use crate::driver::{DriverStatus, LocalSchedulerDriver, LocalSession, OutboundCall};
    use crate::protocol::{
        FrameworkId, Offer, OfferId, Resource, SlaveId, TaskId, TaskInfo,
    };
    use std::sync::Arc;

    /// Launches one task per offer, decoding offers back into records.
    struct Launcher {
        converter: ProtocolValueConverter,
    }

    impl Scheduler for Launcher {
        fn resource_offers(
            &self,
            driver: &dyn SchedulerDriver,
            offers: HandlerValue,
        ) -> anyhow::Result<()> {
            let offers = offers
                .as_list()
                .ok_or_else(|| anyhow!("offers should be a list"))?;
            for value in offers {
                let offer: Offer = self.converter.from_handler_value(value, "Offer")?;
                let task = TaskInfo {
                    name: format!("task-on-{}", offer.hostname),
                    task_id: TaskId::new(format!("task-{}", offer.id)),
                    slave_id: offer.slave_id.clone(),
                    resources: offer.resources.clone(),
                    ..Default::default()
                };
                let status = driver.launch_tasks(&offer.id, vec![task], None);
                anyhow::ensure!(status == DriverStatus::Running, "launch refused: {:?}", status);
            }
            Ok(())
        }
    }

    #[test]
    fn handler_replies_through_the_driver() {
        let session = Arc::new(LocalSession::new());
        let driver = LocalSchedulerDriver::new(session.clone());
        driver.start();
        let bridge = SchedulerEventBridge::new(
            Arc::new(Launcher {
                converter: ProtocolValueConverter::default(),
            }),
            Arc::new(driver),
        );

        let mut offer = Offer::new(
            OfferId::new("o-1"),
            FrameworkId::new("fw"),
            SlaveId::new("s-1"),
            "node-1",
        );
        offer.resources.push(Resource::scalar("cpus", 2.0));

        assert!(bridge.resource_offers(&[offer]).is_delivered());

        let outbound = session.outbound();
        assert_eq!(outbound.len(), 1);
        match &outbound[0] {
            OutboundCall::LaunchTasks {
                offer_id, tasks, ..
            } => {
                assert_eq!(offer_id, &OfferId::new("o-1"));
                assert_eq!(tasks[0].task_id, TaskId::new("task-o-1"));
                assert_eq!(tasks[0].resources, vec![Resource::scalar("cpus", 2.0)]);
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn refused_launch_fails_the_callback() {
        let session = Arc::new(LocalSession::new());
        let driver = LocalSchedulerDriver::new(session.clone());
        driver.start();
        driver.stop(false);
        let bridge = SchedulerEventBridge::new(
            Arc::new(Launcher {
                converter: ProtocolValueConverter::default(),
            }),
            Arc::new(driver),
        );

        let offer = Offer::new(
            OfferId::new("o-2"),
            FrameworkId::new("fw"),
            SlaveId::new("s-2"),
            "node-2",
        );
        let outcome = bridge.resource_offers(&[offer]);

        assert!(outcome.aborted_session());
        assert!(outcome
            .error()
            .map_or(false, |e| e.to_string().contains("launch refused")));
        assert!(session.outbound().is_empty());
    }
}
