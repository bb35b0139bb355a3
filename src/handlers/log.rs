//! Handlers that only log what they receive.
//!
//! Used by the replay binary when no handler process is configured.
//!
//! ## Example output
//! ```text
//! [registered] framework_id="fw-1" master="master@10.0.0.1"
//! [resource_offers] count=2 hosts=["node-1", "node-2"]
//! [status_update] task="task-1" state="TASK_RUNNING"
//! [framework_message] bytes=5
//! ```

use super::{Executor, Scheduler};
use crate::converter::HandlerValue;
use crate::driver::{ExecutorDriver, SchedulerDriver};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

fn text<'a>(value: &'a HandlerValue, path: &str) -> &'a str {
    value
        .path(path)
        .and_then(HandlerValue::as_text)
        .unwrap_or("?")
}

#[derive(Debug, Default)]
pub struct LogScheduler {
    events: AtomicUsize,
}

impl LogScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks received so far.
    pub fn events(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }

    fn seen(&self) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }
}

impl Scheduler for LogScheduler {
    fn registered(
        &self,
        _driver: &dyn SchedulerDriver,
        framework_id: HandlerValue,
        master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!(
            "[registered] framework_id={:?} master={:?}",
            text(&framework_id, "value"),
            text(&master_info, "id")
        );
        Ok(())
    }

    fn reregistered(
        &self,
        _driver: &dyn SchedulerDriver,
        master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!("[reregistered] master={:?}", text(&master_info, "id"));
        Ok(())
    }

    fn disconnected(&self, _driver: &dyn SchedulerDriver) -> anyhow::Result<()> {
        self.seen();
        info!("[disconnected]");
        Ok(())
    }

    fn resource_offers(
        &self,
        _driver: &dyn SchedulerDriver,
        offers: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        let offers = offers.as_list().unwrap_or_default();
        let hosts: Vec<&str> = offers.iter().map(|o| text(o, "hostname")).collect();
        info!("[resource_offers] count={} hosts={:?}", offers.len(), hosts);
        Ok(())
    }

    fn offer_rescinded(
        &self,
        _driver: &dyn SchedulerDriver,
        offer_id: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!("[offer_rescinded] offer={:?}", text(&offer_id, "value"));
        Ok(())
    }

    fn status_update(
        &self,
        _driver: &dyn SchedulerDriver,
        status: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!(
            "[status_update] task={:?} state={:?}",
            text(&status, "task_id.value"),
            text(&status, "state")
        );
        Ok(())
    }

    fn framework_message(
        &self,
        _driver: &dyn SchedulerDriver,
        executor_id: HandlerValue,
        slave_id: HandlerValue,
        data: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!(
            "[framework_message] executor={:?} slave={:?} bytes={}",
            text(&executor_id, "value"),
            text(&slave_id, "value"),
            data.as_bytes().map_or(0, <[u8]>::len)
        );
        Ok(())
    }

    fn slave_lost(&self, _driver: &dyn SchedulerDriver, slave_id: HandlerValue) -> anyhow::Result<()> {
        self.seen();
        info!("[slave_lost] slave={:?}", text(&slave_id, "value"));
        Ok(())
    }

    fn executor_lost(
        &self,
        _driver: &dyn SchedulerDriver,
        executor_id: HandlerValue,
        slave_id: HandlerValue,
        status: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!(
            "[executor_lost] executor={:?} slave={:?} status={:?}",
            text(&executor_id, "value"),
            text(&slave_id, "value"),
            status.as_int()
        );
        Ok(())
    }

    fn error(&self, _driver: &dyn SchedulerDriver, message: HandlerValue) -> anyhow::Result<()> {
        self.seen();
        warn!("[error] {}", message.to_text_lossy());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogExecutor {
    events: AtomicUsize,
}

impl LogExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }

    fn seen(&self) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }
}

impl Executor for LogExecutor {
    fn registered(
        &self,
        _driver: &dyn ExecutorDriver,
        executor_info: HandlerValue,
        framework_info: HandlerValue,
        slave_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!(
            "[registered] executor={:?} framework={:?} slave={:?}",
            text(&executor_info, "executor_id.value"),
            text(&framework_info, "name"),
            text(&slave_info, "hostname")
        );
        Ok(())
    }

    fn reregistered(
        &self,
        _driver: &dyn ExecutorDriver,
        slave_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!("[reregistered] slave={:?}", text(&slave_info, "hostname"));
        Ok(())
    }

    fn disconnected(&self, _driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        self.seen();
        info!("[disconnected]");
        Ok(())
    }

    fn launch_task(&self, _driver: &dyn ExecutorDriver, task: HandlerValue) -> anyhow::Result<()> {
        self.seen();
        info!(
            "[launch_task] task={:?} name={:?}",
            text(&task, "task_id.value"),
            text(&task, "name")
        );
        Ok(())
    }

    fn kill_task(&self, _driver: &dyn ExecutorDriver, task_id: HandlerValue) -> anyhow::Result<()> {
        self.seen();
        info!("[kill_task] task={:?}", text(&task_id, "value"));
        Ok(())
    }

    fn framework_message(
        &self,
        _driver: &dyn ExecutorDriver,
        data: HandlerValue,
    ) -> anyhow::Result<()> {
        self.seen();
        info!(
            "[framework_message] bytes={}",
            data.as_bytes().map_or(0, <[u8]>::len)
        );
        Ok(())
    }

    fn shutdown(&self, _driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        self.seen();
        info!("[shutdown]");
        Ok(())
    }

    fn error(&self, _driver: &dyn ExecutorDriver, message: HandlerValue) -> anyhow::Result<()> {
        self.seen();
        warn!("[error] {}", message.to_text_lossy());
        Ok(())
    }
}
