//! Framework handler interfaces.
//!
//! A handler implements one method per driver callback. Every method receives
//! the driver first so it can reply from inside the callback, followed by the
//! converted payloads in a fixed order. Methods a handler does not override
//! do nothing; returning `Err` (or panicking) aborts the session, except from
//! `error`.

mod log;
mod process;

pub use self::log::{LogExecutor, LogScheduler};
pub use process::{ProcessAction, ProcessHandler, ProcessRequest, ProcessResponse};

use crate::converter::HandlerValue;
use crate::driver::{ExecutorDriver, SchedulerDriver};
use tracing::warn;

pub trait Scheduler: Send + Sync + 'static {
    /// Registered with a master. `framework_id` is the id the master
    /// generated for this framework.
    fn registered(
        &self,
        _driver: &dyn SchedulerDriver,
        _framework_id: HandlerValue,
        _master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Re-registered with a newly elected master.
    fn reregistered(
        &self,
        _driver: &dyn SchedulerDriver,
        _master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn disconnected(&self, _driver: &dyn SchedulerDriver) -> anyhow::Result<()> {
        Ok(())
    }

    /// `offers` is a [`HandlerValue::List`] of `Offer` records, in the
    /// order the driver delivered them.
    fn resource_offers(
        &self,
        _driver: &dyn SchedulerDriver,
        _offers: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn offer_rescinded(
        &self,
        _driver: &dyn SchedulerDriver,
        _offer_id: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returning from this callback acknowledges the update.
    fn status_update(
        &self,
        _driver: &dyn SchedulerDriver,
        _status: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn framework_message(
        &self,
        _driver: &dyn SchedulerDriver,
        _executor_id: HandlerValue,
        _slave_id: HandlerValue,
        _data: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn slave_lost(
        &self,
        _driver: &dyn SchedulerDriver,
        _slave_id: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn executor_lost(
        &self,
        _driver: &dyn SchedulerDriver,
        _executor_id: HandlerValue,
        _slave_id: HandlerValue,
        _status: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// The driver has already been aborted when this is called.
    fn error(&self, _driver: &dyn SchedulerDriver, message: HandlerValue) -> anyhow::Result<()> {
        warn!("Error from Mesos: {}", message.to_text_lossy());
        Ok(())
    }
}

pub trait Executor: Send + Sync + 'static {
    fn registered(
        &self,
        _driver: &dyn ExecutorDriver,
        _executor_info: HandlerValue,
        _framework_info: HandlerValue,
        _slave_info: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn reregistered(
        &self,
        _driver: &dyn ExecutorDriver,
        _slave_info: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn disconnected(&self, _driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        Ok(())
    }

    /// No other callback is delivered until this returns.
    fn launch_task(&self, _driver: &dyn ExecutorDriver, _task: HandlerValue) -> anyhow::Result<()> {
        Ok(())
    }

    /// The executor is responsible for sending the TASK_KILLED update.
    fn kill_task(
        &self,
        _driver: &dyn ExecutorDriver,
        _task_id: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn framework_message(
        &self,
        _driver: &dyn ExecutorDriver,
        _data: HandlerValue,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn shutdown(&self, _driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        Ok(())
    }

    /// The driver has already been aborted when this is called.
    fn error(&self, _driver: &dyn ExecutorDriver, message: HandlerValue) -> anyhow::Result<()> {
        warn!("Error from Mesos: {}", message.to_text_lossy());
        Ok(())
    }
}
