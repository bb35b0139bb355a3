use super::{DeliveryOutcome, EventKind, ExecutorEvent, HandlerBinding, InvocationPolicy};
use crate::converter::ProtocolValueConverter;
use crate::driver::ExecutorDriver;
use crate::handlers::Executor;
use crate::protocol::{ExecutorInfo, FrameworkInfo, ProtocolRecord, SlaveInfo, TaskId, TaskInfo};
use std::sync::{Arc, Mutex};

/// Callbacks an executor driver delivers.
pub trait ExecutorCallbacks: Send + Sync {
    fn registered(
        &self,
        executor_info: &ExecutorInfo,
        framework_info: &FrameworkInfo,
        slave_info: &SlaveInfo,
    ) -> DeliveryOutcome;

    fn reregistered(&self, slave_info: &SlaveInfo) -> DeliveryOutcome;

    fn disconnected(&self) -> DeliveryOutcome;

    fn launch_task(&self, task: &TaskInfo) -> DeliveryOutcome;

    fn kill_task(&self, task_id: &TaskId) -> DeliveryOutcome;

    fn framework_message(&self, data: &[u8]) -> DeliveryOutcome;

    fn shutdown(&self) -> DeliveryOutcome;

    fn error(&self, message: &str) -> DeliveryOutcome;

    fn dispatch(&self, event: &ExecutorEvent) -> DeliveryOutcome {
        match event {
            ExecutorEvent::Registered {
                executor_info,
                framework_info,
                slave_info,
            } => self.registered(executor_info, framework_info, slave_info),
            ExecutorEvent::Reregistered { slave_info } => self.reregistered(slave_info),
            ExecutorEvent::Disconnected => self.disconnected(),
            ExecutorEvent::LaunchTask { task } => self.launch_task(task),
            ExecutorEvent::KillTask { task_id } => self.kill_task(task_id),
            ExecutorEvent::FrameworkMessage { data } => self.framework_message(data),
            ExecutorEvent::Shutdown => self.shutdown(),
            ExecutorEvent::Error { message } => self.error(message),
        }
    }
}

/// Forwards executor driver callbacks to an [`Executor`] handler.
pub struct ExecutorEventBridge {
    binding: HandlerBinding<dyn Executor, dyn ExecutorDriver>,
    converter: Arc<ProtocolValueConverter>,
}

impl ExecutorEventBridge {
    pub fn new(executor: Arc<dyn Executor>, driver: Arc<dyn ExecutorDriver>) -> Self {
        Self {
            binding: HandlerBinding::new("executor", executor, driver),
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

    pub fn binding(&self) -> &HandlerBinding<dyn Executor, dyn ExecutorDriver> {
        &self.binding
    }

    pub fn converter(&self) -> &Arc<ProtocolValueConverter> {
        &self.converter
    }
}

impl ExecutorCallbacks for ExecutorEventBridge {
    fn registered(
        &self,
        executor_info: &ExecutorInfo,
        framework_info: &FrameworkInfo,
        slave_info: &SlaveInfo,
    ) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Registered,
            |c| {
                Ok((
                    c.to_handler_value(executor_info, ExecutorInfo::SCHEMA)?,
                    c.to_handler_value(framework_info, FrameworkInfo::SCHEMA)?,
                    c.to_handler_value(slave_info, SlaveInfo::SCHEMA)?,
                ))
            },
            |executor, driver, (executor_info, framework_info, slave_info)| {
                executor.registered(driver, executor_info, framework_info, slave_info)
            },
        )
    }

    fn reregistered(&self, slave_info: &SlaveInfo) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Reregistered,
            |c| c.to_handler_value(slave_info, SlaveInfo::SCHEMA),
            |executor, driver, slave_info| executor.reregistered(driver, slave_info),
        )
    }

    fn disconnected(&self) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Disconnected,
            |_| Ok(()),
            |executor, driver, ()| executor.disconnected(driver),
        )
    }

    fn launch_task(&self, task: &TaskInfo) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::LaunchTask,
            |c| c.to_handler_value(task, TaskInfo::SCHEMA),
            |executor, driver, task| executor.launch_task(driver, task),
        )
    }

    fn kill_task(&self, task_id: &TaskId) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::KillTask,
            |c| c.to_handler_value(task_id, TaskId::SCHEMA),
            |executor, driver, task_id| executor.kill_task(driver, task_id),
        )
    }

    fn framework_message(&self, data: &[u8]) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::FrameworkMessage,
            |c| Ok(c.bytes(data)),
            |executor, driver, data| executor.framework_message(driver, data),
        )
    }

    fn shutdown(&self) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Shutdown,
            |_| Ok(()),
            |executor, driver, ()| executor.shutdown(driver),
        )
    }

    fn error(&self, message: &str) -> DeliveryOutcome {
        self.binding.deliver(
            &self.converter,
            EventKind::Error,
            |c| Ok(c.bytes(message.as_bytes())),
            |executor, driver, message| executor.error(driver, message),
        )
    }
}
