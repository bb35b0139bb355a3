//! Out-of-process handler speaking JSON lines.
//!
//! Each callback is written to the child's stdin as one [`ProcessRequest`]
//! line; the child answers with one [`ProcessResponse`] line carrying the same
//! `request_id`. Responses may ask the bridge to act on the driver on the
//! handler's behalf (launch tasks, send a status update, ...). Lines on stdout
//! that are not responses are logged and skipped; stderr goes to the log.

use super::{Executor, Scheduler};
use crate::converter::{HandlerValue, ProtocolValueConverter};
use crate::driver::{DriverStatus, ExecutorDriver, SchedulerDriver};
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{
    ExecutorId, Filters, OfferId, ProtocolRecord, SlaveId, TaskId, TaskInfo, TaskStatus,
};
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(rename = "type")]
    pub req_type: String,
    pub request_id: String,
    pub role: String,
    pub callback: String,
    pub args: Vec<HandlerValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    #[serde(rename = "type")]
    pub resp_type: String,
    pub request_id: String,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub actions: Vec<ProcessAction>,
}

/// Driver calls a handler process asks for in its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProcessAction {
    LaunchTasks {
        offer_id: HandlerValue,
        tasks: Vec<HandlerValue>,
        #[serde(default)]
        filters: Option<HandlerValue>,
    },
    DeclineOffer {
        offer_id: HandlerValue,
        #[serde(default)]
        filters: Option<HandlerValue>,
    },
    KillTask {
        task_id: HandlerValue,
    },
    ReviveOffers,
    SendStatusUpdate {
        status: HandlerValue,
    },
    SendFrameworkMessage {
        #[serde(default)]
        executor_id: Option<HandlerValue>,
        #[serde(default)]
        slave_id: Option<HandlerValue>,
        data: HandlerValue,
    },
}

struct ProcessIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

pub struct ProcessHandler {
    program: String,
    io: Mutex<Option<ProcessIo>>,
    converter: ProtocolValueConverter,
}

impl ProcessHandler {
    /// Starts `command[0]` with the remaining elements as arguments.
    pub fn spawn(command: &[String]) -> BridgeResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| BridgeError::ConfigError("handler command is empty".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BridgeError::ProcessError(format!("Failed to start handler {}: {}", program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::ProcessError("Failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::ProcessError("Failed to capture stdout".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let name = program.clone();
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    warn!("Handler {} stderr: {}", name, line);
                }
            });
        }

        info!("Started handler process {} (pid {})", program, child.id());

        Ok(Self {
            program: program.clone(),
            io: Mutex::new(Some(ProcessIo {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            })),
            converter: ProtocolValueConverter::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProcessIo>> {
        self.io.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        match self.lock().as_mut() {
            Some(io) => matches!(io.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Closes the handler's stdin and waits for it, killing it if it is
    /// still running afterwards.
    pub fn stop(&self) -> BridgeResult<()> {
        let Some(io) = self.lock().take() else {
            return Ok(());
        };
        let ProcessIo {
            mut child, stdin, ..
        } = io;
        drop(stdin);

        std::thread::sleep(std::time::Duration::from_millis(50));
        if child.try_wait()?.is_none() {
            child.kill()?;
        }
        let status = child.wait()?;
        info!("Handler process {} exited with {}", self.program, status);
        Ok(())
    }

    /// Sends one callback and waits for its response.
    pub fn call(
        &self,
        role: &str,
        callback: &str,
        args: Vec<HandlerValue>,
    ) -> anyhow::Result<Vec<ProcessAction>> {
        let mut guard = self.lock();
        let io = guard
            .as_mut()
            .ok_or_else(|| BridgeError::ProcessError("Handler process not running".to_string()))?;

        let request = ProcessRequest {
            req_type: "event".to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
            role: role.to_string(),
            callback: callback.to_string(),
            args,
        };
        let json = serde_json::to_string(&request)?;

        writeln!(io.stdin, "{}", json)
            .and_then(|_| io.stdin.flush())
            .map_err(|e| {
                BridgeError::CommunicationError(format!("Failed to send {}: {}", callback, e))
            })?;

        let response = read_response(&mut io.stdout, &request.request_id)?;
        if !response.success {
            bail!(
                "{} handler reported failure: {}",
                callback,
                response.error.unwrap_or_else(|| "no error message".to_string())
            );
        }
        Ok(response.actions)
    }

    fn forward_scheduler(
        &self,
        driver: &dyn SchedulerDriver,
        callback: &str,
        args: Vec<HandlerValue>,
    ) -> anyhow::Result<()> {
        for action in self.call("scheduler", callback, args)? {
            let status = self.apply_scheduler_action(driver, action)?;
            if status != DriverStatus::Running {
                warn!("Driver call from {} returned {:?}", callback, status);
            }
        }
        Ok(())
    }

    fn forward_executor(
        &self,
        driver: &dyn ExecutorDriver,
        callback: &str,
        args: Vec<HandlerValue>,
    ) -> anyhow::Result<()> {
        for action in self.call("executor", callback, args)? {
            let status = self.apply_executor_action(driver, action)?;
            if status != DriverStatus::Running {
                warn!("Driver call from {} returned {:?}", callback, status);
            }
        }
        Ok(())
    }

    fn decode<R: ProtocolRecord>(&self, value: &HandlerValue) -> anyhow::Result<R> {
        Ok(self.converter.from_handler_value(value, R::SCHEMA)?)
    }

    fn decode_filters(&self, value: &Option<HandlerValue>) -> anyhow::Result<Option<Filters>> {
        value.as_ref().map(|v| self.decode::<Filters>(v)).transpose()
    }

    fn apply_scheduler_action(
        &self,
        driver: &dyn SchedulerDriver,
        action: ProcessAction,
    ) -> anyhow::Result<DriverStatus> {
        debug!("Applying handler action {:?}", action);
        let status = match action {
            ProcessAction::LaunchTasks {
                offer_id,
                tasks,
                filters,
            } => {
                let offer_id: OfferId = self.decode(&offer_id)?;
                let tasks = tasks
                    .iter()
                    .map(|task| self.decode::<TaskInfo>(task))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                driver.launch_tasks(&offer_id, tasks, self.decode_filters(&filters)?)
            }
            ProcessAction::DeclineOffer { offer_id, filters } => {
                let offer_id: OfferId = self.decode(&offer_id)?;
                driver.decline_offer(&offer_id, self.decode_filters(&filters)?)
            }
            ProcessAction::KillTask { task_id } => {
                let task_id: TaskId = self.decode(&task_id)?;
                driver.kill_task(&task_id)
            }
            ProcessAction::ReviveOffers => driver.revive_offers(),
            ProcessAction::SendFrameworkMessage {
                executor_id: Some(executor_id),
                slave_id: Some(slave_id),
                data,
            } => {
                let executor_id: ExecutorId = self.decode(&executor_id)?;
                let slave_id: SlaveId = self.decode(&slave_id)?;
                let data = data
                    .as_bytes()
                    .ok_or_else(|| anyhow!("framework message data must be bytes"))?;
                driver.send_framework_message(&executor_id, &slave_id, data)
            }
            ProcessAction::SendFrameworkMessage { .. } => {
                bail!("scheduler framework messages need executor_id and slave_id")
            }
            ProcessAction::SendStatusUpdate { .. } => {
                bail!("send_status_update is not available to schedulers")
            }
        };
        Ok(status)
    }

    fn apply_executor_action(
        &self,
        driver: &dyn ExecutorDriver,
        action: ProcessAction,
    ) -> anyhow::Result<DriverStatus> {
        debug!("Applying handler action {:?}", action);
        let status = match action {
            ProcessAction::SendStatusUpdate { status } => {
                let status: TaskStatus = self.decode(&status)?;
                driver.send_status_update(status)
            }
            ProcessAction::SendFrameworkMessage { data, .. } => {
                let data = data
                    .as_bytes()
                    .ok_or_else(|| anyhow!("framework message data must be bytes"))?;
                driver.send_framework_message(data)
            }
            other => bail!("{:?} is not available to executors", other),
        };
        Ok(status)
    }
}

fn read_response(
    stdout: &mut BufReader<ChildStdout>,
    request_id: &str,
) -> anyhow::Result<ProcessResponse> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = stdout
            .read_line(&mut line)
            .context("Failed to read handler response")?;
        if read == 0 {
            return Err(BridgeError::CommunicationError(
                "Handler process closed its stdout".to_string(),
            )
            .into());
        }

        let trimmed = line.trim();
        match serde_json::from_str::<ProcessResponse>(trimmed) {
            Ok(response) if response.request_id == request_id => return Ok(response),
            Ok(response) => {
                return Err(BridgeError::CommunicationError(format!(
                    "Expected response to {}, got {}",
                    request_id, response.request_id
                ))
                .into())
            }
            Err(_) => debug!("Handler stdout: {}", trimmed),
        }
    }
}

impl Drop for ProcessHandler {
    fn drop(&mut self) {
        self.stop().ok();
    }
}

impl Scheduler for ProcessHandler {
    fn registered(
        &self,
        driver: &dyn SchedulerDriver,
        framework_id: HandlerValue,
        master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "registered", vec![framework_id, master_info])
    }

    fn reregistered(
        &self,
        driver: &dyn SchedulerDriver,
        master_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "reregistered", vec![master_info])
    }

    fn disconnected(&self, driver: &dyn SchedulerDriver) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "disconnected", vec![])
    }

    fn resource_offers(
        &self,
        driver: &dyn SchedulerDriver,
        offers: HandlerValue,
    ) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "resource_offers", vec![offers])
    }

    fn offer_rescinded(
        &self,
        driver: &dyn SchedulerDriver,
        offer_id: HandlerValue,
    ) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "offer_rescinded", vec![offer_id])
    }

    fn status_update(&self, driver: &dyn SchedulerDriver, status: HandlerValue) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "status_update", vec![status])
    }

    fn framework_message(
        &self,
        driver: &dyn SchedulerDriver,
        executor_id: HandlerValue,
        slave_id: HandlerValue,
        data: HandlerValue,
    ) -> anyhow::Result<()> {
        self.forward_scheduler(
            driver,
            "framework_message",
            vec![executor_id, slave_id, data],
        )
    }

    fn slave_lost(&self, driver: &dyn SchedulerDriver, slave_id: HandlerValue) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "slave_lost", vec![slave_id])
    }

    fn executor_lost(
        &self,
        driver: &dyn SchedulerDriver,
        executor_id: HandlerValue,
        slave_id: HandlerValue,
        status: HandlerValue,
    ) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "executor_lost", vec![executor_id, slave_id, status])
    }

    fn error(&self, driver: &dyn SchedulerDriver, message: HandlerValue) -> anyhow::Result<()> {
        self.forward_scheduler(driver, "error", vec![message])
    }
}

impl Executor for ProcessHandler {
    fn registered(
        &self,
        driver: &dyn ExecutorDriver,
        executor_info: HandlerValue,
        framework_info: HandlerValue,
        slave_info: HandlerValue,
    ) -> anyhow::Result<()> {
        self.forward_executor(
            driver,
            "registered",
            vec![executor_info, framework_info, slave_info],
        )
    }

    fn reregistered(&self, driver: &dyn ExecutorDriver, slave_info: HandlerValue) -> anyhow::Result<()> {
        self.forward_executor(driver, "reregistered", vec![slave_info])
    }

    fn disconnected(&self, driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        self.forward_executor(driver, "disconnected", vec![])
    }

    fn launch_task(&self, driver: &dyn ExecutorDriver, task: HandlerValue) -> anyhow::Result<()> {
        self.forward_executor(driver, "launch_task", vec![task])
    }

    fn kill_task(&self, driver: &dyn ExecutorDriver, task_id: HandlerValue) -> anyhow::Result<()> {
        self.forward_executor(driver, "kill_task", vec![task_id])
    }

    fn framework_message(&self, driver: &dyn ExecutorDriver, data: HandlerValue) -> anyhow::Result<()> {
        self.forward_executor(driver, "framework_message", vec![data])
    }

    fn shutdown(&self, driver: &dyn ExecutorDriver) -> anyhow::Result<()> {
        self.forward_executor(driver, "shutdown", vec![])
    }

    fn error(&self, driver: &dyn ExecutorDriver, message: HandlerValue) -> anyhow::Result<()> {
        self.forward_executor(driver, "error", vec![message])
    }
}
