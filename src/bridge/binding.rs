use super::{DeliveryOutcome, EventKind};
use crate::converter::ProtocolValueConverter;
use crate::driver::SessionControl;
use crate::error::{BridgeError, ConversionResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, Span};
use uuid::Uuid;

/// How handler methods are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationPolicy {
    /// Hold the session-wide execution lock for the duration of each call.
    /// Required when the handler runtime is not reentrant.
    pub serialize_calls: bool,
    /// Watchdog deadline. A handler that has not returned by then is treated
    /// as failed and the session is aborted; the call itself keeps running
    /// on its own thread.
    pub timeout: Option<Duration>,
}

impl Default for InvocationPolicy {
    fn default() -> Self {
        Self {
            serialize_calls: true,
            timeout: None,
        }
    }
}

/// A handler bound to the driver session that feeds it.
///
/// Read-only after construction, so driver threads share it without locking.
/// The only lock is the execution lock around handler calls.
pub struct HandlerBinding<H: ?Sized, D: ?Sized> {
    role: &'static str,
    session_id: Uuid,
    handler: Arc<H>,
    driver: Arc<D>,
    execution_lock: Arc<Mutex<()>>,
    policy: InvocationPolicy,
}

impl<H, D> HandlerBinding<H, D>
where
    H: ?Sized + Send + Sync + 'static,
    D: ?Sized + SessionControl + 'static,
{
    pub fn new(role: &'static str, handler: Arc<H>, driver: Arc<D>) -> Self {
        Self {
            role,
            session_id: Uuid::new_v4(),
            handler,
            driver,
            execution_lock: Arc::new(Mutex::new(())),
            policy: InvocationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: InvocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shares one execution lock between bindings, e.g. a scheduler and an
    /// executor bridge calling into the same runtime.
    pub fn with_execution_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.execution_lock = lock;
        self
    }

    pub fn role(&self) -> &'static str {
        self.role
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    pub fn execution_lock(&self) -> &Arc<Mutex<()>> {
        &self.execution_lock
    }

    pub fn policy(&self) -> InvocationPolicy {
        self.policy
    }

    /// Converts every payload, then invokes the handler once.
    pub(crate) fn deliver<A, C, F>(
        &self,
        converter: &ProtocolValueConverter,
        kind: EventKind,
        convert: C,
        call: F,
    ) -> DeliveryOutcome
    where
        A: Send + 'static,
        C: FnOnce(&ProtocolValueConverter) -> ConversionResult<A>,
        F: FnOnce(&H, &D, A) -> anyhow::Result<()> + Send + 'static,
    {
        let callback = kind.callback_name();
        let span = tracing::debug_span!(
            "callback",
            session = %self.session_id,
            role = self.role,
            callback
        );
        let _entered = span.enter();

        let args = match convert(converter) {
            Ok(args) => args,
            Err(source) => {
                let err = BridgeError::ConversionFailed { callback, source };
                error!(
                    "Failed to convert payload for {}'s {}: {} {}",
                    self.role,
                    callback,
                    err.diagnostic(),
                    err
                );
                self.driver.abort();
                return DeliveryOutcome::Aborted(err);
            }
        };

        debug!("Invoking {}'s {}", self.role, callback);
        match self.invoke(callback, move |handler, driver| call(handler, driver, args)) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(err) if kind.aborts_on_handler_failure() => {
                error!(
                    "Failed to call {}'s {}: {} {}",
                    self.role,
                    callback,
                    err.diagnostic(),
                    err
                );
                self.driver.abort();
                DeliveryOutcome::Aborted(err)
            }
            Err(err) => {
                error!("Failed to call {}'s {}: {}", self.role, callback, err);
                DeliveryOutcome::Logged(err)
            }
        }
    }

    fn invoke<F>(&self, callback: &'static str, call: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&H, &D) -> anyhow::Result<()> + Send + 'static,
    {
        let handler = Arc::clone(&self.handler);
        let driver = Arc::clone(&self.driver);
        let lock = self
            .policy
            .serialize_calls
            .then(|| Arc::clone(&self.execution_lock));
        let span = Span::current();

        let run = move || -> Result<(), BridgeError> {
            let _entered = span.enter();
            let _guard = lock
                .as_ref()
                .map(|lock| lock.lock().unwrap_or_else(|e| e.into_inner()));

            match panic::catch_unwind(AssertUnwindSafe(|| call(&*handler, &*driver))) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(BridgeError::HandlerError {
                    callback,
                    message: format!("{:#}", e),
                }),
                Err(payload) => Err(BridgeError::HandlerPanicked {
                    callback,
                    message: panic_message(payload.as_ref()),
                }),
            }
        };

        let Some(timeout) = self.policy.timeout else {
            return run();
        };

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("{}-{}", self.role, callback))
            .spawn(move || {
                let _ = tx.send(run());
            })
            .map_err(|e| BridgeError::HandlerError {
                callback,
                message: format!("failed to spawn handler thread: {}", e),
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(BridgeError::HandlerTimeout {
                callback,
                timeout_ms: timeout.as_millis(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::HandlerPanicked {
                callback,
                message: "handler thread exited without a result".to_string(),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic payload".to_string()
    }
}
