//! Bridges cluster driver callbacks to framework scheduler and executor
//! handlers.
//!
//! A driver delivers callbacks carrying protocol records. The bridges in
//! [`bridge`] convert every payload with [`converter::ProtocolValueConverter`]
//! and invoke the matching method on a [`handlers::Scheduler`] or
//! [`handlers::Executor`]. Conversion failures and handler failures abort the
//! driver session; nothing is retried.

pub mod bridge;
pub mod config;
pub mod converter;
pub mod driver;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod protocol;
pub mod replay;

#[cfg(test)]
mod test;

pub use bridge::{
    DeliveryOutcome, EventKind, ExecutorCallbacks, ExecutorEventBridge, InvocationPolicy,
    SchedulerCallbacks, SchedulerEventBridge,
};
pub use converter::{HandlerValue, ProtocolValueConverter};
pub use error::{BridgeError, BridgeResult, ConversionError};
