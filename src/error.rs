use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure converting a protocol record to or from its handler-side value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("record of schema '{actual}' cannot be converted as '{requested}'")]
    SchemaMismatch { requested: String, actual: String },

    #[error("{schema} is missing required fields: {}", .missing.join(", "))]
    Uninitialized { schema: String, missing: Vec<String> },

    #[error("{schema} element {index} failed to convert: {source}")]
    SequenceElement {
        schema: String,
        index: usize,
        #[source]
        source: Box<ConversionError>,
    },

    #[error("cannot decode {schema} from handler value: {message}")]
    Decode { schema: String, message: String },

    #[error("{schema} field {path} is not a finite number")]
    NonFinite { schema: String, path: String },
}

impl ConversionError {
    /// Name of the schema whose conversion failed.
    pub fn schema(&self) -> &str {
        match self {
            ConversionError::UnknownSchema(schema) => schema,
            ConversionError::SchemaMismatch { requested, .. } => requested,
            ConversionError::Uninitialized { schema, .. } => schema,
            ConversionError::SequenceElement { schema, .. } => schema,
            ConversionError::Decode { schema, .. } => schema,
            ConversionError::NonFinite { schema, .. } => schema,
        }
    }
}

pub type ConversionResult<T> = Result<T, ConversionError>;

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to convert payload for {callback}: {source}")]
    ConversionFailed {
        callback: &'static str,
        #[source]
        source: ConversionError,
    },

    #[error("Handler failed in {callback}: {message}")]
    HandlerError {
        callback: &'static str,
        message: String,
    },

    #[error("Handler panicked in {callback}: {message}")]
    HandlerPanicked {
        callback: &'static str,
        message: String,
    },

    #[error("Handler did not return from {callback} within {timeout_ms}ms")]
    HandlerTimeout {
        callback: &'static str,
        timeout_ms: u128,
    },

    #[error("Handler process error: {0}")]
    ProcessError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Operator-facing summary of a [`BridgeError`], emitted with the log line
/// that reports it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Diagnostic {
    pub title: String,
    pub error_code: String,
    pub severity: ErrorSeverity,
    pub aborts_session: bool,
    pub suggested_action: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

impl BridgeError {
    /// Whether the failing callback is one the bridge would abort the session for.
    pub fn is_callback_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::ConversionFailed { .. }
                | BridgeError::HandlerError { .. }
                | BridgeError::HandlerPanicked { .. }
                | BridgeError::HandlerTimeout { .. }
        )
    }

    /// Callback name for callback failures.
    pub fn callback(&self) -> Option<&'static str> {
        match self {
            BridgeError::ConversionFailed { callback, .. }
            | BridgeError::HandlerError { callback, .. }
            | BridgeError::HandlerPanicked { callback, .. }
            | BridgeError::HandlerTimeout { callback, .. } => Some(*callback),
            _ => None,
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            BridgeError::ConfigError(_) => Diagnostic {
                title: "Configuration Error".to_string(),
                error_code: "CONFIG_001".to_string(),
                severity: ErrorSeverity::Error,
                aborts_session: false,
                suggested_action: Some(
                    "Please check your configuration file and try again.".to_string(),
                ),
            },

            BridgeError::ConversionFailed { source, .. } => Diagnostic {
                title: format!("Conversion Error ({})", source.schema()),
                error_code: "CONV_001".to_string(),
                severity: ErrorSeverity::Critical,
                aborts_session: true,
                suggested_action: Some(
                    "The driver delivered a record the handler cannot represent.".to_string(),
                ),
            },

            BridgeError::Conversion(source) => Diagnostic {
                title: format!("Conversion Error ({})", source.schema()),
                error_code: "CONV_002".to_string(),
                severity: ErrorSeverity::Error,
                aborts_session: false,
                suggested_action: None,
            },

            BridgeError::HandlerError { .. } => Diagnostic {
                title: "Handler Error".to_string(),
                error_code: "HANDLER_001".to_string(),
                severity: ErrorSeverity::Error,
                aborts_session: true,
                suggested_action: Some("Check the framework handler's logs.".to_string()),
            },

            BridgeError::HandlerPanicked { .. } => Diagnostic {
                title: "Handler Panic".to_string(),
                error_code: "HANDLER_002".to_string(),
                severity: ErrorSeverity::Critical,
                aborts_session: true,
                suggested_action: Some("Check the framework handler's logs.".to_string()),
            },

            BridgeError::HandlerTimeout { .. } => Diagnostic {
                title: "Handler Timeout".to_string(),
                error_code: "HANDLER_003".to_string(),
                severity: ErrorSeverity::Error,
                aborts_session: true,
                suggested_action: Some(
                    "Raise handler_timeout_ms or move slow work off the callback.".to_string(),
                ),
            },

            BridgeError::ProcessError(_) => Diagnostic {
                title: "Process Error".to_string(),
                error_code: "PROC_001".to_string(),
                severity: ErrorSeverity::Error,
                aborts_session: false,
                suggested_action: Some("Check the handler command and its output.".to_string()),
            },

            BridgeError::CommunicationError(_) => Diagnostic {
                title: "Communication Error".to_string(),
                error_code: "COMM_001".to_string(),
                severity: ErrorSeverity::Warning,
                aborts_session: false,
                suggested_action: Some("Restart the handler process.".to_string()),
            },

            BridgeError::SessionError(_) => Diagnostic {
                title: "Session Error".to_string(),
                error_code: "SESSION_001".to_string(),
                severity: ErrorSeverity::Warning,
                aborts_session: false,
                suggested_action: None,
            },

            BridgeError::IoError(_) => Diagnostic {
                title: "File System Error".to_string(),
                error_code: "IO_001".to_string(),
                severity: ErrorSeverity::Error,
                aborts_session: false,
                suggested_action: Some("Check file permissions and disk space.".to_string()),
            },

            BridgeError::JsonError(_) => Diagnostic {
                title: "Data Format Error".to_string(),
                error_code: "JSON_001".to_string(),
                severity: ErrorSeverity::Warning,
                aborts_session: false,
                suggested_action: None,
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code, self.title)
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
