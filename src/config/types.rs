use crate::bridge::InvocationPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(rename = "logToFile", default = "default_true")]
    pub log_to_file: bool,
    #[serde(rename = "logToConsole", default = "default_true")]
    pub log_to_console: bool,
    #[serde(rename = "logDirectory")]
    pub log_directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_to_file: true,
            log_to_console: true,
            log_directory: None,
        }
    }
}

impl LoggingSettings {
    pub fn parsed_level(&self) -> Option<Level> {
        self.level.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationSettings {
    #[serde(rename = "serializeHandlerCalls", default = "default_true")]
    pub serialize_handler_calls: bool,
    #[serde(rename = "handlerTimeoutMs")]
    pub handler_timeout_ms: Option<u64>,
}

impl Default for InvocationSettings {
    fn default() -> Self {
        Self {
            serialize_handler_calls: true,
            handler_timeout_ms: None,
        }
    }
}

impl InvocationSettings {
    pub fn policy(&self) -> InvocationPolicy {
        InvocationPolicy {
            serialize_calls: self.serialize_handler_calls,
            timeout: self.handler_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    #[default]
    Log,
    Process,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Log => "log",
            HandlerKind::Process => "process",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerSettings {
    #[serde(default)]
    pub kind: HandlerKind,
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub version: String,
    pub metadata: ConfigMetadata,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub invocation: InvocationSettings,
    #[serde(default)]
    pub handler: HandlerSettings,
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.version.is_empty() {
            errors.push("Configuration version is required".to_string());
        }

        if self.metadata.name.is_empty() {
            errors.push("Configuration name is required".to_string());
        }

        if self.logging.parsed_level().is_none() {
            errors.push(format!("Unknown log level: {}", self.logging.level));
        }

        if self.invocation.handler_timeout_ms == Some(0) {
            errors.push("handlerTimeoutMs must be greater than zero".to_string());
        }

        if self.handler.kind == HandlerKind::Process && self.handler.command.is_empty() {
            errors.push("A process handler needs a command".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn summary(&self) -> String {
        let timeout = self
            .invocation
            .handler_timeout_ms
            .map_or_else(|| "none".to_string(), |ms| format!("{}ms", ms));
        format!(
            "Configuration: {} (v{})\nHandler: {}, Serialized: {}, Timeout: {}",
            self.metadata.name,
            self.version,
            self.handler.kind.as_str(),
            self.invocation.serialize_handler_calls,
            timeout
        )
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
