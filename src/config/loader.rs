use super::types::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> BridgeResult<BridgeConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::ConfigError(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::ConfigError(format!("Failed to read configuration file: {}", e))
        })?;

        Self::load_from_string(&content)
    }

    pub fn load_from_string(json_str: &str) -> BridgeResult<BridgeConfig> {
        debug!(
            "Loading configuration (first 200 chars): {}",
            json_str.chars().take(200).collect::<String>()
        );

        let config: BridgeConfig = serde_json::from_str(json_str).map_err(|e| {
            debug!("Deserialization error details: {:?}", e);
            BridgeError::ConfigError(format!("Failed to parse JSON configuration: {}", e))
        })?;

        config
            .validate()
            .map_err(|errors| BridgeError::ConfigError(errors.join(", ")))?;

        info!("{}", config.summary().replace('\n', "; "));

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerKind;
    use std::time::Duration;

    fn load(json: &str) -> BridgeResult<BridgeConfig> {
        ConfigLoader::load_from_string(json)
    }

    fn config_error(json: &str) -> String {
        match load(json) {
            Err(BridgeError::ConfigError(message)) => message,
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load(r#"{"version": "1.0", "metadata": {"name": "replay"}}"#).unwrap();

        assert_eq!(config.handler.kind, HandlerKind::Log);
        assert_eq!(config.logging.level, "info");
        let policy = config.invocation.policy();
        assert!(policy.serialize_calls);
        assert_eq!(policy.timeout, None);
    }

    #[test]
    fn full_config() {
        let config = load(
            r#"{
                "version": "1.0",
                "metadata": {"name": "batch", "tags": ["prod"]},
                "logging": {"level": "debug", "logToFile": false},
                "invocation": {"serializeHandlerCalls": false, "handlerTimeoutMs": 250},
                "handler": {"kind": "process", "command": ["python3", "handler.py"]}
            }"#,
        )
        .unwrap();

        assert_eq!(config.handler.kind, HandlerKind::Process);
        assert_eq!(config.handler.command, vec!["python3", "handler.py"]);
        assert!(!config.logging.log_to_file);
        assert_eq!(config.logging.parsed_level(), Some(tracing::Level::DEBUG));
        let policy = config.invocation.policy();
        assert!(!policy.serialize_calls);
        assert_eq!(policy.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn empty_version_and_name_are_rejected() {
        let message = config_error(r#"{"version": "", "metadata": {"name": ""}}"#);
        assert!(message.contains("version is required"));
        assert!(message.contains("name is required"));
    }

    #[test]
    fn unknown_level_is_rejected() {
        let message = config_error(
            r#"{"version": "1", "metadata": {"name": "x"}, "logging": {"level": "loud"}}"#,
        );
        assert!(message.contains("Unknown log level: loud"));
    }

    #[test]
    fn process_handler_needs_a_command() {
        let message = config_error(
            r#"{"version": "1", "metadata": {"name": "x"}, "handler": {"kind": "process"}}"#,
        );
        assert!(message.contains("needs a command"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let message = config_error(
            r#"{"version": "1", "metadata": {"name": "x"}, "invocation": {"handlerTimeoutMs": 0}}"#,
        );
        assert!(message.contains("greater than zero"));
    }

    #[test]
    fn missing_file_is_reported() {
        let message = match ConfigLoader::load_from_file("/nonexistent/bridge.json") {
            Err(BridgeError::ConfigError(message)) => message,
            other => panic!("expected a configuration error, got {:?}", other),
        };
        assert!(message.contains("not found"));
    }
}
