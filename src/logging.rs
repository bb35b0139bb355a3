use crate::config::LoggingSettings;
use chrono::Local;
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

pub struct LoggingConfig {
    pub level: Level,
    pub log_to_file: bool,
    pub log_to_console: bool,
    pub log_dir: PathBuf,
}

pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("framework-bridge")
        .join("logs")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_to_file: true,
            log_to_console: cfg!(debug_assertions),
            log_dir: default_log_dir(),
        }
    }
}

impl From<&LoggingSettings> for LoggingConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.parsed_level().unwrap_or(Level::INFO),
            log_to_file: settings.log_to_file,
            log_to_console: settings.log_to_console,
            log_dir: settings
                .log_directory
                .clone()
                .unwrap_or_else(default_log_dir),
        }
    }
}

/// Installs the global subscriber. Keep the returned guard alive for as long
/// as file logging should keep flushing.
pub fn init_logging(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "framework_bridge={level},framework_bridge_lib={level}",
            level = config.level
        )
    }));

    let registry = Registry::default().with(env_filter);

    let log_dir_path = config.log_dir.clone();
    let mut guard = None;

    if config.log_to_file {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = rolling::daily(config.log_dir, "framework-bridge.log");
        let (non_blocking_file, file_guard) = non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::ChronoLocal::new(
                "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            ));

        let subscriber = registry.with(file_layer);

        if config.log_to_console {
            let console_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE);

            subscriber.with(console_layer).try_init()?;
        } else {
            subscriber.try_init()?;
        }
    } else if config.log_to_console {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE);

        registry.with(console_layer).try_init()?;
    }

    tracing::info!("Logging initialized at level: {:?}", config.level);
    if guard.is_some() {
        tracing::info!("Log directory: {:?}", log_dir_path);
    }
    tracing::info!("Bridge started at {}", Local::now());

    Ok(guard)
}

#[macro_export]
macro_rules! log_error {
    ($result:expr, $context:expr) => {
        $result.map_err(|e| {
            tracing::error!("Error in {}: {:?}", $context, e);
            e
        })
    };
}

pub fn log_panic(info: &std::panic::PanicHookInfo) {
    let location = if let Some(location) = info.location() {
        format!(
            "{}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        )
    } else {
        "unknown location".to_string()
    };

    let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic payload".to_string()
    };

    tracing::error!(
        "PANIC at {}: {}\nBacktrace:\n{:?}",
        location,
        message,
        std::backtrace::Backtrace::capture()
    );
}

/// Logs panics before unwinding. Handler panics are caught by the bridge, so
/// this also records panics the bridge turns into session aborts.
///
/// Crash reporting goes through the sentry client `main` installs; its panic
/// integration wraps this hook, so the hook itself only logs.
pub fn setup_panic_handler() {
    std::panic::set_hook(Box::new(log_panic));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_map_onto_logging_config() {
        let settings = LoggingSettings {
            level: "warn".to_string(),
            log_to_file: false,
            log_to_console: true,
            log_directory: Some(PathBuf::from("/tmp/bridge-logs")),
        };

        let config = LoggingConfig::from(&settings);

        assert_eq!(config.level, Level::WARN);
        assert!(!config.log_to_file);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/bridge-logs"));
    }

    #[test]
    fn default_log_dir_is_namespaced() {
        assert!(default_log_dir().ends_with("framework-bridge/logs"));
    }

    #[test]
    fn recovered_panics_leave_crash_reporting_alone() {
        setup_panic_handler();

        for _ in 0..3 {
            let caught = std::panic::catch_unwind(|| panic!("handler blew up"));
            assert!(caught.is_err());
        }

        assert!(sentry::Hub::current().client().is_none());
    }

    #[test]
    fn log_error_passes_results_through() {
        let ok: Result<u8, String> = Ok(3);
        assert_eq!(crate::log_error!(ok, "test"), Ok(3));

        let err: Result<u8, String> = Err("bad".to_string());
        assert_eq!(crate::log_error!(err, "test"), Err("bad".to_string()));
    }
}
