use anyhow::{anyhow, bail};
use framework_bridge_lib::bridge::{ExecutorEventBridge, SchedulerEventBridge};
use framework_bridge_lib::config::{BridgeConfig, ConfigLoader, HandlerKind};
use framework_bridge_lib::driver::{LocalExecutorDriver, LocalSchedulerDriver, LocalSession};
use framework_bridge_lib::handlers::{
    Executor, LogExecutor, LogScheduler, ProcessHandler, Scheduler,
};
use framework_bridge_lib::log_error;
use framework_bridge_lib::logging::{init_logging, setup_panic_handler, LoggingConfig};
use framework_bridge_lib::replay::{
    replay_executor, replay_scheduler, ReplayReport, ReplayTranscript,
};
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let result = std::panic::catch_unwind(run_app);

    match result {
        Ok(Ok(())) => {
            info!("Bridge exited successfully");
        }
        Ok(Err(e)) => {
            error!("Bridge error: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        Err(panic) => {
            error!("Bridge panicked: {:?}", panic);
            std::process::exit(2);
        }
    }
}

fn run_app() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (config_path, transcript_path) = match (args.next(), args.next()) {
        (Some(config), Some(transcript)) => (config, transcript),
        _ => bail!("usage: framework-bridge <config.json> <transcript.json>"),
    };

    let config = ConfigLoader::load_from_file(&config_path);
    let logging = match &config {
        Ok(config) => LoggingConfig::from(&config.logging),
        Err(_) => LoggingConfig::default(),
    };
    let _log_guard = init_logging(logging)?;
    setup_panic_handler();

    info!("Starting framework-bridge v{}", env!("CARGO_PKG_VERSION"));

    #[cfg(not(debug_assertions))]
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        let guard = sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some("production".into()),
                before_send: Some(Arc::new(|event| {
                    info!("Sending error to Sentry: {:?}", event);
                    Some(event)
                })),
                ..Default::default()
            },
        ));
        info!("Sentry crash reporting initialized");
        guard
    });

    let config = log_error!(config, "load_configuration")?;
    let transcript = log_error!(
        ReplayTranscript::load_from_file(&transcript_path),
        "load_transcript"
    )?;

    let report = run_replay(&config, transcript)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    match report.aborted_at {
        Some(index) => Err(anyhow!("session aborted at event {}", index)),
        None => Ok(()),
    }
}

fn run_replay(
    config: &BridgeConfig,
    transcript: ReplayTranscript,
) -> anyhow::Result<ReplayReport> {
    let session = Arc::new(LocalSession::new());
    let policy = config.invocation.policy();
    info!(
        "Replaying {} {} events with the {} handler",
        transcript.len(),
        transcript.role(),
        config.handler.kind.as_str()
    );

    let report = match transcript {
        ReplayTranscript::Scheduler { events } => {
            let scheduler: Arc<dyn Scheduler> = match config.handler.kind {
                HandlerKind::Log => Arc::new(LogScheduler::new()),
                HandlerKind::Process => Arc::new(ProcessHandler::spawn(&config.handler.command)?),
            };
            let driver = Arc::new(LocalSchedulerDriver::new(session.clone()));
            let bridge = SchedulerEventBridge::new(scheduler, driver).with_policy(policy);
            replay_scheduler(&bridge, &session, &events)
        }
        ReplayTranscript::Executor { events } => {
            let executor: Arc<dyn Executor> = match config.handler.kind {
                HandlerKind::Log => Arc::new(LogExecutor::new()),
                HandlerKind::Process => Arc::new(ProcessHandler::spawn(&config.handler.command)?),
            };
            let driver = Arc::new(LocalExecutorDriver::new(session.clone()));
            let bridge = ExecutorEventBridge::new(executor, driver).with_policy(policy);
            replay_executor(&bridge, &session, &events)
        }
    };

    session.stop();
    Ok(report)
}
