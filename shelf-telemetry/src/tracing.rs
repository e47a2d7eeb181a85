use std::io;
use std::sync::Once;

use ::tracing::info;
use shelf_config::{Environment, EnvironmentError};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

/// Directory receiving the rolling log files in production.
const LOGS_DIR: &str = "logs";

/// Variable enabling log output in tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

static INIT_TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] EnvironmentError),

    #[error("failed to bridge `log` records: {0}")]
    LogTracer(#[from] tracing_log::log::SetLoggerError),

    #[error("failed to create the log file appender: {0}")]
    Appender(#[from] InitError),

    #[error("failed to install the global subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Flushes buffered log lines when dropped.
///
/// Keep it alive until the end of `main`, otherwise the last lines written to a log file may be
/// lost.
#[must_use = "dropping the flusher stops file logging"]
pub struct LogFlusher {
    _guard: Option<WorkerGuard>,
}

/// Installs the global subscriber for the environment named by `APP_ENVIRONMENT`.
///
/// In development, human-readable lines go to stderr so command output on stdout stays clean.
/// In production, JSON lines go to a daily rolling file `logs/{app_name}.*.log`. `RUST_LOG`
/// overrides the default `info` filter in both cases.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    let environment = Environment::load()?;

    init_tracing_for(app_name, environment)
}

/// Same as [`init_tracing`] with an explicit environment.
pub fn init_tracing_for(
    app_name: &str,
    environment: Environment,
) -> Result<LogFlusher, TracingError> {
    LogTracer::init()?;

    let flusher = match environment {
        Environment::Dev => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(io::stderr))
                .try_init()?;

            LogFlusher { _guard: None }
        }
        Environment::Prod => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(app_name)
                .filename_suffix("log")
                .build(LOGS_DIR)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(writer),
                )
                .try_init()?;

            LogFlusher {
                _guard: Some(guard),
            }
        }
    };

    info!(app = app_name, environment = %environment, "tracing initialized");

    Ok(flusher)
}

/// Installs a subscriber writing through the test harness, once per process.
///
/// Does nothing unless `ENABLE_TRACING` is set, so test output stays quiet by default.
pub fn init_test_tracing() {
    if std::env::var_os(ENABLE_TRACING_ENV_NAME).is_none() {
        return;
    }

    INIT_TEST_TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
