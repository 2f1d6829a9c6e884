// crates/observability/src/lib.rs
//! Tracing setup shared by bookforge binaries.
//!
//! Console output goes to stderr so command output on stdout stays clean.
//! An optional daily-rolling JSON file sink is added when a log directory is
//! configured; keep the returned guard alive for the life of the process.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that selects development verbosity.
pub const ENV_VAR: &str = "BOOKFORGE_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format '{other}' (expected compact or json)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Directory for `bookforge.YYYY-MM-DD.jsonl` files. None = console only.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset. None = derive from `BOOKFORGE_ENV`.
    pub default_directive: Option<String>,
}

/// `debug` in development, `info` everywhere else.
pub fn default_directive(environment: Option<&str>) -> &'static str {
    match environment {
        Some(env) if env.eq_ignore_ascii_case("development") => "debug",
        _ => "info",
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let fallback = match &config.default_directive {
        Some(directive) => directive.clone(),
        None => default_directive(std::env::var(ENV_VAR).ok().as_deref()).to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::Builder::new()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("bookforge")
                .filename_suffix("jsonl")
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_current_span(false)
                .with_span_list(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (compact, json) = match config.format {
        LogFormat::Compact => (
            Some(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(compact)
        .with(json)
        .with(file_layer)
        .try_init()
        .ok();

    Ok(guard)
}
