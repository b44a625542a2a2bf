//! Process-wide `tracing` setup for programs built on this crate.
//!
//! Turns are logged inside a `turn` span carrying `turn_id`, `session_id`
//! and, once known, `conversation_id`; the JSON output includes it.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::errors::HarnessError;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info";

/// Where log records go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    Disabled,
    /// Compact lines on stderr. Chat output owns stdout.
    Console,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

/// Logging settings read from `AGENT_BUILDER_*` variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub output: LogOutput,
    /// `EnvFilter` directives, e.g. `agent_builder_bridge=debug`.
    pub filter: String,
}

impl LogSettings {
    /// Reads:
    /// - `AGENT_BUILDER_OBSERVABILITY_ENABLED` / `AGENT_BUILDER_OBSERVABILITY`: on/off (default on).
    /// - `AGENT_BUILDER_LOG_LEVEL`, then `RUST_LOG`: filter directives (default `info`).
    /// - `AGENT_BUILDER_JSON_LOG_PATH`: JSONL file instead of stderr.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let enabled = [
            "AGENT_BUILDER_OBSERVABILITY_ENABLED",
            "AGENT_BUILDER_OBSERVABILITY",
        ]
        .into_iter()
        .find_map(|key| value(key))
        .map_or(true, |raw| parse_switch(&raw).unwrap_or(true));

        let output = if !enabled {
            LogOutput::Disabled
        } else if let Some(path) = value("AGENT_BUILDER_JSON_LOG_PATH") {
            LogOutput::JsonFile(PathBuf::from(path.trim()))
        } else {
            LogOutput::Console
        };
        let filter = value("AGENT_BUILDER_LOG_LEVEL")
            .or_else(|| value("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self { output, filter }
    }

    fn env_filter(&self) -> Result<EnvFilter, HarnessError> {
        EnvFilter::try_new(&self.filter).map_err(|e| {
            HarnessError::Config(format!("invalid log filter {:?}: {e}", self.filter))
        })
    }
}

/// Keeps the file writer flushing; drop it at the end of `main`.
#[derive(Default)]
#[must_use]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Installs the global subscriber from `LogSettings::from_env()`.
///
/// Only the first call in a process installs anything. Fails when the filter
/// does not parse or the log file cannot be created.
pub fn init_observability() -> Result<LogGuard, HarnessError> {
    init_with(LogSettings::from_env())
}

/// Like `init_observability`, with explicit settings.
pub fn init_with(settings: LogSettings) -> Result<LogGuard, HarnessError> {
    if INIT.get().is_some() || settings.output == LogOutput::Disabled {
        return Ok(LogGuard::default());
    }

    let filter = settings.env_filter()?;
    let guard = match &settings.output {
        LogOutput::Disabled => None,
        LogOutput::Console => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
            None
        }
        LogOutput::JsonFile(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
            Some(guard)
        }
    };
    let _ = INIT.set(());
    Ok(LogGuard { _worker: guard })
}

fn open_log_file(path: &Path) -> Result<RollingFileAppender, HarnessError> {
    let unusable = |reason: String| {
        HarnessError::Config(format!("log file {}: {reason}", path.display()))
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| unusable("no file name".into()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| unusable(e.to_string()))
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}
