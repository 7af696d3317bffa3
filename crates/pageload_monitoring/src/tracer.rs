//! This module configures `tracing_subscriber` to write to standard error and/or a rolling log
//! file.
use anyhow::anyhow;
use serde::Deserialize;
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::from_env::optional_var;
use crate::from_env::FromEnvError;

const TRACING_MODE_VAR: &str = "PAGELOAD_TRACING_MODE";

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum TracerMode {
  /// Output the logs to stderr, keeping stdout free for reports
  Stderr,
  /// Output the logs to hourly rolling files in the temporary directory
  File,
}

impl TracerMode {
  /// Parses a comma separated list such as `stderr,file`
  pub fn from_env() -> Result<Vec<Self>, FromEnvError> {
    let Some(value) = optional_var(TRACING_MODE_VAR) else {
      return Ok(vec![]);
    };

    let mut modes = vec![];
    for mode in value.split(',').map(|mode| mode.trim()) {
      let parsed = match mode {
        "stderr" | "stdout" => Self::Stderr,
        "file" => Self::File,
        value => {
          return Err(FromEnvError::InvalidKey(
            String::from(TRACING_MODE_VAR),
            anyhow!("Invalid value: {}", value),
          ))
        }
      };
      if !modes.contains(&parsed) {
        modes.push(parsed);
      }
    }

    Ok(modes)
  }
}

pub struct Tracer {
  #[allow(unused)]
  worker_guards: Vec<WorkerGuard>,
}

impl Tracer {
  pub fn new(options: &[TracerMode]) -> anyhow::Result<Self> {
    let mut worker_guards = vec![];

    let file_layer = if options.contains(&TracerMode::File) {
      let directory = std::env::temp_dir().join("pageload_trace");
      let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::HOURLY)
        .max_log_files(4)
        .filename_prefix("pageload-tracing")
        .build(&directory)
        .map_err(|err| anyhow!(err))?;
      let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
      worker_guards.push(worker_guard);

      Some(
        tracing_subscriber::fmt::layer()
          .with_writer(non_blocking)
          .with_span_events(FmtSpan::CLOSE)
          .with_filter(EnvFilter::from_default_env()),
      )
    } else {
      None
    };

    let stderr_layer = if options.contains(&TracerMode::Stderr) {
      let (non_blocking, worker_guard) = tracing_appender::non_blocking(std::io::stderr());
      worker_guards.push(worker_guard);

      Some(
        tracing_subscriber::fmt::layer()
          .with_writer(non_blocking)
          .with_filter(EnvFilter::from_default_env()),
      )
    } else {
      None
    };

    let subscriber = Registry::default().with(file_layer).with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(Self { worker_guards })
  }
}
