//! Lifecycle multiplexing over a set of logs.

use crate::logging::error::LogError;
use crate::logging::log::Log;
use crate::store::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Status token handed back to the step loop for each delivered signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggerStatus {
    Started,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoggerState {
    Closed,
    Open,
}

/// Owns an ordered set of logs and drives them through the lifecycle
/// signals START, RUN, and STOP.
///
/// The first START creates the run directory
/// `<prefix>/<name>_<UTC yyyymmdd_HHMMSS>/` and assigns each log a sink
/// inside it; later STARTs reopen the same sinks in append mode. RUN and
/// STOP while closed are errors: the step loop owns the sequencing and a
/// violation is a bug to surface, not swallow.
///
/// Within one signal, logs fire in registration order.
pub struct Logger {
    name: String,
    prefix: PathBuf,
    path: Option<PathBuf>,
    logs: Vec<Log>,
    state: LoggerState,
}

impl Logger {
    pub fn new(name: impl Into<String>, prefix: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            path: None,
            logs: Vec::new(),
            state: LoggerState::Closed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The run directory, `None` until the first START.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn is_open(&self) -> bool {
        self.state == LoggerState::Open
    }

    /// Register a log. Registration order is firing order.
    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    /// Resolve every owned log against the store.
    pub fn resolve(&mut self, store: &mut Store) {
        for log in &mut self.logs {
            log.resolve(store);
        }
    }

    /// START: (re)open every sink, write headers for new sinks, derive
    /// formats, then fire every log once.
    pub fn start(&mut self) -> Result<LoggerStatus, LogError> {
        let dir = match &self.path {
            Some(dir) => dir.clone(),
            None => {
                let stamp = Utc::now().format("%Y%m%d_%H%M%S");
                let dir = self.prefix.join(format!("{}_{}", self.name, stamp));
                fs::create_dir_all(&dir)?;
                self.path = Some(dir.clone());
                dir
            }
        };
        for log in &mut self.logs {
            log.open(&dir)?;
            log.prepare()?;
        }
        for log in &mut self.logs {
            log.fire()?;
        }
        self.state = LoggerState::Open;
        debug!(logger = %self.name, dir = %dir.display(), "logger started");
        Ok(LoggerStatus::Started)
    }

    /// RUN: fire every log once.
    pub fn run(&mut self) -> Result<LoggerStatus, LogError> {
        self.expect_open("run")?;
        for log in &mut self.logs {
            log.fire()?;
        }
        Ok(LoggerStatus::Running)
    }

    /// STOP: fire every log once more, then flush and close every sink.
    pub fn stop(&mut self) -> Result<LoggerStatus, LogError> {
        self.expect_open("stop")?;
        for log in &mut self.logs {
            log.fire()?;
            log.close()?;
        }
        self.state = LoggerState::Closed;
        debug!(logger = %self.name, "logger stopped");
        Ok(LoggerStatus::Stopped)
    }

    fn expect_open(&self, signal: &'static str) -> Result<(), LogError> {
        if self.state == LoggerState::Closed {
            return Err(LogError::Closed {
                logger: self.name.clone(),
                signal,
            });
        }
        Ok(())
    }
}
