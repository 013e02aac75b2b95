//! Controller task
//!
//! Owns the status, runtime configuration and log ring. Nothing outside this
//! task ever holds a reference to them; readers get owned snapshots.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace};

use crate::severity::Severity;
use crate::state::{ConfigError, ConfigFields, LogEntry, LogRing, RuntimeConfig, Snapshot, Status};

use super::{Command, Controller};

/// The single owner of dashboard state
pub struct StateController {
    status: Status,
    config: RuntimeConfig,
    logs: LogRing,
    /// Handle back to ourselves, used for self-logging
    handle: Controller,
    commands: mpsc::Receiver<Command>,
    period: watch::Sender<Duration>,
}

impl StateController {
    pub(super) fn new(
        config: RuntimeConfig,
        handle: Controller,
        commands: mpsc::Receiver<Command>,
        period: watch::Sender<Duration>,
    ) -> Self {
        Self {
            status: Status::default(),
            config,
            logs: LogRing::default(),
            handle,
            commands,
            period,
        }
    }

    /// Service commands one at a time, in arrival order
    ///
    /// The controller keeps a sender to its own queue, so the loop only ends
    /// when the runtime drops the task.
    pub async fn run(mut self) {
        info!(
            log_severity = %self.config.log_severity,
            period_secs = self.config.status_update_period.as_secs(),
            "State controller started"
        );

        while let Some(command) = self.commands.recv().await {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::GetSnapshot { reply } => {
                // Requester may have given up; nothing to undo
                let _ = reply.send(self.snapshot());
            }
            Command::SetStatus { status, reply } => {
                self.set_status(status);
                let _ = reply.send(());
            }
            Command::UpdateConfig { fields, reply } => {
                let result = self.update_config(&fields);
                let _ = reply.send(result);
            }
            Command::ResetConfig { reply } => {
                self.config.reset();
                let _ = reply.send(());
            }
            Command::AppendLog { entry } => self.append_log(entry),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status.clone(),
            config: self.config.clone(),
            logs: self.logs.entries(),
        }
    }

    fn set_status(&mut self, status: Status) {
        self.status = Status {
            status_update_count: self.status.status_update_count + 1,
            config_update_count: self.status.config_update_count,
            log_count: self.status.log_count,
            ..status
        };
        self.handle.log(Severity::Trace, "Status Updated");
    }

    fn update_config(&mut self, fields: &ConfigFields) -> Result<(), ConfigError> {
        let result = self.config.update(fields);
        match &result {
            Ok(()) => {
                self.status.config_update_count += 1;
                info!(
                    log_severity = %self.config.log_severity,
                    period_secs = self.config.status_update_period.as_secs(),
                    "Runtime configuration updated"
                );
                self.handle.log(Severity::Info, "Config Updated");
            }
            Err(e) => {
                debug!(error = %e, "Rejected configuration update");
                self.handle.log(Severity::Error, e.to_string());
            }
        }

        // Published on every submission; the ticker ignores unchanged values
        self.period.send_replace(self.config.status_update_period);
        result
    }

    fn append_log(&mut self, entry: LogEntry) {
        if !self.config.admits(entry.severity) {
            trace!(severity = %entry.severity, "Log entry below minimum severity, dropped");
            return;
        }

        debug!(severity = %entry.severity, message = %entry.message, "Dashboard log");
        self.logs.admit(entry);
        self.status.log_count = self.logs.next_sequence();
    }
}
