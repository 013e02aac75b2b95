//! State controller
//!
//! A single task owns the dashboard state. Everything else (HTTP handlers,
//! the periodic timers) talks to it through a cloneable [`Controller`]
//! handle that turns each operation into a command on one FIFO queue, so
//! requests are applied one at a time in arrival order.

mod actor;

pub use actor::StateController;

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;

use crate::severity::Severity;
use crate::state::{ConfigError, ConfigFields, LogEntry, RuntimeConfig, Snapshot, Status};

/// Default capacity of the command queue
pub const DEFAULT_CHANNEL_BUFFER: usize = 100;

/// Errors returned by the controller handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The submitted configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The controller task is no longer running
    #[error("state controller is not running")]
    Unavailable,
}

/// Requests serviced by the controller task
#[derive(Debug)]
pub(crate) enum Command {
    GetSnapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    SetStatus {
        status: Status,
        reply: oneshot::Sender<()>,
    },
    UpdateConfig {
        fields: ConfigFields,
        reply: oneshot::Sender<Result<(), ConfigError>>,
    },
    ResetConfig {
        reply: oneshot::Sender<()>,
    },
    AppendLog {
        entry: LogEntry,
    },
}

/// Handle to the state controller
#[derive(Debug, Clone)]
pub struct Controller {
    commands: mpsc::Sender<Command>,
    period: watch::Receiver<Duration>,
}

impl Controller {
    /// Spawn a controller task with default runtime configuration
    pub fn spawn(buffer: usize) -> Self {
        Self::spawn_with(RuntimeConfig::default(), buffer)
    }

    /// Spawn a controller task starting from the given configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_with(config: RuntimeConfig, buffer: usize) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(buffer.max(1));
        let (period_tx, period_rx) = watch::channel(config.status_update_period);

        let handle = Self {
            commands: commands_tx,
            period: period_rx,
        };

        let controller = StateController::new(config, handle.clone(), commands_rx, period_tx);
        tokio::spawn(controller.run());

        handle
    }

    /// Receiver for the committed status update period
    ///
    /// A new value is published after every configuration submission.
    pub fn period_updates(&self) -> watch::Receiver<Duration> {
        self.period.clone()
    }

    /// Get a copy of the current status, configuration and log ring
    pub async fn get_snapshot(&self) -> Result<Snapshot, ControllerError> {
        self.request(|reply| Command::GetSnapshot { reply }).await
    }

    /// Replace the status; counters are maintained by the controller
    pub async fn set_status(&self, status: Status) -> Result<(), ControllerError> {
        self.request(|reply| Command::SetStatus { status, reply })
            .await
    }

    /// Submit raw configuration fields for validation
    pub async fn submit_config_update(&self, fields: ConfigFields) -> Result<(), ControllerError> {
        self.request(|reply| Command::UpdateConfig { fields, reply })
            .await?
            .map_err(ControllerError::from)
    }

    /// Discard the pending period edit and its error
    pub async fn reset_config(&self) -> Result<(), ControllerError> {
        self.request(|reply| Command::ResetConfig { reply }).await
    }

    /// Queue a log entry, waiting until it is enqueued
    pub async fn append_log(
        &self,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<(), ControllerError> {
        let entry = LogEntry::new(severity, message);
        self.commands
            .send(Command::AppendLog { entry })
            .await
            .map_err(|_| ControllerError::Unavailable)
    }

    /// Queue a log entry without waiting
    ///
    /// The entry is timestamped now and delivered from a short-lived task,
    /// so this is safe to call from inside the controller itself.
    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        let entry = LogEntry::new(severity, message);
        let commands = self.commands.clone();
        tokio::spawn(async move {
            if commands.send(Command::AppendLog { entry }).await.is_err() {
                warn!("State controller gone, dropping log entry");
            }
        });
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| ControllerError::Unavailable)?;
        reply_rx.await.map_err(|_| ControllerError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LOG_SEVERITY_KEY, STATUS_UPDATE_PERIOD_KEY};

    fn fields(severity: &str, period: &str) -> ConfigFields {
        let mut map = ConfigFields::new();
        map.insert(LOG_SEVERITY_KEY.to_string(), vec![severity.to_string()]);
        map.insert(
            STATUS_UPDATE_PERIOD_KEY.to_string(),
            vec![period.to_string()],
        );
        map
    }

    /// Poll snapshots until one satisfies `pred`; self-logs arrive asynchronously
    async fn wait_for(controller: &Controller, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
        for _ in 0..200 {
            let snapshot = controller.get_snapshot().await.unwrap();
            if pred(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    fn has_message(snapshot: &Snapshot, message: &str) -> bool {
        snapshot.logs.iter().any(|e| e.message == message)
    }

    #[tokio::test]
    async fn test_initial_snapshot() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        let snapshot = controller.get_snapshot().await.unwrap();

        assert_eq!(snapshot.status, Status::default());
        assert_eq!(snapshot.config, RuntimeConfig::default());
        assert!(snapshot.logs.is_empty());
        assert_eq!(
            *controller.period_updates().borrow(),
            Duration::from_secs(1)
        );
    }

    #[tokio::test]
    async fn test_set_status_recomputes_counters() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);

        let mut status = Status::capture(std::time::Instant::now());
        status.status_update_count = 41;
        status.config_update_count = 7;
        status.log_count = 99;
        let date = status.date.clone();
        controller.set_status(status).await.unwrap();

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.status.date, date);
        assert_eq!(snapshot.status.status_update_count, 1);
        assert_eq!(snapshot.status.config_update_count, 0);

        let snapshot = wait_for(&controller, |s| has_message(s, "Status Updated")).await;
        let entry = &snapshot.logs[0];
        assert_eq!(entry.severity, Severity::Trace);
        assert_eq!(entry.sequence, Some(0));
        assert_eq!(snapshot.status.log_count, 1);
    }

    #[tokio::test]
    async fn test_append_log_admission() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        // The Info self-log for this update falls below the new minimum
        controller
            .submit_config_update(fields("Warning", "1"))
            .await
            .unwrap();

        controller
            .append_log(Severity::Info, "ignored")
            .await
            .unwrap();
        controller
            .append_log(Severity::Warning, "kept warning")
            .await
            .unwrap();
        controller
            .append_log(Severity::Trace, "ignored too")
            .await
            .unwrap();
        controller
            .append_log(Severity::Error, "kept error")
            .await
            .unwrap();

        let snapshot = controller.get_snapshot().await.unwrap();
        let messages: Vec<&str> = snapshot.logs.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["kept error", "kept warning"]);
        // Filtered entries do not consume sequence numbers
        assert_eq!(snapshot.logs[0].sequence, Some(1));
        assert_eq!(snapshot.logs[1].sequence, Some(0));
        assert_eq!(snapshot.status.log_count, 2);
    }

    #[tokio::test]
    async fn test_log_ring_evicts_oldest() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        for i in 0..4 {
            controller
                .append_log(Severity::Info, format!("entry {}", i))
                .await
                .unwrap();
        }

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.logs.len(), 3);
        let messages: Vec<&str> = snapshot.logs.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["entry 3", "entry 2", "entry 1"]);

        let page = snapshot.filter_logs_from(0);
        assert_eq!(page.load_next, 4);
        assert_eq!(
            page.entries.last().unwrap().message,
            "Dropped 1 Log Messages"
        );
    }

    #[tokio::test]
    async fn test_submit_config_success() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        let mut period = controller.period_updates();

        controller
            .submit_config_update(fields("Info", "10"))
            .await
            .unwrap();

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.config.log_severity, "Info");
        assert_eq!(
            snapshot.config.status_update_period,
            Duration::from_secs(10)
        );
        assert_eq!(snapshot.status.config_update_count, 1);
        assert!(period.has_changed().unwrap());
        assert_eq!(*period.borrow_and_update(), Duration::from_secs(10));

        let snapshot = wait_for(&controller, |s| has_message(s, "Config Updated")).await;
        assert_eq!(snapshot.logs[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_submit_config_failure() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        let mut period = controller.period_updates();
        period.borrow_and_update();

        let err = controller
            .submit_config_update(fields("Info", "120"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ControllerError::Config(ConfigError::PeriodOutOfRange(120))
        );

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.status.config_update_count, 0);
        assert_eq!(snapshot.config.status_update_period, Duration::from_secs(1));
        // The unchanged period is still published
        assert!(period.has_changed().unwrap());
        assert_eq!(*period.borrow_and_update(), Duration::from_secs(1));

        let message = "StatusUpdatePeriod must be in range 1 - 60 s. Got 120";
        let snapshot = wait_for(&controller, |s| has_message(s, message)).await;
        assert_eq!(snapshot.logs[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        let err = controller
            .submit_config_update(ConfigFields::new())
            .await
            .unwrap_err();
        assert_eq!(err, ControllerError::Config(ConfigError::MissingFields));
        assert_eq!(err.to_string(), "Missing Entries");
    }

    #[tokio::test]
    async fn test_reset_config() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        controller
            .submit_config_update(fields("Warning", "10"))
            .await
            .unwrap();
        controller
            .submit_config_update(fields("Warning", "abc"))
            .await
            .unwrap_err();

        controller.reset_config().await.unwrap();

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.config.status_update_period_string, "10");
        assert!(snapshot.config.status_update_period_error.is_empty());
        assert_eq!(snapshot.config.log_severity, "Warning");
        assert_eq!(snapshot.status.config_update_count, 1);
    }

    #[tokio::test]
    async fn test_fire_and_forget_log() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        controller.log(Severity::Error, "from anywhere");

        let snapshot = wait_for(&controller, |s| has_message(s, "from anywhere")).await;
        assert_eq!(snapshot.status.log_count, 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        let before = controller.get_snapshot().await.unwrap();

        controller
            .append_log(Severity::Info, "later")
            .await
            .unwrap();
        controller
            .submit_config_update(fields("Error", "30"))
            .await
            .unwrap();

        assert!(before.logs.is_empty());
        assert_eq!(before.config, RuntimeConfig::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_serialized() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);

        let a = controller.clone();
        let b = controller.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.submit_config_update(fields("Warning", "10")).await }),
            tokio::spawn(async move { b.submit_config_update(fields("Error", "20")).await }),
        );
        ra.unwrap().unwrap();
        rb.unwrap().unwrap();

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.status.config_update_count, 2);
        let config = &snapshot.config;
        let applied_a_last = config.log_severity == "Warning"
            && config.status_update_period == Duration::from_secs(10)
            && config.status_update_period_string == "10";
        let applied_b_last = config.log_severity == "Error"
            && config.status_update_period == Duration::from_secs(20)
            && config.status_update_period_string == "20";
        assert!(applied_a_last || applied_b_last, "{config:?}");
        assert!(config.status_update_period_error.is_empty());
    }
}
