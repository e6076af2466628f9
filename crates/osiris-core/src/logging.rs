use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Fire-and-forget diagnostic sink handed to pipeline components.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards to `tracing`; where the events end up is decided by the
/// subscriber the binary installs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, message: &str) {
        tracing::info!(target: "osiris", "{message}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn log(&self, _message: &str) {}
}

/// Keeps every line in memory. Used by tests to assert on diagnostics.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Periodic liveness line, useful for spotting a wedged UI loop in the log.
pub fn spawn_heartbeat(log: Arc<dyn LogSink>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            log.log("heartbeat");
        }
    })
}
