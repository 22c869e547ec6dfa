//! ═══════════════════════════════════════════════════════════════════════════════
//! JOURNAL — Best-Effort Event Persistence
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Append-only JSON-lines event log, kept strictly off the hot path: the
//! tick loop pushes into a bounded channel and moves on. A background writer
//! buffers and flushes. Every failure mode — full channel, closed channel,
//! unwritable path, failed write — is absorbed silently. A slow filesystem
//! can never delay a tick.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use serde::Serialize;

/// Queued events before the writer forces a flush
const BUFFER_CAPACITY: usize = 100;
/// Channel depth; events beyond this are dropped, not awaited
const CHANNEL_CAPACITY: usize = 1024;
/// Quiet period after which a partial buffer is flushed anyway
const FLUSH_IDLE: Duration = Duration::from_millis(250);
/// Bound on shutdown join
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Event severity. Clamped-input notices go out at Debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

/// One journal line
#[derive(Debug, Clone, Serialize)]
pub struct JournalEvent {
    pub timestamp: String,
    pub severity: Severity,
    /// Subsystem that produced the event
    pub component: &'static str,
    /// Short machine-readable event name
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl JournalEvent {
    pub fn new(severity: Severity, component: &'static str, kind: &'static str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            severity,
            component,
            kind,
            tick: None,
            detail: None,
        }
    }

    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Handle to the background writer. Dropping it flushes what the writer has
/// and joins with a bounded timeout.
pub struct Journal {
    tx: Option<Sender<JournalEvent>>,
    handle: Option<JoinHandle<()>>,
}

impl Journal {
    /// Spawn the writer thread targeting `path`. The path not being
    /// writable is not an error; events are simply lost.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = bounded::<JournalEvent>(CHANNEL_CAPACITY);
        let handle = thread::spawn(move || {
            let mut vault: Vec<String> = Vec::with_capacity(BUFFER_CAPACITY);
            loop {
                match rx.recv_timeout(FLUSH_IDLE) {
                    Ok(event) => {
                        if let Ok(line) = serde_json::to_string(&event) {
                            vault.push(line);
                        }
                        if vault.len() >= BUFFER_CAPACITY {
                            flush_to_disk(&path, &mut vault);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        // Quiet period: drain whatever accumulated
                        flush_to_disk(&path, &mut vault);
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        flush_to_disk(&path, &mut vault);
                        break;
                    }
                }
            }
        });
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// A journal that drops everything. Useful for tests and bare runs.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            handle: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Fire-and-forget. A full or closed channel drops the event.
    pub fn log(&self, event: JournalEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        // Closing the sender lets the writer drain and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            }
            // Else: abandon the writer rather than stall shutdown
        }
    }
}

fn flush_to_disk(path: &Path, vault: &mut Vec<String>) {
    if vault.is_empty() {
        return;
    }
    let mut file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(_) => {
            // Unwritable target: discard rather than propagate
            vault.clear();
            return;
        }
    };
    for line in vault.drain(..) {
        let _ = file.write_all(line.as_bytes());
        let _ = file.write_all(b"\n");
    }
    let _ = file.flush();
}
