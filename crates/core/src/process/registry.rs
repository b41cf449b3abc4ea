//! Tracks every spawned external process for later bulk termination.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::Child;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::types::{ProcessHandle, ProcessId, ProcessState, ProcessStatus};

/// How often termination re-checks whether a signalled process has stopped.
const STATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for reapers to record a forced kill.
const KILL_SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

struct Entry {
    id: ProcessId,
    label: String,
    pid: Option<u32>,
    state: ProcessState,
    spawned_at: DateTime<Utc>,
    kill_tx: mpsc::Sender<()>,
    /// Set once a termination pass has claimed this entry, so concurrent
    /// or repeated passes never signal the same process twice.
    term_sent: bool,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    next_id: u64,
}

struct Target {
    id: ProcessId,
    label: String,
    pid: Option<u32>,
    kill_tx: mpsc::Sender<()>,
}

/// Synchronized list of tracked processes, insertion order preserved.
///
/// Registration happens from the run sequencing flow while termination may
/// be invoked concurrently from the signal path, so every mutation goes
/// through one mutex. Termination walks entries newest-first.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly spawned child and starts its reaper task. The
    /// entry is visible to `terminate_all` before this returns, so a
    /// signal arriving mid-spawn cannot race past registration.
    pub(crate) async fn register(&self, label: &str, mut child: Child) -> ProcessHandle {
        let pid = child.id();
        let (exit_tx, exit_rx) = watch::channel(ProcessState::Running);
        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);

        let id = {
            let mut inner = self.inner.lock().await;
            inner.next_id += 1;
            let id = ProcessId(inner.next_id);
            inner.entries.push(Entry {
                id,
                label: label.to_string(),
                pid,
                state: ProcessState::Running,
                spawned_at: Utc::now(),
                kill_tx,
                term_sent: false,
            });
            id
        };
        debug!("Registered {} as {} (pid {:?})", label, id, pid);

        let registry = Arc::clone(&self.inner);
        let reaper_label = label.to_string();
        tokio::spawn(async move {
            let mut kill_requested = false;
            let mut kill_armed = true;
            let state = loop {
                tokio::select! {
                    res = child.wait() => {
                        break match res {
                            Ok(_) if kill_requested => ProcessState::Killed,
                            Ok(status) => ProcessState::Exited(status.code()),
                            Err(e) => {
                                warn!("Wait on {} failed: {}", reaper_label, e);
                                ProcessState::Exited(None)
                            }
                        };
                    }
                    msg = kill_rx.recv(), if kill_armed => {
                        match msg {
                            Some(()) => {
                                kill_requested = true;
                                kill_armed = false;
                                if let Err(e) = child.start_kill() {
                                    warn!("Force-kill of {} failed: {}", reaper_label, e);
                                }
                            }
                            None => kill_armed = false,
                        }
                    }
                }
            };
            {
                let mut inner = registry.lock().await;
                if let Some(entry) = inner.entries.iter_mut().find(|e| e.id == id) {
                    entry.state = state;
                }
            }
            let _ = exit_tx.send(state);
            debug!("{} reached {:?}", reaper_label, state);
        });

        ProcessHandle {
            id,
            label: label.to_string(),
            pid,
            exit_rx,
        }
    }

    /// Removes a handle from tracking. Returns false when unknown.
    pub async fn unregister(&self, id: ProcessId) -> bool {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|e| e.id != id);
        inner.entries.len() != before
    }

    /// Point-in-time view of every tracked process, insertion order.
    pub async fn snapshot(&self) -> Vec<ProcessStatus> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .iter()
            .map(|e| ProcessStatus {
                id: e.id,
                label: e.label.clone(),
                pid: e.pid,
                state: e.state,
                spawned_at: e.spawned_at,
            })
            .collect()
    }

    /// Number of tracked processes still running.
    pub async fn running_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.entries.iter().filter(|e| e.state.is_running()).count()
    }

    /// Best-effort termination of a single tracked process.
    pub async fn terminate(&self, id: ProcessId, grace: Duration) {
        let targets = self.claim_targets(Some(id)).await;
        self.terminate_targets(targets, grace).await;
    }

    /// Best-effort termination of every tracked process still running,
    /// newest first. Individual failures are logged, never propagated, so
    /// cleanup always covers the whole list.
    pub async fn terminate_all(&self, grace: Duration) {
        let targets = self.claim_targets(None).await;
        if targets.is_empty() {
            debug!("No running processes to terminate");
            return;
        }
        info!("Terminating {} tracked process(es)", targets.len());
        self.terminate_targets(targets, grace).await;
    }

    /// Marks running entries as claimed for termination and returns them in
    /// reverse insertion order. An entry is claimed at most once.
    async fn claim_targets(&self, only: Option<ProcessId>) -> Vec<Target> {
        let mut inner = self.inner.lock().await;
        inner
            .entries
            .iter_mut()
            .rev()
            .filter(|e| only.is_none_or(|id| e.id == id))
            .filter(|e| e.state.is_running() && !e.term_sent)
            .map(|e| {
                e.term_sent = true;
                Target {
                    id: e.id,
                    label: e.label.clone(),
                    pid: e.pid,
                    kill_tx: e.kill_tx.clone(),
                }
            })
            .collect()
    }

    async fn terminate_targets(&self, targets: Vec<Target>, grace: Duration) {
        if targets.is_empty() {
            return;
        }

        for target in &targets {
            debug!("Interrupting {} ({})", target.label, target.id);
            send_interrupt(target);
        }

        if !self.await_stopped(&targets, grace).await {
            for target in &targets {
                if self.is_running(target.id).await {
                    warn!(
                        "{} did not stop within the grace period, force-killing",
                        target.label
                    );
                    let _ = target.kill_tx.try_send(());
                }
            }
            if !self.await_stopped(&targets, KILL_SETTLE_TIMEOUT).await {
                for target in &targets {
                    if self.is_running(target.id).await {
                        error!("Could not terminate {} ({})", target.label, target.id);
                    }
                }
            }
        }
    }

    /// Polls until every target has stopped or the timeout elapses.
    async fn await_stopped(&self, targets: &[Target], timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.all_stopped(targets).await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(STATE_POLL_INTERVAL).await;
        }
    }

    async fn all_stopped(&self, targets: &[Target]) -> bool {
        let inner = self.inner.lock().await;
        targets.iter().all(|t| {
            inner
                .entries
                .iter()
                .find(|e| e.id == t.id)
                // Unregistered while we were waiting counts as stopped.
                .is_none_or(|e| !e.state.is_running())
        })
    }

    async fn is_running(&self, id: ProcessId) -> bool {
        let inner = self.inner.lock().await;
        inner
            .entries
            .iter()
            .find(|e| e.id == id)
            .is_some_and(|e| e.state.is_running())
    }
}

/// Asks a running process to stop. On unix the whole session is signalled
/// (children run under `setsid`); elsewhere there is no interrupt
/// equivalent, so the reaper force-kills directly.
#[cfg(unix)]
fn send_interrupt(target: &Target) {
    match target.pid {
        Some(pid) => unsafe {
            libc::kill(-(pid as i32), libc::SIGTERM);
        },
        None => {
            let _ = target.kill_tx.try_send(());
        }
    }
}

#[cfg(not(unix))]
fn send_interrupt(target: &Target) {
    let _ = target.kill_tx.try_send(());
}
