//! Idempotent end-of-run cleanup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::process::ProcessRegistry;

/// Terminates every tracked process exactly once, no matter how many of the
/// exit paths reach it: normal completion, a fatal step, or an interrupt.
#[derive(Clone)]
pub struct CleanupHandler {
    registry: ProcessRegistry,
    grace: Duration,
    ran: Arc<AtomicBool>,
}

impl CleanupHandler {
    pub fn new(registry: ProcessRegistry, grace: Duration) -> Self {
        Self {
            registry,
            grace,
            ran: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs cleanup. Later calls return immediately.
    pub async fn run(&self) {
        if self.ran.swap(true, Ordering::SeqCst) {
            debug!("Cleanup already ran, skipping");
            return;
        }
        info!("Cleaning up spawned processes");
        self.registry.terminate_all(self.grace).await;
    }

    pub fn has_run(&self) -> bool {
        self.ran.load(Ordering::SeqCst)
    }
}
