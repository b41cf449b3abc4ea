//! Polls the training log tail for upload and transaction markers.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::types::{LogScanResult, UploadConfirmation, TRANSACTION_MARKER, UPLOAD_MARKER};

/// Scans the tail of a growing log file for the two completion markers,
/// with a bounded retry budget. Unlike the login wait, this phase has an
/// upstream timing expectation: the producer either wrote its confirmation
/// shortly after training or it never will.
pub struct LogTailScanner {
    log_path: PathBuf,
    window_lines: usize,
    attempts: u32,
    interval: Duration,
}

impl LogTailScanner {
    pub fn new(log_path: PathBuf, window_lines: usize, attempts: u32, interval: Duration) -> Self {
        Self {
            log_path,
            window_lines,
            attempts,
            interval,
        }
    }

    /// Runs the full attempt budget, stopping early once both markers are
    /// found. Returns whatever was found: neither, one, or both.
    pub async fn poll(&self) -> LogScanResult {
        let mut result = LogScanResult::default();
        for attempt in 1..=self.attempts {
            tokio::time::sleep(self.interval).await;
            self.scan_once(&mut result).await;
            if result.is_complete() {
                debug!("Both markers found after {} attempt(s)", attempt);
                return result;
            }
        }
        debug!(
            "Attempt budget ({}) exhausted, upload={} transaction={}",
            self.attempts,
            result.upload.is_some(),
            result.transaction.is_some()
        );
        result
    }

    /// One attempt. A missing or unreadable file is "no match yet", not an
    /// error.
    pub async fn scan_once(&self, result: &mut LogScanResult) {
        let content = match tokio::fs::read_to_string(&self.log_path).await {
            Ok(content) => content,
            Err(_) => return,
        };
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(self.window_lines);
        scan_lines(&lines[start..], result);
    }
}

/// Applies both markers to a window of lines. First match wins per field;
/// already-found fields are never overwritten.
pub fn scan_lines(lines: &[&str], result: &mut LogScanResult) {
    result.lines_scanned = lines.iter().map(|line| line.trim().to_string()).collect();
    for line in &result.lines_scanned {
        if result.upload.is_none() && line.contains(UPLOAD_MARKER) {
            let confirmation = parse_upload_line(line);
            match &confirmation {
                UploadConfirmation::Parsed { model_path, size } => {
                    info!("Upload confirmed: {} ({})", model_path, size);
                }
                UploadConfirmation::Unparsed { .. } => {
                    warn!("Upload marker found but line has unexpected shape: {}", line);
                }
            }
            result.upload = Some(confirmation);
        } else if result.transaction.is_none() && line.contains(TRANSACTION_MARKER) {
            info!("Transaction response: {}", line);
            result.transaction = Some(line.clone());
        }
    }
}

/// Extracts the model path and human-readable size from an upload line.
///
/// The producer writes `...{UPLOAD_MARKER}<path> <n> of <amount> <unit>`;
/// token 0 is the path and tokens 3 and 4 form the size string. This
/// token-split contract lives only here, so producer format drift is a
/// one-place fix.
pub fn parse_upload_line(line: &str) -> UploadConfirmation {
    let Some(tail) = line.split(UPLOAD_MARKER).nth(1) else {
        return UploadConfirmation::Unparsed {
            line: line.to_string(),
        };
    };
    let tokens: Vec<&str> = tail.split_whitespace().collect();
    match (tokens.first(), tokens.get(3), tokens.get(4)) {
        (Some(path), Some(amount), Some(unit)) => UploadConfirmation::Parsed {
            model_path: path.to_string(),
            size: format!("{amount} {unit}"),
        },
        _ => UploadConfirmation::Unparsed {
            line: line.to_string(),
        },
    }
}
