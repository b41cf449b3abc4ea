//! Background watcher that fails the run when collaborator logs show a
//! build failure or an unhandled Python traceback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex_lite::Regex;
use tokio::sync::mpsc;
use tracing::error;

/// A fatal condition detected in a collaborator log.
#[derive(Debug, Clone)]
pub struct LogFailure {
    pub file: PathBuf,
    pub reason: String,
    pub traceback: Vec<String>,
}

/// Polls collaborator logs for failure patterns, remembering per-file read
/// offsets so each appended line is inspected once. The front-end build log
/// additionally gets a `BUILD FAILED` check; every log gets the traceback
/// check. Tolerates a missing logs directory and file truncation.
pub struct LogWatcher {
    logs_dir: PathBuf,
    check_interval: Duration,
    positions: HashMap<PathBuf, u64>,
    build_failed: Regex,
    traceback_start: Regex,
}

impl LogWatcher {
    pub fn new(logs_dir: PathBuf, check_interval: Duration) -> Self {
        Self {
            logs_dir,
            check_interval,
            positions: HashMap::new(),
            build_failed: Regex::new(r"(?i)BUILD FAILED").expect("static pattern"),
            traceback_start: Regex::new(r"(?i)Traceback \(most recent call last\):")
                .expect("static pattern"),
        }
    }

    /// Spawns the polling task. Detections arrive on the returned channel;
    /// the task stops once the receiver is dropped.
    pub fn spawn(mut self) -> mpsc::Receiver<LogFailure> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            loop {
                if tx.is_closed() {
                    break;
                }
                if let Some(failure) = self.check_all().await {
                    error!(
                        "Critical error in {}: {}",
                        failure.file.display(),
                        failure.reason
                    );
                    if tx.send(failure).await.is_err() {
                        break;
                    }
                }
                tokio::time::sleep(self.check_interval).await;
            }
        });
        rx
    }

    async fn check_all(&mut self) -> Option<LogFailure> {
        // The front-end build log gets the BUILD FAILED check on top of the
        // traceback check.
        let malmo = self.logs_dir.join("malmo.log");
        if let Some(failure) = self.check_file(&malmo, true).await {
            return Some(failure);
        }

        let mut entries = match tokio::fs::read_dir(&self.logs_dir).await {
            Ok(entries) => entries,
            Err(_) => return None,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("blockassist") && name.ends_with(".log") {
                if let Some(failure) = self.check_file(&entry.path(), false).await {
                    return Some(failure);
                }
            }
        }
        None
    }

    /// Inspects content appended since the last check. A shrunken file is a
    /// truncation; the offset resets to the start. Logs from the build
    /// tooling can carry raw non-UTF-8 bytes, so decoding is lossy rather
    /// than strict.
    async fn check_file(&mut self, path: &Path, check_build: bool) -> Option<LogFailure> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let size = metadata.len();
        let mut position = self.positions.get(path).copied().unwrap_or(0);
        if size < position {
            position = 0;
        }
        if size <= position {
            return None;
        }

        let bytes = tokio::fs::read(path).await.ok()?;
        let start = (position as usize).min(bytes.len());
        self.positions.insert(path.to_path_buf(), bytes.len() as u64);

        let new_content = String::from_utf8_lossy(&bytes[start..]);
        let lines: Vec<&str> = new_content.lines().collect();
        if check_build && lines.iter().any(|line| self.build_failed.is_match(line)) {
            return Some(LogFailure {
                file: path.to_path_buf(),
                reason: "BUILD FAILED".to_string(),
                traceback: Vec::new(),
            });
        }
        find_traceback(&self.traceback_start, &lines).map(|traceback| LogFailure {
            file: path.to_path_buf(),
            reason: "unhandled traceback".to_string(),
            traceback,
        })
    }
}

/// Collects a traceback block: from the start marker through the first
/// non-indented line naming an error or exception. A block whose last line
/// is `KeyboardInterrupt` is an expected interrupt, not a failure.
pub fn find_traceback(start: &Regex, lines: &[&str]) -> Option<Vec<String>> {
    let mut block: Vec<String> = Vec::new();
    let mut in_traceback = false;

    for line in lines {
        if start.is_match(line) {
            in_traceback = true;
            block = vec![line.to_string()];
        } else if in_traceback {
            block.push(line.to_string());
            let trimmed = line.trim();
            if !trimmed.is_empty()
                && !line.starts_with(' ')
                && !line.starts_with('\t')
                && (trimmed.contains("Error") || trimmed.contains("Exception"))
            {
                return Some(block);
            }
        }
    }

    if in_traceback {
        let interrupted = block
            .last()
            .is_some_and(|line| line.contains("KeyboardInterrupt"));
        if interrupted {
            return None;
        }
        return Some(block);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traceback_re() -> Regex {
        Regex::new(r"(?i)Traceback \(most recent call last\):").unwrap()
    }

    #[test]
    fn test_find_traceback_with_terminating_error() {
        let lines = vec![
            "step 12 complete",
            "Traceback (most recent call last):",
            "  File \"train.py\", line 4, in <module>",
            "    raise ValueError(\"bad\")",
            "ValueError: bad",
            "later unrelated output",
        ];
        let block = find_traceback(&traceback_re(), &lines).unwrap();
        assert_eq!(block.first().unwrap(), "Traceback (most recent call last):");
        assert_eq!(block.last().unwrap(), "ValueError: bad");
    }

    #[test]
    fn test_find_traceback_keyboard_interrupt_is_allowed() {
        let lines = vec![
            "Traceback (most recent call last):",
            "  File \"train.py\", line 9, in <module>",
            "KeyboardInterrupt",
        ];
        assert!(find_traceback(&traceback_re(), &lines).is_none());
    }

    #[test]
    fn test_find_traceback_incomplete_block_still_reported() {
        let lines = vec![
            "Traceback (most recent call last):",
            "  File \"train.py\", line 9, in <module>",
        ];
        let block = find_traceback(&traceback_re(), &lines).unwrap();
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn test_find_traceback_none_without_marker() {
        let lines = vec!["all good", "ValueError: red herring"];
        assert!(find_traceback(&traceback_re(), &lines).is_none());
    }

    #[tokio::test]
    async fn test_check_file_tracks_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("malmo.log");
        tokio::fs::write(&log, "line one\nBUILD FAILED\n").await.unwrap();

        let mut watcher = LogWatcher::new(dir.path().to_path_buf(), Duration::from_millis(10));
        let failure = watcher.check_file(&log, true).await.unwrap();
        assert_eq!(failure.reason, "BUILD FAILED");

        // Already-inspected content is not re-reported.
        assert!(watcher.check_file(&log, true).await.is_none());

        // Appended failure content is.
        let mut content = tokio::fs::read_to_string(&log).await.unwrap();
        content.push_str("BUILD FAILED again\n");
        tokio::fs::write(&log, content).await.unwrap();
        assert!(watcher.check_file(&log, true).await.is_some());
    }

    #[tokio::test]
    async fn test_check_file_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("malmo.log");
        let mut content = vec![0xFF, b'\n'];
        content.extend_from_slice(b"BUILD FAILED\n");
        tokio::fs::write(&log, content).await.unwrap();

        let mut watcher = LogWatcher::new(dir.path().to_path_buf(), Duration::from_millis(10));
        let failure = watcher.check_file(&log, true).await.unwrap();
        assert_eq!(failure.reason, "BUILD FAILED");

        // The offset advanced past the raw bytes too.
        assert!(watcher.check_file(&log, true).await.is_none());
    }

    #[tokio::test]
    async fn test_check_file_finds_traceback_after_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("blockassist-train.log");
        let mut content = b"step 1 done\n\xF0\x28garbled\n".to_vec();
        content.extend_from_slice(
            b"Traceback (most recent call last):\n  File \"train.py\", line 2\nValueError: bad\n",
        );
        tokio::fs::write(&log, content).await.unwrap();

        let mut watcher = LogWatcher::new(dir.path().to_path_buf(), Duration::from_millis(10));
        let failure = watcher.check_file(&log, false).await.unwrap();
        assert_eq!(failure.reason, "unhandled traceback");
        assert_eq!(failure.traceback.last().unwrap(), "ValueError: bad");
    }

    #[tokio::test]
    async fn test_check_file_missing_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogWatcher::new(dir.path().to_path_buf(), Duration::from_millis(10));
        assert!(watcher
            .check_file(&dir.path().join("absent.log"), true)
            .await
            .is_none());
    }
}
