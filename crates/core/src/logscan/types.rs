//! Types for confirmation-log scanning.

/// Substring marking a completed model upload. Everything after it is a
/// versioned contract with the producer: `<path> <n> of <amount> <unit>`.
pub const UPLOAD_MARKER: &str = "Successfully uploaded model to HuggingFace: ";

/// Standalone marker for the on-chain transaction response line.
pub const TRANSACTION_MARKER: &str = "HF Upload API response:";

/// A matched upload line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadConfirmation {
    /// Marker found and the tail matched the producer's format.
    Parsed { model_path: String, size: String },
    /// Marker found but the tail did not match; kept raw rather than
    /// failing the scan over format drift.
    Unparsed { line: String },
}

impl UploadConfirmation {
    pub fn model_path(&self) -> Option<&str> {
        match self {
            UploadConfirmation::Parsed { model_path, .. } => Some(model_path),
            UploadConfirmation::Unparsed { .. } => None,
        }
    }

    pub fn size(&self) -> Option<&str> {
        match self {
            UploadConfirmation::Parsed { size, .. } => Some(size),
            UploadConfirmation::Unparsed { .. } => None,
        }
    }
}

/// Accumulated scan outcome across attempts. Fields are first-match-wins:
/// once set, a later match never overwrites them.
#[derive(Debug, Clone, Default)]
pub struct LogScanResult {
    pub upload: Option<UploadConfirmation>,
    pub transaction: Option<String>,
    /// The most recent window of lines inspected.
    pub lines_scanned: Vec<String>,
}

impl LogScanResult {
    pub fn is_complete(&self) -> bool {
        self.upload.is_some() && self.transaction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_confirmation_accessors() {
        let parsed = UploadConfirmation::Parsed {
            model_path: "org/model".to_string(),
            size: "5.2 MB".to_string(),
        };
        assert_eq!(parsed.model_path(), Some("org/model"));
        assert_eq!(parsed.size(), Some("5.2 MB"));

        let unparsed = UploadConfirmation::Unparsed {
            line: "garbled".to_string(),
        };
        assert_eq!(unparsed.model_path(), None);
        assert_eq!(unparsed.size(), None);
    }

    #[test]
    fn test_result_completeness() {
        let mut result = LogScanResult::default();
        assert!(!result.is_complete());
        result.upload = Some(UploadConfirmation::Unparsed {
            line: "x".to_string(),
        });
        assert!(!result.is_complete());
        result.transaction = Some("tx".to_string());
        assert!(result.is_complete());
    }
}
