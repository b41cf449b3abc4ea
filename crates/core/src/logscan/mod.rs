//! Confirmation-log scanning: bounded polling of the training log tail for
//! the upload and transaction markers.

mod scanner;
mod types;

pub use scanner::{parse_upload_line, scan_lines, LogTailScanner};
pub use types::{LogScanResult, UploadConfirmation, TRANSACTION_MARKER, UPLOAD_MARKER};
