//! Startup banner and end-of-run summary.

use blockassist_core::RunSummary;

const BANNER: &str = r#"
 ____  _            _       _            _     _
| __ )| | ___   ___| | __  / \   ___ ___(_)___| |_
|  _ \| |/ _ \ / __| |/ / / _ \ / __/ __| / __| __|
| |_) | | (_) | (__|   < / ___ \\__ \__ \ \__ \ |_
|____/|_|\___/ \___|_|\_\_/   \_\___/___/_|___/\__|
"#;

pub fn print_banner() {
    println!("{BANNER}");
    println!("  BlockAssist launcher v{}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Prints what the run produced in human terms. The structured log already
/// carries the same facts; this is the operator-facing recap.
pub fn print_summary(summary: &RunSummary) {
    let duration = summary.finished_at - summary.started_at;
    println!();
    println!(
        "Run complete in {}s (started {}).",
        duration.num_seconds(),
        summary.started_at.with_timezone(&chrono::Local).format("%H:%M:%S")
    );
    match (summary.model_path(), summary.model_size()) {
        (Some(path), Some(size)) => {
            println!("Model uploaded: {path} ({size})");
        }
        (Some(path), None) => {
            println!("Model uploaded: {path}");
        }
        _ => {
            println!("No upload confirmation was found; check the training log.");
        }
    }
    if summary.scan.transaction.is_none() {
        println!("No transaction response was seen.");
    }
}
