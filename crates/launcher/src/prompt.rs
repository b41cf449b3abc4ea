//! Interactive HF token prompt.

use anyhow::{Context, Result};
use tracing::info;

const HF_TOKEN: &str = "HF_TOKEN";

/// Ensures `HF_TOKEN` is set, prompting on stdin when it is not. Must run
/// before the async runtime starts: the process is still single-threaded
/// there, so mutating the environment cannot race a concurrent read, and
/// every later child process inherits the value.
pub fn ensure_hf_token() -> Result<()> {
    if std::env::var(HF_TOKEN).is_ok_and(|v| !v.trim().is_empty()) {
        info!("HF_TOKEN already set");
        return Ok(());
    }

    println!("A Hugging Face access token is required to upload your model.");
    println!("Create one at https://huggingface.co/docs/hub/en/security-tokens");
    let token = read_nonempty_line()?;
    std::env::set_var(HF_TOKEN, token);
    Ok(())
}

fn read_nonempty_line() -> Result<String> {
    loop {
        print!("HF token: ");
        use std::io::Write;
        std::io::stdout().flush().context("failed to flush stdout")?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("failed to read token from stdin")?;
        let token = line.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
        println!("Token cannot be empty.");
    }
}
