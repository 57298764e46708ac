//! Human-in-the-loop checkpoint.
//!
//! The portal fronts its search submission with a CAPTCHA the operator must
//! solve in the browser window. Unlike the bounded waits used against the
//! DOM, this checkpoint has no timeout: the run blocks until the operator
//! signals continuation on stdin.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Block without timeout until the operator presses Enter.
///
/// Runs the blocking read on the blocking thread pool so the async runtime
/// is not stalled.
pub async fn await_operator(message: &str) -> Result<()> {
    let message = message.to_string();
    tokio::task::spawn_blocking(move || read_ack(&message))
        .await
        .context("Operator gate task failed")?
}

/// Prompt the operator and read one line of free-text input.
pub async fn prompt_line(prompt: &str) -> Result<String> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || read_prompted_line(&prompt))
        .await
        .context("Prompt task failed")?
}

fn read_prompted_line(prompt: &str) -> Result<String> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{prompt}").context("Failed to write prompt")?;
    stderr.flush().context("Failed to flush prompt")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input line")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_ack(message: &str) -> Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(stderr, "{message}").context("Failed to write operator prompt")?;
    writeln!(stderr, "Press Enter to continue...").context("Failed to write operator prompt")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read operator acknowledgement")?;
    Ok(())
}
