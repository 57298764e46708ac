use thiserror::Error;

/// Fatal error surfaced by the CLI, mapped to a process exit code.
///
/// Only catastrophic failures end up here: everything recoverable is
/// absorbed inside the traversal as skip-and-continue, so this covers the
/// session bootstrap and the output file, not per-row extraction.
#[derive(Debug, Error)]
pub enum CourtgridError {
    /// WebDriver connection failed (exit code 4)
    #[error("WebDriver connection failed: {0}")]
    WebDriverFailed(String),
    /// Operation timeout (exit code 5)
    #[error("Operation timed out: {0}")]
    Timeout(String),
    /// Generic error (exit code 1)
    #[error(transparent)]
    Other(anyhow::Error),
}

impl CourtgridError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CourtgridError::WebDriverFailed(_) => 4,
            CourtgridError::Timeout(_) => 5,
            CourtgridError::Other(_) => 1,
        }
    }
}

impl From<anyhow::Error> for CourtgridError {
    fn from(err: anyhow::Error) -> Self {
        // Classify from the message chain; the plumbing below reports
        // plain anyhow errors.
        let msg = format!("{err:#}");
        let lower = msg.to_lowercase();

        if lower.contains("webdriver") || lower.contains("geckodriver") || lower.contains("chromedriver")
        {
            CourtgridError::WebDriverFailed(msg)
        } else if lower.contains("timeout") || lower.contains("timed out") {
            CourtgridError::Timeout(msg)
        } else {
            CourtgridError::Other(err)
        }
    }
}
