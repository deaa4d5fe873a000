//! Interactive input seam for escalation collection.
//!
//! The escalation controller needs to ask the user for confirmation and
//! contact details mid-flow. Putting the prompt behind a trait keeps the core
//! front-end agnostic: the CLI reads stdin, tests supply scripted replies.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::error::PromptError;

/// Blocking question/answer exchange with the user.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    /// Show `prompt` and wait for one line of input.
    async fn ask(&self, prompt: &str) -> Result<String, PromptError>;
}

/// Stdin-backed prompt for the CLI front end.
pub struct StdinPrompt {
    // One shared reader; a fresh BufReader per call could drop buffered bytes.
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserPrompt for StdinPrompt {
    async fn ask(&self, prompt: &str) -> Result<String, PromptError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.write_all(b" ").await?;
        stdout.flush().await?;

        let mut lines = self.lines.lock().await;
        let line = lines.next_line().await?.ok_or(PromptError::Closed)?;
        Ok(line.trim().to_string())
    }
}
