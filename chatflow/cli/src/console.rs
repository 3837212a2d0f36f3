//! Line-oriented terminal IO
//!
//! Generic over the reader and writer so the fill loop can run against
//! stdin/stdout or in-memory buffers.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Prompt/answer console
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap a reader and a writer
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print one line
    pub async fn say(&mut self, text: &str) -> Result<()> {
        self.output
            .write_all(format!("{text}\n").as_bytes())
            .await
            .context("Failed to write to terminal")?;
        self.output.flush().await?;
        Ok(())
    }

    /// Print a prompt and read one line
    ///
    /// Returns `None` once the input is closed.
    pub async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        self.output
            .write_all(format!("{prompt} ").as_bytes())
            .await
            .context("Failed to write to terminal")?;
        self.output.flush().await?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .await
            .context("Failed to read from terminal")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    /// Give back the writer
    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}
