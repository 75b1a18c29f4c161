//! Terminal confirmation gate.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use hostboot_core::error::{BootstrapError, BootstrapResult};
use hostboot_core::gate::{Confirm, KeyPrompt};

/// Shows each new public key on stdout and waits for Enter on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

pub(crate) fn render_prompt(prompt: &KeyPrompt<'_>) -> String {
    format!(
        "\nNew SSH key for {host} ({path}):\n\n{key}\n\n\
         Add this key to {host}, then press Enter to continue...",
        host = prompt.host,
        path = prompt.public_key_path.display(),
        key = prompt.public_key,
    )
}

impl Confirm for TerminalConfirm {
    async fn confirm_key(&self, prompt: KeyPrompt<'_>) -> BootstrapResult<()> {
        let text = render_prompt(&prompt);
        let write_err = |e| BootstrapError::io("writing prompt for", prompt.public_key_path, e);
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await.map_err(write_err)?;
        stdout.flush().await.map_err(write_err)?;

        tracing::info!(host = %prompt.host, "Waiting for key confirmation");

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| BootstrapError::io("reading confirmation for", prompt.public_key_path, e))?;
        if read == 0 {
            return Err(BootstrapError::Usage(format!(
                "stdin closed before the key for {} was confirmed",
                prompt.host
            )));
        }

        tracing::info!(host = %prompt.host, "Key confirmed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
