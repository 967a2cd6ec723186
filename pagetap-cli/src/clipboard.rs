use anyhow::{Context, Result};
use pagetap_core::Clipboard;
use tracing::info;

/// Copies selections to the system clipboard, opening it per copy.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("failed to open system clipboard")?;
        clipboard
            .set_text(text)
            .context("failed to copy selection to system clipboard")?;
        Ok(())
    }
}

/// Records copies in the log only, for headless replays.
#[derive(Default)]
pub struct LogClipboard {
    copies: usize,
}

impl Clipboard for LogClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.copies += 1;
        info!(copy = self.copies, chars = text.chars().count(), %text, "selection copied");
        Ok(())
    }
}
