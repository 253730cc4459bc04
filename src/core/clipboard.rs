// src/core/clipboard.rs
use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;

pub trait ClipboardWriter: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Pipes the text into a clipboard program such as `pbcopy`,
/// `wl-copy` or `xclip -selection clipboard`
pub struct CommandClipboard {
    command: String,
}

impl CommandClipboard {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ClipboardWriter for CommandClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Clipboard command is empty"))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute clipboard command: {}", self.command))?;

        child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("Clipboard command has no stdin"))?
            .write_all(text.as_bytes())
            .context("Failed to write to clipboard command")?;

        let status = child.wait().context("Clipboard command did not finish")?;
        if !status.success() {
            anyhow::bail!("Clipboard command failed: {}", status);
        }
        Ok(())
    }
}

/// Keeps the last copied text in memory
#[derive(Default)]
pub struct MemoryClipboard {
    content: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> Option<String> {
        self.content.lock().ok().and_then(|c| c.clone())
    }
}

impl ClipboardWriter for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut content = self
            .content
            .lock()
            .map_err(|_| anyhow::anyhow!("clipboard lock poisoned"))?;
        *content = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.content(), None);
        clipboard.write_text("https://intowork.fr/cv/abc").unwrap();
        assert_eq!(clipboard.content().as_deref(), Some("https://intowork.fr/cv/abc"));
    }

    #[test]
    fn test_command_clipboard_pipes_stdin() {
        let clipboard = CommandClipboard::new("cat");
        assert!(clipboard.write_text("hello").is_ok());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let clipboard = CommandClipboard::new("definitely-not-a-clipboard-tool");
        assert!(clipboard.write_text("hello").is_err());
        assert!(CommandClipboard::new("  ").write_text("x").is_err());
    }
}
