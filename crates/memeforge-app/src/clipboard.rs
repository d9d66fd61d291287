//! Clipboard access for share links.

use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);

/// Somewhere to put a share link.
pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard.
#[cfg(feature = "native")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

#[cfg(feature = "native")]
impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError(e.to_string()))?;
        log::info!("Copied to clipboard: {}", text);
        Ok(())
    }
}

/// Keeps the last copied text in memory. Used headless and in tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: RwLock<Option<String>>,
    unavailable: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that refuses every write.
    pub fn unavailable() -> Self {
        Self {
            contents: RwLock::new(None),
            unavailable: true,
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.read().ok()?.clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.unavailable {
            return Err(ClipboardError("clipboard access denied".to_string()));
        }
        let mut contents = self
            .contents
            .write()
            .map_err(|e| ClipboardError(format!("Lock error: {}", e)))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.contents(), None);
        clipboard.set_text("https://x.example/share?id=Qm1").unwrap();
        assert_eq!(
            clipboard.contents().as_deref(),
            Some("https://x.example/share?id=Qm1")
        );
    }

    #[test]
    fn test_unavailable_clipboard() {
        let clipboard = MemoryClipboard::unavailable();
        assert!(clipboard.set_text("x").is_err());
        assert_eq!(clipboard.contents(), None);
    }
}
