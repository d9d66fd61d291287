//! MemeForge application layer.
//!
//! Orchestrates the download, share-link and mint flows on top of the core
//! editor, and hosts the command-line shell.

pub mod cli;
pub mod clipboard;
pub mod publisher;

pub use clipboard::{Clipboard, ClipboardError, MemoryClipboard};
pub use publisher::{MintSubmission, PublishError, PublishResult, Publisher, ShareOutcome};

#[cfg(feature = "native")]
pub use clipboard::SystemClipboard;
