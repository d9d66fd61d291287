//! Command-line shell: build a meme from flags and push it through a flow.

use crate::clipboard::{Clipboard, MemoryClipboard};
use crate::publisher::{PublishError, Publisher};
use clap::{Args, Parser, Subcommand};
use kurbo::Vec2;
use memeforge_core::config::{AppConfig, ConfigError};
use memeforge_core::contract::{ContractConstants, ContractError};
use memeforge_core::editor::{Editor, EditorError};
use memeforge_core::pinning::{MemoryPinning, PinError, PinataClient, PinningService};
use memeforge_core::surface::SurfaceDocument;
use memeforge_render::SoftwareRasterizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Vertical gap between stacked captions.
const TEXT_LINE_SPACING: f64 = 60.0;

#[derive(Debug, Parser)]
#[command(name = "memeforge", version, about = "Make and share memes")]
pub struct Cli {
    /// Config file (defaults to ./memeforge.toml, then the user config dir)
    #[arg(long, global = true, env = "MEMEFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a meme to a PNG file
    Render {
        #[command(flatten)]
        edits: EditArgs,
        /// Output file or directory
        #[arg(long, short, default_value = ".")]
        out: PathBuf,
        /// Resolution multiplier (overrides config)
        #[arg(long)]
        multiplier: Option<f64>,
    },
    /// Pin a meme and print its share link
    Share {
        #[command(flatten)]
        edits: EditArgs,
        /// Pin in memory instead of calling Pinata
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the contract constants file from a compiled artifact
    ContractConstants {
        /// Compiled contract artifact (hardhat or solc JSON)
        #[arg(long)]
        artifact: PathBuf,
        /// Deployed contract address
        #[arg(long)]
        address: String,
        /// Where to write the constants file
        #[arg(long, default_value = "contract.json")]
        out: PathBuf,
    },
}

/// Edits applied on top of the base image, in order.
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Base image
    pub image: PathBuf,
    /// Caption text; repeat for several captions
    #[arg(long = "text", short = 't')]
    pub texts: Vec<String>,
    /// Add a rectangle
    #[arg(long)]
    pub rect: bool,
    /// Add an arrow
    #[arg(long)]
    pub arrow: bool,
    /// Sticker image; repeatable
    #[arg(long = "sticker")]
    pub stickers: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Pinning(#[from] PinError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("Invalid multiplier {0}")]
    InvalidMultiplier(f64),
}

pub type CliResult<T> = Result<T, CliError>;

fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Build an editor session from the edit flags and return the export document.
pub fn compose(config: &AppConfig, edits: &EditArgs) -> CliResult<SurfaceDocument> {
    let mut editor = Editor::new(config)?;
    editor.load_base_image(&read_file(&edits.image)?)?;

    for (i, caption) in edits.texts.iter().enumerate() {
        let id = editor.add_text()?;
        editor.set_text(id, caption)?;
        if i > 0 {
            editor.move_selected(Vec2::new(0.0, TEXT_LINE_SPACING * i as f64))?;
        }
    }
    if edits.rect {
        editor.add_rectangle()?;
    }
    if edits.arrow {
        editor.add_arrow()?;
    }
    for sticker in &edits.stickers {
        editor.add_sticker(&read_file(sticker)?)?;
    }

    for notice in editor.take_notices() {
        log::debug!("{}", notice.message);
    }
    log::info!(
        "Composed {} objects ({} history entries)",
        editor.surface().len(),
        editor.history().len()
    );
    Ok(editor.prepare_export())
}

fn publisher(
    config: AppConfig,
    pinning: Arc<dyn PinningService>,
    clipboard: Box<dyn Clipboard>,
) -> Publisher {
    Publisher::new(config, Box::new(SoftwareRasterizer::new()), pinning, clipboard)
}

#[cfg(feature = "native")]
fn default_clipboard() -> Box<dyn Clipboard> {
    Box::new(crate::clipboard::SystemClipboard)
}

#[cfg(not(feature = "native"))]
fn default_clipboard() -> Box<dyn Clipboard> {
    Box::new(MemoryClipboard::new())
}

/// Run a parsed command line. Returns what should be printed on success.
pub async fn run(cli: Cli) -> CliResult<String> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Render {
            edits,
            out,
            multiplier,
        } => {
            if let Some(multiplier) = multiplier {
                if !(multiplier.is_finite() && multiplier > 0.0) {
                    return Err(CliError::InvalidMultiplier(multiplier));
                }
                config.export.multiplier = multiplier;
            }
            let document = compose(&config, &edits)?;
            let publisher = publisher(
                config,
                Arc::new(MemoryPinning::new()),
                Box::new(MemoryClipboard::new()),
            );
            let path = publisher.download(&document, &out)?;
            Ok(format!("Meme downloaded to {}", path.display()))
        }
        Command::Share { edits, dry_run } => {
            let document = compose(&config, &edits)?;
            let pinning: Arc<dyn PinningService>;
            let clipboard: Box<dyn Clipboard>;
            if dry_run {
                pinning = Arc::new(MemoryPinning::new());
                clipboard = Box::new(MemoryClipboard::new());
            } else {
                pinning = Arc::new(PinataClient::from_config(&config.pinata)?);
                clipboard = default_clipboard();
            }
            let publisher = publisher(config, pinning, clipboard);
            match publisher.share_link(&document).await {
                Ok(outcome) => Ok(format!("Share link copied to clipboard!\n{}", outcome.url)),
                // The link exists even if the clipboard refused it.
                Err(PublishError::Clipboard { url, source }) => {
                    log::warn!("{}", source);
                    Ok(url)
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::ContractConstants {
            artifact,
            address,
            out,
        } => {
            let constants = ContractConstants::from_artifact_file(&artifact, &address)?;
            constants.save(&out)?;
            Ok(format!(
                "Wrote constants for {} to {}",
                constants.address,
                out.display()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "memeforge",
            "render",
            "cat.png",
            "--text",
            "TOP",
            "-t",
            "BOTTOM",
            "--arrow",
            "--multiplier",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::Render {
                edits, multiplier, ..
            } => {
                assert_eq!(edits.image, PathBuf::from("cat.png"));
                assert_eq!(edits.texts, vec!["TOP", "BOTTOM"]);
                assert!(edits.arrow);
                assert!(!edits.rect);
                assert_eq!(multiplier, Some(2.0));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_contract_constants_requires_address() {
        assert!(
            Cli::try_parse_from(["memeforge", "contract-constants", "--artifact", "a.json"])
                .is_err()
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from([
            "memeforge",
            "share",
            "cat.png",
            "--dry-run",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Command::Share { dry_run: true, .. }));
    }
}
