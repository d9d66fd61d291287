//! Download, share-link and mint flows.
//!
//! Each flow is a straight pipeline of stages; the first failing stage ends
//! it with its own [`PublishError`] variant. Flows read a prepared document
//! and never touch editor state. Only one flow runs at a time.

use crate::clipboard::{Clipboard, ClipboardError};
use memeforge_core::config::AppConfig;
use memeforge_core::contract::{ContractConstants, ContractError};
use memeforge_core::pinning::{ContentId, NftMetadata, PinError, PinningService};
use memeforge_core::share::{ShareLinks, ipfs_uri};
use memeforge_core::surface::SurfaceDocument;
use memeforge_core::wallet::{TransactionId, WalletBridge, WalletError};
use memeforge_render::{RasterError, Rasterizer, encode_png};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Name given to pinned meme images.
pub const IMAGE_PIN_NAME: &str = "Based Meme Image";
/// Name given to pinned metadata documents.
pub const METADATA_PIN_NAME: &str = "Based Meme Metadata";

/// Flow errors, one variant per failing stage.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Another export is already in progress")]
    Busy,
    #[error("Failed to render meme: {0}")]
    Rasterize(#[source] RasterError),
    #[error("Failed to save {path}: {source}")]
    SaveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to upload to IPFS: {0}")]
    UploadImage(#[source] PinError),
    #[error("Failed to upload metadata: {0}")]
    UploadMetadata(#[source] PinError),
    #[error("Share link created but could not be copied: {url}")]
    Clipboard {
        url: String,
        #[source]
        source: ClipboardError,
    },
    #[error("Please connect your wallet")]
    WalletNotConnected,
    #[error("NFT contract not configured")]
    ContractUnavailable,
    #[error("NFT contract unavailable: {0}")]
    Contract(#[source] ContractError),
    #[error("Mint failed: {0}")]
    SubmitTransaction(#[source] WalletError),
}

/// Result type for publishing flows.
pub type PublishResult<T> = Result<T, PublishError>;

/// A share link that made it to the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareOutcome {
    pub image_cid: ContentId,
    pub url: String,
}

/// A mint submitted to the wallet. Confirmation is tracked separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSubmission {
    pub transaction_id: TransactionId,
    pub image_cid: ContentId,
    pub metadata_cid: ContentId,
    pub token_uri: String,
}

/// Clears the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> PublishResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| PublishError::Busy)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the publishing flows against injected collaborators.
pub struct Publisher {
    config: AppConfig,
    links: ShareLinks,
    rasterizer: Box<dyn Rasterizer>,
    pinning: Arc<dyn PinningService>,
    clipboard: Box<dyn Clipboard>,
    contract: Option<ContractConstants>,
    busy: AtomicBool,
}

impl Publisher {
    pub fn new(
        config: AppConfig,
        rasterizer: Box<dyn Rasterizer>,
        pinning: Arc<dyn PinningService>,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let links = ShareLinks::new(&config.share.origin, &config.share.gateway);
        Self {
            config,
            links,
            rasterizer,
            pinning,
            clipboard,
            contract: None,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_contract(mut self, contract: ContractConstants) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn links(&self) -> &ShareLinks {
        &self.links
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn render_png(&self, document: &SurfaceDocument) -> PublishResult<Vec<u8>> {
        let pixels = self
            .rasterizer
            .rasterize(document, self.config.export.multiplier)
            .map_err(PublishError::Rasterize)?;
        encode_png(&pixels).map_err(PublishError::Rasterize)
    }

    async fn upload_image(&self, document: &SurfaceDocument) -> PublishResult<ContentId> {
        let png = self.render_png(document)?;
        log::info!("Uploading {} byte meme image", png.len());
        self.pinning
            .pin_file(IMAGE_PIN_NAME, png, "image/png")
            .await
            .map_err(|e| {
                log::error!("Image upload failed: {}", e);
                PublishError::UploadImage(e)
            })
    }

    /// Render to PNG and write it. A directory target gets the configured
    /// file name (`meme.png` by default).
    pub fn download(&self, document: &SurfaceDocument, target: &Path) -> PublishResult<PathBuf> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let png = self.render_png(document)?;

        let path = if target.is_dir() {
            target.join(&self.config.export.file_name)
        } else {
            target.to_path_buf()
        };
        std::fs::write(&path, &png).map_err(|source| PublishError::SaveFile {
            path: path.clone(),
            source,
        })?;
        log::info!("Meme downloaded to {}", path.display());
        Ok(path)
    }

    /// Pin the rendered meme and copy its share link.
    pub async fn share_link(&self, document: &SurfaceDocument) -> PublishResult<ShareOutcome> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let image_cid = self.upload_image(document).await?;
        let url = self.links.share_url(image_cid.as_str());

        self.clipboard
            .set_text(&url)
            .map_err(|source| PublishError::Clipboard {
                url: url.clone(),
                source,
            })?;
        log::info!("Share link copied: {}", url);
        Ok(ShareOutcome { image_cid, url })
    }

    /// Pin image and metadata, then submit `safeMint` through the wallet.
    /// Returns as soon as the wallet accepts the transaction.
    pub async fn mint(
        &self,
        document: &SurfaceDocument,
        wallet: &dyn WalletBridge,
    ) -> PublishResult<MintSubmission> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let recipient = match wallet.address() {
            Some(address) if wallet.is_connected() => address,
            _ => return Err(PublishError::WalletNotConnected),
        };
        let contract = self
            .contract
            .as_ref()
            .ok_or(PublishError::ContractUnavailable)?;

        let image_cid = self.upload_image(document).await?;

        let metadata = NftMetadata::for_image(&self.config.metadata, &self.links, &image_cid);
        let document = metadata.to_value().map_err(PublishError::UploadMetadata)?;
        let metadata_cid = self
            .pinning
            .pin_json(METADATA_PIN_NAME, &document)
            .await
            .map_err(|e| {
                log::error!("Metadata upload failed: {}", e);
                PublishError::UploadMetadata(e)
            })?;
        let token_uri = ipfs_uri(metadata_cid.as_str());
        log::info!("Metadata uploaded: {}", token_uri);

        let call = contract
            .mint_call(&recipient, &token_uri)
            .map_err(PublishError::Contract)?;
        let transaction_id = wallet
            .submit_transaction(call)
            .await
            .map_err(|e| match e {
                WalletError::NotConnected => PublishError::WalletNotConnected,
                other => PublishError::SubmitTransaction(other),
            })?;
        log::info!("Mint submitted: {}", transaction_id);

        Ok(MintSubmission {
            transaction_id,
            image_cid,
            metadata_cid,
            token_uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = BusyGuard::acquire(&flag).unwrap();
            assert!(matches!(BusyGuard::acquire(&flag), Err(PublishError::Busy)));
        }
        assert!(BusyGuard::acquire(&flag).is_ok());
    }
}
