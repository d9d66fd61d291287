//! Asset pinning: store a blob or a JSON document, get a content id back.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod pinata;

pub use memory::{MemoryPinning, PinnedObject};

#[cfg(not(target_arch = "wasm32"))]
pub use pinata::PinataClient;

use crate::BoxFuture;
use crate::config::MetadataConfig;
use crate::share::ShareLinks;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pinning errors.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("Pinata API keys missing")]
    MissingCredentials,
    #[error("Request failed: {0}")]
    Http(String),
    #[error("Pinning service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for pinning operations.
pub type PinResult<T> = Result<T, PinError>;

/// Content identifier returned by the pinning service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for pinning backends.
///
/// On native platforms implementations must be Send + Sync.
#[cfg(not(target_arch = "wasm32"))]
pub trait PinningService: Send + Sync {
    /// Pin a binary file.
    fn pin_file<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
        mime_type: &'a str,
    ) -> BoxFuture<'a, PinResult<ContentId>>;

    /// Pin a JSON document.
    fn pin_json<'a>(
        &'a self,
        name: &'a str,
        document: &'a serde_json::Value,
    ) -> BoxFuture<'a, PinResult<ContentId>>;
}

/// Trait for pinning backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait PinningService {
    fn pin_file<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
        mime_type: &'a str,
    ) -> BoxFuture<'a, PinResult<ContentId>>;

    fn pin_json<'a>(
        &'a self,
        name: &'a str,
        document: &'a serde_json::Value,
    ) -> BoxFuture<'a, PinResult<ContentId>>;
}

/// One entry of the metadata `attributes` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

/// ERC-721 style token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
    pub attributes: Vec<Attribute>,
}

impl NftMetadata {
    /// Metadata pointing at a pinned image through the gateway.
    pub fn for_image(config: &MetadataConfig, links: &ShareLinks, image: &ContentId) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            image: links.gateway_url(image.as_str()),
            external_url: links.external_url(),
            attributes: vec![
                Attribute {
                    trait_type: "Creator".to_string(),
                    value: config.creator.clone(),
                },
                Attribute {
                    trait_type: "App".to_string(),
                    value: config.app.clone(),
                },
            ],
        }
    }

    pub fn to_value(&self) -> PinResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| PinError::Serialization(e.to_string()))
    }
}
