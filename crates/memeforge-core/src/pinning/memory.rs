//! In-memory pinning for tests and offline use.

use super::{ContentId, PinError, PinResult, PinningService};
use crate::BoxFuture;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that was pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedObject {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Content-addressed in-memory store. Identical bytes get identical ids.
#[derive(Default)]
pub struct MemoryPinning {
    objects: RwLock<HashMap<ContentId, PinnedObject>>,
    failing: AtomicBool,
}

impl MemoryPinning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent request fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, cid: &ContentId) -> Option<PinnedObject> {
        self.objects.read().ok()?.get(cid).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, object: PinnedObject) -> PinResult<ContentId> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PinError::Status {
                status: 503,
                body: "pinning unavailable".to_string(),
            });
        }
        let cid = content_id(&object.bytes);
        let mut objects = self
            .objects
            .write()
            .map_err(|e| PinError::Http(format!("Lock error: {}", e)))?;
        objects.insert(cid.clone(), object);
        Ok(cid)
    }
}

/// `Qm` followed by two FNV-1a digests, alphanumeric like a CIDv0.
fn content_id(bytes: &[u8]) -> ContentId {
    fn fnv1a(bytes: &[u8], seed: u64) -> u64 {
        bytes.iter().fold(seed, |hash, b| {
            (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }
    let a = fnv1a(bytes, 0xcbf2_9ce4_8422_2325);
    let b = fnv1a(bytes, a ^ bytes.len() as u64);
    ContentId::new(format!("Qm{a:016x}{b:016x}"))
}

impl PinningService for MemoryPinning {
    fn pin_file<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
        mime_type: &'a str,
    ) -> BoxFuture<'a, PinResult<ContentId>> {
        Box::pin(async move {
            self.store(PinnedObject {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                bytes,
            })
        })
    }

    fn pin_json<'a>(
        &'a self,
        name: &'a str,
        document: &'a serde_json::Value,
    ) -> BoxFuture<'a, PinResult<ContentId>> {
        Box::pin(async move {
            let bytes = serde_json::to_vec(document)
                .map_err(|e| PinError::Serialization(e.to_string()))?;
            self.store(PinnedObject {
                name: name.to_string(),
                mime_type: "application/json".to_string(),
                bytes,
            })
        })
    }
}
