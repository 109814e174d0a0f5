//! File handles and the transient object-URL resource backing a preview.

use std::collections::HashSet;
use std::sync::Arc;

/// Immutable reference to a selected file: display name, lowercase extension
/// and the raw bytes. Replaced wholesale when the user picks a new file.
#[derive(Debug, Clone)]
pub struct AssetHandle {
    pub name: String,
    pub extension: String,
    pub bytes: Arc<[u8]>,
}

impl AssetHandle {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let extension = name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != name)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Self {
            name,
            extension,
            bytes: bytes.into(),
        }
    }
}

/// Reference-counted transient resource standing in for a browser object
/// URL: created exactly once per handle, revoked exactly once when the
/// handle is replaced or the preview is torn down.
#[derive(Debug, Clone)]
pub struct ObjectUrl {
    id: u64,
    bytes: Arc<[u8]>,
}

impl ObjectUrl {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn url(&self) -> String {
        format!("blob:mesh-preview/{}", self.id)
    }
}

/// Per-preview registry accounting for object-URL creation and revocation.
/// Instance-scoped on purpose: two previews never see each other's URLs.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    next_id: u64,
    live: HashSet<u64>,
    revoked: u64,
    double_revocations: u64,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a URL for the handle's bytes.
    pub fn create(&mut self, handle: &AssetHandle) -> ObjectUrl {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id);
        log::debug!("object url created: blob:mesh-preview/{} ({})", id, handle.name);
        ObjectUrl {
            id,
            bytes: handle.bytes.clone(),
        }
    }

    /// Release a URL. Revoking twice is a lifecycle bug; it is counted and
    /// logged rather than ignored.
    pub fn revoke(&mut self, url: &ObjectUrl) {
        if self.live.remove(&url.id) {
            self.revoked += 1;
            log::debug!("object url revoked: {}", url.url());
        } else {
            self.double_revocations += 1;
            log::warn!("object url revoked twice: {}", url.url());
        }
    }

    /// URLs currently alive.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// URLs revoked over the registry's lifetime.
    pub fn revoked_count(&self) -> u64 {
        self.revoked
    }

    /// Times a URL was revoked after it was already gone.
    pub fn double_revocations(&self) -> u64 {
        self.double_revocations
    }
}
