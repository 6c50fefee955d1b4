use std::collections::HashMap;

use bytes::Bytes;
use uuid::Uuid;

use crate::domain::media::BLOB_SCHEME;

#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: String,
}

/// Process-local registry of uploaded file contents keyed by `blob:` handle.
///
/// A handle resolves until it is released; afterwards it is gone for good and
/// releasing it again is a no-op.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    live: HashMap<String, Blob>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, bytes: Bytes, content_type: String, file_name: String) -> String {
        let handle = format!("{}{}", BLOB_SCHEME, Uuid::new_v4());
        self.live.insert(
            handle.clone(),
            Blob {
                bytes,
                content_type,
                file_name,
            },
        );
        handle
    }

    pub fn get(&self, handle: &str) -> Option<&Blob> {
        self.live.get(handle)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.live.contains_key(handle)
    }

    pub fn release(&mut self, handle: &str) -> bool {
        let released = self.live.remove(handle).is_some();
        if !released {
            tracing::debug!(handle, "release of unknown blob handle ignored");
        }
        released
    }

    pub fn release_all(&mut self) -> usize {
        let count = self.live.len();
        self.live.clear();
        count
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
