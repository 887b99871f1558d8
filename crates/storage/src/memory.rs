use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use wardrobe_core::store::{ObjectStorage, StorageError};

/// A stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// [`ObjectStorage`] that keeps objects in a map and hands out
/// `memory://` URLs.
pub struct MemoryStorage {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Look up an object by the URL returned from `upload`.
    pub fn get(&self, url: &str) -> Option<StoredObject> {
        let name = url.strip_prefix(&self.base_url)?.trim_start_matches('/');
        self.objects.lock().ok()?.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let mut objects = self.objects.lock().map_err(|_| StorageError::Upload {
            name: name.to_string(),
            message: "object map lock poisoned".into(),
        })?;
        objects.insert(
            name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{name}", self.base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uploaded_objects_are_retrievable_by_url() {
        let storage = MemoryStorage::default();
        let url = storage.upload(vec![1, 2, 3], "abc.png", "image/png").await.unwrap();
        assert_eq!(url, "memory://objects/abc.png");

        let object = storage.get(&url).unwrap();
        assert_eq!(object.bytes, vec![1, 2, 3]);
        assert_eq!(object.content_type, "image/png");
        assert_eq!(storage.len(), 1);
    }
}
