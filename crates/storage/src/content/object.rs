use async_trait::async_trait;
use object_store::PutPayload;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use cidrag_core::{ChunkObject, Cid};

use super::ContentStore;
use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::retry::RetryPolicy;

/// Content-addressed store over an object_store backend (local disk or S3).
///
/// The CID is `b` followed by the lowercase hex SHA-256 of the serialized
/// object; the object is written to `{cid}/{filename}`.
pub struct ObjectContentStore {
    backend: StorageBackend,
    policy: RetryPolicy,
}

impl ObjectContentStore {
    pub fn new(backend: StorageBackend, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }
}

/// Digest-derived identifier for `bytes`.
pub fn content_cid(bytes: &[u8]) -> Cid {
    format!("b{}", hex::encode(Sha256::digest(bytes)))
}

#[async_trait]
impl ContentStore for ObjectContentStore {
    async fn put_json(&self, object: &ChunkObject, filename: &str) -> Result<Cid, StorageError> {
        let body = serde_json::to_vec(object)?;
        let cid = content_cid(&body);
        let location = self.backend.location(&format!("{cid}/{filename}"));

        self.backend
            .store()
            .put(&location, PutPayload::from(body))
            .await?;

        info!(cid = %cid, location = %location, "stored chunk object");
        Ok(cid)
    }

    async fn get_json(&self, cid: &str, filename: &str) -> Result<Option<ChunkObject>, StorageError> {
        let location = self.backend.location(&format!("{cid}/{filename}"));
        let location = &location;
        let store = self.backend.store();

        let bytes = self
            .policy
            .run(|_| async move {
                match store.get(location).await {
                    Ok(result) => result.bytes().await.map(Some),
                    Err(object_store::Error::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;

        match bytes {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => {
                debug!(cid, filename, "chunk object not found");
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        if self.backend.is_remote() {
            "s3"
        } else {
            "local"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::backend::LocalBackend;

    fn local_store(dir: &std::path::Path) -> ObjectContentStore {
        let backend = StorageBackend::Local(LocalBackend::new(dir).unwrap());
        ObjectContentStore::new(
            backend,
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_secs(2)),
        )
    }

    #[test]
    fn cid_is_prefixed_sha256_hex() {
        let cid = content_cid(b"abc");
        assert_eq!(
            cid,
            "bba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(cid.len(), 65);
    }

    #[tokio::test]
    async fn put_then_get_roundtrip_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());

        let object = ChunkObject::for_index(2, "Stored locally.");
        let cid = store.put_json(&object, "chunk-2.json").await.unwrap();

        let expected_cid = content_cid(&serde_json::to_vec(&object).unwrap());
        assert_eq!(cid, expected_cid);
        assert!(tmp.path().join(&cid).join("chunk-2.json").is_file());

        assert_eq!(store.get_json(&cid, "chunk-2.json").await.unwrap(), Some(object));
        assert_eq!(store.name(), "local");
    }

    #[tokio::test]
    async fn identical_objects_share_a_cid() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        let object = ChunkObject::for_index(0, "Same.");

        let a = store.put_json(&object, "chunk-0.json").await.unwrap();
        let b = store.put_json(&object, "chunk-0.json").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        assert_eq!(store.get_json("bdeadbeef", "chunk-0.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_object_is_a_serialization_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = local_store(tmp.path());
        std::fs::create_dir_all(tmp.path().join("bbad")).unwrap();
        std::fs::write(tmp.path().join("bbad").join("chunk-0.json"), b"{not json").unwrap();

        let err = store.get_json("bbad", "chunk-0.json").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialize(_)));
    }
}
