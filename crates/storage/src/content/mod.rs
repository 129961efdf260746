pub mod ipfs;
pub mod object;

use async_trait::async_trait;

use cidrag_core::{ChunkObject, Cid};

use crate::error::StorageError;

pub use ipfs::IpfsContentStore;
pub use object::ObjectContentStore;

/// Content-addressed storage for chunk objects.
///
/// `put_json` persists the object as `filename` and returns the CID under
/// which `get_json(cid, filename)` finds it again.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put_json(&self, object: &ChunkObject, filename: &str) -> Result<Cid, StorageError>;

    /// `Ok(None)` when the object is not reachable.
    async fn get_json(&self, cid: &str, filename: &str) -> Result<Option<ChunkObject>, StorageError>;

    fn name(&self) -> &str;
}
