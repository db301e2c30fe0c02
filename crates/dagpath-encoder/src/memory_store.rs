use std::collections::HashMap;
use std::sync::RwLock;

use dagpath_types::{BlockError, BlockSink, BlockSource, BoxFuture, ContentAddress, ResolveContext};

/// In-memory block store backed by a `HashMap`.
///
/// Suitable for tests and small tools. Not persisted across runs. Uses
/// [`RwLock`] for interior mutability so that [`BlockSink::put`] (which
/// takes `&self`) can mutate the map safely across threads.
///
/// # Concurrency
///
/// Reads (`get`, `contains`) acquire a read lock. Writes (`put`,
/// `remove`) acquire a write lock. A fetch never awaits while holding the
/// lock.
///
/// # Example
///
/// ```rust
/// use dagpath_encoder::{DagBuilder, MemoryBlockStore};
/// use dagpath_types::BlockSink;
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryBlockStore::new());
/// let link = DagBuilder::new(store.clone()).put_raw(b"hello").unwrap();
/// assert!(store.contains(&link.address));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<ContentAddress, Vec<u8>>>,
}

impl MemoryBlockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of stored blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.read().expect("block store lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the total bytes stored across all blocks.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.blocks
            .read()
            .expect("block store lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Drop a block, returning its bytes if it was present.
    pub fn remove(&self, address: &ContentAddress) -> Option<Vec<u8>> {
        self.blocks
            .write()
            .expect("block store lock poisoned")
            .remove(address)
    }

    /// Overwrite the bytes stored under `address`, bypassing the
    /// first-write-wins rule of [`BlockSink::put`].
    pub fn replace(&self, address: &ContentAddress, block: Vec<u8>) {
        self.blocks
            .write()
            .expect("block store lock poisoned")
            .insert(address.clone(), block);
    }

    /// Every stored address, in no particular order.
    #[must_use]
    pub fn addresses(&self) -> Vec<ContentAddress> {
        self.blocks
            .read()
            .expect("block store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn lookup(&self, address: &ContentAddress) -> Option<Vec<u8>> {
        self.blocks
            .read()
            .expect("block store lock poisoned")
            .get(address)
            .cloned()
    }
}

impl BlockSource for MemoryBlockStore {
    fn get<'a>(
        &'a self,
        _ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        let found = self.lookup(address);
        Box::pin(async move {
            found.ok_or_else(|| BlockError::NotFound {
                address: address.clone(),
            })
        })
    }
}

impl BlockSink for MemoryBlockStore {
    fn put(&self, address: &ContentAddress, block: &[u8]) -> Result<(), BlockError> {
        let mut blocks = self.blocks.write().expect("block store lock poisoned");
        blocks
            .entry(address.clone())
            .or_insert_with(|| block.to_vec());
        Ok(())
    }

    fn contains(&self, address: &ContentAddress) -> bool {
        self.blocks
            .read()
            .expect("block store lock poisoned")
            .contains_key(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagpath_types::{Codec, HashFn};

    fn addr(block: &[u8]) -> ContentAddress {
        ContentAddress::compute(Codec::Raw, HashFn::Blake3, block)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = MemoryBlockStore::new();
        let block = b"\x00\x05hello";
        let address = addr(block);
        store.put(&address, block).unwrap();
        let ctx = ResolveContext::background();
        assert_eq!(store.get(&ctx, &address).await.unwrap(), block);
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let store = MemoryBlockStore::new();
        let address = addr(b"nope");
        let err = store
            .get(&ResolveContext::background(), &address)
            .await
            .unwrap_err();
        assert!(matches!(err, BlockError::NotFound { address: a } if a == address));
    }

    #[test]
    fn first_put_wins() {
        let store = MemoryBlockStore::new();
        let address = addr(b"a");
        store.put(&address, b"a").unwrap();
        store.put(&address, b"b").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 1);
        assert_eq!(store.lookup(&address).unwrap(), b"a");
    }

    #[test]
    fn replace_and_remove() {
        let store = MemoryBlockStore::new();
        let address = addr(b"a");
        store.put(&address, b"a").unwrap();
        store.replace(&address, b"corrupt".to_vec());
        assert_eq!(store.lookup(&address).unwrap(), b"corrupt");
        assert_eq!(store.remove(&address).unwrap(), b"corrupt");
        assert!(!store.contains(&address));
        assert!(store.is_empty());
    }
}
