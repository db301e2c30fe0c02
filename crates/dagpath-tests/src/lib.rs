//! Shared fixtures for the integration tests and benches.
//!
//! Block sources here wrap or replace a [`MemoryBlockStore`] to observe or
//! disturb fetching: counting calls per address, never answering, or
//! always failing.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use dagpath_encoder::{DagBuilder, MemoryBlockStore};
use dagpath_types::{
    BlockError, BlockSource, BoxFuture, ContentAddress, DagNode, Link, NamedLink, ResolveContext,
};

/// Wraps a source and records every fetch.
pub struct CountingSource<S> {
    inner: S,
    fetches: Mutex<HashMap<ContentAddress, usize>>,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetches: Mutex::new(HashMap::new()),
        }
    }

    /// How many times `address` was requested, whether or not it was found.
    pub fn fetches_of(&self, address: &ContentAddress) -> usize {
        self
            .fetches
            .lock()
            .expect("fetch counter poisoned")
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.fetches.lock().expect("fetch counter poisoned").values().sum()
    }
}

impl<S: BlockSource> BlockSource for CountingSource<S> {
    fn get<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        *self
            .fetches
            .lock()
            .expect("fetch counter poisoned")
            .entry(address.clone())
            .or_default() += 1;
        self.inner.get(ctx, address)
    }
}

/// A source whose fetches never complete.
pub struct HangingSource;

impl BlockSource for HangingSource {
    fn get<'a>(
        &'a self,
        _ctx: &'a ResolveContext,
        _address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        Box::pin(std::future::pending())
    }
}

/// A source that fails every fetch with a transport error.
pub struct FailingSource;

impl BlockSource for FailingSource {
    fn get<'a>(
        &'a self,
        _ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        Box::pin(async move { Err(BlockError::source(address, "disk unavailable")) })
    }
}

pub type Store = Arc<MemoryBlockStore>;

/// A fresh in-memory store and a builder writing into it.
pub fn store() -> (Store, DagBuilder<Store>) {
    let store = Arc::new(MemoryBlockStore::new());
    (store.clone(), DagBuilder::new(store))
}

/// One DAG node with the given named links and no data.
///
/// # Panics
///
/// If the store rejects the block.
pub fn dag(builder: &DagBuilder<Store>, links: &[(&str, &Link)]) -> Link {
    builder
        .put_dag(&DagNode {
            links: links
                .iter()
                .map(|(name, link)| NamedLink::new(*name, (*link).clone()))
                .collect(),
            data: None,
        })
        .expect("store dag node")
}

/// `count` raw leaves named `entry-0000`, `entry-0001`, ...
///
/// # Panics
///
/// If the store rejects a block.
pub fn leaves(builder: &DagBuilder<Store>, count: usize) -> BTreeMap<String, Link> {
    (0..count)
        .map(|i| {
            let link = builder
                .put_raw(format!("leaf {i}").as_bytes())
                .expect("store leaf");
            (format!("entry-{i:04}"), link)
        })
        .collect()
}

/// A linear chain `root -> next -> next -> ... -> tail` of `len` links,
/// returned root first with the tail last.
///
/// # Panics
///
/// If the store rejects a block.
pub fn chain(builder: &DagBuilder<Store>, len: usize) -> Vec<Link> {
    let tail = builder.put_raw(b"tail").expect("store tail");
    let mut links = vec![tail];
    for _ in 0..len {
        let next = links.last().cloned().expect("chain starts non-empty");
        links.push(dag(builder, &[("next", &next)]));
    }
    links.reverse();
    links
}
