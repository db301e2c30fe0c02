use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dagpath_wire::ContentAddress;

use crate::context::ResolveContext;

/// A boxed, sendable future borrowed for `'a`.
///
/// The traits in this crate return these so they stay object-safe and can
/// sit behind `dyn` in a resolver configuration.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failure to produce the bytes behind an address.
///
/// ```text
/// ┌───────────────────────────────────────────────────────┐
/// │ BlockError                                            │
/// │   ├── NotFound: the source answered "no such block"   │
/// │   └── Source:   the source itself failed (I/O, etc.)  │
/// └───────────────────────────────────────────────────────┘
/// ```
///
/// A resolver treats the two differently: `NotFound` is a statement about
/// the DAG, `Source` is a statement about the transport.
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block not found: {address}")]
    NotFound { address: ContentAddress },

    #[error("block source failed for {address}: {source}")]
    Source {
        address: ContentAddress,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BlockError {
    /// Wrap any error as a [`BlockError::Source`] for `address`.
    pub fn source(
        address: &ContentAddress,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Source {
            address: address.clone(),
            source: err.into(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &ContentAddress {
        match self {
            Self::NotFound { address } | Self::Source { address, .. } => address,
        }
    }
}

/// Fetches raw blocks by content address.
///
/// Implementations can be in-memory, file-backed, or networked. A fetch
/// may take arbitrarily long, so it receives the caller's
/// [`ResolveContext`]; a well-behaved source returns promptly once the
/// context is interrupted, but a resolver never relies on it and races
/// every fetch against the context anyway.
///
/// The returned bytes are the whole block exactly as addressed.
///
/// # Thread Safety
///
/// Sources must be `Send + Sync`: one source serves any number of
/// concurrent resolutions.
pub trait BlockSource: Send + Sync {
    fn get<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>>;
}

impl<S: BlockSource + ?Sized> BlockSource for Arc<S> {
    fn get<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        (**self).get(ctx, address)
    }
}

impl<S: BlockSource + ?Sized> BlockSource for &S {
    fn get<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        (**self).get(ctx, address)
    }
}

/// Stores raw blocks under their content address.
///
/// The writing half used by encoders. Storing the same address twice is a
/// no-op; the bytes are identical by construction.
pub trait BlockSink: Send + Sync {
    /// # Errors
    ///
    /// [`BlockError::Source`] if the underlying storage fails.
    fn put(&self, address: &ContentAddress, block: &[u8]) -> Result<(), BlockError>;

    fn contains(&self, address: &ContentAddress) -> bool;
}

impl<S: BlockSink + ?Sized> BlockSink for Arc<S> {
    fn put(&self, address: &ContentAddress, block: &[u8]) -> Result<(), BlockError> {
        (**self).put(address, block)
    }

    fn contains(&self, address: &ContentAddress) -> bool {
        (**self).contains(address)
    }
}

impl<S: BlockSink + ?Sized> BlockSink for &S {
    fn put(&self, address: &ContentAddress, block: &[u8]) -> Result<(), BlockError> {
        (**self).put(address, block)
    }

    fn contains(&self, address: &ContentAddress) -> bool {
        (**self).contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagpath_wire::{Codec, HashFn};

    struct Fixed(Vec<u8>);

    impl BlockSource for Fixed {
        fn get<'a>(
            &'a self,
            _ctx: &'a ResolveContext,
            _address: &'a ContentAddress,
        ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
            Box::pin(async move { Ok(self.0.clone()) })
        }
    }

    #[tokio::test]
    async fn arc_and_ref_forward() {
        let address = ContentAddress::compute(Codec::Raw, HashFn::Blake3, b"x");
        let ctx = ResolveContext::background();
        let source = Arc::new(Fixed(b"x".to_vec()));
        assert_eq!(source.get(&ctx, &address).await.unwrap(), b"x");
        let dyn_source: &dyn BlockSource = &*source;
        assert_eq!((&dyn_source).get(&ctx, &address).await.unwrap(), b"x");
    }

    #[test]
    fn error_reports_address() {
        let address = ContentAddress::compute(Codec::Raw, HashFn::Blake3, b"x");
        let err = BlockError::source(&address, "disk on fire");
        assert_eq!(err.address(), &address);
        assert!(err.to_string().contains("disk on fire"));
    }
}
